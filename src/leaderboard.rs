//! Leaderboard ranking
//!
//! This module derives ranked standings from the ballot box and the team
//! roster. Standings are computed on demand from final-vote tallies and are
//! never stored; teams that have not presented are excluded entirely,
//! including from rank numbering.
//!
//! Ranks are dense: the highest vote count is rank 1, every team tied on
//! that count shares rank 1, and the next distinct count is rank 2 no
//! matter how wide the tie was.

use itertools::Itertools;
use serde::Serialize;

use super::{Id, Result, registry::TeamRegistry, vote::Ballots};

/// One row of the leaderboard, derived and never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// The ranked team
    pub team_id: Id,
    /// Display name of the team
    pub team_name: String,
    /// Count of final votes for the team
    pub vote_count: usize,
    /// Dense rank, 1-based; ties share a rank
    pub rank: usize,
    /// Always `true` for listed teams; kept for the client contract
    pub has_presented: bool,
}

/// Aggregate leaderboard statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Number of registered teams, presented or not
    pub total_teams: usize,
    /// Number of final votes across all teams
    pub total_final_votes: usize,
    /// Number of teams that have presented
    pub teams_presented: usize,
    /// The entry at rank 1, or `None` while the leaderboard is empty
    pub top_entry: Option<Entry>,
}

/// Computes the full ranked standings
///
/// Teams are ordered by vote count descending with remaining ties broken by
/// team name ascending for determinism, then assigned dense ranks.
///
/// # Errors
///
/// Registry failures are passed through.
pub fn standings<R: TeamRegistry>(ballots: &Ballots, registry: &R) -> Result<Vec<Entry>> {
    let ordered = registry
        .all_teams()?
        .into_iter()
        .filter(|team| team.has_presented)
        .map(|team| (ballots.tally(team.id), team))
        .sorted_by(|(count_a, team_a), (count_b, team_b)| {
            count_b.cmp(count_a).then_with(|| team_a.name.cmp(&team_b.name))
        })
        .collect_vec();

    let mut entries = Vec::with_capacity(ordered.len());
    let mut rank = 0;
    let mut previous_count = None;
    for (count, team) in ordered {
        if previous_count != Some(count) {
            rank += 1;
            previous_count = Some(count);
        }
        entries.push(Entry {
            team_id: team.id,
            team_name: team.name,
            vote_count: count,
            rank,
            has_presented: true,
        });
    }

    Ok(entries)
}

/// Returns the single leaderboard entry for a team
///
/// `None` when the team is unknown or has not presented yet.
///
/// # Errors
///
/// Registry failures are passed through.
pub fn team_entry<R: TeamRegistry>(
    ballots: &Ballots,
    registry: &R,
    team_id: Id,
) -> Result<Option<Entry>> {
    Ok(standings(ballots, registry)?
        .into_iter()
        .find(|entry| entry.team_id == team_id))
}

/// Computes aggregate leaderboard statistics
///
/// # Errors
///
/// Registry failures are passed through.
pub fn stats<R: TeamRegistry>(ballots: &Ballots, registry: &R) -> Result<Stats> {
    let teams = registry.all_teams()?;
    let top_entry = standings(ballots, registry)?.into_iter().next();

    Ok(Stats {
        total_teams: teams.len(),
        total_final_votes: ballots.final_vote_total(),
        teams_presented: teams.iter().filter(|team| team.has_presented).count(),
        top_entry,
    })
}
