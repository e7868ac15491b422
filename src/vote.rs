//! Ballot validation, storage, and tallying
//!
//! This module enforces the voting rules of the event and keeps the ballot
//! box consistent: a voter holds at most one final vote across all teams, at
//! most one draft vote per team, and never any vote for their own team.
//! Validation and commit run inside one `&mut self` call, with secondary
//! indexes maintained alongside the primary vote map, so a check never races
//! its own write as long as callers serialize access to the ballot box.
//!
//! Draft votes are provisional and never counted; tallies consider final
//! votes only.

use std::collections::HashMap;

use garde::Validate;
use rustrict::CensorStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use web_time::SystemTime;

use super::{Id, Result, registry::TeamRegistry};

/// Business-rule rejections for vote submissions
///
/// Rejections are expected outcomes, not failures: they serialize to stable
/// snake_case codes so clients can render precise messaging.
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// The global voting-open flag is off
    #[error("voting is closed")]
    VotingClosed,
    /// The target team does not exist
    #[error("team does not exist")]
    TeamNotFound,
    /// The target team has not presented yet
    #[error("team has not presented yet")]
    TeamNotPresented,
    /// The voter targeted their own team
    #[error("cannot vote for your own team")]
    SelfVoteNotAllowed,
    /// The voter already holds a final vote
    #[error("a final vote has already been cast")]
    AlreadyVotedFinal,
}

/// A ballot cast by a voter for a team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    /// Unique identifier of the ballot
    pub id: Id,
    /// The user who cast it
    pub voter_id: Id,
    /// The team it targets
    pub team_id: Id,
    /// Whether this is the voter's single counted ballot
    pub is_final_vote: bool,
    /// Optional public note shown alongside the vote
    pub note: Option<String>,
    /// When the ballot was last submitted
    pub submitted_at: SystemTime,
}

/// A voter's private judging note about a team, one per (voter, team)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateNote {
    /// Unique identifier of the note
    pub id: Id,
    /// The voter who wrote it
    pub voter_id: Id,
    /// The team it is about
    pub team_id: Id,
    /// Free-text note
    pub note: String,
    /// The voter's private ranking of the team
    pub ranking: u32,
    /// When the note was last updated
    pub updated_at: SystemTime,
}

/// Caller-supplied vote submission
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VoteInput {
    /// The team the ballot targets
    #[garde(skip)]
    pub team_id: Id,
    /// Whether the ballot is final
    #[garde(skip)]
    pub is_final_vote: bool,
    /// Optional public note
    #[garde(inner(length(max = crate::constants::vote::MAX_NOTE_LENGTH)))]
    pub note: Option<String>,
    /// The voter's own team as the caller believes it to be; must agree
    /// with the registry when present
    #[garde(skip)]
    pub voter_team_hint: Option<Id>,
}

/// Caller-supplied private note upsert
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NoteInput {
    /// The team the note is about
    #[garde(skip)]
    pub team_id: Id,
    /// Free-text note
    #[garde(length(max = crate::constants::notes::MAX_NOTE_LENGTH))]
    pub note: String,
    /// Private ranking value
    #[garde(range(
        min = crate::constants::notes::MIN_RANKING,
        max = crate::constants::notes::MAX_RANKING,
    ))]
    pub ranking: u32,
}

/// Outcome of a committed vote submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// The ballot as stored after the commit
    pub vote: Vote,
    /// `true` if a new row was inserted, `false` if a draft was updated
    pub is_new: bool,
}

/// Serialization helper for the ballot box
#[derive(Deserialize)]
struct BallotsSerde {
    voting_open: bool,
    votes: HashMap<Id, Vote>,
    notes: Vec<PrivateNote>,
}

/// The ballot box: votes, private notes, and the voting-open flag
///
/// Secondary indexes (final vote per voter, draft per (voter, team), final
/// tallies per team) are derived from the vote map and rebuilt on
/// deserialization.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(from = "BallotsSerde")]
pub struct Ballots {
    /// Global flag gating all submissions
    voting_open: bool,
    /// Primary vote storage by ballot id
    votes: HashMap<Id, Vote>,
    /// Private notes in insertion order
    notes: Vec<PrivateNote>,

    /// Voter id to their final ballot id (cached)
    #[serde(skip)]
    final_by_voter: HashMap<Id, Id>,
    /// (voter, team) to their draft ballot id (cached)
    #[serde(skip)]
    draft_by_pair: HashMap<(Id, Id), Id>,
    /// Team id to count of final votes (cached)
    #[serde(skip)]
    final_counts: HashMap<Id, usize>,
    /// (voter, team) to position in `notes` (cached)
    #[serde(skip)]
    note_index: HashMap<(Id, Id), usize>,
}

impl From<BallotsSerde> for Ballots {
    /// Rebuilds the cached indexes from the serialized primary data
    fn from(serde: BallotsSerde) -> Self {
        let BallotsSerde {
            voting_open,
            votes,
            notes,
        } = serde;

        let mut final_by_voter = HashMap::new();
        let mut draft_by_pair = HashMap::new();
        let mut final_counts: HashMap<Id, usize> = HashMap::new();
        for vote in votes.values() {
            if vote.is_final_vote {
                final_by_voter.insert(vote.voter_id, vote.id);
                *final_counts.entry(vote.team_id).or_default() += 1;
            } else {
                draft_by_pair.insert((vote.voter_id, vote.team_id), vote.id);
            }
        }

        let note_index = notes
            .iter()
            .enumerate()
            .map(|(i, note)| ((note.voter_id, note.team_id), i))
            .collect();

        Self {
            voting_open,
            votes,
            notes,
            final_by_voter,
            draft_by_pair,
            final_counts,
            note_index,
        }
    }
}

impl Ballots {
    /// Creates an empty ballot box with voting closed
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether submissions are currently accepted
    pub fn is_voting_open(&self) -> bool {
        self.voting_open
    }

    /// Opens or closes voting
    pub fn set_voting_open(&mut self, open: bool) {
        self.voting_open = open;
    }

    /// Validates and commits a vote submission
    ///
    /// # Errors
    ///
    /// See [`Ballots::submit_at`].
    pub fn submit<R: TeamRegistry>(
        &mut self,
        voter_id: Id,
        input: &VoteInput,
        registry: &R,
    ) -> Result<Receipt> {
        self.submit_at(voter_id, input, registry, SystemTime::now())
    }

    /// Validates and commits a vote submission with an explicit timestamp
    ///
    /// Validation order, first failure wins: voting open, team exists, team
    /// has presented, not the voter's own team, final-vote exclusivity.
    /// When the voter already holds a draft for the team, the draft is
    /// updated in place; otherwise a new ballot is inserted. The existence
    /// check and the write happen within this one call.
    ///
    /// # Errors
    ///
    /// * [`crate::Error::Validation`] for malformed or inappropriate input
    /// * [`crate::Error::Rejected`] carrying the specific [`Rejection`]
    /// * [`crate::Error::Conflict`] when the caller's team hint disagrees
    ///   with the registry
    /// * registry failures are passed through
    pub fn submit_at<R: TeamRegistry>(
        &mut self,
        voter_id: Id,
        input: &VoteInput,
        registry: &R,
        now: SystemTime,
    ) -> Result<Receipt> {
        input
            .validate()
            .map_err(|report| crate::Error::Validation(report.to_string()))?;

        let note = match &input.note {
            Some(raw) => {
                let trimmed = rustrict::trim_whitespace(raw);
                if trimmed.is_inappropriate() {
                    return Err(crate::Error::Validation(
                        "note contains inappropriate content".to_owned(),
                    ));
                }
                (!trimmed.is_empty()).then(|| trimmed.to_owned())
            }
            None => None,
        };

        if !self.voting_open {
            return Err(Rejection::VotingClosed.into());
        }

        let Some(team) = registry.team(input.team_id)? else {
            return Err(Rejection::TeamNotFound.into());
        };

        if !team.has_presented {
            return Err(Rejection::TeamNotPresented.into());
        }

        let own_team = registry.user_team(voter_id)?;
        if let Some(hint) = input.voter_team_hint {
            if own_team != Some(hint) {
                return Err(crate::Error::Conflict(
                    "voter team hint disagrees with the registry".to_owned(),
                ));
            }
        }
        if own_team == Some(team.id) {
            return Err(Rejection::SelfVoteNotAllowed.into());
        }

        if input.is_final_vote && self.final_by_voter.contains_key(&voter_id) {
            return Err(Rejection::AlreadyVotedFinal.into());
        }

        match self.draft_by_pair.get(&(voter_id, team.id)).copied() {
            Some(vote_id) => {
                let vote = self
                    .votes
                    .get_mut(&vote_id)
                    .ok_or_else(|| crate::Error::Internal(format!("vote {vote_id} vanished")))?;

                vote.note.clone_from(&note);
                vote.is_final_vote = input.is_final_vote;
                vote.submitted_at = now;

                if vote.is_final_vote {
                    self.draft_by_pair.remove(&(voter_id, team.id));
                    self.final_by_voter.insert(voter_id, vote_id);
                    *self.final_counts.entry(team.id).or_default() += 1;
                }

                Ok(Receipt {
                    vote: self.votes[&vote_id].clone(),
                    is_new: false,
                })
            }
            None => {
                let vote_id = Id::new();
                let vote = Vote {
                    id: vote_id,
                    voter_id,
                    team_id: team.id,
                    is_final_vote: input.is_final_vote,
                    note,
                    submitted_at: now,
                };

                if vote.is_final_vote {
                    self.final_by_voter.insert(voter_id, vote_id);
                    *self.final_counts.entry(team.id).or_default() += 1;
                } else {
                    self.draft_by_pair.insert((voter_id, team.id), vote_id);
                }

                self.votes.insert(vote_id, vote);
                Ok(Receipt {
                    vote: self.votes[&vote_id].clone(),
                    is_new: true,
                })
            }
        }
    }

    /// Count of final votes for a team; drafts never count
    pub fn tally(&self, team_id: Id) -> usize {
        self.final_counts.get(&team_id).copied().unwrap_or(0)
    }

    /// Total number of final votes across all teams
    pub fn final_vote_total(&self) -> usize {
        self.final_by_voter.len()
    }

    /// The voter's final ballot, if they have committed one
    pub fn final_vote_of(&self, voter_id: Id) -> Option<&Vote> {
        self.final_by_voter
            .get(&voter_id)
            .and_then(|vote_id| self.votes.get(vote_id))
    }

    /// The voter's draft ballot for a team, if any
    pub fn draft_of(&self, voter_id: Id, team_id: Id) -> Option<&Vote> {
        self.draft_by_pair
            .get(&(voter_id, team_id))
            .and_then(|vote_id| self.votes.get(vote_id))
    }

    /// Number of stored ballots, drafts included
    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    /// Upserts the voter's private note for a team
    ///
    /// # Errors
    ///
    /// See [`Ballots::upsert_note_at`].
    pub fn upsert_note<R: TeamRegistry>(
        &mut self,
        voter_id: Id,
        input: &NoteInput,
        registry: &R,
    ) -> Result<PrivateNote> {
        self.upsert_note_at(voter_id, input, registry, SystemTime::now())
    }

    /// Upserts the voter's private note with an explicit timestamp
    ///
    /// # Errors
    ///
    /// * [`crate::Error::Validation`] for out-of-bounds note or ranking
    /// * [`crate::Error::NotFound`] if the team does not exist
    /// * registry failures are passed through
    pub fn upsert_note_at<R: TeamRegistry>(
        &mut self,
        voter_id: Id,
        input: &NoteInput,
        registry: &R,
        now: SystemTime,
    ) -> Result<PrivateNote> {
        input
            .validate()
            .map_err(|report| crate::Error::Validation(report.to_string()))?;

        if registry.team(input.team_id)?.is_none() {
            return Err(crate::Error::not_found("team", input.team_id));
        }

        match self.note_index.get(&(voter_id, input.team_id)).copied() {
            Some(index) => {
                let note = &mut self.notes[index];
                note.note.clone_from(&input.note);
                note.ranking = input.ranking;
                note.updated_at = now;
                Ok(note.clone())
            }
            None => {
                let note = PrivateNote {
                    id: Id::new(),
                    voter_id,
                    team_id: input.team_id,
                    note: input.note.clone(),
                    ranking: input.ranking,
                    updated_at: now,
                };
                self.note_index
                    .insert((voter_id, input.team_id), self.notes.len());
                self.notes.push(note.clone());
                Ok(note)
            }
        }
    }

    /// The voter's private notes ordered by their ranking, best first
    pub fn user_rankings(&self, voter_id: Id) -> Vec<PrivateNote> {
        let mut rankings: Vec<PrivateNote> = self
            .notes
            .iter()
            .filter(|note| note.voter_id == voter_id)
            .cloned()
            .collect();
        rankings.sort_by_key(|note| note.ranking);
        rankings
    }
}
