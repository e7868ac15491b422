//! Presentation queue management
//!
//! This module orders teams into a presentation queue and tracks which
//! presentation is upcoming, on stage, or finished. Slots move one way
//! (`upcoming → current → completed`); only a full reset regresses them.
//! Process-wide, at most one presentation is `current` at any time, and each
//! queue transition happens inside a single `&mut self` call so exterior
//! serialization is enough to keep that invariant.

use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use web_time::SystemTime;

use super::{Error, Id, Result, constants, registry::TeamRegistry};

/// Lifecycle state of a presentation slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Waiting for its turn in the queue
    Upcoming,
    /// On stage right now
    Current,
    /// Finished presenting
    Completed,
}

/// A single team's slot in the presentation queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    /// Unique identifier of the slot
    pub id: Id,
    /// The team presenting in this slot
    pub team_id: Id,
    /// Lifecycle state of the slot
    pub status: Status,
    /// Position in the queue, assigned at initialization (1-based)
    pub order: u32,
    /// When the presentation went on stage
    pub started_at: Option<SystemTime>,
    /// When the presentation finished
    pub completed_at: Option<SystemTime>,
}

/// Snapshot of the queue grouped by lifecycle state
///
/// `upcoming` is ordered by queue position ascending, `completed` by finish
/// time descending (most recent first).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    /// The presentation on stage, if any
    pub current: Option<Presentation>,
    /// Presentations still waiting, next first
    pub upcoming: Vec<Presentation>,
    /// Finished presentations, most recent first
    pub completed: Vec<Presentation>,
}

/// Outcome of a queue transition
///
/// `started` is `None` when the queue ran out of upcoming presentations,
/// which leaves the round with no presentation on stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    /// The previously current presentation, now completed
    pub completed: Option<Presentation>,
    /// The presentation promoted to the stage
    pub started: Option<Presentation>,
}

/// Orders teams and tracks presentation lifecycle for one event round
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PresentationQueue {
    presentations: HashMap<Id, Presentation>,
}

impl PresentationQueue {
    /// Creates an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards any prior queue and deals a fresh random running order
    ///
    /// Fetches all teams from the registry, assigns a uniformly random
    /// permutation of queue positions, writes each position back through the
    /// registry, and creates one `upcoming` presentation per team.
    ///
    /// # Errors
    ///
    /// * [`Error::Conflict`] if a presentation is currently on stage
    /// * [`Error::Validation`] if the roster exceeds the team limit
    /// * registry failures are passed through
    pub fn initialize<R: TeamRegistry>(&mut self, registry: &mut R) -> Result<QueueStatus> {
        if self.presentations.values().any(|p| p.status == Status::Current) {
            return Err(Error::Conflict(
                "cannot initialize while a presentation is in progress".to_owned(),
            ));
        }

        let mut teams = registry
            .all_teams()?
            .into_iter()
            .map(|team| team.id)
            .sorted()
            .collect_vec();

        if teams.len() > constants::queue::MAX_TEAM_COUNT {
            return Err(Error::Validation(format!(
                "at most {} teams may enter a round",
                constants::queue::MAX_TEAM_COUNT
            )));
        }

        fastrand::shuffle(&mut teams);

        let mut fresh = HashMap::with_capacity(teams.len());
        for (index, team_id) in teams.into_iter().enumerate() {
            let order = index as u32 + 1;
            registry.set_presentation_order(team_id, Some(order))?;

            let id = Id::new();
            fresh.insert(
                id,
                Presentation {
                    id,
                    team_id,
                    status: Status::Upcoming,
                    order,
                    started_at: None,
                    completed_at: None,
                },
            );
        }

        self.presentations = fresh;
        Ok(self.status())
    }

    /// Puts the given presentation on stage
    ///
    /// If another presentation is current it is completed first; both steps
    /// happen within this call. The presenting team is marked as having
    /// presented. Starting the presentation that is already on stage is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// * [`Error::NotFound`] if the id is unknown
    /// * [`Error::Internal`] if queue and roster disagree about the team
    pub fn start<R: TeamRegistry>(
        &mut self,
        presentation_id: Id,
        registry: &mut R,
    ) -> Result<Transition> {
        self.start_at(presentation_id, registry, SystemTime::now())
    }

    /// Puts the given presentation on stage using an explicit clock reading
    ///
    /// # Errors
    ///
    /// Same failure modes as [`PresentationQueue::start`].
    pub fn start_at<R: TeamRegistry>(
        &mut self,
        presentation_id: Id,
        registry: &mut R,
        now: SystemTime,
    ) -> Result<Transition> {
        let target = self
            .presentations
            .get(&presentation_id)
            .ok_or_else(|| Error::not_found("presentation", presentation_id))?
            .clone();

        if target.status == Status::Current {
            return Ok(Transition {
                completed: None,
                started: Some(target),
            });
        }

        mark_presented(registry, target.team_id)?;

        let completed = self.complete_current(now)?;

        let slot = self
            .presentations
            .get_mut(&presentation_id)
            .ok_or_else(|| Error::Internal(format!("presentation {presentation_id} vanished")))?;
        slot.status = Status::Current;
        slot.started_at = Some(now);
        slot.completed_at = None;
        let started = slot.clone();

        Ok(Transition {
            completed,
            started: Some(started),
        })
    }

    /// Completes the current presentation and promotes the next upcoming one
    ///
    /// Both steps execute within this single call; a partially applied
    /// transition is never observable. When no upcoming presentation
    /// remains, `started` is `None` and the stage is left empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if queue and roster disagree about the
    /// promoted team; registry failures are passed through.
    pub fn advance<R: TeamRegistry>(&mut self, registry: &mut R) -> Result<Transition> {
        self.advance_at(registry, SystemTime::now())
    }

    /// Completes and promotes using an explicit clock reading
    ///
    /// # Errors
    ///
    /// Same failure modes as [`PresentationQueue::advance`].
    pub fn advance_at<R: TeamRegistry>(
        &mut self,
        registry: &mut R,
        now: SystemTime,
    ) -> Result<Transition> {
        let next = self
            .presentations
            .values()
            .filter(|p| p.status == Status::Upcoming)
            .min_by_key(|p| p.order)
            .map(|p| p.id);

        if let Some(next_id) = next {
            let team_id = self.presentations[&next_id].team_id;
            mark_presented(registry, team_id)?;
        }

        let completed = self.complete_current(now)?;

        let started = match next {
            Some(next_id) => {
                let slot = self
                    .presentations
                    .get_mut(&next_id)
                    .ok_or_else(|| Error::Internal(format!("presentation {next_id} vanished")))?;
                slot.status = Status::Current;
                slot.started_at = Some(now);
                Some(slot.clone())
            }
            None => None,
        };

        Ok(Transition { completed, started })
    }

    /// Deletes every presentation and clears roster presentation state
    ///
    /// # Errors
    ///
    /// Registry failures are passed through; the queue is cleared regardless.
    pub fn reset<R: TeamRegistry>(&mut self, registry: &mut R) -> Result<()> {
        self.presentations.clear();
        registry.clear_presentation_state()
    }

    /// Snapshot of the queue grouped by lifecycle state
    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            current: self
                .presentations
                .values()
                .find(|p| p.status == Status::Current)
                .cloned(),
            upcoming: self
                .presentations
                .values()
                .filter(|p| p.status == Status::Upcoming)
                .sorted_by_key(|p| p.order)
                .cloned()
                .collect_vec(),
            completed: self
                .presentations
                .values()
                .filter(|p| p.status == Status::Completed)
                .sorted_by_key(|p| p.completed_at)
                .rev()
                .cloned()
                .collect_vec(),
        }
    }

    /// Looks up a presentation by id
    pub fn get(&self, presentation_id: Id) -> Option<&Presentation> {
        self.presentations.get(&presentation_id)
    }

    /// Number of presentations in the queue
    pub fn len(&self) -> usize {
        self.presentations.len()
    }

    /// Whether the queue holds no presentations
    pub fn is_empty(&self) -> bool {
        self.presentations.is_empty()
    }

    /// Completes the current presentation, enforcing the single-stage rule
    fn complete_current(&mut self, now: SystemTime) -> Result<Option<Presentation>> {
        let current = self
            .presentations
            .values()
            .filter(|p| p.status == Status::Current)
            .map(|p| p.id)
            .collect_vec();

        if current.len() > 1 {
            return Err(Error::Internal(format!(
                "{} presentations are on stage at once",
                current.len()
            )));
        }

        Ok(match current.first() {
            Some(&id) => {
                let slot = self
                    .presentations
                    .get_mut(&id)
                    .ok_or_else(|| Error::Internal(format!("presentation {id} vanished")))?;
                slot.status = Status::Completed;
                slot.completed_at = Some(now);
                Some(slot.clone())
            }
            None => None,
        })
    }
}

/// Marks a team presented, escalating roster disagreement to `Internal`
///
/// A presentation always references a registry team; the roster not knowing
/// that team is a structural violation, not a caller mistake.
fn mark_presented<R: TeamRegistry>(registry: &mut R, team_id: Id) -> Result<()> {
    registry.mark_presented(team_id).map_err(|e| match e {
        Error::NotFound(_) => {
            Error::Internal(format!("queue references unknown team {team_id}"))
        }
        other => other,
    })
}
