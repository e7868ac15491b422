//! Event coordination facade
//!
//! The [`Coordinator`] owns every piece of mutable event state (queue, timer,
//! ballot box, subscriptions) behind one `&mut self` surface and wires state
//! changes to their broadcast events. Callers hold exactly one coordinator
//! per event and serialize access to it, typically behind a mutex or an
//! actor mailbox; given that, every operation here is atomic end to end.
//!
//! Observers receive events through the same tunnel-finder pattern as
//! [`crate::broadcast`]: each mutating operation takes a closure resolving
//! observer ids to live tunnels, so the coordinator never owns connections.

use std::time::Duration;

use web_time::SystemTime;

use super::{
    Error, Id, Result,
    broadcast::{Broadcaster, Event, Topic, Tunnel},
    leaderboard,
    queue::{PresentationQueue, QueueStatus, Transition},
    registry::TeamRegistry,
    timer::{self, TimerState},
    vote::{Ballots, NoteInput, PrivateNote, Receipt, VoteInput},
};

/// Central coordinator for one voting event
///
/// Generic over the team registry so production code can plug in a
/// store-backed roster while tests use
/// [`crate::registry::InMemoryRegistry`].
#[derive(Debug)]
pub struct Coordinator<R: TeamRegistry> {
    registry: R,
    queue: PresentationQueue,
    timer: TimerState,
    ballots: Ballots,
    broadcaster: Broadcaster,
}

impl<R: TeamRegistry> Coordinator<R> {
    /// Creates a coordinator with an empty queue, baseline timer, and
    /// voting closed
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            queue: PresentationQueue::new(),
            timer: TimerState::default(),
            ballots: Ballots::new(),
            broadcaster: Broadcaster::new(),
        }
    }

    /// Read access to the team registry
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Write access to the team registry, for roster management
    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    /// Current timer state
    pub fn timer(&self) -> &TimerState {
        &self.timer
    }

    // ---- presentation queue ----

    /// Deals a fresh random running order and announces the new queue
    ///
    /// # Errors
    ///
    /// See [`PresentationQueue::initialize`].
    pub fn initialize_queue<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        tunnel_finder: F,
    ) -> Result<QueueStatus> {
        let status = self.queue.initialize(&mut self.registry)?;
        self.broadcaster
            .publish(&Event::QueueUpdated(status.clone()), tunnel_finder);
        Ok(status)
    }

    /// Puts a specific presentation on stage
    ///
    /// # Errors
    ///
    /// See [`PresentationQueue::start`].
    pub fn start_presentation<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        presentation_id: Id,
        tunnel_finder: F,
    ) -> Result<Transition> {
        self.start_presentation_at(presentation_id, SystemTime::now(), tunnel_finder)
    }

    /// Puts a presentation on stage using an explicit clock reading
    ///
    /// # Errors
    ///
    /// See [`PresentationQueue::start`].
    pub fn start_presentation_at<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        presentation_id: Id,
        now: SystemTime,
        tunnel_finder: F,
    ) -> Result<Transition> {
        let transition = self
            .queue
            .start_at(presentation_id, &mut self.registry, now)?;
        self.publish_transition(&transition, &tunnel_finder);
        Ok(transition)
    }

    /// Completes the current presentation and promotes the next one
    ///
    /// # Errors
    ///
    /// See [`PresentationQueue::advance`].
    pub fn advance_to_next<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        tunnel_finder: F,
    ) -> Result<Transition> {
        self.advance_to_next_at(SystemTime::now(), tunnel_finder)
    }

    /// Completes and promotes using an explicit clock reading
    ///
    /// # Errors
    ///
    /// See [`PresentationQueue::advance`].
    pub fn advance_to_next_at<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        now: SystemTime,
        tunnel_finder: F,
    ) -> Result<Transition> {
        let transition = self.queue.advance_at(&mut self.registry, now)?;
        self.publish_transition(&transition, &tunnel_finder);
        Ok(transition)
    }

    /// Clears the queue and roster presentation state, stops the timer, and
    /// announces the empty queue
    ///
    /// Ballots are kept; a queue reset reorders presentations, it does not
    /// void votes.
    ///
    /// # Errors
    ///
    /// Registry failures are passed through.
    pub fn reset_queue<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        tunnel_finder: F,
    ) -> Result<()> {
        self.queue.reset(&mut self.registry)?;
        self.timer.reset();
        self.broadcaster
            .publish(&Event::QueueUpdated(self.queue.status()), &tunnel_finder);
        self.broadcaster
            .publish(&Event::TimerUpdate(self.timer.clone()), &tunnel_finder);
        Ok(())
    }

    /// Snapshot of the queue grouped by lifecycle state
    pub fn queue_status(&self) -> QueueStatus {
        self.queue.status()
    }

    // ---- countdown timer ----

    /// Starts the countdown for a presentation
    ///
    /// # Errors
    ///
    /// * [`Error::Validation`] if the duration is out of bounds
    /// * [`Error::NotFound`] if the presentation is unknown
    pub fn start_timer<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        presentation_id: Id,
        duration_seconds: u64,
        tunnel_finder: F,
    ) -> Result<()> {
        self.start_timer_at(
            presentation_id,
            duration_seconds,
            SystemTime::now(),
            tunnel_finder,
        )
    }

    /// Starts the countdown using an explicit clock reading
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Coordinator::start_timer`].
    pub fn start_timer_at<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        presentation_id: Id,
        duration_seconds: u64,
        now: SystemTime,
        tunnel_finder: F,
    ) -> Result<()> {
        timer::validate_duration_seconds(duration_seconds)?;
        if self.queue.get(presentation_id).is_none() {
            return Err(Error::not_found("presentation", presentation_id));
        }

        self.timer
            .start_at(presentation_id, Duration::from_secs(duration_seconds), now);
        self.publish_timer(&tunnel_finder);
        Ok(())
    }

    /// Pauses the countdown; a no-op when it is not running
    pub fn pause_timer<T: Tunnel, F: Fn(Id) -> Option<T>>(&mut self, tunnel_finder: F) {
        self.pause_timer_at(SystemTime::now(), tunnel_finder);
    }

    /// Pauses the countdown using an explicit clock reading
    pub fn pause_timer_at<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        now: SystemTime,
        tunnel_finder: F,
    ) {
        self.timer.pause_at(now);
        self.publish_timer(&tunnel_finder);
    }

    /// Returns the timer to its baseline and announces it
    pub fn reset_timer<T: Tunnel, F: Fn(Id) -> Option<T>>(&mut self, tunnel_finder: F) {
        self.timer.reset();
        self.publish_timer(&tunnel_finder);
    }

    /// Reconfigures the countdown duration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the duration is out of bounds.
    pub fn set_timer_duration<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        duration_seconds: u64,
        tunnel_finder: F,
    ) -> Result<()> {
        self.timer.set_duration(duration_seconds)?;
        self.publish_timer(&tunnel_finder);
        Ok(())
    }

    /// Remaining countdown time in whole seconds, never negative
    pub fn remaining_seconds(&self) -> u64 {
        self.timer.remaining().as_secs()
    }

    /// Remaining countdown time using an explicit clock reading
    pub fn remaining_seconds_at(&self, now: SystemTime) -> u64 {
        self.timer.remaining_at(now).as_secs()
    }

    /// Records that the countdown reached zero and announces the expiry
    ///
    /// The driving loop lives outside this crate; it calls in when its tick
    /// observes zero remaining. The timer is stopped so a late second tick
    /// announces nothing twice.
    pub fn notify_timer_expired<T: Tunnel, F: Fn(Id) -> Option<T>>(&mut self, tunnel_finder: F) {
        self.notify_timer_expired_at(SystemTime::now(), tunnel_finder);
    }

    /// Records the expiry using an explicit clock reading
    pub fn notify_timer_expired_at<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        now: SystemTime,
        tunnel_finder: F,
    ) {
        if !self.timer.is_active {
            return;
        }

        self.timer.pause_at(now);
        self.broadcaster
            .publish(&Event::TimerExpired { timestamp: now }, &tunnel_finder);
        self.publish_timer(&tunnel_finder);
    }

    // ---- voting ----

    /// Whether vote submissions are currently accepted
    pub fn is_voting_open(&self) -> bool {
        self.ballots.is_voting_open()
    }

    /// Opens or closes voting for the whole event
    pub fn set_voting_open(&mut self, open: bool) {
        self.ballots.set_voting_open(open);
    }

    /// Validates and commits a vote, then announces the outcome
    ///
    /// Every committed ballot is announced; tally and leaderboard events
    /// follow only for final votes, since drafts never change a count.
    ///
    /// # Errors
    ///
    /// See [`Ballots::submit`].
    pub fn submit_vote<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        voter_id: Id,
        input: &VoteInput,
        tunnel_finder: F,
    ) -> Result<Receipt> {
        self.submit_vote_at(voter_id, input, SystemTime::now(), tunnel_finder)
    }

    /// Validates and commits a vote with an explicit timestamp
    ///
    /// # Errors
    ///
    /// See [`Ballots::submit_at`].
    pub fn submit_vote_at<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        voter_id: Id,
        input: &VoteInput,
        now: SystemTime,
        tunnel_finder: F,
    ) -> Result<Receipt> {
        let receipt = self.ballots.submit_at(voter_id, input, &self.registry, now)?;

        self.broadcaster.publish(
            &Event::VoteSubmitted(receipt.vote.clone()),
            &tunnel_finder,
        );

        if receipt.vote.is_final_vote {
            let team_id = receipt.vote.team_id;
            self.broadcaster.publish(
                &Event::VoteCount {
                    team_id,
                    count: self.ballots.tally(team_id),
                },
                &tunnel_finder,
            );

            let entries = leaderboard::standings(&self.ballots, &self.registry)?;
            let entry = entries.iter().find(|e| e.team_id == team_id).cloned();
            self.broadcaster
                .publish(&Event::LeaderboardUpdate(entries), &tunnel_finder);
            self.broadcaster.publish(
                &Event::LeaderboardTeamUpdate { team_id, entry },
                &tunnel_finder,
            );
        }

        Ok(receipt)
    }

    /// Upserts the caller's private judging note for a team
    ///
    /// Private notes are never broadcast.
    ///
    /// # Errors
    ///
    /// See [`Ballots::upsert_note`].
    pub fn update_private_note(&mut self, voter_id: Id, input: &NoteInput) -> Result<PrivateNote> {
        self.ballots.upsert_note(voter_id, input, &self.registry)
    }

    /// The caller's private notes ordered by their ranking, best first
    pub fn user_rankings(&self, voter_id: Id) -> Vec<PrivateNote> {
        self.ballots.user_rankings(voter_id)
    }

    // ---- leaderboard ----

    /// Full ranked standings
    ///
    /// # Errors
    ///
    /// Registry failures are passed through.
    pub fn leaderboard(&self) -> Result<Vec<leaderboard::Entry>> {
        leaderboard::standings(&self.ballots, &self.registry)
    }

    /// A single team's leaderboard entry, if listed
    ///
    /// # Errors
    ///
    /// Registry failures are passed through.
    pub fn team_entry(&self, team_id: Id) -> Result<Option<leaderboard::Entry>> {
        leaderboard::team_entry(&self.ballots, &self.registry, team_id)
    }

    /// Aggregate leaderboard statistics
    ///
    /// # Errors
    ///
    /// Registry failures are passed through.
    pub fn leaderboard_stats(&self) -> Result<leaderboard::Stats> {
        leaderboard::stats(&self.ballots, &self.registry)
    }

    // ---- subscriptions ----

    /// Subscribes an observer to a topic
    pub fn subscribe(&mut self, topic: Topic, observer: Id) -> bool {
        self.broadcaster.subscribe(topic, observer)
    }

    /// Unsubscribes an observer from a topic
    pub fn unsubscribe(&mut self, topic: Topic, observer: Id) -> bool {
        self.broadcaster.unsubscribe(topic, observer)
    }

    /// Removes an observer from every topic, e.g. on disconnect
    pub fn unsubscribe_all(&mut self, observer: Id) {
        self.broadcaster.unsubscribe_all(observer);
    }

    /// Announces a queue transition: each touched presentation, then the
    /// reshaped queue
    fn publish_transition<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &self,
        transition: &Transition,
        tunnel_finder: &F,
    ) {
        if let Some(completed) = &transition.completed {
            self.broadcaster
                .publish(&Event::PresentationUpdate(completed.clone()), tunnel_finder);
        }
        if let Some(started) = &transition.started {
            self.broadcaster
                .publish(&Event::PresentationUpdate(started.clone()), tunnel_finder);
        }
        self.broadcaster
            .publish(&Event::QueueUpdated(self.queue.status()), tunnel_finder);
    }

    fn publish_timer<T: Tunnel, F: Fn(Id) -> Option<T>>(&self, tunnel_finder: &F) {
        self.broadcaster
            .publish(&Event::TimerUpdate(self.timer.clone()), tunnel_finder);
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };

    use super::*;
    use crate::{registry::InMemoryRegistry, vote::Rejection};

    #[derive(Debug, Clone, Default)]
    struct MockTunnel {
        messages: Arc<Mutex<VecDeque<String>>>,
    }

    impl MockTunnel {
        fn event_names(&self) -> Vec<String> {
            self.messages
                .lock()
                .unwrap()
                .iter()
                .map(|m| {
                    serde_json::from_str::<serde_json::Value>(m).unwrap()["event"]
                        .as_str()
                        .unwrap()
                        .to_owned()
                })
                .collect()
        }

        fn clear(&self) {
            self.messages.lock().unwrap().clear();
        }
    }

    impl Tunnel for MockTunnel {
        fn send(&self, event: &Event) {
            self.messages.lock().unwrap().push_back(event.to_message());
        }

        fn close(self) {}
    }

    fn instant(offset_seconds: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000 + offset_seconds)
    }

    /// A coordinator with three registered teams and an observer watching
    /// every topic through one tunnel
    fn full_setup() -> (Coordinator<InMemoryRegistry>, Vec<Id>, Id, MockTunnel) {
        let mut registry = InMemoryRegistry::new();
        let teams = vec![
            registry.add_team("Alpha"),
            registry.add_team("Beta"),
            registry.add_team("Gamma"),
        ];

        let mut coordinator = Coordinator::new(registry);
        let observer = Id::new();
        for topic in [
            Topic::Leaderboard,
            Topic::Presentation,
            Topic::Timer,
            Topic::Vote,
        ] {
            coordinator.subscribe(topic, observer);
        }

        (coordinator, teams, observer, MockTunnel::default())
    }

    fn final_vote(team_id: Id) -> VoteInput {
        VoteInput {
            team_id,
            is_final_vote: true,
            note: None,
            voter_team_hint: None,
        }
    }

    #[test]
    fn test_full_event_flow() {
        let (mut coordinator, _, observer, tunnel) = full_setup();
        let finder = |id: Id| (id == observer).then(|| tunnel.clone());

        // Deal the running order and walk the first team on stage.
        let status = coordinator.initialize_queue(finder).unwrap();
        assert_eq!(status.upcoming.len(), 3);

        let transition = coordinator.advance_to_next_at(instant(0), finder).unwrap();
        let on_stage = transition.started.unwrap();

        // Run a countdown for the presentation.
        coordinator
            .start_timer_at(on_stage.id, 300, instant(0), finder)
            .unwrap();
        assert_eq!(coordinator.remaining_seconds_at(instant(100)), 200);

        // Open voting and cast a final vote for the team on stage.
        coordinator.set_voting_open(true);
        let voter = Id::new();
        let receipt = coordinator
            .submit_vote_at(voter, &final_vote(on_stage.team_id), instant(120), finder)
            .unwrap();
        assert!(receipt.is_new);

        let entries = coordinator.leaderboard().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].team_id, on_stage.team_id);
        assert_eq!(entries[0].vote_count, 1);
        assert_eq!(entries[0].rank, 1);
    }

    #[test]
    fn test_queue_events_published_per_transition() {
        let (mut coordinator, _, observer, tunnel) = full_setup();
        let finder = |id: Id| (id == observer).then(|| tunnel.clone());

        coordinator.initialize_queue(finder).unwrap();
        assert_eq!(tunnel.event_names(), vec!["presentation:queue:updated"]);

        tunnel.clear();
        coordinator.advance_to_next_at(instant(0), finder).unwrap();
        assert_eq!(
            tunnel.event_names(),
            vec!["presentation:update", "presentation:queue:updated"],
            "first advance completes nothing"
        );

        tunnel.clear();
        coordinator.advance_to_next_at(instant(60), finder).unwrap();
        assert_eq!(
            tunnel.event_names(),
            vec![
                "presentation:update",
                "presentation:update",
                "presentation:queue:updated"
            ],
            "later advances announce the completed and the started slot"
        );
    }

    #[test]
    fn test_vote_events_final_vs_draft() {
        let (mut coordinator, _, observer, tunnel) = full_setup();
        let finder = |id: Id| (id == observer).then(|| tunnel.clone());

        coordinator.initialize_queue(finder).unwrap();
        let transition = coordinator.advance_to_next_at(instant(0), finder).unwrap();
        let team_id = transition.started.unwrap().team_id;
        coordinator.set_voting_open(true);

        tunnel.clear();
        let draft = VoteInput {
            is_final_vote: false,
            ..final_vote(team_id)
        };
        coordinator
            .submit_vote_at(Id::new(), &draft, instant(10), finder)
            .unwrap();
        assert_eq!(
            tunnel.event_names(),
            vec!["vote:submitted"],
            "drafts never touch tallies or the leaderboard"
        );

        tunnel.clear();
        coordinator
            .submit_vote_at(Id::new(), &final_vote(team_id), instant(20), finder)
            .unwrap();
        assert_eq!(
            tunnel.event_names(),
            vec![
                "vote:submitted",
                "vote:count",
                "leaderboard:update",
                "leaderboard:team:update"
            ]
        );
    }

    #[test]
    fn test_rejected_vote_publishes_nothing() {
        let (mut coordinator, teams, observer, tunnel) = full_setup();
        let finder = |id: Id| (id == observer).then(|| tunnel.clone());

        coordinator.set_voting_open(true);
        let result = coordinator.submit_vote_at(Id::new(), &final_vote(teams[0]), instant(0), finder);

        assert_eq!(result, Err(Rejection::TeamNotPresented.into()));
        assert!(tunnel.event_names().is_empty());
    }

    #[test]
    fn test_voting_closed_by_default() {
        let (mut coordinator, teams, observer, tunnel) = full_setup();
        let finder = |id: Id| (id == observer).then(|| tunnel.clone());

        assert!(!coordinator.is_voting_open());
        let result = coordinator.submit_vote_at(Id::new(), &final_vote(teams[0]), instant(0), finder);
        assert_eq!(result, Err(Rejection::VotingClosed.into()));
    }

    #[test]
    fn test_start_timer_unknown_presentation() {
        let (mut coordinator, _, observer, tunnel) = full_setup();
        let finder = |id: Id| (id == observer).then(|| tunnel.clone());

        coordinator.initialize_queue(finder).unwrap();
        let result = coordinator.start_timer_at(Id::new(), 300, instant(0), finder);
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_start_timer_duration_bounds() {
        let (mut coordinator, _, observer, tunnel) = full_setup();
        let finder = |id: Id| (id == observer).then(|| tunnel.clone());

        coordinator.initialize_queue(finder).unwrap();
        let slot = coordinator.queue_status().upcoming[0].id;

        assert!(matches!(
            coordinator.start_timer_at(slot, 0, instant(0), finder),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            coordinator.start_timer_at(slot, 3601, instant(0), finder),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_timer_pause_and_events() {
        let (mut coordinator, _, observer, tunnel) = full_setup();
        let finder = |id: Id| (id == observer).then(|| tunnel.clone());

        coordinator.initialize_queue(finder).unwrap();
        let slot = coordinator.queue_status().upcoming[0].id;

        tunnel.clear();
        coordinator
            .start_timer_at(slot, 300, instant(0), finder)
            .unwrap();
        coordinator.pause_timer_at(instant(100), finder);

        assert_eq!(tunnel.event_names(), vec!["timer:update", "timer:update"]);
        assert_eq!(coordinator.remaining_seconds_at(instant(100)), 200);
        assert!(!coordinator.timer().is_active);
    }

    #[test]
    fn test_timer_expiry_announced_once() {
        let (mut coordinator, _, observer, tunnel) = full_setup();
        let finder = |id: Id| (id == observer).then(|| tunnel.clone());

        coordinator.initialize_queue(finder).unwrap();
        let slot = coordinator.queue_status().upcoming[0].id;
        coordinator
            .start_timer_at(slot, 30, instant(0), finder)
            .unwrap();

        tunnel.clear();
        coordinator.notify_timer_expired_at(instant(30), finder);
        assert_eq!(tunnel.event_names(), vec!["timer:expired", "timer:update"]);

        // A late second tick is swallowed.
        tunnel.clear();
        coordinator.notify_timer_expired_at(instant(31), finder);
        assert!(tunnel.event_names().is_empty());
    }

    #[test]
    fn test_reset_queue_keeps_ballots() {
        let (mut coordinator, _, observer, tunnel) = full_setup();
        let finder = |id: Id| (id == observer).then(|| tunnel.clone());

        coordinator.initialize_queue(finder).unwrap();
        let transition = coordinator.advance_to_next_at(instant(0), finder).unwrap();
        let team_id = transition.started.unwrap().team_id;
        coordinator.set_voting_open(true);
        coordinator
            .submit_vote_at(Id::new(), &final_vote(team_id), instant(10), finder)
            .unwrap();

        coordinator.reset_queue(finder).unwrap();

        assert!(coordinator.queue_status().upcoming.is_empty());
        assert!(!coordinator.timer().is_active);
        assert_eq!(
            coordinator.leaderboard_stats().unwrap().total_final_votes,
            1,
            "a queue reset does not void votes"
        );
    }

    #[test]
    fn test_private_notes_not_broadcast() {
        let (mut coordinator, teams, observer, tunnel) = full_setup();
        let finder = |id: Id| (id == observer).then(|| tunnel.clone());
        coordinator.initialize_queue(finder).unwrap();

        tunnel.clear();
        let voter = Id::new();
        coordinator
            .update_private_note(
                voter,
                &NoteInput {
                    team_id: teams[0],
                    note: "clean demo".to_owned(),
                    ranking: 1,
                },
            )
            .unwrap();

        assert!(tunnel.event_names().is_empty());
        assert_eq!(coordinator.user_rankings(voter).len(), 1);
    }

    #[test]
    fn test_unsubscribed_observer_receives_nothing() {
        let (mut coordinator, _, observer, tunnel) = full_setup();
        let finder = |id: Id| (id == observer).then(|| tunnel.clone());

        coordinator.unsubscribe_all(observer);
        coordinator.initialize_queue(finder).unwrap();

        assert!(tunnel.event_names().is_empty());
    }

    #[test]
    fn test_self_vote_blocked_through_coordinator() {
        let (mut coordinator, _, observer, tunnel) = full_setup();
        let finder = |id: Id| (id == observer).then(|| tunnel.clone());

        coordinator.initialize_queue(finder).unwrap();
        let transition = coordinator.advance_to_next_at(instant(0), finder).unwrap();
        let team_id = transition.started.unwrap().team_id;

        let voter = Id::new();
        coordinator.registry_mut().assign_user(voter, team_id).unwrap();
        coordinator.set_voting_open(true);

        let result = coordinator.submit_vote_at(voter, &final_vote(team_id), instant(5), finder);
        assert_eq!(result, Err(Rejection::SelfVoteNotAllowed.into()));
    }
}
