//! Real-time event fan-out
//!
//! This module publishes state-change events to subscribed observers over
//! named topics. Delivery is best-effort and fire-and-forget: an observer
//! whose tunnel has gone away is skipped, never an error, so a disconnected
//! client can never fail the admin or voter action that triggered the
//! publish. The subscriber set is snapshotted per publish, so subscription
//! changes cannot corrupt an in-progress fan-out.
//!
//! The tunnel abstraction mirrors the transport-agnostic design of the rest
//! of the crate: WebSockets, Server-Sent Events, or an in-process channel
//! all fit behind [`Tunnel`].

use std::collections::HashSet;

use enum_map::{Enum, EnumMap};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use web_time::SystemTime;

use super::{
    Id,
    leaderboard::Entry,
    queue::{Presentation, QueueStatus},
    timer::TimerState,
    vote::Vote,
};

/// Named channels observers subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    /// Ranked standings changes
    Leaderboard,
    /// Presentation and queue lifecycle changes
    Presentation,
    /// Countdown timer changes
    Timer,
    /// Ballot submissions and tally changes
    Vote,
    /// Roster changes, published by the outer layer
    Team,
}

/// A state-change event published to one topic
///
/// The serialized form is `{"event": "<name>", "payload": ...}` with the
/// event names fixed by the client contract.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload")]
pub enum Event {
    /// Full ordered standings after a tally change
    #[serde(rename = "leaderboard:update")]
    LeaderboardUpdate(Vec<Entry>),
    /// A single team's entry after a tally change
    #[serde(rename = "leaderboard:team:update", rename_all = "camelCase")]
    LeaderboardTeamUpdate {
        /// The team whose entry changed
        team_id: Id,
        /// The new entry, or `None` if the team left the board
        entry: Option<Entry>,
    },
    /// A presentation changed lifecycle state
    #[serde(rename = "presentation:update")]
    PresentationUpdate(Presentation),
    /// The queue as a whole changed shape
    #[serde(rename = "presentation:queue:updated")]
    QueueUpdated(QueueStatus),
    /// The countdown timer changed state
    #[serde(rename = "timer:update")]
    TimerUpdate(TimerState),
    /// The countdown reached zero
    #[serde(rename = "timer:expired")]
    TimerExpired {
        /// When the expiry was observed
        timestamp: SystemTime,
    },
    /// A ballot was committed
    #[serde(rename = "vote:submitted")]
    VoteSubmitted(Vote),
    /// A team's final-vote tally changed
    #[serde(rename = "vote:count", rename_all = "camelCase")]
    VoteCount {
        /// The tallied team
        team_id: Id,
        /// Its new final-vote count
        count: usize,
    },
}

impl Event {
    /// The topic this event is published on
    pub fn topic(&self) -> Topic {
        match self {
            Event::LeaderboardUpdate(_) | Event::LeaderboardTeamUpdate { .. } => Topic::Leaderboard,
            Event::PresentationUpdate(_) | Event::QueueUpdated(_) => Topic::Presentation,
            Event::TimerUpdate(_) | Event::TimerExpired { .. } => Topic::Timer,
            Event::VoteSubmitted(_) | Event::VoteCount { .. } => Topic::Vote,
        }
    }

    /// The wire name of the event, bit-exact per the client contract
    pub fn name(&self) -> &'static str {
        match self {
            Event::LeaderboardUpdate(_) => "leaderboard:update",
            Event::LeaderboardTeamUpdate { .. } => "leaderboard:team:update",
            Event::PresentationUpdate(_) => "presentation:update",
            Event::QueueUpdated(_) => "presentation:queue:updated",
            Event::TimerUpdate(_) => "timer:update",
            Event::TimerExpired { .. } => "timer:expired",
            Event::VoteSubmitted(_) => "vote:submitted",
            Event::VoteCount { .. } => "vote:count",
        }
    }

    /// Converts the event to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Trait for delivering events through a communication tunnel
///
/// Implementations might use WebSockets, Server-Sent Events, or other
/// real-time communication protocols. Sending must not block the publisher
/// for a slow consumer.
pub trait Tunnel {
    /// Delivers an event to the observer
    fn send(&self, event: &Event);

    /// Closes the communication tunnel
    fn close(self);
}

/// Topic-based publish/subscribe registry for connected observers
///
/// Observers are addressed by [`Id`]; the tunnel for an observer is looked
/// up per publish through a caller-supplied finder, so the broadcaster
/// itself never owns connections and never outlives them.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Broadcaster {
    /// Subscribed observer ids per topic
    subscriptions: EnumMap<Topic, HashSet<Id>>,
}

impl Broadcaster {
    /// Creates a broadcaster with no subscriptions
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes an observer to a topic
    ///
    /// Returns `false` if the observer was already subscribed.
    pub fn subscribe(&mut self, topic: Topic, observer: Id) -> bool {
        self.subscriptions[topic].insert(observer)
    }

    /// Unsubscribes an observer from a topic
    ///
    /// Returns `false` if the observer was not subscribed.
    pub fn unsubscribe(&mut self, topic: Topic, observer: Id) -> bool {
        self.subscriptions[topic].remove(&observer)
    }

    /// Removes an observer from every topic, e.g. on disconnect
    pub fn unsubscribe_all(&mut self, observer: Id) {
        for subscribers in self.subscriptions.values_mut() {
            subscribers.remove(&observer);
        }
    }

    /// Whether an observer is subscribed to a topic
    pub fn is_subscribed(&self, topic: Topic, observer: Id) -> bool {
        self.subscriptions[topic].contains(&observer)
    }

    /// Number of observers subscribed to a topic
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscriptions[topic].len()
    }

    /// Publishes an event to every subscriber of its topic
    ///
    /// The subscriber set is snapshotted before delivery; observers without
    /// a live tunnel are skipped. Delivery is at-most-once per publish.
    pub fn publish<T: Tunnel, F: Fn(Id) -> Option<T>>(&self, event: &Event, tunnel_finder: F) {
        let snapshot = self.subscriptions[event.topic()]
            .iter()
            .copied()
            .collect_vec();

        for observer in snapshot {
            let Some(tunnel) = tunnel_finder(observer) else {
                continue;
            };
            tunnel.send(event);
        }
    }
}
