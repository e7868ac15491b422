//! Configuration constants for the event coordination engine
//!
//! This module contains the limits and constraints used throughout the
//! coordination engine to ensure data integrity and provide consistent
//! boundaries for the different components.

/// Countdown timer configuration constants
pub mod timer {
    /// Minimum configurable countdown duration in seconds
    pub const MIN_DURATION_SECONDS: u64 = 1;
    /// Maximum configurable countdown duration in seconds
    pub const MAX_DURATION_SECONDS: u64 = 3600;
    /// Countdown duration used before the admin configures one
    pub const DEFAULT_DURATION_SECONDS: u64 = 300;
}

/// Ballot configuration constants
pub mod vote {
    /// Maximum length of the public note attached to a vote
    pub const MAX_NOTE_LENGTH: usize = 500;
}

/// Private judging-note configuration constants
pub mod notes {
    /// Maximum length of a voter's private note about a team
    pub const MAX_NOTE_LENGTH: usize = 2000;
    /// Lowest (best) allowed private ranking value
    pub const MIN_RANKING: u32 = 1;
    /// Highest allowed private ranking value
    pub const MAX_RANKING: u32 = 1000;
}

/// Presentation queue configuration constants
pub mod queue {
    /// Maximum number of teams a single event round may hold
    pub const MAX_TEAM_COUNT: usize = 1000;
}
