//! Shared countdown timer
//!
//! This module tracks the single countdown bound to the presentation that is
//! currently on stage. The timer state is a process-wide singleton owned by
//! the coordinator; it is created once at initialization, mutated only
//! through the operations here, and reset back to its baseline rather than
//! deleted.
//!
//! Every time-dependent operation has an `*_at` form taking an explicit
//! instant so the arithmetic can be tested without sleeping; the public form
//! passes `SystemTime::now()`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use web_time::SystemTime;

use super::{Error, Id, Result, constants};

/// Validates a countdown duration expressed in seconds
///
/// # Errors
///
/// Returns [`Error::Validation`] if the value falls outside the configured
/// bounds.
pub fn validate_duration_seconds(seconds: u64) -> Result<()> {
    if (constants::timer::MIN_DURATION_SECONDS..=constants::timer::MAX_DURATION_SECONDS)
        .contains(&seconds)
    {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "duration is outside of the bounds [{},{}]",
            constants::timer::MIN_DURATION_SECONDS,
            constants::timer::MAX_DURATION_SECONDS,
        )))
    }
}

/// State of the shared countdown timer
///
/// While the timer is running, `elapsed` holds the time accumulated during
/// previous runs and `started_at` marks when the present run began; the two
/// are combined by [`TimerState::remaining`]. While paused, `elapsed` is
/// monotonic non-decreasing.
#[serde_with::serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    /// Whether the countdown is currently running
    pub is_active: bool,
    /// Configured countdown duration
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub duration: Duration,
    /// When the present run began, if running
    pub started_at: Option<SystemTime>,
    /// When the countdown was last paused
    pub paused_at: Option<SystemTime>,
    /// Time accumulated across completed runs
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub elapsed: Duration,
    /// The presentation this countdown is bound to
    pub current_presentation: Option<Id>,
}

impl Default for TimerState {
    /// Baseline state: inactive, default duration, nothing elapsed
    fn default() -> Self {
        Self {
            is_active: false,
            duration: Duration::from_secs(constants::timer::DEFAULT_DURATION_SECONDS),
            started_at: None,
            paused_at: None,
            elapsed: Duration::ZERO,
            current_presentation: None,
        }
    }
}

impl TimerState {
    /// Starts a fresh countdown bound to the given presentation
    ///
    /// Any prior run is overwritten; there is no implicit resume.
    pub fn start(&mut self, presentation_id: Id, duration: Duration) {
        self.start_at(presentation_id, duration, SystemTime::now());
    }

    /// Starts a fresh countdown using an explicit clock reading
    pub fn start_at(&mut self, presentation_id: Id, duration: Duration, now: SystemTime) {
        self.is_active = true;
        self.duration = duration;
        self.started_at = Some(now);
        self.paused_at = None;
        self.elapsed = Duration::ZERO;
        self.current_presentation = Some(presentation_id);
    }

    /// Pauses the countdown, folding the running time into `elapsed`
    ///
    /// A no-op when the timer is not active.
    pub fn pause(&mut self) {
        self.pause_at(SystemTime::now());
    }

    /// Pauses the countdown using an explicit clock reading
    pub fn pause_at(&mut self, now: SystemTime) {
        if !self.is_active {
            return;
        }

        let run = self
            .started_at
            .and_then(|started| now.duration_since(started).ok())
            .unwrap_or_default();

        self.elapsed += run;
        self.is_active = false;
        self.paused_at = Some(now);
    }

    /// Returns the timer to its baseline, keeping the configured duration
    pub fn reset(&mut self) {
        self.is_active = false;
        self.started_at = None;
        self.paused_at = None;
        self.elapsed = Duration::ZERO;
        self.current_presentation = None;
    }

    /// Remaining countdown time, never negative
    pub fn remaining(&self) -> Duration {
        self.remaining_at(SystemTime::now())
    }

    /// Remaining countdown time using an explicit clock reading
    pub fn remaining_at(&self, now: SystemTime) -> Duration {
        let consumed = if self.is_active {
            let run = self
                .started_at
                .and_then(|started| now.duration_since(started).ok())
                .unwrap_or_default();
            self.elapsed + run
        } else {
            self.elapsed
        };

        self.duration.saturating_sub(consumed)
    }

    /// Reconfigures the countdown duration without touching the run state
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `seconds` is outside the allowed
    /// bounds.
    pub fn set_duration(&mut self, seconds: u64) -> Result<()> {
        validate_duration_seconds(seconds)?;
        self.duration = Duration::from_secs(seconds);
        Ok(())
    }

    /// Accumulated elapsed time in whole seconds
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed.as_secs()
    }
}
