//! # Demoday Coordination Library
//!
//! This library provides the core coordination logic for a live, multi-user
//! voting event: a bounded set of teams present in sequence, an admin drives
//! a shared countdown timer, voters cast ballots under exclusivity rules,
//! and every connected observer sees a continuously updated ranking.
//!
//! The crate is intentionally free of I/O: the team roster sits behind the
//! [`registry::TeamRegistry`] trait, and real-time delivery goes through the
//! [`broadcast::Tunnel`] trait. All mutable state is owned by a
//! [`coordinator::Coordinator`], and every transition is a single `&mut self`
//! call, so wrapping the coordinator in a mutex or actor is enough to keep
//! the global invariants (one current presentation, vote exclusivity,
//! monotonic elapsed time) intact under concurrent use.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]

use std::{fmt::Display, str::FromStr};

use serde::Serialize;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use uuid::Uuid;

pub mod broadcast;
pub mod constants;
pub mod coordinator;
pub mod leaderboard;
pub mod queue;
pub mod registry;
pub mod timer;
pub mod vote;

/// A unique identifier for teams, users, presentations, votes, and observers
///
/// Every entity the coordinator touches is addressed by one of these. The
/// identifier serializes as its UUID string so it can be used directly as a
/// JSON map key or URL segment.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Id {
    /// Creates a new random identifier (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Id {
    /// Formats the identifier as a UUID string
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    /// Parses an identifier from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Failures surfaced by coordination operations
///
/// Expected business-rule rejections travel as [`Error::Rejected`] with a
/// stable machine-readable code; the remaining variants cover malformed
/// input, unknown identifiers, conflicting admin actions, backing-store
/// unavailability, and invariant violations that indicate a bug.
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Error {
    /// Caller-supplied input failed validation
    #[error("invalid input: {0}")]
    Validation(String),
    /// The referenced entity does not exist
    #[error("{0} not found")]
    NotFound(String),
    /// The operation conflicts with the present state of the event
    #[error("{0}")]
    Conflict(String),
    /// A vote was rejected by a business rule
    #[error(transparent)]
    Rejected(#[from] vote::Rejection),
    /// The backing store was unavailable; the caller may retry reads
    #[error("backing store unavailable: {0}")]
    Transient(String),
    /// A structural invariant was violated; this is a programming error
    #[error("invariant violated: {0}")]
    Internal(String),
}

impl Error {
    /// Builds a `NotFound` error for the given entity kind and id
    pub fn not_found(what: &str, id: Id) -> Self {
        Self::NotFound(format!("{what} {id}"))
    }
}

/// Convenience alias used across the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;
