//! Team roster access
//!
//! The team roster (team existence, presentation status, and user-to-team
//! membership) is owned by an external collaborator. This module defines the
//! trait the coordination engine consumes, the team record it exchanges, and
//! an in-memory implementation suitable for tests and single-process
//! deployments.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Error, Id, Result};

/// A team participating in the event
///
/// Owned by the registry; the presentation queue reads and writes
/// `presentation_order` and `has_presented` through [`TeamRegistry`] as a
/// side effect of the queue lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Unique identifier of the team
    pub id: Id,
    /// Display name shown on the leaderboard
    pub name: String,
    /// Position in the presentation queue, assigned at initialization
    pub presentation_order: Option<u32>,
    /// Whether the team's presentation has started at least once
    pub has_presented: bool,
}

/// Source of team existence, presentation status, and membership
///
/// Implementations backed by a store may suspend on I/O; every method
/// returns [`Error::Transient`] when the store is unavailable so callers
/// can decide whether to retry.
pub trait TeamRegistry {
    /// Looks up a team by id
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transient`] if the backing store is unavailable.
    fn team(&self, team_id: Id) -> Result<Option<Team>>;

    /// Returns the id of the team the given user belongs to, if any
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transient`] if the backing store is unavailable.
    fn user_team(&self, user_id: Id) -> Result<Option<Id>>;

    /// Returns every registered team
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transient`] if the backing store is unavailable.
    fn all_teams(&self) -> Result<Vec<Team>>;

    /// Writes a team's position in the presentation queue
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the team does not exist.
    fn set_presentation_order(&mut self, team_id: Id, order: Option<u32>) -> Result<()>;

    /// Marks a team as having presented
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the team does not exist.
    fn mark_presented(&mut self, team_id: Id) -> Result<()>;

    /// Clears `presentation_order` and `has_presented` on every team
    ///
    /// Invoked as part of a full queue reset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transient`] if the backing store is unavailable.
    fn clear_presentation_state(&mut self) -> Result<()>;
}

/// In-memory registry used by tests and single-process deployments
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InMemoryRegistry {
    teams: HashMap<Id, Team>,
    /// Mapping from user id to the team they belong to
    members: HashMap<Id, Id>,
}

impl InMemoryRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a team and returns its id
    pub fn add_team(&mut self, name: &str) -> Id {
        let id = Id::new();
        self.teams.insert(
            id,
            Team {
                id,
                name: name.to_owned(),
                presentation_order: None,
                has_presented: false,
            },
        );
        id
    }

    /// Assigns a user to a team
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the team does not exist.
    pub fn assign_user(&mut self, user_id: Id, team_id: Id) -> Result<()> {
        if !self.teams.contains_key(&team_id) {
            return Err(Error::not_found("team", team_id));
        }
        self.members.insert(user_id, team_id);
        Ok(())
    }

    /// Number of registered teams
    pub fn team_count(&self) -> usize {
        self.teams.len()
    }
}

impl TeamRegistry for InMemoryRegistry {
    fn team(&self, team_id: Id) -> Result<Option<Team>> {
        Ok(self.teams.get(&team_id).cloned())
    }

    fn user_team(&self, user_id: Id) -> Result<Option<Id>> {
        Ok(self.members.get(&user_id).copied())
    }

    fn all_teams(&self) -> Result<Vec<Team>> {
        Ok(self.teams.values().cloned().collect())
    }

    fn set_presentation_order(&mut self, team_id: Id, order: Option<u32>) -> Result<()> {
        let team = self
            .teams
            .get_mut(&team_id)
            .ok_or_else(|| Error::not_found("team", team_id))?;
        team.presentation_order = order;
        Ok(())
    }

    fn mark_presented(&mut self, team_id: Id) -> Result<()> {
        let team = self
            .teams
            .get_mut(&team_id)
            .ok_or_else(|| Error::not_found("team", team_id))?;
        team.has_presented = true;
        Ok(())
    }

    fn clear_presentation_state(&mut self) -> Result<()> {
        for team in self.teams.values_mut() {
            team.presentation_order = None;
            team.has_presented = false;
        }
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_add_team_and_lookup() {
        let mut registry = InMemoryRegistry::new();
        let id = registry.add_team("Rustaceans");

        let team = registry.team(id).unwrap().unwrap();
        assert_eq!(team.name, "Rustaceans");
        assert_eq!(team.presentation_order, None);
        assert!(!team.has_presented);

        assert!(registry.team(Id::new()).unwrap().is_none());
    }

    #[test]
    fn test_assign_user_and_user_team() {
        let mut registry = InMemoryRegistry::new();
        let team_id = registry.add_team("Rustaceans");
        let user_id = Id::new();

        registry.assign_user(user_id, team_id).unwrap();
        assert_eq!(registry.user_team(user_id).unwrap(), Some(team_id));
        assert_eq!(registry.user_team(Id::new()).unwrap(), None);
    }

    #[test]
    fn test_assign_user_unknown_team() {
        let mut registry = InMemoryRegistry::new();
        let result = registry.assign_user(Id::new(), Id::new());
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_mark_presented() {
        let mut registry = InMemoryRegistry::new();
        let team_id = registry.add_team("Rustaceans");

        registry.mark_presented(team_id).unwrap();
        assert!(registry.team(team_id).unwrap().unwrap().has_presented);

        assert!(matches!(
            registry.mark_presented(Id::new()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_clear_presentation_state() {
        let mut registry = InMemoryRegistry::new();
        let team_id = registry.add_team("Rustaceans");
        registry.set_presentation_order(team_id, Some(1)).unwrap();
        registry.mark_presented(team_id).unwrap();

        registry.clear_presentation_state().unwrap();

        let team = registry.team(team_id).unwrap().unwrap();
        assert_eq!(team.presentation_order, None);
        assert!(!team.has_presented);
    }
}
