//! Team membership policy

use super::AssignmentGroups;
use crate::config::TeamsSettings;
use crate::types::{TeamsMode, TeamsScope};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, info, warn};

/// A team, identified the way mappings refer to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRef {
    /// Owning organization; `None` for enterprise teams
    pub org: Option<String>,
    pub slug: String,
    pub name: String,
}

impl TeamRef {
    pub fn org_team(
        org: impl Into<String>,
        slug: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            org: Some(org.into()),
            slug: slug.into(),
            name: name.into(),
        }
    }

    pub fn enterprise_team(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            org: None,
            slug: slug.into(),
            name: name.into(),
        }
    }

    /// Key used in `team_mappings`: `org/slug` or the bare enterprise slug
    pub fn mapping_key(&self) -> String {
        match &self.org {
            Some(org) => format!("{org}/{}", self.slug),
            None => self.slug.clone(),
        }
    }

    fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.slug
        } else {
            &self.name
        }
    }
}

impl fmt::Display for TeamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mapping_key())
    }
}

/// A team with the logins of its members
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamMembership {
    pub team: TeamRef,
    pub members: Vec<String>,
}

/// Outcome of the teams policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamsAssignment {
    /// Members keyed by cost center name
    pub groups: AssignmentGroups,
    /// Teams that resolved to no cost center
    pub unmapped_teams: Vec<String>,
    /// Users that belonged to more than one target, with the targets they lost
    pub conflicts: BTreeMap<String, Vec<String>>,
}

impl TeamsAssignment {
    pub fn user_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Maps teams to cost center names
#[derive(Debug, Clone)]
pub struct TeamsPolicy {
    scope: TeamsScope,
    mode: TeamsMode,
    mappings: HashMap<String, String>,
}

impl TeamsPolicy {
    pub fn new(scope: TeamsScope, mode: TeamsMode, mappings: HashMap<String, String>) -> Self {
        Self {
            scope,
            mode,
            mappings,
        }
    }

    pub fn from_settings(settings: &TeamsSettings) -> Self {
        Self::new(settings.scope, settings.mode, settings.mappings.clone())
    }

    pub fn scope(&self) -> TeamsScope {
        self.scope
    }

    pub fn mode(&self) -> TeamsMode {
        self.mode
    }

    /// Cost center name for a team, if any
    pub fn cost_center_for(&self, team: &TeamRef) -> Option<String> {
        match self.mode {
            TeamsMode::Auto => Some(match &team.org {
                Some(org) => format!("[org team] {org}/{}", team.display_name()),
                None => format!("[enterprise team] {}", team.display_name()),
            }),
            TeamsMode::Manual => self.mappings.get(&team.mapping_key()).cloned(),
        }
    }

    /// Desired members per cost center
    ///
    /// A user in several teams is kept in the cost center of the first team,
    /// in the order given.
    pub fn assign(&self, teams: &[TeamMembership]) -> TeamsAssignment {
        let mut result = TeamsAssignment::default();
        let mut placed: HashMap<&str, String> = HashMap::new();

        for membership in teams {
            let Some(cost_center) = self.cost_center_for(&membership.team) else {
                debug!(team = %membership.team, "No cost center mapping for team, skipping");
                result.unmapped_teams.push(membership.team.mapping_key());
                continue;
            };
            let group = result.groups.entry(cost_center.clone()).or_default();

            for login in &membership.members {
                if login.is_empty() {
                    continue;
                }
                match placed.get(login.as_str()) {
                    None => {
                        placed.insert(login, cost_center.clone());
                        group.push(login.clone());
                    }
                    Some(kept) if *kept == cost_center => {}
                    Some(kept) => {
                        warn!(
                            user = %login,
                            kept = %kept,
                            skipped = %cost_center,
                            "User belongs to teams in multiple cost centers, keeping the first"
                        );
                        result
                            .conflicts
                            .entry(login.clone())
                            .or_default()
                            .push(cost_center.clone());
                    }
                }
            }
        }

        info!(
            cost_centers = result.groups.len(),
            users = result.user_count(),
            conflicts = result.conflicts.len(),
            "Built team assignments"
        );
        result
    }
}

#[cfg(test)]
mod teams_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn members(team: TeamRef, logins: &[&str]) -> TeamMembership {
        TeamMembership {
            team,
            members: logins.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[test]
    fn test_auto_naming() {
        let policy = TeamsPolicy::new(TeamsScope::Organization, TeamsMode::Auto, HashMap::new());
        assert_eq!(
            policy.cost_center_for(&TeamRef::org_team("acme", "platform", "Platform")),
            Some("[org team] acme/Platform".to_string())
        );
        assert_eq!(
            policy.cost_center_for(&TeamRef::enterprise_team("sre", "")),
            Some("[enterprise team] sre".to_string())
        );
    }

    #[test]
    fn test_manual_mappings() {
        let mappings = HashMap::from([
            ("acme/platform".to_string(), "Platform CC".to_string()),
            ("sre".to_string(), "SRE CC".to_string()),
        ]);
        let policy = TeamsPolicy::new(TeamsScope::Organization, TeamsMode::Manual, mappings);

        assert_eq!(
            policy.cost_center_for(&TeamRef::org_team("acme", "platform", "Platform")),
            Some("Platform CC".to_string())
        );
        assert_eq!(
            policy.cost_center_for(&TeamRef::enterprise_team("sre", "SRE")),
            Some("SRE CC".to_string())
        );
        assert_eq!(policy.cost_center_for(&TeamRef::org_team("acme", "web", "Web")), None);
    }

    #[test]
    fn test_assign_first_team_wins() {
        let policy = TeamsPolicy::new(TeamsScope::Organization, TeamsMode::Auto, HashMap::new());
        let teams = vec![
            members(TeamRef::org_team("acme", "a", "A"), &["alice", "bob"]),
            members(TeamRef::org_team("acme", "b", "B"), &["bob", "carol", ""]),
        ];

        let assignment = policy.assign(&teams);
        assert_eq!(
            assignment.groups["[org team] acme/A"],
            vec!["alice".to_string(), "bob".to_string()]
        );
        assert_eq!(assignment.groups["[org team] acme/B"], vec!["carol".to_string()]);
        assert_eq!(
            assignment.conflicts["bob"],
            vec!["[org team] acme/B".to_string()]
        );
        assert_eq!(assignment.user_count(), 3);
    }

    #[test]
    fn test_assign_same_cost_center_is_not_a_conflict() {
        let mappings = HashMap::from([
            ("acme/a".to_string(), "Shared".to_string()),
            ("acme/b".to_string(), "Shared".to_string()),
        ]);
        let policy = TeamsPolicy::new(TeamsScope::Organization, TeamsMode::Manual, mappings);
        let teams = vec![
            members(TeamRef::org_team("acme", "a", "A"), &["alice"]),
            members(TeamRef::org_team("acme", "b", "B"), &["alice", "bob"]),
            members(TeamRef::org_team("acme", "c", "C"), &["carol"]),
        ];

        let assignment = policy.assign(&teams);
        assert_eq!(
            assignment.groups["Shared"],
            vec!["alice".to_string(), "bob".to_string()]
        );
        assert!(assignment.conflicts.is_empty());
        assert_eq!(assignment.unmapped_teams, vec!["acme/c".to_string()]);
    }
}
