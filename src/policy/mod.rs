//! Assignment policies
//!
//! Each policy turns data fetched from GitHub into a desired assignment:
//! cost center to members. Policies do no I/O.
//!
//! - [`PruPolicy`]: exception list decides between two cost centers
//! - [`TeamsPolicy`]: team membership decides
//! - [`RepositoryPolicy`]: repository custom properties decide

mod pru;
mod repository;
mod teams;

pub use pru::PruPolicy;
pub use repository::RepositoryPolicy;
pub use teams::{TeamMembership, TeamRef, TeamsAssignment, TeamsPolicy};

use crate::types::UserAssignments;
use std::collections::{BTreeMap, HashSet};

/// Desired members keyed by cost center
pub type AssignmentGroups = BTreeMap<String, Vec<String>>;

/// Drop members already assigned to their target cost center
///
/// `current` maps a member to the cost center it belongs to now. Empty
/// groups are kept so callers still see every target.
pub fn pending_assignments(
    groups: &AssignmentGroups,
    current: &UserAssignments,
) -> AssignmentGroups {
    groups
        .iter()
        .map(|(cost_center, members)| {
            let pending = members
                .iter()
                .filter(|m| current.get(*m) != Some(cost_center))
                .cloned()
                .collect();
            (cost_center.clone(), pending)
        })
        .collect()
}

/// Current members of a cost center that are no longer desired there
pub fn members_to_remove(desired: &[String], current: &HashSet<String>) -> Vec<String> {
    let desired: HashSet<&str> = desired.iter().map(String::as_str).collect();
    let mut stale: Vec<String> = current
        .iter()
        .filter(|m| !desired.contains(m.as_str()))
        .cloned()
        .collect();
    stale.sort();
    stale
}
