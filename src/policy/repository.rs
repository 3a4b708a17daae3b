//! Repository custom property policy

use super::AssignmentGroups;
use crate::config::{ExplicitMapping, RepositoryConfig};
use crate::github::RepoProperties;
use tracing::{debug, info};

/// Maps repositories to cost centers through explicit property mappings
#[derive(Debug, Clone, Default)]
pub struct RepositoryPolicy {
    mappings: Vec<ExplicitMapping>,
}

impl RepositoryPolicy {
    pub fn new(mappings: Vec<ExplicitMapping>) -> Self {
        Self { mappings }
    }

    pub fn from_config(config: &RepositoryConfig) -> Self {
        Self::new(config.explicit_mappings.clone())
    }

    pub fn mappings(&self) -> &[ExplicitMapping] {
        &self.mappings
    }

    /// First mapping whose property value matches the repository
    pub fn match_repository(&self, repo: &RepoProperties) -> Option<&ExplicitMapping> {
        self.mappings.iter().find(|mapping| {
            repo.property(&mapping.property_name)
                .is_some_and(|value| value.matches_any(&mapping.property_values))
        })
    }

    /// Repositories (`owner/name`) keyed by cost center name
    ///
    /// Every mapped cost center is present, possibly empty.
    pub fn assign(&self, repos: &[RepoProperties]) -> AssignmentGroups {
        let mut groups: AssignmentGroups = self
            .mappings
            .iter()
            .map(|m| (m.cost_center.clone(), Vec::new()))
            .collect();
        let mut unmatched = 0usize;

        for repo in repos {
            match self.match_repository(repo) {
                Some(mapping) => {
                    debug!(
                        repo = %repo.repository_full_name,
                        cc = %mapping.cost_center,
                        "Matched repository"
                    );
                    groups
                        .entry(mapping.cost_center.clone())
                        .or_default()
                        .push(repo.repository_full_name.clone());
                }
                None => unmatched += 1,
            }
        }

        info!(
            repositories = repos.len(),
            unmatched,
            cost_centers = groups.len(),
            "Built repository assignments"
        );
        groups
    }
}
