//! PRU exception policy
//!
//! Every Copilot user goes to one of two cost centers: users on the PRU
//! exception list to the PRU-allowed one, everyone else to the no-PRU one.

use super::AssignmentGroups;
use crate::config::Settings;
use crate::github::CopilotUser;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Two-tier PRU assignment
#[derive(Debug, Clone)]
pub struct PruPolicy {
    no_pru_cost_center: String,
    pru_allowed_cost_center: String,
    exceptions: HashSet<String>,
}

impl PruPolicy {
    /// Create a policy; exception logins compare case-insensitively
    pub fn new(
        no_pru_cost_center: impl Into<String>,
        pru_allowed_cost_center: impl Into<String>,
        exceptions: &[String],
    ) -> Self {
        let policy = Self {
            no_pru_cost_center: no_pru_cost_center.into(),
            pru_allowed_cost_center: pru_allowed_cost_center.into(),
            exceptions: exceptions.iter().map(|u| u.to_lowercase()).collect(),
        };
        info!(
            exception_users = policy.exceptions.len(),
            no_pru_cc = %policy.no_pru_cost_center,
            pru_allowed_cc = %policy.pru_allowed_cost_center,
            "Initialized PRU policy"
        );
        policy
    }

    /// Create a policy from resolved settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.no_prus_cost_center_id.clone(),
            settings.prus_allowed_cost_center_id.clone(),
            &settings.prus_exception_users,
        )
    }

    /// Replace the cost center ids, e.g. after auto-creation
    pub fn set_cost_center_ids(
        &mut self,
        no_pru: impl Into<String>,
        pru_allowed: impl Into<String>,
    ) {
        self.no_pru_cost_center = no_pru.into();
        self.pru_allowed_cost_center = pru_allowed.into();
        info!(
            no_pru = %self.no_pru_cost_center,
            pru_allowed = %self.pru_allowed_cost_center,
            "Updated cost center ids"
        );
    }

    pub fn no_pru_cost_center(&self) -> &str {
        &self.no_pru_cost_center
    }

    pub fn pru_allowed_cost_center(&self) -> &str {
        &self.pru_allowed_cost_center
    }

    /// Whether `login` is on the exception list
    pub fn is_exception(&self, login: &str) -> bool {
        self.exceptions.contains(&login.to_lowercase())
    }

    /// Cost center for one user
    pub fn assign(&self, user: &CopilotUser) -> &str {
        let cost_center = if self.is_exception(&user.login) {
            &self.pru_allowed_cost_center
        } else {
            &self.no_pru_cost_center
        };
        debug!(user = %user.login, cc = %cost_center, "Assigned user");
        cost_center
    }

    /// Desired members of both cost centers
    ///
    /// Both cost centers are always present, possibly empty.
    pub fn assignment_groups(&self, users: &[CopilotUser]) -> AssignmentGroups {
        let mut groups = AssignmentGroups::from([
            (self.pru_allowed_cost_center.clone(), Vec::new()),
            (self.no_pru_cost_center.clone(), Vec::new()),
        ]);
        for user in users {
            groups
                .entry(self.assign(user).to_string())
                .or_default()
                .push(user.login.clone());
        }
        groups
    }

    /// User count per cost center
    pub fn summary(&self, users: &[CopilotUser]) -> BTreeMap<String, usize> {
        let mut summary = BTreeMap::new();
        for user in users {
            *summary.entry(self.assign(user).to_string()).or_default() += 1;
        }
        summary
    }

    /// Configuration problems; empty when usable
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.no_pru_cost_center.is_empty() {
            issues.push("no_prus_cost_center_id is not defined".to_string());
        }
        if self.pru_allowed_cost_center.is_empty() {
            issues.push("prus_allowed_cost_center_id is not defined".to_string());
        }
        if !self.no_pru_cost_center.is_empty()
            && self.no_pru_cost_center == self.pru_allowed_cost_center
        {
            issues.push(
                "no_prus_cost_center_id and prus_allowed_cost_center_id cannot be the same"
                    .to_string(),
            );
        }
        issues
    }
}
