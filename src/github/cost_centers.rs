//! Cost centers: listing, membership and create-or-adopt

use super::GitHubClient;
use crate::error::{Error, Result};
use crate::http::ApiRequest;
use crate::types::UserAssignments;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;
use tracing::{debug, error, info, warn};

/// Maximum number of users or repositories per membership call
pub const MEMBERSHIP_BATCH_SIZE: usize = 50;

const STATE_ACTIVE: &str = "active";

static EXISTING_COST_CENTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)existing cost center uuid:\s*([0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})")
        .expect("cost center conflict pattern is valid")
});

/// A resource attached to a cost center
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostCenterResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
}

/// A cost center
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostCenter {
    pub id: String,
    pub name: String,
    pub state: String,
    pub resources: Vec<CostCenterResource>,
}

impl CostCenter {
    /// Active and carrying an id
    pub fn is_active(&self) -> bool {
        self.state.eq_ignore_ascii_case(STATE_ACTIVE) && !self.id.is_empty()
    }

    /// Logins of member users
    pub fn user_logins(&self) -> impl Iterator<Item = &str> {
        self.resources
            .iter()
            .filter(|r| r.resource_type.eq_ignore_ascii_case("user"))
            .map(|r| r.name.as_str())
    }
}

#[derive(Debug, Default, Deserialize)]
struct CostCentersEnvelope {
    #[serde(default, rename = "costCenters")]
    cost_centers: Vec<CostCenter>,
}

#[derive(Debug, Default, Deserialize)]
struct CreatedCostCenter {
    #[serde(default)]
    id: String,
}

/// Recover the id of an existing cost center from a 409 body
pub fn existing_cost_center_id(body: &str) -> Option<String> {
    EXISTING_COST_CENTER
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

impl GitHubClient {
    fn cost_centers_url(&self, path: &str) -> String {
        self.enterprise_url(&format!("/settings/billing/cost-centers{path}"))
    }

    /// All cost centers, in any state
    pub async fn list_cost_centers(&self) -> Result<Vec<CostCenter>> {
        let envelope: Option<CostCentersEnvelope> = self.get(&self.cost_centers_url("")).await?;
        Ok(envelope.unwrap_or_default().cost_centers)
    }

    /// Active cost centers by name
    pub async fn active_cost_centers(&self) -> Result<HashMap<String, String>> {
        let active: HashMap<String, String> = self
            .list_cost_centers()
            .await?
            .into_iter()
            .filter(CostCenter::is_active)
            .map(|cc| (cc.name, cc.id))
            .collect();
        info!(count = active.len(), "Found active cost centers");
        Ok(active)
    }

    /// One cost center with its resources
    pub async fn get_cost_center(&self, id: &str) -> Result<CostCenter> {
        self.get(&self.cost_centers_url(&format!("/{id}"))).await
    }

    /// Logins currently assigned to a cost center
    pub async fn cost_center_members(&self, id: &str) -> Result<HashSet<String>> {
        let cost_center = self.get_cost_center(id).await?;
        Ok(cost_center.user_logins().map(str::to_owned).collect())
    }

    /// Cost center id of every assigned user, across active cost centers
    ///
    /// A user listed under several cost centers keeps the first one seen.
    pub async fn user_cost_center_index(&self) -> Result<UserAssignments> {
        let mut index = UserAssignments::new();
        for cost_center in self.list_cost_centers().await? {
            if !cost_center.is_active() {
                continue;
            }
            for login in cost_center.user_logins() {
                index
                    .entry(login.to_string())
                    .or_insert_with(|| cost_center.id.clone());
            }
        }
        debug!(users = index.len(), "Built user to cost center index");
        Ok(index)
    }

    /// Create a cost center, or adopt the existing one with that name
    ///
    /// A 409 whose body names the existing cost center's UUID is treated as
    /// success. Any other failure, including an unparseable 409, is returned
    /// unchanged.
    pub async fn create_or_adopt_cost_center(&self, name: &str) -> Result<String> {
        let request = ApiRequest::post(&self.cost_centers_url(""), &json!({ "name": name }))?;

        match self.http.request_json::<Option<CreatedCostCenter>>(&request).await {
            Ok(created) => {
                let id = created
                    .map(|created| created.id)
                    .filter(|id| !id.trim().is_empty())
                    .ok_or_else(|| {
                        Error::Other(format!("cost center '{name}' created without an id"))
                    })?;
                info!(name, id = %id, "Created cost center");
                Ok(id)
            }
            Err(err) if err.is_conflict() => {
                match err.body().and_then(existing_cost_center_id) {
                    Some(id) => {
                        info!(name, id = %id, "Cost center already exists, adopting it");
                        Ok(id)
                    }
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Ids for every name, creating missing cost centers
    pub async fn ensure_cost_centers(&self, names: &[String]) -> Result<BTreeMap<String, String>> {
        let existing = self.active_cost_centers().await?;
        let mut ids = BTreeMap::new();
        for name in names {
            let id = match existing.get(name) {
                Some(id) => id.clone(),
                None => self.create_or_adopt_cost_center(name).await?,
            };
            ids.insert(name.clone(), id);
        }
        Ok(ids)
    }

    /// Add users in batches, reporting success per login
    ///
    /// A failed batch marks its logins `false` and does not stop the
    /// remaining batches.
    pub async fn add_users_to_cost_center(
        &self,
        cost_center_id: &str,
        logins: &[String],
    ) -> Result<BTreeMap<String, bool>> {
        self.add_resources(cost_center_id, "users", logins).await
    }

    /// Add repositories (`owner/name`) in batches, reporting success per repository
    pub async fn add_repositories_to_cost_center(
        &self,
        cost_center_id: &str,
        repositories: &[String],
    ) -> Result<BTreeMap<String, bool>> {
        self.add_resources(cost_center_id, "repositories", repositories)
            .await
    }

    /// Remove users in batches
    pub async fn remove_users_from_cost_center(
        &self,
        cost_center_id: &str,
        logins: &[String],
    ) -> Result<()> {
        let url = self.cost_centers_url(&format!("/{cost_center_id}/resource"));
        for batch in logins.chunks(MEMBERSHIP_BATCH_SIZE) {
            let request = ApiRequest::delete(&url, &json!({ "users": batch }))?;
            self.http.send(&request).await?;
            info!(cost_center_id, count = batch.len(), "Removed users from cost center");
        }
        Ok(())
    }

    async fn add_resources(
        &self,
        cost_center_id: &str,
        kind: &str,
        items: &[String],
    ) -> Result<BTreeMap<String, bool>> {
        let url = self.cost_centers_url(&format!("/{cost_center_id}/resource"));
        let mut results = BTreeMap::new();

        for (batch_number, batch) in items.chunks(MEMBERSHIP_BATCH_SIZE).enumerate() {
            let request = ApiRequest::post(&url, &json!({ kind: batch }))?;
            let ok = match self.http.send(&request).await {
                Ok(()) => {
                    info!(
                        cost_center_id,
                        kind,
                        batch = batch_number + 1,
                        count = batch.len(),
                        "Added batch to cost center"
                    );
                    true
                }
                Err(e) if e.is_retryable() || e.status().is_some() => {
                    error!(
                        cost_center_id,
                        kind,
                        batch = batch_number + 1,
                        error = %e,
                        "Failed to add batch to cost center"
                    );
                    false
                }
                Err(e) => return Err(e),
            };
            for item in batch {
                results.insert(item.clone(), ok);
            }
        }

        let failed = results.values().filter(|ok| !**ok).count();
        if failed > 0 {
            warn!(
                cost_center_id,
                kind,
                failed,
                total = results.len(),
                "Some resources were not assigned"
            );
        }
        Ok(results)
    }
}
