//! GitHub Enterprise API operations
//!
//! Every call goes through the retrying [`HttpClient`]; listings go through
//! the page-number paginator at 100 items per page.
//!
//! # Endpoints
//!
//! - Copilot seats: `/enterprises/{enterprise}/copilot/billing/seats`
//! - Teams: `/orgs/{org}/teams`, `/enterprises/{enterprise}/teams`
//! - Custom properties: `/orgs/{org}/properties/...`, `/repos/{owner}/{repo}/properties/values`
//! - Cost centers: `/enterprises/{enterprise}/settings/billing/cost-centers`
//! - Budgets: `/enterprises/{enterprise}/settings/billing/budgets`

mod budgets;
mod copilot;
mod cost_centers;
mod repos;
mod teams;

pub use budgets::{budget_type_and_sku, Budget, BudgetKind};
pub use copilot::{dedupe_users, filter_users_by_timestamp, AssigningTeam, CopilotUser};
pub use cost_centers::{
    existing_cost_center_id, CostCenter, CostCenterResource, MEMBERSHIP_BATCH_SIZE,
};
pub use repos::{Property, PropertyDefinition, PropertyValue, RepoProperties};
pub use teams::{Team, TeamMember};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::http::{ApiRequest, HttpClient};
use crate::pagination::{Page, DEFAULT_PAGE_SIZE};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

/// Client for the enterprise billing and organization APIs
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: HttpClient,
    base_url: String,
    enterprise: String,
}

impl GitHubClient {
    /// Create a client from resolved settings
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = HttpClient::with_config(settings.http_client_config())?;
        Self::new(http, &settings.api_base_url, &settings.enterprise)
    }

    /// Create a client over an existing transport
    ///
    /// Trailing slashes on `base_url` are dropped. The enterprise slug must
    /// not be empty.
    pub fn new(http: HttpClient, base_url: &str, enterprise: &str) -> Result<Self> {
        if enterprise.trim().is_empty() {
            return Err(Error::config("enterprise slug must not be empty"));
        }
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            enterprise: enterprise.to_string(),
        })
    }

    /// Abort calls before their next attempt once `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.http = self.http.with_cancellation(token);
        self
    }

    /// Enterprise slug
    pub fn enterprise(&self) -> &str {
        &self.enterprise
    }

    /// Normalized API base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Underlying transport
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// URL under `/enterprises/{enterprise}`
    pub fn enterprise_url(&self, path: &str) -> String {
        format!("{}/enterprises/{}{}", self.base_url, self.enterprise, path)
    }

    /// URL under `/orgs/{org}`
    pub fn org_url(&self, org: &str, path: &str) -> String {
        format!("{}/orgs/{}{}", self.base_url, org, path)
    }

    /// URL under the API root
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.http.get_json(url).await
    }

    async fn list<P>(&self, request: &ApiRequest) -> Result<Vec<P::Item>>
    where
        P: Page + DeserializeOwned,
    {
        self.http.list_paged::<P>(request, DEFAULT_PAGE_SIZE).await
    }
}
