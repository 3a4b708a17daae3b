//! Organization and enterprise teams

use super::GitHubClient;
use crate::error::Result;
use crate::http::ApiRequest;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A GitHub team (organization or enterprise level)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    pub description: Option<String>,
}

/// A member of a team
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "type")]
    pub user_type: Option<String>,
}

impl GitHubClient {
    /// All teams of an organization
    pub async fn list_org_teams(&self, org: &str) -> Result<Vec<Team>> {
        info!(org, "Fetching teams for organization");
        let request = ApiRequest::get(&self.org_url(org, "/teams"))?;
        let teams = self.list::<Vec<Team>>(&request).await?;
        info!(org, count = teams.len(), "Total teams found");
        Ok(teams)
    }

    /// All members of an organization team
    pub async fn list_org_team_members(
        &self,
        org: &str,
        team_slug: &str,
    ) -> Result<Vec<TeamMember>> {
        debug!(org, team = team_slug, "Fetching members for team");
        let request = ApiRequest::get(&self.org_url(org, &format!("/teams/{team_slug}/members")))?;
        let members = self.list::<Vec<TeamMember>>(&request).await?;
        info!(team = %format!("{org}/{team_slug}"), count = members.len(), "Total members found");
        Ok(members)
    }

    /// All teams of the enterprise
    pub async fn list_enterprise_teams(&self) -> Result<Vec<Team>> {
        info!(enterprise = %self.enterprise, "Fetching enterprise teams");
        let request = ApiRequest::get(&self.enterprise_url("/teams"))?;
        let teams = self.list::<Vec<Team>>(&request).await?;
        info!(count = teams.len(), "Total enterprise teams found");
        Ok(teams)
    }

    /// All members of an enterprise team
    pub async fn list_enterprise_team_members(&self, team_slug: &str) -> Result<Vec<TeamMember>> {
        debug!(team = team_slug, "Fetching members for enterprise team");
        let request =
            ApiRequest::get(&self.enterprise_url(&format!("/teams/{team_slug}/memberships")))?;
        let members = self.list::<Vec<TeamMember>>(&request).await?;
        info!(team = team_slug, count = members.len(), "Total members found for enterprise team");
        Ok(members)
    }
}
