//! Copilot seat holders

use super::GitHubClient;
use crate::error::Result;
use crate::http::ApiRequest;
use crate::pagination::Page;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// Team through which a seat was granted
///
/// The API sends an object, `null`, or nothing at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<Value>", into = "Option<Value>")]
pub enum AssigningTeam {
    /// Seat assigned directly
    #[default]
    Absent,
    /// Seat assigned through the named team
    Team(String),
    /// Any other shape, kept verbatim
    Unknown(Value),
}

impl From<Option<Value>> for AssigningTeam {
    fn from(value: Option<Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Absent,
            Some(value) => {
                let name = value
                    .get("slug")
                    .or_else(|| value.get("name"))
                    .and_then(Value::as_str)
                    .map(str::to_owned);
                match name {
                    Some(name) => Self::Team(name),
                    None => Self::Unknown(value),
                }
            }
        }
    }
}

impl From<AssigningTeam> for Option<Value> {
    fn from(team: AssigningTeam) -> Self {
        match team {
            AssigningTeam::Absent => None,
            AssigningTeam::Team(name) => Some(serde_json::json!({ "slug": name })),
            AssigningTeam::Unknown(value) => Some(value),
        }
    }
}

/// A Copilot seat holder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CopilotUser {
    pub login: String,
    pub id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "type")]
    pub user_type: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub pending_cancellation_date: Option<String>,
    pub last_activity_at: Option<String>,
    pub last_activity_editor: Option<String>,
    pub plan: Option<String>,
    #[serde(default)]
    pub assigning_team: AssigningTeam,
}

#[derive(Debug, Default, Deserialize)]
struct Assignee {
    #[serde(default)]
    login: String,
    #[serde(default)]
    id: i64,
    name: Option<String>,
    email: Option<String>,
    #[serde(rename = "type")]
    user_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeatEntry {
    #[serde(default)]
    assignee: Assignee,
    created_at: Option<String>,
    updated_at: Option<String>,
    pending_cancellation_date: Option<String>,
    last_activity_at: Option<String>,
    last_activity_editor: Option<String>,
    plan: Option<String>,
    #[serde(default)]
    assigning_team: AssigningTeam,
}

impl From<SeatEntry> for CopilotUser {
    fn from(seat: SeatEntry) -> Self {
        Self {
            login: seat.assignee.login,
            id: seat.assignee.id,
            name: seat.assignee.name,
            email: seat.assignee.email,
            user_type: seat.assignee.user_type,
            created_at: seat.created_at,
            updated_at: seat.updated_at,
            pending_cancellation_date: seat.pending_cancellation_date,
            last_activity_at: seat.last_activity_at,
            last_activity_editor: seat.last_activity_editor,
            plan: seat.plan,
            assigning_team: seat.assigning_team,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SeatsPage {
    #[serde(default)]
    seats: Vec<SeatEntry>,
}

impl Page for SeatsPage {
    type Item = SeatEntry;

    fn into_items(self) -> Vec<SeatEntry> {
        self.seats
    }
}

impl GitHubClient {
    /// All Copilot seat holders in the enterprise, deduplicated by login
    pub async fn list_copilot_users(&self) -> Result<Vec<CopilotUser>> {
        info!(enterprise = %self.enterprise, "Fetching Copilot users");

        let request = ApiRequest::get(&self.enterprise_url("/copilot/billing/seats"))?;
        let seats = self.list::<SeatsPage>(&request).await?;
        let users: Vec<CopilotUser> = seats.into_iter().map(CopilotUser::from).collect();

        info!(count = users.len(), "Total Copilot users found");
        Ok(dedupe_users(users))
    }
}

/// Drop empty logins and repeated logins, keeping the first occurrence
pub fn dedupe_users(users: Vec<CopilotUser>) -> Vec<CopilotUser> {
    let mut seen = HashSet::with_capacity(users.len());
    let mut duplicates: HashMap<String, usize> = HashMap::new();
    let mut unique = Vec::with_capacity(users.len());

    for user in users {
        if user.login.is_empty() {
            continue;
        }
        if seen.contains(&user.login) {
            *duplicates.entry(user.login).or_default() += 1;
            continue;
        }
        seen.insert(user.login.clone());
        unique.push(user);
    }

    if !duplicates.is_empty() {
        warn!(
            duplicate_entries = duplicates.values().sum::<usize>(),
            unique_users_affected = duplicates.len(),
            "Detected and skipped duplicate seat entries"
        );
        info!(count = unique.len(), "Unique Copilot users after deduplication");
    }
    unique
}

/// Users whose seat was created strictly after `after`
///
/// `created_at` is read as RFC 3339, or as a zone-less timestamp taken to
/// be UTC. Users with a missing or unreadable value are skipped.
pub fn filter_users_by_timestamp(users: &[CopilotUser], after: DateTime<Utc>) -> Vec<CopilotUser> {
    users
        .iter()
        .filter(|user| {
            user.created_at
                .as_deref()
                .and_then(parse_timestamp)
                .is_some_and(|created| created > after)
        })
        .cloned()
        .collect()
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if value.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

#[cfg(test)]
mod copilot_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn user(login: &str, created_at: Option<&str>) -> CopilotUser {
        CopilotUser {
            login: login.to_string(),
            created_at: created_at.map(str::to_owned),
            ..Default::default()
        }
    }

    #[test]
    fn test_assigning_team_shapes() {
        let parse = |v: Value| -> AssigningTeam {
            let entry: SeatEntry = serde_json::from_value(json!({ "assigning_team": v })).unwrap();
            entry.assigning_team
        };

        assert_eq!(parse(Value::Null), AssigningTeam::Absent);
        assert_eq!(
            parse(json!({"slug": "platform", "name": "Platform"})),
            AssigningTeam::Team("platform".to_string())
        );
        assert_eq!(
            parse(json!({"name": "Platform"})),
            AssigningTeam::Team("Platform".to_string())
        );
        assert_eq!(parse(json!(42)), AssigningTeam::Unknown(json!(42)));

        let entry: SeatEntry = serde_json::from_value(json!({})).unwrap();
        assert_eq!(entry.assigning_team, AssigningTeam::Absent);
    }

    #[test]
    fn test_seat_entry_flattens_assignee() {
        let entry: SeatEntry = serde_json::from_value(json!({
            "assignee": {"login": "alice", "id": 7, "name": "Alice", "type": "User"},
            "created_at": "2024-01-01T00:00:00Z",
            "plan": "business"
        }))
        .unwrap();
        let user = CopilotUser::from(entry);

        assert_eq!(user.login, "alice");
        assert_eq!(user.id, 7);
        assert_eq!(user.name.as_deref(), Some("Alice"));
        assert_eq!(user.user_type.as_deref(), Some("User"));
        assert_eq!(user.plan.as_deref(), Some("business"));
    }

    #[test]
    fn test_dedupe_keeps_first_and_skips_empty() {
        let mut first = user("alice", None);
        first.id = 1;
        let mut second = user("alice", None);
        second.id = 2;

        let unique = dedupe_users(vec![first, user("", None), user("bob", None), second]);
        let logins: Vec<&str> = unique.iter().map(|u| u.login.as_str()).collect();

        assert_eq!(logins, vec!["alice", "bob"]);
        assert_eq!(unique[0].id, 1);
    }

    #[test]
    fn test_dedupe_empty() {
        assert!(dedupe_users(Vec::new()).is_empty());
    }

    #[test]
    fn test_filter_users_by_timestamp() {
        let after = DateTime::parse_from_rfc3339("2024-06-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let users = vec![
            user("old", Some("2024-01-01T00:00:00Z")),
            user("exact", Some("2024-06-01T00:00:00Z")),
            user("new", Some("2024-07-01T10:00:00+02:00")),
            user("naive", Some("2024-08-01T00:00:00")),
            user("missing", None),
            user("garbage", Some("yesterday")),
        ];

        let filtered = filter_users_by_timestamp(&users, after);
        let logins: Vec<&str> = filtered.iter().map(|u| u.login.as_str()).collect();
        assert_eq!(logins, vec!["new", "naive"]);
    }
}
