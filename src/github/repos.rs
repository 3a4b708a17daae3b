//! Repository custom properties

use super::GitHubClient;
use crate::error::Result;
use crate::http::ApiRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

/// Value of a custom property
///
/// Properties are either unset, a single string, or a multi-select list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<Value>", into = "Option<Value>")]
pub enum PropertyValue {
    #[default]
    Absent,
    Single(String),
    Multiple(Vec<String>),
    /// Any other shape, kept verbatim
    Unknown(Value),
}

impl From<Option<Value>> for PropertyValue {
    fn from(value: Option<Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Absent,
            Some(Value::String(s)) => Self::Single(s),
            Some(Value::Array(items)) => {
                let strings: Option<Vec<String>> = items
                    .iter()
                    .map(|item| item.as_str().map(str::to_owned))
                    .collect();
                match strings {
                    Some(strings) => Self::Multiple(strings),
                    None => Self::Unknown(Value::Array(items)),
                }
            }
            Some(other) => Self::Unknown(other),
        }
    }
}

impl From<PropertyValue> for Option<Value> {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Absent => None,
            PropertyValue::Single(s) => Some(Value::String(s)),
            PropertyValue::Multiple(items) => {
                Some(Value::Array(items.into_iter().map(Value::String).collect()))
            }
            PropertyValue::Unknown(value) => Some(value),
        }
    }
}

impl PropertyValue {
    /// String values carried by the property
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(s) => vec![s.as_str()],
            Self::Multiple(items) => items.iter().map(String::as_str).collect(),
            Self::Absent | Self::Unknown(_) => Vec::new(),
        }
    }

    /// Whether any carried value is one of `candidates`
    pub fn matches_any(&self, candidates: &[String]) -> bool {
        self.values()
            .iter()
            .any(|value| candidates.iter().any(|c| c == value))
    }
}

/// A single custom property name/value pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub property_name: String,
    #[serde(default)]
    pub value: PropertyValue,
}

/// A repository with its custom property values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoProperties {
    #[serde(default)]
    pub repository_id: i64,
    #[serde(default)]
    pub repository_name: String,
    #[serde(default)]
    pub repository_full_name: String,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl RepoProperties {
    /// Value of the named property, if present
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|p| p.property_name == name)
            .map(|p| &p.value)
    }
}

/// Schema definition of an organization custom property
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub property_name: String,
    #[serde(default)]
    pub value_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub allowed_values: Option<Vec<String>>,
}

impl GitHubClient {
    /// Custom property definitions of an organization
    pub async fn org_property_schema(&self, org: &str) -> Result<Vec<PropertyDefinition>> {
        info!(org, "Fetching custom property schema");
        let definitions: Option<Vec<PropertyDefinition>> =
            self.get(&self.org_url(org, "/properties/schema")).await?;
        let definitions = definitions.unwrap_or_default();
        info!(org, count = definitions.len(), "Custom properties defined");
        Ok(definitions)
    }

    /// Repositories of an organization with their property values
    ///
    /// `query` narrows the result using repository search syntax.
    pub async fn list_org_repo_properties(
        &self,
        org: &str,
        query: Option<&str>,
    ) -> Result<Vec<RepoProperties>> {
        info!(org, "Fetching repositories with custom properties");
        let mut request = ApiRequest::get(&self.org_url(org, "/properties/values"))?;
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            request = request.with_query("repository_query", query);
        }

        let repos = self.list::<Vec<RepoProperties>>(&request).await?;
        info!(org, count = repos.len(), "Total repositories with custom properties");
        Ok(repos)
    }

    /// Property values of a single repository
    pub async fn repo_properties(&self, owner: &str, repo: &str) -> Result<Vec<Property>> {
        debug!(repo = %format!("{owner}/{repo}"), "Fetching custom properties for repository");
        let properties: Option<Vec<Property>> = self
            .get(&self.api_url(&format!("/repos/{owner}/{repo}/properties/values")))
            .await?;
        Ok(properties.unwrap_or_default())
    }
}

#[cfg(test)]
mod repos_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_property_value_shapes() {
        let parse = |v: Value| -> PropertyValue {
            let p: Property =
                serde_json::from_value(json!({"property_name": "team", "value": v})).unwrap();
            p.value
        };

        assert_eq!(parse(Value::Null), PropertyValue::Absent);
        assert_eq!(parse(json!("platform")), PropertyValue::Single("platform".into()));
        assert_eq!(
            parse(json!(["a", "b"])),
            PropertyValue::Multiple(vec!["a".into(), "b".into()])
        );
        assert_eq!(parse(json!([1, "b"])), PropertyValue::Unknown(json!([1, "b"])));
        assert_eq!(parse(json!(true)), PropertyValue::Unknown(json!(true)));
    }

    #[test]
    fn test_property_value_matches_any() {
        let candidates = vec!["platform".to_string(), "infra".to_string()];

        assert!(PropertyValue::Single("infra".into()).matches_any(&candidates));
        assert!(
            PropertyValue::Multiple(vec!["web".into(), "platform".into()]).matches_any(&candidates)
        );
        assert!(!PropertyValue::Single("web".into()).matches_any(&candidates));
        assert!(!PropertyValue::Absent.matches_any(&candidates));
        assert!(!PropertyValue::Unknown(json!("infra")).matches_any(&candidates));
    }

    #[test]
    fn test_repo_property_lookup() {
        let repo: RepoProperties = serde_json::from_value(json!({
            "repository_id": 1,
            "repository_name": "api",
            "repository_full_name": "acme/api",
            "properties": [{"property_name": "team", "value": "platform"}]
        }))
        .unwrap();

        assert_eq!(repo.property("team"), Some(&PropertyValue::Single("platform".into())));
        assert_eq!(repo.property("missing"), None);
    }
}
