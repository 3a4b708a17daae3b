//! Configuration loading and resolution
//!
//! The YAML file is parsed into [`FileConfig`], a loose mirror of the file
//! where every key is optional. [`Settings`] is the resolved view: environment
//! overrides applied, backward-compatible key chains followed, defaults filled
//! in and values validated.

use crate::error::{Error, Result, ResultExt};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::types::{CostCenterMode, LogLevel, TeamsMode, TeamsScope};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Standard GitHub API endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Default id of the cost center for users without PRU overages
pub const DEFAULT_NO_PRUS_CC_ID: &str = "CC-001-NO-PRUS";

/// Default id of the cost center for PRU exception users
pub const DEFAULT_PRUS_ALLOWED_CC_ID: &str = "CC-002-PRUS-ALLOWED";

/// Default name used when auto-creating the no-PRU cost center
pub const DEFAULT_NO_PRUS_CC_NAME: &str = "00 - No PRU overages";

/// Default name used when auto-creating the PRU-allowed cost center
pub const DEFAULT_PRUS_ALLOWED_CC_NAME: &str = "01 - PRU overages allowed";

/// Default directory for exports and the last-run timestamp
pub const DEFAULT_EXPORT_DIR: &str = "exports";

/// File name of the last-run timestamp inside the export directory
pub const TIMESTAMP_FILE_NAME: &str = ".last_run_timestamp";

const PLACEHOLDER_ENTERPRISES: &[&str] =
    &["", "REPLACE_WITH_ENTERPRISE_SLUG", "your_enterprise_name"];

const PLACEHOLDER_NO_PRUS_IDS: &[&str] =
    &["REPLACE_WITH_NO_PRUS_COST_CENTER_ID", DEFAULT_NO_PRUS_CC_ID];

const PLACEHOLDER_PRUS_ALLOWED_IDS: &[&str] = &[
    "REPLACE_WITH_PRUS_ALLOWED_COST_CENTER_ID",
    DEFAULT_PRUS_ALLOWED_CC_ID,
];

// ============================================================================
// File Config
// ============================================================================

/// Configuration file as written on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub github: GitHubSection,
    pub logging: LoggingSection,
    pub cost_centers: CostCentersSection,
    pub teams: TeamsSection,
    pub budgets: BudgetsSection,
    pub export_dir: Option<String>,
    pub http: HttpSection,
}

/// `github` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubSection {
    pub enterprise: Option<String>,
    pub api_base_url: Option<String>,
    pub cost_centers: CostCenterModeSection,
}

/// `github.cost_centers` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CostCenterModeSection {
    pub mode: Option<String>,
    pub repository_config: RepositoryConfig,
}

/// Repository-mode configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Organizations whose repositories are scanned
    pub organizations: Vec<String>,
    /// Property value sets mapped to cost centers, first match wins
    pub explicit_mappings: Vec<ExplicitMapping>,
}

/// Maps a custom property value set to a cost center
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplicitMapping {
    pub cost_center: String,
    pub property_name: String,
    pub property_values: Vec<String>,
}

/// `logging` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

/// `cost_centers` section, including legacy key names
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CostCentersSection {
    pub no_prus_cost_center_id: Option<String>,
    pub prus_allowed_cost_center_id: Option<String>,
    pub prus_exception_users: Vec<String>,
    pub auto_create: bool,
    pub no_prus_cost_center_name: Option<String>,
    pub prus_allowed_cost_center_name: Option<String>,
    pub enable_incremental: bool,

    // legacy keys
    pub no_prus_cost_center: Option<String>,
    pub prus_allowed_cost_center: Option<String>,
    pub no_pru_name: Option<String>,
    pub pru_allowed_name: Option<String>,
}

/// `teams` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamsSection {
    pub enabled: bool,
    pub scope: Option<String>,
    pub mode: Option<String>,
    pub organizations: Vec<String>,
    pub auto_create_cost_centers: bool,
    pub team_mappings: HashMap<String, String>,
    pub remove_users_no_longer_in_teams: Option<bool>,
    pub remove_orphaned_users: Option<bool>,
}

/// `budgets` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetsSection {
    pub enabled: bool,
    pub products: Option<BTreeMap<String, ProductBudget>>,
}

/// Budget settings for one product
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductBudget {
    pub amount: u64,
    pub enabled: bool,
}

/// `http` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub requests_per_second: Option<u32>,
}

impl FileConfig {
    /// Parse a configuration document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // an empty document is a valid, all-default config
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read a configuration file
    ///
    /// A missing file is not an error: defaults are used and a warning is
    /// logged.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_yaml(&contents)
                .with_context(|| format!("parsing config file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(Error::Io(e)),
        }
    }
}

// ============================================================================
// Resolved Settings
// ============================================================================

/// Transport settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub requests_per_second: Option<u32>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            requests_per_second: None,
        }
    }
}

/// Team-based assignment settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamsSettings {
    pub enabled: bool,
    pub scope: TeamsScope,
    pub mode: TeamsMode,
    pub organizations: Vec<String>,
    pub auto_create: bool,
    pub mappings: HashMap<String, String>,
    pub remove_users_no_longer_in_teams: bool,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub enterprise: String,
    pub api_base_url: String,
    pub token: Option<String>,
    pub cost_center_mode: CostCenterMode,
    pub repository: Option<RepositoryConfig>,

    pub no_prus_cost_center_id: String,
    pub prus_allowed_cost_center_id: String,
    pub no_prus_cost_center_name: String,
    pub prus_allowed_cost_center_name: String,
    pub prus_exception_users: Vec<String>,
    pub auto_create: bool,
    pub enable_incremental: bool,

    pub teams: TeamsSettings,

    pub budgets_enabled: bool,
    pub budget_products: BTreeMap<String, ProductBudget>,

    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
    pub export_dir: PathBuf,
    pub http: HttpSettings,
}

/// Contents of the last-run timestamp file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TimestampFile {
    #[serde(default)]
    last_run: String,
    #[serde(default)]
    saved_at: String,
}

impl Settings {
    /// Load and resolve the configuration file using the process environment
    pub fn load(path: &Path) -> Result<Self> {
        let file = FileConfig::load(path)?;
        Self::resolve_with_env(file, |key| std::env::var(key).ok())
    }

    /// Resolve a parsed file against an environment lookup
    pub fn resolve_with_env<F>(file: FileConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_value = |key: &str| env(key).filter(|v| !v.is_empty());

        let enterprise = env_value("GITHUB_ENTERPRISE")
            .or(file.github.enterprise)
            .unwrap_or_default();
        if PLACEHOLDER_ENTERPRISES.contains(&enterprise.as_str()) {
            return Err(Error::config(
                "github enterprise must be configured (set env GITHUB_ENTERPRISE or update config github.enterprise)",
            ));
        }

        let raw_url = env_value("GITHUB_API_BASE_URL")
            .or(file.github.api_base_url.filter(|v| !v.is_empty()))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = validate_api_url(&raw_url)?;

        let token = env_value("GITHUB_TOKEN").or_else(|| env_value("GH_TOKEN"));

        let cost_center_mode: CostCenterMode =
            file.github.cost_centers.mode.as_deref().unwrap_or_default().parse()?;

        let repository = if cost_center_mode == CostCenterMode::Repository {
            let config = file.github.cost_centers.repository_config;
            validate_repository_config(&config)?;
            info!(mappings = config.explicit_mappings.len(), "Repository mode enabled");
            Some(config)
        } else {
            None
        };

        let cc = file.cost_centers;
        let teams = file.teams;

        let teams = TeamsSettings {
            enabled: teams.enabled,
            scope: teams.scope.as_deref().unwrap_or_default().parse()?,
            mode: teams.mode.as_deref().unwrap_or_default().parse()?,
            organizations: teams.organizations,
            auto_create: teams.auto_create_cost_centers,
            mappings: teams.team_mappings,
            remove_users_no_longer_in_teams: teams
                .remove_users_no_longer_in_teams
                .or(teams.remove_orphaned_users)
                .unwrap_or(true),
        };

        let budget_products = file.budgets.products.unwrap_or_else(default_budget_products);

        let http = HttpSettings {
            timeout: Duration::from_secs(file.http.timeout_secs.unwrap_or(30)),
            max_attempts: file.http.max_attempts.unwrap_or(3).max(1),
            requests_per_second: file.http.requests_per_second.filter(|rps| *rps > 0),
        };

        Ok(Self {
            enterprise,
            api_base_url,
            token,
            cost_center_mode,
            repository,
            no_prus_cost_center_id: first_non_empty(
                [cc.no_prus_cost_center_id, cc.no_prus_cost_center],
                DEFAULT_NO_PRUS_CC_ID,
            ),
            prus_allowed_cost_center_id: first_non_empty(
                [cc.prus_allowed_cost_center_id, cc.prus_allowed_cost_center],
                DEFAULT_PRUS_ALLOWED_CC_ID,
            ),
            no_prus_cost_center_name: first_non_empty(
                [cc.no_prus_cost_center_name, cc.no_pru_name],
                DEFAULT_NO_PRUS_CC_NAME,
            ),
            prus_allowed_cost_center_name: first_non_empty(
                [cc.prus_allowed_cost_center_name, cc.pru_allowed_name],
                DEFAULT_PRUS_ALLOWED_CC_NAME,
            ),
            prus_exception_users: cc.prus_exception_users,
            auto_create: cc.auto_create,
            enable_incremental: cc.enable_incremental,
            teams,
            budgets_enabled: file.budgets.enabled,
            budget_products,
            log_level: LogLevel::parse(file.logging.level.as_deref().unwrap_or_default()),
            log_file: file.logging.file.filter(|p| !p.as_os_str().is_empty()),
            export_dir: PathBuf::from(
                file.export_dir
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| DEFAULT_EXPORT_DIR.to_string()),
            ),
            http,
        })
    }

    /// Turn on cost center auto-creation (`--create-cost-centers`)
    pub fn enable_auto_creation(&mut self) {
        self.auto_create = true;
    }

    /// Build the transport configuration
    pub fn http_client_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .timeout(self.http.timeout)
            .max_attempts(self.http.max_attempts);
        if let Some(token) = &self.token {
            builder = builder.token(token.clone());
        }
        if let Some(rps) = self.http.requests_per_second {
            builder = builder.rate_limit(RateLimiterConfig::per_second(rps));
        }
        builder.build()
    }

    /// Path of the last-run timestamp file
    pub fn timestamp_file(&self) -> PathBuf {
        self.export_dir.join(TIMESTAMP_FILE_NAME)
    }

    /// Persist the last-run timestamp (now when `at` is `None`)
    pub fn save_last_run(&self, at: Option<DateTime<Utc>>) -> Result<()> {
        let now = Utc::now();
        let data = TimestampFile {
            last_run: at
                .unwrap_or(now)
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            saved_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        };

        std::fs::create_dir_all(&self.export_dir)
            .with_context(|| format!("creating export directory {}", self.export_dir.display()))?;
        let json = serde_json::to_string_pretty(&data)?;
        std::fs::write(self.timestamp_file(), json)?;

        info!(timestamp = %data.last_run, "Saved last run timestamp");
        Ok(())
    }

    /// Read the last-run timestamp, if one was saved
    pub fn load_last_run(&self) -> Result<Option<DateTime<Utc>>> {
        let path = self.timestamp_file();
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No previous run timestamp found, all users will be processed");
                return Ok(None);
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let data: TimestampFile = serde_json::from_str(&contents)?;
        if data.last_run.is_empty() {
            warn!(path = %path.display(), "Invalid timestamp file format");
            return Ok(None);
        }

        let parsed = DateTime::parse_from_rfc3339(&data.last_run)
            .map_err(|e| Error::invalid_value("last_run", e.to_string()))?
            .with_timezone(&Utc);
        info!(timestamp = %data.last_run, "Loaded last run timestamp");
        Ok(Some(parsed))
    }

    /// Log warnings for placeholder values still present
    ///
    /// Returns the offending fields.
    pub fn check_warnings(&self) -> Vec<&'static str> {
        let mut flagged = Vec::new();
        if !self.auto_create {
            let checks = [
                ("no_prus_cost_center_id", &self.no_prus_cost_center_id, PLACEHOLDER_NO_PRUS_IDS),
                (
                    "prus_allowed_cost_center_id",
                    &self.prus_allowed_cost_center_id,
                    PLACEHOLDER_PRUS_ALLOWED_IDS,
                ),
            ];
            for (field, value, placeholders) in checks {
                if placeholders.contains(&value.as_str()) {
                    warn!(
                        field,
                        value = %value,
                        "Configuration appears to be a placeholder; set real cost center ids before applying"
                    );
                    flagged.push(field);
                }
            }
        }

        if self.prus_exception_users.is_empty() {
            info!("No PRU exception users configured, all users go to the no-PRU cost center");
        }
        flagged
    }

    /// Human-readable view of the resolved configuration
    pub fn summary(&self) -> BTreeMap<&'static str, String> {
        let mut summary = BTreeMap::from([
            ("enterprise", self.enterprise.clone()),
            ("api_base_url", self.api_base_url.clone()),
            ("cost_center_mode", self.cost_center_mode.to_string()),
            ("no_prus_cost_center_id", self.no_prus_cost_center_id.clone()),
            ("prus_allowed_cost_center_id", self.prus_allowed_cost_center_id.clone()),
            (
                "prus_exception_users_count",
                self.prus_exception_users.len().to_string(),
            ),
            ("auto_create", self.auto_create.to_string()),
            ("enable_incremental", self.enable_incremental.to_string()),
            ("teams_enabled", self.teams.enabled.to_string()),
            ("teams_scope", self.teams.scope.to_string()),
            ("teams_mode", self.teams.mode.to_string()),
            ("budgets_enabled", self.budgets_enabled.to_string()),
            ("log_level", self.log_level.as_directive().to_uppercase()),
            ("export_dir", self.export_dir.display().to_string()),
            ("token_configured", self.token.is_some().to_string()),
        ]);

        summary.insert(
            "no_prus_cost_center_url",
            cost_center_url(&self.enterprise, &self.no_prus_cost_center_id),
        );
        summary.insert(
            "prus_allowed_cost_center_url",
            cost_center_url(&self.enterprise, &self.prus_allowed_cost_center_id),
        );
        summary
    }
}

fn cost_center_url(enterprise: &str, id: &str) -> String {
    format!("https://github.com/enterprises/{enterprise}/billing/cost_centers/{id}")
}

fn default_budget_products() -> BTreeMap<String, ProductBudget> {
    BTreeMap::from([
        (
            "copilot".to_string(),
            ProductBudget {
                amount: 100,
                enabled: true,
            },
        ),
        (
            "actions".to_string(),
            ProductBudget {
                amount: 125,
                enabled: true,
            },
        ),
    ])
}

fn first_non_empty<const N: usize>(candidates: [Option<String>; N], default: &str) -> String {
    candidates
        .into_iter()
        .flatten()
        .find(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

// ============================================================================
// Validation
// ============================================================================

/// Validate and normalise a GitHub API base URL
///
/// Trailing slashes are removed. The URL must be HTTPS. `*.ghe.com` hosts
/// must have the form `api.<subdomain>.ghe.com`. Anything that is neither
/// github.com, a data-resident host nor a `/api/v3` server is accepted with
/// a warning.
pub fn validate_api_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::invalid_value(
            "github.api_base_url",
            "must be a non-empty string",
        ));
    }
    if !trimmed.starts_with("https://") {
        return Err(Error::invalid_value(
            "github.api_base_url",
            format!("must use HTTPS: {trimmed}"),
        ));
    }

    if trimmed == DEFAULT_API_BASE_URL {
        info!(url = trimmed, "Using standard GitHub API");
    } else if trimmed.contains(".ghe.com") {
        let host = Url::parse(trimmed)?
            .host_str()
            .unwrap_or_default()
            .to_string();
        let subdomain = host
            .strip_prefix("api.")
            .and_then(|rest| rest.strip_suffix(".ghe.com"))
            .ok_or_else(|| {
                Error::invalid_value(
                    "github.api_base_url",
                    format!("data resident API URL should match 'https://api.{{subdomain}}.ghe.com', got: {trimmed}"),
                )
            })?;
        if subdomain.is_empty() {
            return Err(Error::invalid_value(
                "github.api_base_url",
                format!("missing data resident subdomain: {trimmed}"),
            ));
        }
        info!(subdomain, url = trimmed, "Using GitHub Enterprise data resident API");
    } else if trimmed.contains("/api/v3") {
        info!(url = trimmed, "Using GitHub Enterprise Server API");
    } else {
        warn!(
            url = trimmed,
            expected = "https://api.github.com | https://api.{subdomain}.ghe.com | https://{hostname}/api/v3",
            "Using custom GitHub API URL (non-standard pattern)"
        );
    }

    Ok(trimmed.to_string())
}

fn validate_repository_config(config: &RepositoryConfig) -> Result<()> {
    for (i, mapping) in config.explicit_mappings.iter().enumerate() {
        let field = format!("explicit_mappings[{i}]");
        if mapping.cost_center.is_empty() {
            return Err(Error::invalid_value(field, "missing 'cost_center'"));
        }
        if mapping.property_name.is_empty() {
            return Err(Error::invalid_value(field, "missing 'property_name'"));
        }
        if mapping.property_values.is_empty() {
            return Err(Error::invalid_value(field, "missing 'property_values'"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use test_case::test_case;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn resolve(yaml: &str) -> Result<Settings> {
        Settings::resolve_with_env(FileConfig::from_yaml(yaml)?, no_env)
    }

    #[test]
    fn test_defaults_applied() {
        let settings = resolve("github:\n  enterprise: acme\n").unwrap();

        assert_eq!(settings.enterprise, "acme");
        assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(settings.cost_center_mode, CostCenterMode::Users);
        assert_eq!(settings.no_prus_cost_center_id, DEFAULT_NO_PRUS_CC_ID);
        assert_eq!(settings.prus_allowed_cost_center_id, DEFAULT_PRUS_ALLOWED_CC_ID);
        assert_eq!(settings.no_prus_cost_center_name, DEFAULT_NO_PRUS_CC_NAME);
        assert_eq!(settings.teams.scope, TeamsScope::Enterprise);
        assert_eq!(settings.teams.mode, TeamsMode::Auto);
        assert!(settings.teams.remove_users_no_longer_in_teams);
        assert_eq!(settings.budget_products["copilot"].amount, 100);
        assert_eq!(settings.budget_products["actions"].amount, 125);
        assert_eq!(settings.log_level, LogLevel::Info);
        assert_eq!(settings.export_dir, PathBuf::from(DEFAULT_EXPORT_DIR));
        assert_eq!(settings.http, HttpSettings::default());
        assert!(settings.token.is_none());
        assert!(settings.repository.is_none());
    }

    #[test_case(""; "empty")]
    #[test_case("REPLACE_WITH_ENTERPRISE_SLUG"; "template placeholder")]
    #[test_case("your_enterprise_name"; "example placeholder")]
    fn test_placeholder_enterprise_rejected(enterprise: &str) {
        let yaml = format!("github:\n  enterprise: \"{enterprise}\"\n");
        let err = resolve(&yaml).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let file = FileConfig::from_yaml(
            "github:\n  enterprise: REPLACE_WITH_ENTERPRISE_SLUG\n  api_base_url: https://api.github.com\n",
        )
        .unwrap();
        let settings = Settings::resolve_with_env(file, |key| match key {
            "GITHUB_ENTERPRISE" => Some("from-env".to_string()),
            "GITHUB_API_BASE_URL" => Some("https://ghes.example.com/api/v3/".to_string()),
            "GH_TOKEN" => Some("gh-token".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(settings.enterprise, "from-env");
        assert_eq!(settings.api_base_url, "https://ghes.example.com/api/v3");
        assert_eq!(settings.token.as_deref(), Some("gh-token"));
    }

    #[test]
    fn test_github_token_preferred_over_gh_token() {
        let file = FileConfig::from_yaml("github:\n  enterprise: acme\n").unwrap();
        let settings = Settings::resolve_with_env(file, |key| match key {
            "GITHUB_TOKEN" => Some("primary".to_string()),
            "GH_TOKEN" => Some("secondary".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(settings.token.as_deref(), Some("primary"));
    }

    #[test]
    fn test_legacy_keys_fallback() {
        let settings = resolve(
            r#"
github:
  enterprise: acme
cost_centers:
  no_prus_cost_center: old-no-prus
  prus_allowed_cost_center_id: new-allowed
  prus_allowed_cost_center: old-allowed
  no_pru_name: Old No PRU
teams:
  remove_orphaned_users: false
"#,
        )
        .unwrap();

        assert_eq!(settings.no_prus_cost_center_id, "old-no-prus");
        assert_eq!(settings.prus_allowed_cost_center_id, "new-allowed");
        assert_eq!(settings.no_prus_cost_center_name, "Old No PRU");
        assert_eq!(settings.prus_allowed_cost_center_name, DEFAULT_PRUS_ALLOWED_CC_NAME);
        assert!(!settings.teams.remove_users_no_longer_in_teams);
    }

    #[test]
    fn test_new_remove_key_wins_over_legacy() {
        let settings = resolve(
            "github:\n  enterprise: acme\nteams:\n  remove_users_no_longer_in_teams: true\n  remove_orphaned_users: false\n",
        )
        .unwrap();
        assert!(settings.teams.remove_users_no_longer_in_teams);
    }

    #[test]
    fn test_repository_mode_validation() {
        let ok = resolve(
            r#"
github:
  enterprise: acme
  cost_centers:
    mode: repository
    repository_config:
      organizations: [acme-org]
      explicit_mappings:
        - cost_center: Platform
          property_name: team
          property_values: [platform, infra]
"#,
        )
        .unwrap();
        let repo = ok.repository.unwrap();
        assert_eq!(repo.organizations, vec!["acme-org"]);
        assert_eq!(repo.explicit_mappings[0].property_values, vec!["platform", "infra"]);

        let err = resolve(
            r#"
github:
  enterprise: acme
  cost_centers:
    mode: repository
    repository_config:
      explicit_mappings:
        - cost_center: Platform
          property_name: team
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("property_values"));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let err =
            resolve("github:\n  enterprise: acme\n  cost_centers:\n    mode: bogus\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));
    }

    #[test]
    fn test_http_section() {
        let settings = resolve(
            "github:\n  enterprise: acme\nhttp:\n  timeout_secs: 5\n  max_attempts: 0\n  requests_per_second: 4\n",
        )
        .unwrap();
        assert_eq!(settings.http.timeout, Duration::from_secs(5));
        assert_eq!(settings.http.max_attempts, 1);
        assert_eq!(settings.http.requests_per_second, Some(4));

        let config = settings.http_client_config();
        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.rate_limit, Some(RateLimiterConfig::per_second(4)));
    }

    #[test_case("https://api.github.com/", Some("https://api.github.com"); "trailing slash")]
    #[test_case("https://api.acme.ghe.com", Some("https://api.acme.ghe.com"); "data resident")]
    #[test_case("https://ghes.example.com/api/v3", Some("https://ghes.example.com/api/v3"); "server")]
    #[test_case("https://proxy.example.com", Some("https://proxy.example.com"); "custom")]
    #[test_case("http://api.github.com", None; "plain http")]
    #[test_case("https://acme.ghe.com", None; "data resident without api prefix")]
    #[test_case("https://api.ghe.com", None; "missing subdomain")]
    #[test_case("", None; "empty")]
    fn test_validate_api_url(input: &str, expected: Option<&str>) {
        let result = validate_api_url(input).ok();
        assert_eq!(result.as_deref(), expected);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let file = FileConfig::load(&dir.path().join("missing.yaml")).unwrap();
        assert!(file.github.enterprise.is_none());
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "github: [unclosed").unwrap();
        assert!(FileConfig::load(&path).is_err());
    }

    #[test]
    fn test_timestamp_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut settings = resolve("github:\n  enterprise: acme\n").unwrap();
        settings.export_dir = dir.path().join("exports");

        assert_eq!(settings.load_last_run().unwrap(), None);

        let at = DateTime::parse_from_rfc3339("2024-05-01T12:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        settings.save_last_run(Some(at)).unwrap();
        assert_eq!(settings.load_last_run().unwrap(), Some(at));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(settings.timestamp_file()).unwrap())
                .unwrap();
        assert_eq!(raw["last_run"], "2024-05-01T12:30:00Z");
        assert!(raw["saved_at"].is_string());
    }

    #[test]
    fn test_timestamp_file_without_last_run() {
        let dir = TempDir::new().unwrap();
        let mut settings = resolve("github:\n  enterprise: acme\n").unwrap();
        settings.export_dir = dir.path().to_path_buf();
        std::fs::write(settings.timestamp_file(), r#"{"saved_at": "x"}"#).unwrap();

        assert_eq!(settings.load_last_run().unwrap(), None);
    }

    #[test]
    fn test_check_warnings_flags_placeholders() {
        let mut settings = resolve("github:\n  enterprise: acme\n").unwrap();
        assert_eq!(
            settings.check_warnings(),
            vec!["no_prus_cost_center_id", "prus_allowed_cost_center_id"]
        );

        settings.enable_auto_creation();
        assert!(settings.check_warnings().is_empty());
    }

    #[test]
    fn test_summary() {
        let settings = resolve("github:\n  enterprise: acme\n").unwrap();
        let summary = settings.summary();
        assert_eq!(summary["enterprise"], "acme");
        assert_eq!(summary["log_level"], "INFO");
        assert_eq!(
            summary["no_prus_cost_center_url"],
            "https://github.com/enterprises/acme/billing/cost_centers/CC-001-NO-PRUS"
        );
    }
}
