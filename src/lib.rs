// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # gh-cost-center
//!
//! Assigns GitHub Enterprise Copilot license holders and repositories to
//! cost centers.
//!
//! ## Features
//!
//! - **PRU exceptions**: every Copilot user lands in one of two cost centers
//! - **Teams**: one cost center per team, or explicit team mappings
//! - **Repositories**: custom property values pick the cost center
//! - **Resilient transport**: retries with backoff, rate-limit waits, paging
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gh_cost_center::{config::Settings, github::GitHubClient, policy::PruPolicy, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let settings = Settings::load("config/config.yaml".as_ref())?;
//!     let client = GitHubClient::from_settings(&settings)?;
//!
//!     let users = client.list_copilot_users().await?;
//!     let groups = PruPolicy::from_settings(&settings).assignment_groups(&users);
//!     for (cost_center, logins) in &groups {
//!         client.add_users_to_cost_center(cost_center, logins).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  cli: assign / list-users / report / config              │
//! └──────────────────────────────────────────────────────────┘
//!          │                               │
//! ┌────────┴─────────┐        ┌────────────┴────────────────┐
//! │ policy           │        │ github                      │
//! │ PRU, teams, repo │        │ seats, teams, properties,   │
//! │                  │        │ cost centers, budgets       │
//! └──────────────────┘        └────────────┬────────────────┘
//!                                          │
//!                   ┌──────────────────────┴──────────────┐
//!                   │ http: retry, rate limit, pagination │
//!                   └─────────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// HTTP client with retry and rate limiting
pub mod http;

/// Page-number pagination
pub mod pagination;

/// GitHub Enterprise API operations
pub mod github;

/// Assignment policies
pub mod policy;

/// Configuration file and resolved settings
pub mod config;

/// Log sinks
pub mod logging;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use config::Settings;
pub use github::GitHubClient;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
