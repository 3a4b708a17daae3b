//! Common types used throughout gh-cost-center
//!
//! This module contains shared enums for configuration values and
//! command modes used across multiple modules.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Type Aliases
// ============================================================================

/// Cost center id keyed by user login
pub type UserAssignments = HashMap<String, String>;

// ============================================================================
// Log Level
// ============================================================================

/// Log level for console and file output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a level name
    ///
    /// Case-insensitive; `WARNING` is accepted for `WARN`. Empty or unknown
    /// names map to `Info`.
    pub fn parse(level: &str) -> Self {
        match level.trim().to_uppercase().as_str() {
            "TRACE" => Self::Trace,
            "DEBUG" => Self::Debug,
            "WARN" | "WARNING" => Self::Warn,
            "ERROR" => Self::Error,
            _ => Self::Info,
        }
    }

    /// Directive string understood by `EnvFilter`
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

// ============================================================================
// Assignment Modes
// ============================================================================

/// How users (or repositories) are mapped to cost centers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostCenterMode {
    /// PRU exception list decides between two cost centers
    #[default]
    Users,
    /// Team membership decides
    Teams,
    /// Repository custom properties decide
    Repository,
}

impl fmt::Display for CostCenterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Users => "users",
            Self::Teams => "teams",
            Self::Repository => "repository",
        })
    }
}

impl FromStr for CostCenterMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "users" => Ok(Self::Users),
            "teams" => Ok(Self::Teams),
            "repository" => Ok(Self::Repository),
            other => Err(Error::invalid_value(
                "github.cost_centers.mode",
                format!("expected users, teams or repository, got '{other}'"),
            )),
        }
    }
}

/// Where teams are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamsScope {
    #[default]
    Enterprise,
    Organization,
}

impl fmt::Display for TeamsScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Enterprise => "enterprise",
            Self::Organization => "organization",
        })
    }
}

impl FromStr for TeamsScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "enterprise" => Ok(Self::Enterprise),
            "organization" => Ok(Self::Organization),
            other => Err(Error::invalid_value(
                "teams.scope",
                format!("expected enterprise or organization, got '{other}'"),
            )),
        }
    }
}

/// How team cost center names are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamsMode {
    /// One cost center per team, named after it
    #[default]
    Auto,
    /// Explicit `team_mappings`
    Manual,
}

impl fmt::Display for TeamsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        })
    }
}

impl FromStr for TeamsMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            other => Err(Error::invalid_value(
                "teams.mode",
                format!("expected auto or manual, got '{other}'"),
            )),
        }
    }
}

// ============================================================================
// Execution Mode
// ============================================================================

/// Whether `assign` only shows the plan or pushes it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExecutionMode {
    /// Print the desired assignment without changing anything
    #[default]
    Plan,
    /// Push the assignment to GitHub
    Apply,
}
