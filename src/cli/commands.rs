//! CLI commands and argument parsing

use crate::types::ExecutionMode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Assign GitHub Enterprise Copilot users and repositories to cost centers
#[derive(Parser, Debug)]
#[command(name = "gh-cost-center")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(long, global = true, default_value = "config/config.yaml")]
    pub config: PathBuf,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assign users or repositories to cost centers
    ///
    /// PRU exception rules decide by default; --teams uses team membership
    /// and --repo uses repository custom properties.
    Assign(AssignArgs),

    /// List Copilot license holders
    ListUsers,

    /// Show per cost center user counts
    Report {
        /// Count users per team cost center
        #[arg(long)]
        teams: bool,
    },

    /// Show the resolved configuration
    Config,
}

/// Arguments of `assign`
#[derive(Args, Debug, Clone, Default)]
pub struct AssignArgs {
    /// plan previews changes, apply pushes them
    #[arg(long, value_enum, default_value = "plan")]
    pub mode: ExecutionMode,

    /// Skip the confirmation prompt in apply mode
    #[arg(short, long)]
    pub yes: bool,

    /// Assign users by team membership
    #[arg(long, conflicts_with = "repo")]
    pub teams: bool,

    /// Assign repositories by custom property values
    #[arg(long)]
    pub repo: bool,

    /// Only process these users (comma-separated)
    #[arg(long)]
    pub users: Option<String>,

    /// Only process users added since the last run
    #[arg(long)]
    pub incremental: bool,

    /// Create missing cost centers
    #[arg(long)]
    pub create_cost_centers: bool,

    /// Create budgets for the cost centers
    #[arg(long)]
    pub create_budgets: bool,

    /// Skip users already in their target cost center
    #[arg(long)]
    pub check_current: bool,
}

impl AssignArgs {
    /// Logins given with `--users`, trimmed, empty entries dropped
    pub fn user_filter(&self) -> Vec<String> {
        self.users
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

#[cfg(test)]
mod commands_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["gh-cost-center", "list-users"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("config/config.yaml"));
        assert!(!cli.verbose);
        assert!(matches!(cli.command, Commands::ListUsers));
    }

    #[test]
    fn test_assign_flags() {
        let cli = Cli::try_parse_from([
            "gh-cost-center",
            "assign",
            "--mode",
            "apply",
            "-y",
            "--users",
            "alice, bob,,",
            "--incremental",
            "--create-cost-centers",
            "--check-current",
            "-v",
            "--config",
            "other.yaml",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("other.yaml"));
        let Commands::Assign(args) = cli.command else {
            panic!("expected assign");
        };
        assert_eq!(args.mode, ExecutionMode::Apply);
        assert!(args.yes && args.incremental && args.create_cost_centers && args.check_current);
        assert!(!args.create_budgets && !args.teams && !args.repo);
        assert_eq!(args.user_filter(), vec!["alice".to_string(), "bob".to_string()]);
    }

    #[test]
    fn test_assign_defaults_to_plan() {
        let cli = Cli::try_parse_from(["gh-cost-center", "assign"]).unwrap();
        let Commands::Assign(args) = cli.command else {
            panic!("expected assign");
        };
        assert_eq!(args.mode, ExecutionMode::Plan);
        assert!(args.user_filter().is_empty());
    }

    #[test]
    fn test_teams_and_repo_conflict() {
        assert!(Cli::try_parse_from(["gh-cost-center", "assign", "--teams", "--repo"]).is_err());
        assert!(Cli::try_parse_from(["gh-cost-center", "assign", "--mode", "dry"]).is_err());
    }

    #[test]
    fn test_report_teams() {
        let cli = Cli::try_parse_from(["gh-cost-center", "report", "--teams"]).unwrap();
        assert!(matches!(cli.command, Commands::Report { teams: true }));
    }
}
