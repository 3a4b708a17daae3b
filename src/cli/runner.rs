//! CLI runner - executes commands

use crate::cli::assign::{ApplyOptions, Assigner, PlanKind};
use crate::cli::commands::{AssignArgs, Cli, Commands};
use crate::cli::summary;
use crate::config::Settings;
use crate::error::Result;
use crate::github::GitHubClient;
use crate::logging;
use crate::policy::{PruPolicy, TeamsPolicy};
use crate::types::{ExecutionMode, LogLevel};
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Load configuration, set up logging and run the command
    pub async fn run(&self) -> Result<()> {
        let mut settings = Settings::load(&self.cli.config)?;
        let level = if self.cli.verbose {
            LogLevel::Debug
        } else {
            settings.log_level
        };
        logging::init(level, settings.log_file.as_deref())?;
        if !self.cli.config.exists() {
            warn!(
                path = %self.cli.config.display(),
                "Configuration file not found, using defaults"
            );
        }
        settings.check_warnings();

        match &self.cli.command {
            Commands::Assign(args) => {
                if args.create_cost_centers {
                    settings.enable_auto_creation();
                }
                self.assign(&settings, args).await
            }
            Commands::ListUsers => self.list_users(&settings).await,
            Commands::Report { teams } => self.report(&settings, *teams).await,
            Commands::Config => self.show_config(&settings),
        }
    }

    /// Build a client that stops issuing requests after Ctrl-C
    fn client(settings: &Settings) -> Result<GitHubClient> {
        let token = CancellationToken::new();
        let on_signal = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling remaining requests");
                on_signal.cancel();
            }
        });
        Ok(GitHubClient::from_settings(settings)?.with_cancellation(token))
    }

    async fn assign(&self, settings: &Settings, args: &AssignArgs) -> Result<()> {
        let client = Self::client(settings)?;
        let assigner = Assigner::new(&client, settings);

        let kind = PlanKind::select(args, settings.cost_center_mode);
        if kind == PlanKind::Pru {
            println!("{}", summary::config_text(settings));
        }

        let plan = assigner.plan(args).await?;
        println!("{}", summary::plan_text(&plan));

        if args.mode == ExecutionMode::Plan {
            println!("\nPlan mode: no changes were made. Re-run with --mode apply to push them.");
            println!("{}", summary::success_text(settings, &plan, None));
            return Ok(());
        }

        if plan.member_count() == 0 {
            info!("Nothing to assign");
            println!("{}", summary::success_text(settings, &plan, None));
            return Ok(());
        }

        if !args.yes && !confirm(&format!(
            "Assign {} {} to {} cost center(s)?",
            plan.member_count(),
            kind.noun(),
            plan.groups.len()
        ))? {
            println!("Aborted.");
            return Ok(());
        }

        let options = ApplyOptions {
            check_current: args.check_current,
            create_budgets: args.create_budgets,
            remove_stale: settings.teams.remove_users_no_longer_in_teams
                && args.user_filter().is_empty(),
            save_timestamp: args.incremental || settings.enable_incremental,
        };
        let report = assigner.apply(&plan, options).await?;
        println!("{}", summary::success_text(settings, &plan, Some(&report)));

        if report.failed() > 0 {
            warn!(failed = report.failed(), "Some assignments failed");
        }
        Ok(())
    }

    async fn list_users(&self, settings: &Settings) -> Result<()> {
        let client = Self::client(settings)?;
        let policy = PruPolicy::from_settings(settings);
        let users = client.list_copilot_users().await?;
        println!("{}", summary::users_text(&users, &policy));
        Ok(())
    }

    async fn report(&self, settings: &Settings, teams: bool) -> Result<()> {
        let client = Self::client(settings)?;

        let counts: BTreeMap<String, usize> = if teams {
            let memberships = Assigner::new(&client, settings).team_memberships().await?;
            TeamsPolicy::from_settings(&settings.teams)
                .assign(&memberships)
                .groups
                .into_iter()
                .map(|(cost_center, members)| (cost_center, members.len()))
                .collect()
        } else {
            let users = client.list_copilot_users().await?;
            PruPolicy::from_settings(settings).summary(&users)
        };

        for (cost_center, count) in &counts {
            info!(cost_center = %cost_center, users = count, "Cost center");
        }
        println!("{}", summary::report_text(&counts));
        Ok(())
    }

    fn show_config(&self, settings: &Settings) -> Result<()> {
        println!("\n=== Configuration ===");
        for (key, value) in settings.summary() {
            println!("{key}: {value}");
        }
        println!("config_file: {}", self.cli.config.display());
        Ok(())
    }
}

/// Ask a yes/no question on stdin
fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N]: ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
