//! The `assign` workflow
//!
//! A run first builds a [`Plan`] (desired members per cost center, resolved
//! to cost center ids) and then, in apply mode, pushes it with
//! [`Assigner::apply`].

use crate::cli::commands::AssignArgs;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::github::{filter_users_by_timestamp, CopilotUser, GitHubClient};
use crate::policy::{
    members_to_remove, pending_assignments, AssignmentGroups, PruPolicy, RepositoryPolicy,
    TeamMembership, TeamRef, TeamsPolicy,
};
use crate::types::{CostCenterMode, ExecutionMode, TeamsScope};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

/// Team member listings fetched at once
const MEMBER_FETCH_CONCURRENCY: usize = 8;

/// Which policy produced a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlanKind {
    /// PRU exception list
    #[default]
    Pru,
    /// Team membership
    Teams,
    /// Repository custom properties
    Repository,
}

impl PlanKind {
    /// Pick the policy from the command line, falling back to the configured mode
    pub fn select(args: &AssignArgs, mode: CostCenterMode) -> Self {
        if args.teams {
            Self::Teams
        } else if args.repo {
            Self::Repository
        } else {
            match mode {
                CostCenterMode::Users => Self::Pru,
                CostCenterMode::Teams => Self::Teams,
                CostCenterMode::Repository => Self::Repository,
            }
        }
    }

    /// Plural noun for the assigned resources
    pub fn noun(self) -> &'static str {
        match self {
            Self::Pru | Self::Teams => "users",
            Self::Repository => "repositories",
        }
    }
}

/// Desired assignment
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub kind: PlanKind,
    /// Members keyed by cost center id
    pub groups: AssignmentGroups,
    /// Cost center name by id
    pub names: BTreeMap<String, String>,
    /// Members of cost centers that have no id yet, keyed by name
    pub unresolved: AssignmentGroups,
    /// Users or repositories taken into account
    pub processed: usize,
    /// Users available before the incremental cut, when one was applied
    pub available: Option<usize>,
}

impl Plan {
    /// Total members across resolved cost centers
    pub fn member_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Display name of a cost center id
    pub fn name_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.names.get(id).map_or(id, String::as_str)
    }
}

/// Switches that shape [`Assigner::apply`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    pub check_current: bool,
    pub create_budgets: bool,
    /// Remove members no longer in their team (teams plans only)
    pub remove_stale: bool,
    /// Persist the run timestamp afterwards (PRU plans only)
    pub save_timestamp: bool,
}

/// Outcome of an apply run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Per member success, keyed by cost center id
    pub results: BTreeMap<String, BTreeMap<String, bool>>,
    /// Members skipped because they already sit in their target
    pub already_assigned: usize,
    pub removed: usize,
    pub budgets: usize,
}

impl ApplyReport {
    pub fn attempted(&self) -> usize {
        self.results.values().map(BTreeMap::len).sum()
    }

    pub fn succeeded(&self) -> usize {
        self.results
            .values()
            .flat_map(BTreeMap::values)
            .filter(|ok| **ok)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }
}

/// Runs the `assign` workflow against one enterprise
pub struct Assigner<'a> {
    client: &'a GitHubClient,
    settings: &'a Settings,
}

impl<'a> Assigner<'a> {
    pub fn new(client: &'a GitHubClient, settings: &'a Settings) -> Self {
        Self { client, settings }
    }

    /// Build the plan selected by `args`
    ///
    /// Missing cost centers are only created in apply mode.
    pub async fn plan(&self, args: &AssignArgs) -> Result<Plan> {
        let create = args.mode == ExecutionMode::Apply;
        match PlanKind::select(args, self.settings.cost_center_mode) {
            PlanKind::Pru => {
                let mut policy = PruPolicy::from_settings(self.settings);
                self.plan_pru(&mut policy, args, create).await
            }
            PlanKind::Teams => self.plan_teams(args, create).await,
            PlanKind::Repository => self.plan_repositories(create).await,
        }
    }

    /// Copilot users, narrowed to `only` when it is not empty
    pub async fn copilot_users(&self, only: &[String]) -> Result<Vec<CopilotUser>> {
        let users = self.client.list_copilot_users().await?;
        if only.is_empty() {
            return Ok(users);
        }

        let wanted: HashSet<String> = only.iter().map(|u| u.to_lowercase()).collect();
        let selected: Vec<CopilotUser> = users
            .into_iter()
            .filter(|u| wanted.contains(&u.login.to_lowercase()))
            .collect();
        if selected.len() < wanted.len() {
            warn!(
                requested = wanted.len(),
                found = selected.len(),
                "Some requested users do not hold a Copilot license"
            );
        }
        Ok(selected)
    }

    /// PRU plan; cost centers are created from their configured names when
    /// auto-creation is on
    pub async fn plan_pru(
        &self,
        policy: &mut PruPolicy,
        args: &AssignArgs,
        create: bool,
    ) -> Result<Plan> {
        let settings = self.settings;
        let no_pru_name = settings.no_prus_cost_center_name.clone();
        let pru_name = settings.prus_allowed_cost_center_name.clone();

        if settings.auto_create {
            if create {
                let ids = self
                    .client
                    .ensure_cost_centers(&[no_pru_name.clone(), pru_name.clone()])
                    .await?;
                policy.set_cost_center_ids(
                    ids.get(&no_pru_name).cloned().unwrap_or_default(),
                    ids.get(&pru_name).cloned().unwrap_or_default(),
                );
            } else {
                info!(
                    no_pru = %no_pru_name,
                    pru_allowed = %pru_name,
                    "Cost centers will be created on apply"
                );
            }
        }

        let issues = policy.validate();
        if !issues.is_empty() {
            return Err(Error::config(issues.join("; ")));
        }

        let mut users = self.copilot_users(&args.user_filter()).await?;
        let mut available = None;
        if args.incremental || settings.enable_incremental {
            if let Some(last_run) = settings.load_last_run()? {
                let total = users.len();
                users = filter_users_by_timestamp(&users, last_run);
                info!(new_users = users.len(), total, since = %last_run, "Incremental run");
                available = Some(total);
            }
        }

        let names = BTreeMap::from([
            (policy.no_pru_cost_center().to_string(), no_pru_name),
            (policy.pru_allowed_cost_center().to_string(), pru_name),
        ]);
        Ok(Plan {
            kind: PlanKind::Pru,
            groups: policy.assignment_groups(&users),
            names,
            unresolved: AssignmentGroups::new(),
            processed: users.len(),
            available,
        })
    }

    /// Teams plan
    pub async fn plan_teams(&self, args: &AssignArgs, create: bool) -> Result<Plan> {
        let teams = &self.settings.teams;
        if !teams.enabled {
            warn!("teams.enabled is false in the configuration, running teams mode anyway");
        }

        let mut memberships = self.team_memberships().await?;
        let only: HashSet<String> = args
            .user_filter()
            .iter()
            .map(|u| u.to_lowercase())
            .collect();
        if !only.is_empty() {
            for membership in &mut memberships {
                membership
                    .members
                    .retain(|login| only.contains(&login.to_lowercase()));
            }
        }

        let assignment = TeamsPolicy::from_settings(teams).assign(&memberships);
        let processed = assignment.user_count();
        let create = create && (teams.auto_create || self.settings.auto_create);
        let mut plan = self.resolve(assignment.groups, create).await?;
        plan.kind = PlanKind::Teams;
        plan.processed = processed;
        Ok(plan)
    }

    /// Repository plan
    pub async fn plan_repositories(&self, create: bool) -> Result<Plan> {
        let config = self.settings.repository.as_ref().ok_or_else(|| {
            Error::config(
                "repository assignment needs github.cost_centers.mode: repository with a repository_config",
            )
        })?;
        if config.organizations.is_empty() {
            return Err(Error::config(
                "github.cost_centers.repository_config.organizations must list at least one organization",
            ));
        }

        let mut repos = Vec::new();
        for org in &config.organizations {
            repos.extend(self.client.list_org_repo_properties(org, None).await?);
        }

        let groups = RepositoryPolicy::from_config(config).assign(&repos);
        let processed = groups.values().map(Vec::len).sum();
        let mut plan = self
            .resolve(groups, create && self.settings.auto_create)
            .await?;
        plan.kind = PlanKind::Repository;
        plan.processed = processed;
        Ok(plan)
    }

    /// Teams in scope with their member logins, in listing order
    pub async fn team_memberships(&self) -> Result<Vec<TeamMembership>> {
        let settings = &self.settings.teams;
        let teams: Vec<TeamRef> = match settings.scope {
            TeamsScope::Enterprise => self
                .client
                .list_enterprise_teams()
                .await?
                .into_iter()
                .map(|t| TeamRef::enterprise_team(t.slug, t.name))
                .collect(),
            TeamsScope::Organization => {
                if settings.organizations.is_empty() {
                    return Err(Error::config(
                        "teams.organizations must list at least one organization for organization scope",
                    ));
                }
                let mut teams = Vec::new();
                for org in &settings.organizations {
                    teams.extend(
                        self.client
                            .list_org_teams(org)
                            .await?
                            .into_iter()
                            .map(|t| TeamRef::org_team(org.clone(), t.slug, t.name)),
                    );
                }
                teams
            }
        };

        let client = self.client;
        stream::iter(teams)
            .map(|team| async move {
                let members = match &team.org {
                    Some(org) => client.list_org_team_members(org, &team.slug).await?,
                    None => client.list_enterprise_team_members(&team.slug).await?,
                };
                Ok::<_, Error>(TeamMembership {
                    members: members.into_iter().map(|m| m.login).collect(),
                    team,
                })
            })
            .buffered(MEMBER_FETCH_CONCURRENCY)
            .try_collect()
            .await
    }

    /// Turn name-keyed groups into an id-keyed plan
    async fn resolve(&self, by_name: AssignmentGroups, create: bool) -> Result<Plan> {
        let wanted: Vec<String> = by_name.keys().cloned().collect();
        let ids = if create {
            self.client.ensure_cost_centers(&wanted).await?
        } else {
            let active = self.client.active_cost_centers().await?;
            wanted
                .iter()
                .filter_map(|name| active.get(name).map(|id| (name.clone(), id.clone())))
                .collect()
        };

        let mut plan = Plan::default();
        for (name, members) in by_name {
            match ids.get(&name) {
                Some(id) => {
                    plan.names.insert(id.clone(), name);
                    plan.groups.entry(id.clone()).or_default().extend(members);
                }
                None => {
                    debug!(cost_center = %name, "Cost center does not exist yet");
                    plan.unresolved.insert(name, members);
                }
            }
        }
        if !plan.unresolved.is_empty() {
            warn!(
                missing = plan.unresolved.len(),
                "Some cost centers do not exist; use --create-cost-centers to create them"
            );
        }
        Ok(plan)
    }

    /// Push a plan
    pub async fn apply(&self, plan: &Plan, options: ApplyOptions) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();

        let groups = if options.check_current && plan.kind != PlanKind::Repository {
            let index = self.client.user_cost_center_index().await?;
            let pending = pending_assignments(&plan.groups, &index);
            report.already_assigned = plan.member_count()
                - pending.values().map(Vec::len).sum::<usize>();
            info!(skipped = report.already_assigned, "Users already in their target cost center");
            pending
        } else {
            plan.groups.clone()
        };

        for (id, members) in &groups {
            if members.is_empty() {
                continue;
            }
            info!(
                cost_center = %plan.name_of(id),
                count = members.len(),
                "Assigning {}",
                plan.kind.noun()
            );
            let results = match plan.kind {
                PlanKind::Repository => {
                    self.client
                        .add_repositories_to_cost_center(id, members)
                        .await?
                }
                PlanKind::Pru | PlanKind::Teams => {
                    self.client.add_users_to_cost_center(id, members).await?
                }
            };
            report.results.insert(id.clone(), results);
        }

        if options.remove_stale && plan.kind == PlanKind::Teams {
            for (id, desired) in &plan.groups {
                let current = self.client.cost_center_members(id).await?;
                let stale = members_to_remove(desired, &current);
                if stale.is_empty() {
                    continue;
                }
                info!(
                    cost_center = %plan.name_of(id),
                    count = stale.len(),
                    "Removing users no longer in teams"
                );
                self.client.remove_users_from_cost_center(id, &stale).await?;
                report.removed += stale.len();
            }
        }

        if options.create_budgets {
            report.budgets = self.ensure_budgets(plan).await?;
        }

        if options.save_timestamp && plan.kind == PlanKind::Pru {
            self.settings.save_last_run(None)?;
        }
        Ok(report)
    }

    /// Create the configured product budgets for every planned cost center
    ///
    /// Returns the number of budgets present afterwards. Stops quietly when
    /// the enterprise has no budgets API.
    async fn ensure_budgets(&self, plan: &Plan) -> Result<usize> {
        if !self.settings.budgets_enabled {
            warn!("--create-budgets given but budgets.enabled is false, skipping budgets");
            return Ok(0);
        }

        let mut ensured = 0;
        'cost_centers: for (id, name) in &plan.names {
            for (product, budget) in &self.settings.budget_products {
                if !budget.enabled {
                    continue;
                }
                match self
                    .client
                    .create_product_budget(id, name, product, budget.amount)
                    .await
                {
                    Ok(true) => ensured += 1,
                    Ok(false) => {}
                    Err(e @ Error::BudgetsUnavailable { .. }) => {
                        warn!(error = %e, "Skipping budget creation");
                        break 'cost_centers;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(ensured)
    }
}
