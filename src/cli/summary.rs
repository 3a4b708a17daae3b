//! Console text for plans, summaries and listings

use crate::cli::assign::{ApplyReport, Plan, PlanKind};
use crate::config::Settings;
use crate::github::CopilotUser;
use crate::policy::PruPolicy;
use std::collections::BTreeMap;

const PLACEHOLDER_PREFIX: &str = "REPLACE_WITH_";

fn rule() -> String {
    "=".repeat(60)
}

fn is_placeholder(value: &str) -> bool {
    value.is_empty() || value.starts_with(PLACEHOLDER_PREFIX)
}

/// Billing page of a cost center, unless either part is a placeholder
pub fn cost_center_url(enterprise: &str, id: &str) -> Option<String> {
    if is_placeholder(enterprise) || is_placeholder(id) {
        return None;
    }
    Some(format!(
        "https://github.com/enterprises/{enterprise}/billing/cost_centers/{id}"
    ))
}

/// Resolved PRU configuration, shown before planning
pub fn config_text(settings: &Settings) -> String {
    let mut lines = vec![
        String::new(),
        "===== Current Configuration =====".to_string(),
        format!("Enterprise: {}", settings.enterprise),
    ];
    if settings.auto_create {
        lines.push(format!(
            "No PRUs Cost Center: New cost center \"{}\" to be created",
            settings.no_prus_cost_center_name
        ));
        lines.push(format!(
            "PRUs Allowed Cost Center: New cost center \"{}\" to be created",
            settings.prus_allowed_cost_center_name
        ));
    } else {
        for (label, id) in [
            ("No PRUs Cost Center", &settings.no_prus_cost_center_id),
            ("PRUs Allowed Cost Center", &settings.prus_allowed_cost_center_id),
        ] {
            lines.push(format!("{label}: {id}"));
            if let Some(url) = cost_center_url(&settings.enterprise, id) {
                lines.push(format!("  -> {url}"));
            }
        }
    }
    lines.push(format!(
        "PRUs Exception Users ({}):",
        settings.prus_exception_users.len()
    ));
    lines.extend(
        settings
            .prus_exception_users
            .iter()
            .map(|u| format!("  - {u}")),
    );
    lines.push("===== End of Configuration =====".to_string());
    lines.join("\n")
}

/// Desired assignment, one block per cost center
pub fn plan_text(plan: &Plan) -> String {
    let noun = plan.kind.noun();
    let mut lines = vec![format!("\n=== Assignment Plan ({noun}) ===")];

    for (id, members) in &plan.groups {
        lines.push(format!("{} ({id}): {} {noun}", plan.name_of(id), members.len()));
        lines.extend(members.iter().map(|m| format!("  - {m}")));
    }
    if !plan.unresolved.is_empty() {
        lines.push("Cost centers that do not exist yet:".to_string());
        for (name, members) in &plan.unresolved {
            lines.push(format!("{name}: {} {noun}", members.len()));
        }
    }
    lines.push(format!("Total {noun}: {}", plan.processed));
    lines.join("\n")
}

/// Closing summary of an `assign` run
///
/// Success counts are shown only when `report` is given.
pub fn success_text(settings: &Settings, plan: &Plan, report: Option<&ApplyReport>) -> String {
    let noun = plan.kind.noun();
    let mut lines = vec![String::new(), rule(), "SUCCESS SUMMARY".to_string(), rule()];

    if !is_placeholder(&settings.enterprise) {
        let links: Vec<String> = plan
            .names
            .iter()
            .filter_map(|(id, name)| {
                cost_center_url(&settings.enterprise, id).map(|url| {
                    let label = cost_center_label(plan.kind, settings, id, name);
                    format!("  {label}: {id}\n     -> {url}")
                })
            })
            .collect();
        if !links.is_empty() {
            lines.push(format!("\nCOST CENTERS ({}):", settings.enterprise));
            lines.extend(links);
        }
    }

    if plan.processed > 0 {
        lines.push(format!("\n{} STATISTICS:", noun.to_uppercase()));
        lines.push(format!("  Total {noun} processed: {}", plan.processed));
        if let Some(available) = plan.available {
            lines.push(format!(
                "  Incremental processing: {} of {available} total {noun}",
                plan.processed
            ));
        }
        if let Some(report) = report {
            lines.push(format!(
                "  Assignment success rate: {}/{} {noun}",
                report.succeeded(),
                report.attempted()
            ));
            if report.failed() > 0 {
                lines.push(format!("  Failed assignments: {} {noun}", report.failed()));
            }
            if report.already_assigned > 0 {
                lines.push(format!(
                    "  Already assigned: {} {noun}",
                    report.already_assigned
                ));
            }
            if report.removed > 0 {
                lines.push(format!("  Removed from cost centers: {} {noun}", report.removed));
            }
            if report.budgets > 0 {
                lines.push(format!("  Budgets in place: {}", report.budgets));
            }
        }
    }

    lines.push(rule());
    lines.join("\n")
}

fn cost_center_label<'a>(kind: PlanKind, settings: &Settings, id: &str, name: &'a str) -> &'a str {
    if kind != PlanKind::Pru {
        return name;
    }
    if id == settings.prus_allowed_cost_center_id
        || name == settings.prus_allowed_cost_center_name
    {
        "PRU Overages Allowed"
    } else {
        "No PRU Overages"
    }
}

/// `list-users` output
pub fn users_text(users: &[CopilotUser], policy: &PruPolicy) -> String {
    let mut lines = vec![
        "\n=== Copilot License Holders ===".to_string(),
        format!("Total users: {}", users.len()),
    ];
    lines.extend(users.iter().map(|u| {
        let marker = if policy.is_exception(&u.login) {
            " [PRUs Exception]"
        } else {
            ""
        };
        format!("- {}{marker}", u.login)
    }));
    lines.join("\n")
}

/// `report` output
pub fn report_text(counts: &BTreeMap<String, usize>) -> String {
    let mut lines = vec!["\n=== Cost Center Summary ===".to_string()];
    lines.extend(
        counts
            .iter()
            .map(|(cost_center, count)| format!("{cost_center}: {count} users")),
    );
    lines.join("\n")
}
