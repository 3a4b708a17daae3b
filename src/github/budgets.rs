//! Cost center budgets

use super::GitHubClient;
use crate::error::{Error, Result};
use crate::http::ApiRequest;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use tracing::{debug, info};

const BUDGET_SCOPE_COST_CENTER: &str = "cost_center";

const DEFAULT_BUDGET_SKU: &str = "copilot_premium_request";

const PRODUCT_LEVEL: &[&str] = &["actions", "packages", "codespaces", "copilot", "ghas", "ghec"];

const SKU_LEVEL: &[&str] = &[
    "copilot_premium_request",
    "copilot_agent_premium_request",
    "copilot_enterprise",
    "copilot_for_business",
    "copilot_standalone",
    "actions_linux",
    "actions_macos",
    "actions_windows",
    "actions_storage",
    "codespaces_storage",
    "codespaces_prebuild_storage",
    "packages_storage",
    "packages_bandwidth",
    "ghas_licenses",
    "ghas_code_security_licenses",
    "ghas_secret_protection_licenses",
    "ghec_licenses",
    "git_lfs_storage",
    "git_lfs_bandwidth",
    "models_inference",
    "spark_premium_request",
];

/// Pricing level a budget applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetKind {
    ProductPricing,
    SkuPricing,
}

impl BudgetKind {
    /// Wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProductPricing => "ProductPricing",
            Self::SkuPricing => "SkuPricing",
        }
    }
}

impl fmt::Display for BudgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A budget entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Budget {
    pub budget_type: String,
    pub budget_product_sku: String,
    pub budget_scope: String,
    pub budget_amount: u64,
    pub budget_entity_name: String,
}

impl Budget {
    /// Whether this budget targets the cost center, by id or by name
    ///
    /// The entity name is sometimes stored as the name instead of the id.
    pub fn targets(&self, cost_center_id: &str, cost_center_name: &str) -> bool {
        self.budget_scope == BUDGET_SCOPE_COST_CENTER
            && (self.budget_entity_name == cost_center_id
                || self.budget_entity_name == cost_center_name)
    }
}

#[derive(Debug, Default, Deserialize)]
struct BudgetsEnvelope {
    #[serde(default)]
    budgets: Vec<Budget>,
}

/// Map a product name to its budget pricing level and SKU
///
/// Case-insensitive. Unknown names are treated as SKUs.
pub fn budget_type_and_sku(product: &str) -> (BudgetKind, String) {
    let product = product.to_lowercase();
    if SKU_LEVEL.contains(&product.as_str()) {
        (BudgetKind::SkuPricing, product)
    } else if PRODUCT_LEVEL.contains(&product.as_str()) {
        (BudgetKind::ProductPricing, product)
    } else {
        (BudgetKind::SkuPricing, product)
    }
}

impl GitHubClient {
    fn budgets_url(&self) -> String {
        self.enterprise_url("/settings/billing/budgets")
    }

    fn budgets_unavailable(&self, err: Error) -> Error {
        if err.is_not_found() {
            Error::BudgetsUnavailable {
                enterprise: self.enterprise.clone(),
            }
        } else {
            err
        }
    }

    /// All budgets of the enterprise
    ///
    /// A 404 means the budgets API is not enabled and is reported as
    /// [`Error::BudgetsUnavailable`].
    pub async fn list_budgets(&self) -> Result<Vec<Budget>> {
        let envelope: Option<BudgetsEnvelope> = self
            .get(&self.budgets_url())
            .await
            .map_err(|e| self.budgets_unavailable(e))?;
        Ok(envelope.unwrap_or_default().budgets)
    }

    /// Whether any budget targets the cost center
    pub async fn has_budget(&self, cost_center_id: &str, cost_center_name: &str) -> Result<bool> {
        let budgets = self.list_budgets().await?;
        let found = budgets
            .iter()
            .any(|b| b.targets(cost_center_id, cost_center_name));
        if found {
            debug!(cost_center_id, cost_center_name, "Budget already exists for cost center");
        }
        Ok(found)
    }

    /// Whether a budget for `product` targets the cost center
    pub async fn has_product_budget(
        &self,
        cost_center_id: &str,
        cost_center_name: &str,
        product: &str,
    ) -> Result<bool> {
        let (_, sku) = budget_type_and_sku(product);
        let budgets = self.list_budgets().await?;
        let found = budgets.iter().any(|b| {
            b.targets(cost_center_id, cost_center_name) && b.budget_product_sku == sku
        });
        if found {
            info!(product, cost_center = cost_center_name, "Found existing budget");
        }
        Ok(found)
    }

    /// Ensure a Copilot premium request budget exists for the cost center
    ///
    /// Returns `true` when the budget exists afterwards.
    pub async fn create_budget(
        &self,
        cost_center_id: &str,
        cost_center_name: &str,
        amount: u64,
    ) -> Result<bool> {
        if self.has_budget(cost_center_id, cost_center_name).await? {
            info!(cost_center = cost_center_name, cost_center_id, "Budget already exists");
            return Ok(true);
        }
        self.post_budget(
            cost_center_id,
            cost_center_name,
            BudgetKind::SkuPricing,
            DEFAULT_BUDGET_SKU,
            amount,
        )
        .await
    }

    /// Ensure a budget for `product` exists for the cost center
    pub async fn create_product_budget(
        &self,
        cost_center_id: &str,
        cost_center_name: &str,
        product: &str,
        amount: u64,
    ) -> Result<bool> {
        if self
            .has_product_budget(cost_center_id, cost_center_name, product)
            .await?
        {
            info!(product, cost_center = cost_center_name, "Product budget already exists");
            return Ok(true);
        }
        let (kind, sku) = budget_type_and_sku(product);
        self.post_budget(cost_center_id, cost_center_name, kind, &sku, amount)
            .await
    }

    async fn post_budget(
        &self,
        cost_center_id: &str,
        cost_center_name: &str,
        kind: BudgetKind,
        sku: &str,
        amount: u64,
    ) -> Result<bool> {
        let body = json!({
            "budget_type": kind.as_str(),
            "budget_product_sku": sku,
            "budget_scope": BUDGET_SCOPE_COST_CENTER,
            "budget_amount": amount,
            "prevent_further_usage": true,
            "budget_entity_name": cost_center_id,
            "budget_alerting": {
                "will_alert": false,
                "alert_recipients": [],
            },
        });

        let request = ApiRequest::post(&self.budgets_url(), &body)?;
        self.http
            .send(&request)
            .await
            .map_err(|e| self.budgets_unavailable(e))?;

        info!(
            cost_center = cost_center_name,
            product_sku = sku,
            amount,
            "Successfully created budget"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod budgets_tests {
    use super::*;
    use test_case::test_case;

    #[test_case("actions", BudgetKind::ProductPricing, "actions"; "actions")]
    #[test_case("COPILOT", BudgetKind::ProductPricing, "copilot"; "uppercase copilot")]
    #[test_case("Packages", BudgetKind::ProductPricing, "packages"; "mixed case packages")]
    #[test_case("ghec", BudgetKind::ProductPricing, "ghec"; "ghec")]
    #[test_case("copilot_premium_request", BudgetKind::SkuPricing, "copilot_premium_request"; "premium requests")]
    #[test_case("actions_linux", BudgetKind::SkuPricing, "actions_linux"; "actions linux")]
    #[test_case("git_lfs_storage", BudgetKind::SkuPricing, "git_lfs_storage"; "lfs")]
    #[test_case("unknown_product", BudgetKind::SkuPricing, "unknown_product"; "unknown")]
    fn test_budget_type_and_sku(product: &str, kind: BudgetKind, sku: &str) {
        assert_eq!(budget_type_and_sku(product), (kind, sku.to_string()));
    }

    #[test]
    fn test_budget_targets_id_or_name() {
        let budget = Budget {
            budget_scope: "cost_center".into(),
            budget_entity_name: "Platform".into(),
            ..Default::default()
        };
        assert!(budget.targets("cc-1", "Platform"));
        assert!(!budget.targets("cc-1", "Other"));

        let enterprise_budget = Budget {
            budget_scope: "enterprise".into(),
            budget_entity_name: "cc-1".into(),
            ..Default::default()
        };
        assert!(!enterprise_budget.targets("cc-1", "Platform"));
    }
}
