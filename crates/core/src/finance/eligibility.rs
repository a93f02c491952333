use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::finance::{FinancialProduct, SystemDesignSummary};

pub const NOT_ELIGIBLE_SUFFIX: &str = " (not eligible)";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EligibilityDimension {
    SystemKw,
    BatteryKwh,
    Productivity,
}

impl EligibilityDimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SystemKw => "systemKw",
            Self::BatteryKwh => "batteryKwh",
            Self::Productivity => "productivity",
        }
    }
}

impl fmt::Display for EligibilityDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IneligibilityReason {
    pub dimension: EligibilityDimension,
    pub actual: Decimal,
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedProduct {
    pub product: FinancialProduct,
    pub eligible: bool,
    pub reasons: Vec<IneligibilityReason>,
}

fn check_range(
    dimension: EligibilityDimension,
    actual: Decimal,
    min: Option<Decimal>,
    max: Option<Decimal>,
) -> Option<IneligibilityReason> {
    let below = min.is_some_and(|min| actual < min);
    let above = max.is_some_and(|max| actual > max);
    (below || above).then_some(IneligibilityReason { dimension, actual, min, max })
}

pub fn ineligibility_reasons(
    product: &FinancialProduct,
    design: &SystemDesignSummary,
) -> Vec<IneligibilityReason> {
    if !product.product_type.is_lease_family() {
        return Vec::new();
    }

    [
        check_range(
            EligibilityDimension::SystemKw,
            design.system_capacity_kw,
            product.min_system_kw,
            product.max_system_kw,
        ),
        check_range(
            EligibilityDimension::BatteryKwh,
            design.battery_capacity_kwh,
            product.min_battery_kwh,
            product.max_battery_kwh,
        ),
        check_range(
            EligibilityDimension::Productivity,
            design.productivity,
            product.min_productivity,
            product.max_productivity,
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Annotates every product; ineligible ones stay in the list with a suffixed name.
pub fn filter_eligible_financial_products(
    products: &[FinancialProduct],
    design: &SystemDesignSummary,
) -> Vec<AnnotatedProduct> {
    products
        .iter()
        .map(|product| {
            let reasons = ineligibility_reasons(product, design);
            let eligible = reasons.is_empty();
            let mut product = product.clone();

            if !eligible {
                tracing::info!(
                    event_name = "finance.eligibility.product_ineligible",
                    product_id = %product.id,
                    reasons = reasons.len(),
                    "financial product outside design ranges"
                );
                if !product.name.ends_with(NOT_ELIGIBLE_SUFFIX) {
                    product.name.push_str(NOT_ELIGIBLE_SUFFIX);
                }
            }

            AnnotatedProduct { product, eligible, reasons }
        })
        .collect()
}
