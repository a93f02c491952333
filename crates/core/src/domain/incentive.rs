use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::{percentage_of, Money, Percentage};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReductionUnit {
    #[serde(rename = "$")]
    Dollar,
    #[serde(rename = "%")]
    Percentage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReductionKind {
    Discount,
    Promotion,
    /// Rebates and grid-reward incentives.
    Incentive,
}

impl ReductionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discount => "discount",
            Self::Promotion => "promotion",
            Self::Incentive => "incentive",
        }
    }
}

impl fmt::Display for ReductionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discount, promotion or rebate as configured by a partner admin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReductionConfig {
    pub id: String,
    pub name: String,
    /// Dollars for `$` units, percent for `%` units.
    pub amount: Decimal,
    pub unit: ReductionUnit,
    pub applies_to: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl ReductionConfig {
    /// Dollar value against the pre-reduction base.
    pub fn reduction_against(&self, base: Money) -> Money {
        match self.unit {
            ReductionUnit::Dollar => self.amount,
            ReductionUnit::Percentage => percentage_of(base, self.amount),
        }
    }
}

/// Tax credit configuration. Dates arrive as free-form strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxCreditConfig {
    pub id: String,
    pub name: String,
    pub percentage: Percentage,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedReduction {
    pub kind: ReductionKind,
    pub id: String,
    pub name: String,
    pub unit: ReductionUnit,
    pub amount: Decimal,
    pub total: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteTaxCredit {
    pub id: String,
    pub name: String,
    pub percentage: Percentage,
    pub value: Money,
}
