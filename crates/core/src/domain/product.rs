use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Catalog model identifier a design line item points at.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelId(pub String);

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductCategory {
    Panel,
    Inverter,
    Storage,
    Adder,
    #[serde(rename = "bos")]
    BalanceOfSystem,
    Ancillary,
    Labor,
    SoftCost,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 8] = [
        Self::Panel,
        Self::Inverter,
        Self::Storage,
        Self::Adder,
        Self::BalanceOfSystem,
        Self::Ancillary,
        Self::Labor,
        Self::SoftCost,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Panel => "panel",
            Self::Inverter => "inverter",
            Self::Storage => "storage",
            Self::Adder => "adder",
            Self::BalanceOfSystem => "bos",
            Self::Ancillary => "ancillary",
            Self::Labor => "labor",
            Self::SoftCost => "soft_cost",
        }
    }

    /// Categories summed into the equipment subtotal.
    pub fn is_equipment(self) -> bool {
        matches!(
            self,
            Self::Panel | Self::Inverter | Self::Storage | Self::BalanceOfSystem | Self::Ancillary
        )
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a snapshot's unit cost scales with the line item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PricingUnit {
    /// Unit cost per item.
    #[default]
    Each,
    /// Unit cost per watt of the snapshot's own rating.
    PerWatt,
    /// Unit cost per watt of the whole system design.
    PerSystemWatt,
}

/// Pricing-relevant catalog attributes copied into the quote at creation time.
///
/// Snapshots are values: later catalog edits never reach a saved quote.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemSnapshot {
    pub name: String,
    pub manufacturer: Option<String>,
    pub unit_cost: Option<Money>,
    #[serde(default)]
    pub pricing_unit: PricingUnit,
    /// Watts for panels and inverters, kWh for storage.
    pub rating: Option<Decimal>,
    pub snapshot_date: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignLineItem {
    pub model_id: ModelId,
    pub quantity: Decimal,
    pub snapshot: LineItemSnapshot,
}

/// Bill of materials of one system design, grouped by category.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemDesignProducts {
    pub system_capacity_kw: Decimal,
    pub panels: Vec<DesignLineItem>,
    pub inverters: Vec<DesignLineItem>,
    pub storage: Vec<DesignLineItem>,
    pub adders: Vec<DesignLineItem>,
    pub balance_of_systems: Vec<DesignLineItem>,
    pub ancillary_equipments: Vec<DesignLineItem>,
    pub labor: Vec<DesignLineItem>,
    pub soft_costs: Vec<DesignLineItem>,
}

impl SystemDesignProducts {
    pub fn items(&self, category: ProductCategory) -> &[DesignLineItem] {
        match category {
            ProductCategory::Panel => &self.panels,
            ProductCategory::Inverter => &self.inverters,
            ProductCategory::Storage => &self.storage,
            ProductCategory::Adder => &self.adders,
            ProductCategory::BalanceOfSystem => &self.balance_of_systems,
            ProductCategory::Ancillary => &self.ancillary_equipments,
            ProductCategory::Labor => &self.labor,
            ProductCategory::SoftCost => &self.soft_costs,
        }
    }

    pub fn system_capacity_watts(&self) -> Decimal {
        self.system_capacity_kw * Decimal::ONE_THOUSAND
    }
}
