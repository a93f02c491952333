use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::incentive::{AppliedReduction, QuoteTaxCredit};
use crate::domain::product::{LineItemSnapshot, ModelId, ProductCategory};
use crate::money::{margin_percentage, round_money, Money, Percentage};

/// A priced, merged line item of one category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteCost {
    pub category: ProductCategory,
    pub model_id: ModelId,
    pub quantity: Decimal,
    pub cost: Money,
    pub markup_percentage: Percentage,
    pub markup_amount: Money,
    pub net_cost: Money,
    pub snapshot: LineItemSnapshot,
}

/// `{cost, netCost, marginPercentage, netMargin}` record shared by every subtotal tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtotalRecord {
    pub cost: Money,
    pub net_cost: Money,
    pub margin_percentage: Percentage,
    pub net_margin: Money,
}

impl SubtotalRecord {
    pub fn new(cost: Money, net_cost: Money) -> Self {
        Self {
            cost,
            net_cost,
            margin_percentage: margin_percentage(cost, net_cost),
            net_margin: net_cost - cost,
        }
    }

    /// A deduction from the quote: net amount only, no cost basis and no margin.
    pub fn reduction(net_cost: Money) -> Self {
        Self { cost: Decimal::ZERO, net_cost, margin_percentage: Decimal::ZERO, net_margin: Decimal::ZERO }
    }

    pub fn from_line_items<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a QuoteCost>,
    {
        let (cost, net_cost) = items
            .into_iter()
            .fold((Decimal::ZERO, Decimal::ZERO), |(cost, net), item| {
                (cost + item.cost, net + item.net_cost)
            });
        Self::new(cost, net_cost)
    }

    pub fn plus(&self, other: &SubtotalRecord) -> Self {
        Self::new(self.cost + other.cost, self.net_cost + other.net_cost)
    }

    pub fn minus(&self, other: &SubtotalRecord) -> Self {
        Self::new(self.cost - other.cost, self.net_cost - other.net_cost)
    }

    pub fn rounded(&self, places: u32) -> Self {
        let cost = round_money(self.cost, places);
        let net_cost = round_money(self.net_cost, places);
        Self {
            cost,
            net_cost,
            margin_percentage: round_money(self.margin_percentage, places),
            net_margin: net_cost - cost,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseCostBuildupFee {
    pub unit_percentage: Percentage,
    pub total: Money,
    pub cogs_impact: Money,
    pub margin_impact: Money,
}

impl BaseCostBuildupFee {
    pub fn rounded(&self, places: u32) -> Self {
        Self {
            unit_percentage: self.unit_percentage,
            total: round_money(self.total, places),
            cogs_impact: round_money(self.cogs_impact, places),
            margin_impact: round_money(self.margin_impact, places),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Money,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteCostBuildup {
    pub panel_quote_details: Vec<QuoteCost>,
    pub inverter_quote_details: Vec<QuoteCost>,
    pub storage_quote_details: Vec<QuoteCost>,
    pub adder_quote_details: Vec<QuoteCost>,
    pub balance_of_system_details: Vec<QuoteCost>,
    pub ancillary_equipment_details: Vec<QuoteCost>,
    pub labor_quote_details: Vec<QuoteCost>,
    pub soft_cost_quote_details: Vec<QuoteCost>,
    pub equipment_subtotal: SubtotalRecord,
    pub equipment_and_labor_subtotal: SubtotalRecord,
    pub equipment_labor_and_adders_subtotal: SubtotalRecord,
    pub general_markup: Percentage,
    pub project_gross_total: SubtotalRecord,
    pub applied_reductions: Vec<AppliedReduction>,
    pub total_promotions_discounts_and_swell_gridrewards: SubtotalRecord,
    pub project_subtotal_with_discounts_promotions_and_swell_gridrewards: SubtotalRecord,
    pub sales_origination_manager_fee: BaseCostBuildupFee,
    pub sales_origination_sales_fee: BaseCostBuildupFee,
    pub third_party_financing_dealer_fee: BaseCostBuildupFee,
    pub cash_discount: BaseCostBuildupFee,
    pub project_grand_total: SubtotalRecord,
    pub tax_credits: Vec<QuoteTaxCredit>,
    pub trace: Vec<PricingTraceStep>,
}

impl QuoteCostBuildup {
    pub fn line_items(&self, category: ProductCategory) -> &[QuoteCost] {
        match category {
            ProductCategory::Panel => &self.panel_quote_details,
            ProductCategory::Inverter => &self.inverter_quote_details,
            ProductCategory::Storage => &self.storage_quote_details,
            ProductCategory::Adder => &self.adder_quote_details,
            ProductCategory::BalanceOfSystem => &self.balance_of_system_details,
            ProductCategory::Ancillary => &self.ancillary_equipment_details,
            ProductCategory::Labor => &self.labor_quote_details,
            ProductCategory::SoftCost => &self.soft_cost_quote_details,
        }
    }
}
