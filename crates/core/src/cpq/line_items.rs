use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::domain::partner::PartnerMarkupConfig;
use crate::domain::product::{DesignLineItem, ModelId, PricingUnit, ProductCategory, SystemDesignProducts};
use crate::domain::quote::QuoteCost;
use crate::errors::DomainError;
use crate::money::{calculate_cost, CostBreakdown, Percentage};

/// Where a category takes its line-level markup from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkupSource {
    /// Margin is applied later by the general markup.
    Deferred,
    AdderMarkup,
    SoftCostMarkup,
    LaborFeeSchedule,
}

pub fn markup_source(category: ProductCategory) -> MarkupSource {
    match category {
        ProductCategory::Panel
        | ProductCategory::Inverter
        | ProductCategory::Storage
        | ProductCategory::BalanceOfSystem
        | ProductCategory::Ancillary => MarkupSource::Deferred,
        ProductCategory::Adder => MarkupSource::AdderMarkup,
        ProductCategory::SoftCost => MarkupSource::SoftCostMarkup,
        ProductCategory::Labor => MarkupSource::LaborFeeSchedule,
    }
}

pub fn category_markup(
    category: ProductCategory,
    partner: &PartnerMarkupConfig,
    system_kw: Decimal,
) -> Percentage {
    match markup_source(category) {
        MarkupSource::Deferred => Decimal::ZERO,
        MarkupSource::AdderMarkup => partner.adder_markup,
        MarkupSource::SoftCostMarkup => partner.soft_cost_markup,
        MarkupSource::LaborFeeSchedule => partner.labor_markup(system_kw),
    }
}

/// Combines items sharing a model id by summing quantities.
///
/// The first occurrence keeps its position and snapshot. Zero-quantity items are kept.
pub fn merge_line_items(
    category: ProductCategory,
    items: &[DesignLineItem],
) -> Result<Vec<DesignLineItem>, DomainError> {
    let mut merged: Vec<DesignLineItem> = Vec::with_capacity(items.len());
    let mut positions: HashMap<&ModelId, usize> = HashMap::new();

    for item in items {
        if item.quantity < Decimal::ZERO {
            return Err(DomainError::invalid_input(
                format!("{category}.{}.quantity", item.model_id),
                "quantity cannot be negative",
            ));
        }

        match positions.get(&item.model_id) {
            Some(&index) => merged[index].quantity += item.quantity,
            None => {
                positions.insert(&item.model_id, merged.len());
                merged.push(item.clone());
            }
        }
    }

    Ok(merged)
}

/// Quantity the snapshot's unit cost is multiplied by.
pub fn pricing_quantity(
    category: ProductCategory,
    item: &DesignLineItem,
    system_watts: Decimal,
) -> Result<Decimal, DomainError> {
    match item.snapshot.pricing_unit {
        PricingUnit::Each => Ok(item.quantity),
        PricingUnit::PerWatt => {
            let rating = item.snapshot.rating.ok_or_else(|| DomainError::MissingRating {
                category,
                model_id: item.model_id.clone(),
            })?;
            Ok(item.quantity * rating)
        }
        PricingUnit::PerSystemWatt => Ok(item.quantity * system_watts),
    }
}

pub fn price_line_item(
    category: ProductCategory,
    item: &DesignLineItem,
    markup_percentage: Percentage,
    system_watts: Decimal,
) -> Result<QuoteCost, DomainError> {
    let unit_cost = item.snapshot.unit_cost.ok_or_else(|| DomainError::MissingUnitCost {
        category,
        model_id: item.model_id.clone(),
    })?;
    let quantity = pricing_quantity(category, item, system_watts)?;
    let breakdown = calculate_cost(unit_cost, quantity, markup_percentage);

    Ok(QuoteCost {
        category,
        model_id: item.model_id.clone(),
        quantity: item.quantity,
        cost: breakdown.total,
        markup_percentage,
        markup_amount: breakdown.markup_amount,
        net_cost: breakdown.total_with_markup,
        snapshot: item.snapshot.clone(),
    })
}

/// Merged and priced items of one category, unrounded.
pub fn price_category(
    category: ProductCategory,
    design: &SystemDesignProducts,
    partner: &PartnerMarkupConfig,
) -> Result<Vec<QuoteCost>, DomainError> {
    let markup = category_markup(category, partner, design.system_capacity_kw);
    let system_watts = design.system_capacity_watts();

    merge_line_items(category, design.items(category))?
        .iter()
        .map(|item| price_line_item(category, item, markup, system_watts))
        .collect()
}

/// Rounds a priced item for output, keeping `netCost = cost + markupAmount` exact.
pub fn round_quote_cost(item: QuoteCost, places: u32) -> QuoteCost {
    let breakdown = CostBreakdown {
        total: item.cost,
        markup_amount: item.markup_amount,
        total_with_markup: item.net_cost,
    }
    .rounded(places);

    QuoteCost {
        cost: breakdown.total,
        markup_amount: breakdown.markup_amount,
        net_cost: breakdown.total_with_markup,
        ..item
    }
}
