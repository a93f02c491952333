//! Quote cost buildup.
//!
//! Each stage takes the previous stage's record by value or reference and returns a new one;
//! nothing accumulates in shared state. Order is fixed: line items, subtotal tiers, gross
//! total, reductions, fees, grand total. Amounts stay unrounded until [`round_buildup`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::cpq::incentives::{
    apply_reductions, evaluate_tax_credits, resolve_selection, IncentiveCatalog, IncentiveSelection,
    ReductionOutcome,
};
use crate::cpq::line_items::{price_category, round_quote_cost};
use crate::domain::finance::{FinancialProductType, QuoteFinancing};
use crate::domain::incentive::{AppliedReduction, QuoteTaxCredit, TaxCreditConfig};
use crate::domain::partner::PartnerMarkupConfig;
use crate::domain::product::{ProductCategory, SystemDesignProducts};
use crate::domain::quote::{
    BaseCostBuildupFee, PricingTraceStep, QuoteCost, QuoteCostBuildup, SubtotalRecord,
};
use crate::errors::{ApplicationError, DomainError};
use crate::money::{percentage_of, round_money, Money, Percentage};

/// Everything the buildup needs besides the partner config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteBuildupRequest {
    pub partner_id: String,
    pub design: SystemDesignProducts,
    pub financing: QuoteFinancing,
    #[serde(default)]
    pub incentives: IncentiveCatalog,
    #[serde(default)]
    pub selection: IncentiveSelection,
    pub as_of: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PricedLineItems {
    by_category: BTreeMap<ProductCategory, Vec<QuoteCost>>,
}

impl PricedLineItems {
    pub fn get(&self, category: ProductCategory) -> &[QuoteCost] {
        self.by_category.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn subtotal<F>(&self, include: F) -> SubtotalRecord
    where
        F: Fn(ProductCategory) -> bool,
    {
        SubtotalRecord::from_line_items(
            self.by_category
                .iter()
                .filter(|(category, _)| include(**category))
                .flat_map(|(_, items)| items.iter()),
        )
    }

    fn take(&mut self, category: ProductCategory) -> Vec<QuoteCost> {
        self.by_category.remove(&category).unwrap_or_default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubtotalTiers {
    pub equipment: SubtotalRecord,
    pub equipment_and_labor: SubtotalRecord,
    pub equipment_labor_and_adders: SubtotalRecord,
    pub soft_costs: SubtotalRecord,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeStage {
    pub manager_fee: BaseCostBuildupFee,
    pub sales_fee: BaseCostBuildupFee,
    pub dealer_fee: BaseCostBuildupFee,
    pub cash_discount: BaseCostBuildupFee,
    pub grand_total: SubtotalRecord,
}

#[derive(Debug, Default)]
struct TraceRecorder {
    steps: Vec<PricingTraceStep>,
}

impl TraceRecorder {
    fn record(&mut self, stage: &str, detail: impl Into<String>, amount: Money) {
        self.steps.push(PricingTraceStep { stage: stage.to_owned(), detail: detail.into(), amount });
    }

    fn finish(self) -> Vec<PricingTraceStep> {
        self.steps
    }
}

pub fn price_line_items(
    design: &SystemDesignProducts,
    partner: &PartnerMarkupConfig,
) -> Result<PricedLineItems, DomainError> {
    let mut by_category = BTreeMap::new();
    for category in ProductCategory::ALL {
        by_category.insert(category, price_category(category, design, partner)?);
    }
    Ok(PricedLineItems { by_category })
}

pub fn subtotal_tiers(line_items: &PricedLineItems) -> SubtotalTiers {
    let equipment = line_items.subtotal(ProductCategory::is_equipment);
    let equipment_and_labor =
        equipment.plus(&line_items.subtotal(|category| category == ProductCategory::Labor));
    let equipment_labor_and_adders =
        equipment_and_labor.plus(&line_items.subtotal(|category| category == ProductCategory::Adder));
    let soft_costs = line_items.subtotal(|category| category == ProductCategory::SoftCost);

    SubtotalTiers { equipment, equipment_and_labor, equipment_labor_and_adders, soft_costs }
}

/// `net = (1 + standard/100) * (equipmentLaborAndAdders.net + softCosts.net)`; cost is the
/// unmarked-up sum of both.
pub fn gross_total(tiers: &SubtotalTiers, standard_markup: Percentage) -> SubtotalRecord {
    let product_cost = tiers.equipment_labor_and_adders.plus(&tiers.soft_costs);
    SubtotalRecord::new(
        product_cost.cost,
        product_cost.net_cost + percentage_of(product_cost.net_cost, standard_markup),
    )
}

fn added_fee(running: SubtotalRecord, unit_percentage: Percentage) -> (BaseCostBuildupFee, SubtotalRecord) {
    let total = percentage_of(running.net_cost, unit_percentage);
    let fee = BaseCostBuildupFee { unit_percentage, total, cogs_impact: total, margin_impact: Decimal::ZERO };
    (fee, running.plus(&SubtotalRecord::new(total, total)))
}

fn subtracted_discount(
    running: SubtotalRecord,
    unit_percentage: Percentage,
) -> (BaseCostBuildupFee, SubtotalRecord) {
    let total = percentage_of(running.net_cost, unit_percentage);
    let fee = BaseCostBuildupFee { unit_percentage, total, cogs_impact: Decimal::ZERO, margin_impact: -total };
    (fee, running.minus(&SubtotalRecord::new(Decimal::ZERO, total)))
}

/// Fees in order, each a percentage of the running subtotal left by the previous one.
pub fn apply_fees(
    discounted: SubtotalRecord,
    partner: &PartnerMarkupConfig,
    financing: &QuoteFinancing,
) -> FeeStage {
    let (manager_fee, running) = added_fee(discounted, partner.sales_origination_manager_fee);
    let (sales_fee, running) = added_fee(running, partner.sales_origination_sales_fee);

    let (dealer_fee, running) = if financing.product_type.is_third_party_financed() {
        added_fee(running, financing.dealer_fee_percentage)
    } else {
        (BaseCostBuildupFee::default(), running)
    };

    let (cash_discount, grand_total) = if financing.product_type == FinancialProductType::Cash {
        subtracted_discount(running, partner.cash_discount)
    } else {
        (BaseCostBuildupFee::default(), running)
    };

    FeeStage { manager_fee, sales_fee, dealer_fee, cash_discount, grand_total }
}

fn validate_percentages(
    partner: &PartnerMarkupConfig,
    financing: &QuoteFinancing,
    tax_credits: &[TaxCreditConfig],
) -> Result<(), DomainError> {
    let fields = [
        ("adderMarkup", partner.adder_markup),
        ("softCostMarkup", partner.soft_cost_markup),
        ("swellStandardMarkup", partner.swell_standard_markup),
        ("salesOriginationManagerFee", partner.sales_origination_manager_fee),
        ("salesOriginationSalesFee", partner.sales_origination_sales_fee),
        ("cashDiscount", partner.cash_discount),
        ("dealerFeePercentage", financing.dealer_fee_percentage),
    ];

    for (field, value) in fields {
        if value < Decimal::ZERO {
            return Err(DomainError::invalid_input(field, "percentage cannot be negative"));
        }
    }
    if partner.labor_fee_schedules.iter().any(|schedule| schedule.markup_percentage < Decimal::ZERO) {
        return Err(DomainError::invalid_input("laborFeeSchedules", "percentage cannot be negative"));
    }
    if let Some(credit) = tax_credits.iter().find(|credit| credit.percentage < Decimal::ZERO) {
        return Err(DomainError::invalid_input(
            "taxCredits.percentage",
            format!("`{}` has a negative percentage", credit.id),
        ));
    }
    Ok(())
}

/// Prices a system design into a full [`QuoteCostBuildup`].
///
/// A missing partner config is fatal. Selected reductions are resolved before any pricing
/// so an inactive id never yields a partial buildup.
pub fn build_quote_cost(
    request: &QuoteBuildupRequest,
    partner: Option<&PartnerMarkupConfig>,
    config: &EngineConfig,
) -> Result<QuoteCostBuildup, ApplicationError> {
    let partner = partner.ok_or_else(|| ApplicationError::partner_config_not_found(&request.partner_id))?;
    validate_percentages(partner, &request.financing, &request.incentives.tax_credits)?;
    let selected = resolve_selection(&request.incentives, &request.selection, request.as_of)?;

    let mut trace = TraceRecorder::default();

    let line_items = price_line_items(&request.design, partner)?;
    let tiers = subtotal_tiers(&line_items);
    trace.record("equipment_subtotal", "panels + inverters + storage + bos + ancillary", tiers.equipment.net_cost);
    trace.record("equipment_and_labor_subtotal", "equipment + labor", tiers.equipment_and_labor.net_cost);
    trace.record(
        "equipment_labor_and_adders_subtotal",
        "equipment + labor + adders",
        tiers.equipment_labor_and_adders.net_cost,
    );
    trace.record("soft_costs", "soft cost line items", tiers.soft_costs.net_cost);

    let gross = gross_total(&tiers, partner.swell_standard_markup);
    trace.record(
        "project_gross_total",
        format!("(1 + {}%) * (equipment, labor, adders + soft costs)", partner.swell_standard_markup),
        gross.net_cost,
    );

    let ReductionOutcome { applied, total: reductions } = apply_reductions(&selected, gross.net_cost);
    for reduction in &applied {
        trace.record(
            "reduction",
            format!("{} {}", reduction.kind, reduction.id),
            -reduction.total,
        );
    }
    let discounted = gross.minus(&reductions);
    trace.record(
        "project_subtotal_with_discounts_promotions_and_swell_gridrewards",
        "gross - reductions",
        discounted.net_cost,
    );

    let fees = apply_fees(discounted, partner, &request.financing);
    trace.record("sales_origination_manager_fee", "% of running subtotal", fees.manager_fee.total);
    trace.record("sales_origination_sales_fee", "% of running subtotal", fees.sales_fee.total);
    trace.record(
        "third_party_financing_dealer_fee",
        format!("{} financing", request.financing.product_type),
        fees.dealer_fee.total,
    );
    trace.record("cash_discount", "cash products only", -fees.cash_discount.total);
    trace.record("project_grand_total", "contract price", fees.grand_total.net_cost);

    let buildup = round_buildup(
        QuoteCostBuildup {
            panel_quote_details: Vec::new(),
            inverter_quote_details: Vec::new(),
            storage_quote_details: Vec::new(),
            adder_quote_details: Vec::new(),
            balance_of_system_details: Vec::new(),
            ancillary_equipment_details: Vec::new(),
            labor_quote_details: Vec::new(),
            soft_cost_quote_details: Vec::new(),
            equipment_subtotal: tiers.equipment,
            equipment_and_labor_subtotal: tiers.equipment_and_labor,
            equipment_labor_and_adders_subtotal: tiers.equipment_labor_and_adders,
            general_markup: partner.swell_standard_markup,
            project_gross_total: gross,
            applied_reductions: applied,
            total_promotions_discounts_and_swell_gridrewards: reductions,
            project_subtotal_with_discounts_promotions_and_swell_gridrewards: discounted,
            sales_origination_manager_fee: fees.manager_fee,
            sales_origination_sales_fee: fees.sales_fee,
            third_party_financing_dealer_fee: fees.dealer_fee,
            cash_discount: fees.cash_discount,
            project_grand_total: fees.grand_total,
            tax_credits: Vec::new(),
            trace: trace.finish(),
        },
        line_items,
        config.money_decimal_places,
    );

    let tax_credits = evaluate_tax_credits(
        &request.incentives.tax_credits,
        buildup.project_grand_total.net_cost,
        request.as_of,
    )
    .into_iter()
    .map(|credit| QuoteTaxCredit {
        value: round_money(credit.value, config.money_decimal_places),
        ..credit
    })
    .collect();

    tracing::info!(
        event_name = "quote.buildup.completed",
        partner_id = %partner.partner_id,
        product_type = %request.financing.product_type,
        grand_total = %buildup.project_grand_total.net_cost,
        reductions = buildup.applied_reductions.len(),
        "quote cost buildup completed"
    );

    Ok(QuoteCostBuildup { tax_credits, ..buildup })
}

/// Rounds every money field and moves the priced line items into their category vectors.
fn round_buildup(buildup: QuoteCostBuildup, mut line_items: PricedLineItems, places: u32) -> QuoteCostBuildup {
    let mut round_items = |category: ProductCategory| -> Vec<QuoteCost> {
        line_items.take(category).into_iter().map(|item| round_quote_cost(item, places)).collect()
    };

    QuoteCostBuildup {
        panel_quote_details: round_items(ProductCategory::Panel),
        inverter_quote_details: round_items(ProductCategory::Inverter),
        storage_quote_details: round_items(ProductCategory::Storage),
        adder_quote_details: round_items(ProductCategory::Adder),
        balance_of_system_details: round_items(ProductCategory::BalanceOfSystem),
        ancillary_equipment_details: round_items(ProductCategory::Ancillary),
        labor_quote_details: round_items(ProductCategory::Labor),
        soft_cost_quote_details: round_items(ProductCategory::SoftCost),
        equipment_subtotal: buildup.equipment_subtotal.rounded(places),
        equipment_and_labor_subtotal: buildup.equipment_and_labor_subtotal.rounded(places),
        equipment_labor_and_adders_subtotal: buildup.equipment_labor_and_adders_subtotal.rounded(places),
        project_gross_total: buildup.project_gross_total.rounded(places),
        applied_reductions: buildup
            .applied_reductions
            .into_iter()
            .map(|reduction| AppliedReduction { total: round_money(reduction.total, places), ..reduction })
            .collect(),
        total_promotions_discounts_and_swell_gridrewards: SubtotalRecord::reduction(round_money(
            buildup.total_promotions_discounts_and_swell_gridrewards.net_cost,
            places,
        )),
        project_subtotal_with_discounts_promotions_and_swell_gridrewards: buildup
            .project_subtotal_with_discounts_promotions_and_swell_gridrewards
            .rounded(places),
        sales_origination_manager_fee: buildup.sales_origination_manager_fee.rounded(places),
        sales_origination_sales_fee: buildup.sales_origination_sales_fee.rounded(places),
        third_party_financing_dealer_fee: buildup.third_party_financing_dealer_fee.rounded(places),
        cash_discount: buildup.cash_discount.rounded(places),
        project_grand_total: buildup.project_grand_total.rounded(places),
        trace: buildup
            .trace
            .into_iter()
            .map(|step| PricingTraceStep { amount: round_money(step.amount, places), ..step })
            .collect(),
        ..buildup
    }
}
