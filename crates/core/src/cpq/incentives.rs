use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cpq::activity::{is_active, is_tax_credit_active};
use crate::domain::incentive::{
    AppliedReduction, QuoteTaxCredit, ReductionConfig, ReductionKind, TaxCreditConfig,
};
use crate::domain::quote::SubtotalRecord;
use crate::errors::{ApplicationError, DomainError};
use crate::money::{percentage_of, sum_money, Money};

/// Partner records available to the quote, as loaded by the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IncentiveCatalog {
    pub discounts: Vec<ReductionConfig>,
    pub promotions: Vec<ReductionConfig>,
    pub incentives: Vec<ReductionConfig>,
    pub tax_credits: Vec<TaxCreditConfig>,
}

impl IncentiveCatalog {
    fn records(&self, kind: ReductionKind) -> &[ReductionConfig] {
        match kind {
            ReductionKind::Discount => &self.discounts,
            ReductionKind::Promotion => &self.promotions,
            ReductionKind::Incentive => &self.incentives,
        }
    }
}

/// Ids the quote references.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IncentiveSelection {
    pub discount_ids: Vec<String>,
    pub promotion_ids: Vec<String>,
    pub incentive_ids: Vec<String>,
}

impl IncentiveSelection {
    fn ids(&self, kind: ReductionKind) -> &[String] {
        match kind {
            ReductionKind::Discount => &self.discount_ids,
            ReductionKind::Promotion => &self.promotion_ids,
            ReductionKind::Incentive => &self.incentive_ids,
        }
    }
}

const REDUCTION_ORDER: [ReductionKind; 3] =
    [ReductionKind::Discount, ReductionKind::Promotion, ReductionKind::Incentive];

/// Resolves every referenced id to an active record.
///
/// An id that is unknown or outside its window fails the whole buildup.
pub fn resolve_selection<'a>(
    catalog: &'a IncentiveCatalog,
    selection: &IncentiveSelection,
    as_of: DateTime<Utc>,
) -> Result<Vec<(ReductionKind, &'a ReductionConfig)>, ApplicationError> {
    let mut resolved = Vec::new();

    for kind in REDUCTION_ORDER {
        let records = catalog.records(kind);
        for id in selection.ids(kind) {
            let record = records
                .iter()
                .find(|record| &record.id == id && is_active(*record, as_of))
                .ok_or_else(|| ApplicationError::ReferenceIntegrity {
                    kind: kind.to_string(),
                    id: id.clone(),
                })?;
            if record.amount < Decimal::ZERO {
                return Err(DomainError::invalid_input(
                    format!("{kind}.amount"),
                    format!("`{}` has a negative amount", record.id),
                )
                .into());
            }
            resolved.push((kind, record));
        }
    }

    Ok(resolved)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReductionOutcome {
    pub applied: Vec<AppliedReduction>,
    pub total: SubtotalRecord,
}

/// Dollar value of each reduction, every percentage taken against `gross_net_cost`.
///
/// The summed total is capped at `gross_net_cost`.
pub fn apply_reductions(
    selected: &[(ReductionKind, &ReductionConfig)],
    gross_net_cost: Money,
) -> ReductionOutcome {
    let applied: Vec<AppliedReduction> = selected
        .iter()
        .map(|(kind, record)| AppliedReduction {
            kind: *kind,
            id: record.id.clone(),
            name: record.name.clone(),
            unit: record.unit,
            amount: record.amount,
            total: record.reduction_against(gross_net_cost),
        })
        .collect();

    let requested = sum_money(applied.iter().map(|reduction| reduction.total));
    let capped = requested.min(gross_net_cost.max(Decimal::ZERO));
    if capped < requested {
        tracing::warn!(
            event_name = "quote.buildup.reductions_capped",
            requested = %requested,
            capped = %capped,
            "reductions exceed the gross total and were capped"
        );
    }

    ReductionOutcome { applied, total: SubtotalRecord::reduction(capped) }
}

/// Informational tax credit values; never subtracted from the contract price.
pub fn evaluate_tax_credits(
    configs: &[TaxCreditConfig],
    grand_total_net_cost: Money,
    as_of: DateTime<Utc>,
) -> Vec<QuoteTaxCredit> {
    configs
        .iter()
        .filter(|config| is_tax_credit_active(config, as_of))
        .map(|config| QuoteTaxCredit {
            id: config.id.clone(),
            name: config.name.clone(),
            percentage: config.percentage,
            value: percentage_of(grand_total_net_cost, config.percentage),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::{apply_reductions, evaluate_tax_credits, resolve_selection, IncentiveCatalog, IncentiveSelection};
    use crate::domain::incentive::{ReductionConfig, ReductionKind, ReductionUnit, TaxCreditConfig};
    use crate::errors::{ApplicationError, DomainError};

    fn reduction(id: &str, amount: Decimal, unit: ReductionUnit) -> ReductionConfig {
        ReductionConfig {
            id: id.to_owned(),
            name: id.to_owned(),
            amount,
            unit,
            applies_to: Some("project".to_owned()),
            start_date: None,
            end_date: None,
        }
    }

    #[test]
    fn percentage_reductions_use_pre_reduction_base() {
        let fixed = reduction("fixed", dec!(1000), ReductionUnit::Dollar);
        let percent = reduction("percent", dec!(10), ReductionUnit::Percentage);
        let selected = vec![(ReductionKind::Discount, &fixed), (ReductionKind::Promotion, &percent)];

        let outcome = apply_reductions(&selected, dec!(20000));

        assert_eq!(outcome.applied[1].total, dec!(2000));
        assert_eq!(outcome.total.net_cost, dec!(3000));
        assert_eq!(outcome.total.cost, Decimal::ZERO);
    }

    #[test]
    fn reductions_never_exceed_gross() {
        let huge = reduction("huge", dec!(50000), ReductionUnit::Dollar);
        let outcome = apply_reductions(&[(ReductionKind::Incentive, &huge)], dec!(20000));

        assert_eq!(outcome.total.net_cost, dec!(20000));
        assert_eq!(outcome.applied[0].total, dec!(50000));
    }

    #[test]
    fn reduction_total_carries_no_margin() {
        let fixed = reduction("fixed", dec!(750), ReductionUnit::Dollar);
        let outcome = apply_reductions(&[(ReductionKind::Discount, &fixed)], dec!(20000));

        assert_eq!(outcome.total.net_cost, dec!(750));
        assert_eq!(outcome.total.margin_percentage, Decimal::ZERO);
        assert_eq!(outcome.total.net_margin, Decimal::ZERO);
    }

    #[test]
    fn negative_selected_discount_is_rejected() {
        let catalog = IncentiveCatalog {
            discounts: vec![reduction("refund", dec!(-500), ReductionUnit::Dollar)],
            ..IncentiveCatalog::default()
        };
        let selection =
            IncentiveSelection { discount_ids: vec!["refund".to_owned()], ..IncentiveSelection::default() };

        assert!(matches!(
            resolve_selection(&catalog, &selection, Utc::now()),
            Err(ApplicationError::Domain(DomainError::InvalidInput { ref field, .. })) if field == "discount.amount"
        ));
    }

    #[test]
    fn expired_selected_discount_is_a_reference_error() {
        let now = Utc::now();
        let mut expired = reduction("spring", dec!(500), ReductionUnit::Dollar);
        expired.end_date = Some(now - Duration::days(1));
        let catalog = IncentiveCatalog { discounts: vec![expired], ..IncentiveCatalog::default() };
        let selection =
            IncentiveSelection { discount_ids: vec!["spring".to_owned()], ..IncentiveSelection::default() };

        let error = resolve_selection(&catalog, &selection, now).expect_err("expired discount");
        assert_eq!(
            error,
            ApplicationError::ReferenceIntegrity { kind: "discount".to_owned(), id: "spring".to_owned() }
        );
    }

    #[test]
    fn unknown_promotion_id_is_a_reference_error() {
        let catalog = IncentiveCatalog::default();
        let selection = IncentiveSelection {
            promotion_ids: vec!["ghost".to_owned()],
            ..IncentiveSelection::default()
        };

        assert!(matches!(
            resolve_selection(&catalog, &selection, Utc::now()),
            Err(ApplicationError::ReferenceIntegrity { ref kind, .. }) if kind == "promotion"
        ));
    }

    #[test]
    fn resolution_orders_discounts_then_promotions_then_incentives() {
        let catalog = IncentiveCatalog {
            discounts: vec![reduction("d", dec!(1), ReductionUnit::Dollar)],
            promotions: vec![reduction("p", dec!(1), ReductionUnit::Dollar)],
            incentives: vec![reduction("i", dec!(1), ReductionUnit::Dollar)],
            tax_credits: Vec::new(),
        };
        let selection = IncentiveSelection {
            discount_ids: vec!["d".to_owned()],
            promotion_ids: vec!["p".to_owned()],
            incentive_ids: vec!["i".to_owned()],
        };

        let resolved = resolve_selection(&catalog, &selection, Utc::now())
            .unwrap_or_else(|error| panic!("resolution failed: {error}"));
        let kinds: Vec<ReductionKind> = resolved.iter().map(|(kind, _)| *kind).collect();

        assert_eq!(
            kinds,
            vec![ReductionKind::Discount, ReductionKind::Promotion, ReductionKind::Incentive]
        );
    }

    #[test]
    fn tax_credit_value_is_percentage_of_grand_total() {
        let configs = vec![
            TaxCreditConfig {
                id: "itc".to_owned(),
                name: "Federal ITC".to_owned(),
                percentage: dec!(30),
                start_date: Some("2020-01-01".to_owned()),
                end_date: None,
            },
            TaxCreditConfig {
                id: "bad".to_owned(),
                name: "Malformed".to_owned(),
                percentage: dec!(10),
                start_date: Some("soon".to_owned()),
                end_date: None,
            },
        ];

        let credits = evaluate_tax_credits(&configs, dec!(25000), Utc::now());

        assert_eq!(credits.len(), 1);
        assert_eq!(credits[0].value, dec!(7500));
    }
}
