//! Lease and ESA payment projection.
//!
//! Payments escalate once per contract year and stay flat within it. The projection runs
//! to the longer of the contract term and the full product term so that years past a
//! shortened contract are reported as explicit zeros instead of being extrapolated.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::domain::finance::{
    EsaAttributes, FinancialProductType, LeaseAttributes, PaymentScheduleEntry, SystemProduction,
};
use crate::errors::{ApplicationError, DomainError};
use crate::finance::production::{production_tables, ProductionTables};
use crate::money::{format_usd, round_money, Money, Percentage};

const MONTHS_PER_YEAR: u32 = 12;
const PRICE_PER_KWH_PLACES: u32 = 4;
const PRODUCTION_PLACES: u32 = 2;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseEsaSchedule {
    pub product_type: FinancialProductType,
    pub term_years: u32,
    /// Monthly payment for each projected year.
    pub payments_by_year: Vec<Money>,
    #[serde(flatten)]
    pub production: ProductionTables,
    pub price_per_kwh_by_year: Vec<Decimal>,
    /// `None` for years without a buyout offer.
    pub buyout_by_year: Vec<Option<Money>>,
    pub monthly_schedule: Vec<PaymentScheduleEntry>,
}

impl LeaseEsaSchedule {
    pub fn years(&self) -> u32 {
        self.payments_by_year.len() as u32
    }

    /// Merge fields keyed the way contract documents reference them.
    pub fn document_fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();

        for (index, payment) in self.payments_by_year.iter().enumerate() {
            let year = index + 1;
            fields.insert(format!("payment_year{year}"), format_usd(*payment));

            let payoff = match self.buyout_by_year.get(index).copied().flatten() {
                Some(amount) => format_usd(amount),
                None => "N/A".to_owned(),
            };
            fields.insert(format!("payoff_year_{year}"), payoff);

            if let Some(price) = self.price_per_kwh_by_year.get(index) {
                fields.insert(format!("price_per_kwh_year{year}"), format!("${price:.4}"));
            }
            if let Some(epv) = self.production.epv_yld.get(index) {
                fields.insert(format!("epv_year{year}"), format!("{:.0}", epv.round()));
            }
            if let Some(gpv) = self.production.gpv_yld.get(index) {
                fields.insert(format!("gpv_year{year}"), format!("{:.0}", gpv.round()));
            }
        }

        fields
    }
}

/// Source of the per-year monthly payment before term truncation.
enum PaymentBasis<'a> {
    Escalated { base: Money, escalator: Percentage },
    LeaseDetails { details: &'a LeaseAttributes },
}

impl PaymentBasis<'_> {
    fn payment_for_year(&self, year: u32, escalation_factor: Decimal) -> Money {
        match self {
            Self::Escalated { base, .. } => *base * escalation_factor,
            Self::LeaseDetails { details } => details
                .yearly_lease_payment_details
                .iter()
                .find(|detail| detail.year == year)
                .map(|detail| detail.monthly_payment)
                .unwrap_or_else(|| first_lease_payment(details) * escalation_factor),
        }
    }

    fn escalator(&self) -> Percentage {
        match self {
            Self::Escalated { escalator, .. } => *escalator,
            Self::LeaseDetails { details } => details.rate_escalator,
        }
    }
}

fn first_lease_payment(details: &LeaseAttributes) -> Money {
    details
        .yearly_lease_payment_details
        .iter()
        .min_by_key(|detail| detail.year)
        .map(|detail| detail.monthly_payment)
        .unwrap_or(Decimal::ZERO)
}

pub fn solve_esa(
    attributes: &EsaAttributes,
    production: &SystemProduction,
    config: &EngineConfig,
) -> Result<LeaseEsaSchedule, ApplicationError> {
    let base = attributes.gross_finance_payment.ok_or_else(|| ApplicationError::MissingAttribute {
        product: FinancialProductType::Esa.to_string(),
        attribute: "grossFinancePayment".to_owned(),
    })?;

    project(
        FinancialProductType::Esa,
        attributes.esa_term,
        &PaymentBasis::Escalated { base, escalator: attributes.rate_escalator },
        production,
        config,
    )
}

pub fn solve_lease(
    attributes: &LeaseAttributes,
    production: &SystemProduction,
    config: &EngineConfig,
) -> Result<LeaseEsaSchedule, ApplicationError> {
    if attributes.yearly_lease_payment_details.is_empty() {
        return Err(ApplicationError::MissingAttribute {
            product: FinancialProductType::Lease.to_string(),
            attribute: "yearlyLeasePaymentDetails".to_owned(),
        });
    }

    project(
        FinancialProductType::Lease,
        attributes.lease_term,
        &PaymentBasis::LeaseDetails { details: attributes },
        production,
        config,
    )
}

fn project(
    product_type: FinancialProductType,
    term_years: u32,
    basis: &PaymentBasis<'_>,
    production: &SystemProduction,
    config: &EngineConfig,
) -> Result<LeaseEsaSchedule, ApplicationError> {
    if basis.escalator() < Decimal::ZERO {
        return Err(DomainError::invalid_input("rateEscalator", "cannot be negative").into());
    }

    let horizon = term_years.max(config.full_product_term_years);
    let payments = yearly_payments(term_years, horizon, basis);
    let tables = production_tables(production, horizon, config)?;

    let price_per_kwh_by_year = payments
        .iter()
        .zip(&tables.gpv_yld)
        .map(|(payment, gpv)| price_per_kwh(*payment, *gpv))
        .collect();
    let buyout_by_year = (1..=horizon)
        .map(|year| buyout_value(year, term_years, &payments, config))
        .collect();
    let monthly_schedule = monthly_schedule(term_years, &payments);

    tracing::debug!(
        event_name = "finance.lease.projected",
        product_type = %product_type,
        term_years,
        horizon,
        "lease/esa projection computed"
    );

    Ok(round_schedule(
        LeaseEsaSchedule {
            product_type,
            term_years,
            payments_by_year: payments,
            production: tables,
            price_per_kwh_by_year,
            buyout_by_year,
            monthly_schedule,
        },
        config.money_decimal_places,
    ))
}

/// Unrounded monthly payment per year; zero once `year > term_years`.
fn yearly_payments(term_years: u32, horizon: u32, basis: &PaymentBasis<'_>) -> Vec<Money> {
    let step = Decimal::ONE + basis.escalator() / dec!(100);
    let mut factor = Decimal::ONE;
    let mut payments = Vec::with_capacity(horizon as usize);

    for year in 1..=horizon {
        if year > 1 {
            factor *= step;
        }
        if year > term_years {
            payments.push(Decimal::ZERO);
        } else {
            payments.push(basis.payment_for_year(year, factor));
        }
    }

    payments
}

fn price_per_kwh(monthly_payment: Money, guaranteed_kwh: Decimal) -> Decimal {
    if guaranteed_kwh <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    Decimal::from(MONTHS_PER_YEAR) * monthly_payment / guaranteed_kwh
}

/// Present value of the payments left from the start of `year` through the term.
fn buyout_value(year: u32, term_years: u32, payments: &[Money], config: &EngineConfig) -> Option<Money> {
    if year > term_years {
        return Some(Decimal::ZERO);
    }
    if year < config.buyout_first_year {
        return None;
    }

    let monthly_rate = config.buyout_annual_discount_rate / Decimal::from(MONTHS_PER_YEAR) / dec!(100);
    let step = Decimal::ONE + monthly_rate;
    let mut discount = Decimal::ONE;
    let mut npv = Decimal::ZERO;

    for remaining_year in year..=term_years {
        let payment = payments.get(remaining_year as usize - 1).copied().unwrap_or(Decimal::ZERO);
        for _ in 0..MONTHS_PER_YEAR {
            discount *= step;
            npv += payment / discount;
        }
    }

    Some(npv)
}

fn monthly_schedule(term_years: u32, payments: &[Money]) -> Vec<PaymentScheduleEntry> {
    payments
        .iter()
        .take(term_years as usize)
        .enumerate()
        .flat_map(|(index, payment)| {
            let year = index as u32 + 1;
            (1..=MONTHS_PER_YEAR).map(move |month_of_year| {
                PaymentScheduleEntry::flat((year - 1) * MONTHS_PER_YEAR + month_of_year, year, *payment)
            })
        })
        .collect()
}

fn round_schedule(schedule: LeaseEsaSchedule, places: u32) -> LeaseEsaSchedule {
    let round_all = |values: Vec<Decimal>, places: u32| -> Vec<Decimal> {
        values.into_iter().map(|value| round_money(value, places)).collect()
    };

    LeaseEsaSchedule {
        payments_by_year: round_all(schedule.payments_by_year, places),
        production: ProductionTables {
            epv_yld: round_all(schedule.production.epv_yld, PRODUCTION_PLACES),
            epv_yld_cum: round_all(schedule.production.epv_yld_cum, PRODUCTION_PLACES),
            gpv_yld: round_all(schedule.production.gpv_yld, PRODUCTION_PLACES),
        },
        price_per_kwh_by_year: round_all(schedule.price_per_kwh_by_year, PRICE_PER_KWH_PLACES),
        buyout_by_year: schedule
            .buyout_by_year
            .into_iter()
            .map(|buyout| buyout.map(|value| round_money(value, places)))
            .collect(),
        monthly_schedule: schedule
            .monthly_schedule
            .into_iter()
            .map(|entry| PaymentScheduleEntry {
                payment_amount: round_money(entry.payment_amount, places),
                ..entry
            })
            .collect(),
        ..schedule
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::{solve_esa, solve_lease};
    use crate::config::EngineConfig;
    use crate::domain::finance::{
        EsaAttributes, LeaseAttributes, SystemProduction, YearlyLeasePaymentDetail,
    };
    use crate::errors::ApplicationError;

    fn production(generation: Decimal) -> SystemProduction {
        SystemProduction {
            generation_kwh: generation,
            annual_degradation: Some(dec!(0.5)),
            guaranteed_production: Some(dec!(95)),
        }
    }

    fn esa(term: u32, escalator: Decimal, payment: Decimal) -> EsaAttributes {
        EsaAttributes { esa_term: term, rate_escalator: escalator, gross_finance_payment: Some(payment) }
    }

    #[test]
    fn esa_payments_step_once_per_year() {
        let schedule =
            solve_esa(&esa(25, dec!(2.9), dec!(100)), &production(dec!(10000)), &EngineConfig::default())
                .unwrap_or_else(|error| panic!("esa failed: {error}"));

        assert_eq!(schedule.payments_by_year[0], dec!(100.00));
        assert_eq!(schedule.payments_by_year[1], dec!(102.90));
        assert_eq!(schedule.payments_by_year[2], dec!(105.88));
        assert_eq!(schedule.monthly_schedule.len(), 300);
        assert_eq!(schedule.monthly_schedule[11].payment_amount, dec!(100.00));
        assert_eq!(schedule.monthly_schedule[12].payment_amount, dec!(102.90));
        assert_eq!(schedule.monthly_schedule[12].year, 2);
    }

    #[test]
    fn shortened_esa_term_zeroes_payment_and_payoff_after_term() {
        let schedule =
            solve_esa(&esa(10, dec!(2.9), dec!(120)), &production(dec!(9000)), &EngineConfig::default())
                .unwrap_or_else(|error| panic!("esa failed: {error}"));
        let fields = schedule.document_fields();

        assert_eq!(schedule.years(), 25);
        assert_eq!(fields.get("payment_year12").map(String::as_str), Some("$0.00"));
        assert_eq!(fields.get("payoff_year_12").map(String::as_str), Some("$0.00"));
        assert_eq!(schedule.price_per_kwh_by_year[11], Decimal::ZERO);
        assert_eq!(schedule.monthly_schedule.len(), 120);
    }

    #[test]
    fn term_ending_before_buyout_window_pays_off_at_zero() {
        let schedule =
            solve_esa(&esa(3, dec!(2.9), dec!(110)), &production(dec!(9000)), &EngineConfig::default())
                .unwrap_or_else(|error| panic!("esa failed: {error}"));
        let fields = schedule.document_fields();

        assert_eq!(fields.get("payoff_year_2").map(String::as_str), Some("N/A"));
        assert_eq!(fields.get("payment_year4").map(String::as_str), Some("$0.00"));
        assert_eq!(fields.get("payoff_year_4").map(String::as_str), Some("$0.00"));
        assert_eq!(fields.get("payoff_year_5").map(String::as_str), Some("$0.00"));
        assert_eq!(schedule.buyout_by_year[3], Some(Decimal::ZERO));
    }

    #[test]
    fn buyout_is_only_offered_from_year_six() {
        let schedule =
            solve_esa(&esa(20, dec!(0), dec!(100)), &production(dec!(9000)), &EngineConfig::default())
                .unwrap_or_else(|error| panic!("esa failed: {error}"));

        assert!(schedule.buyout_by_year[..5].iter().all(Option::is_none));
        assert_eq!(
            schedule.document_fields().get("payoff_year_3").map(String::as_str),
            Some("N/A")
        );

        let year_six = schedule.buyout_by_year[5].unwrap_or_default();
        let remaining_undiscounted = dec!(100) * Decimal::from(15 * 12);
        assert!(year_six > Decimal::ZERO);
        assert!(year_six < remaining_undiscounted);

        let later = schedule.buyout_by_year[10].unwrap_or_default();
        assert!(later < year_six);
    }

    #[test]
    fn buyout_npv_discounts_each_remaining_month() {
        let config = EngineConfig { buyout_first_year: 1, ..EngineConfig::default() };
        let schedule = solve_esa(&esa(1, dec!(0), dec!(100)), &production(dec!(1000)), &config)
            .unwrap_or_else(|error| panic!("esa failed: {error}"));

        // 12 payments of 100 at 0.25% per month.
        assert_eq!(schedule.buyout_by_year[0], Some(dec!(1180.73)));
    }

    #[test]
    fn zero_generation_prices_every_year_at_zero() {
        let schedule =
            solve_esa(&esa(25, dec!(1), dec!(150)), &production(Decimal::ZERO), &EngineConfig::default())
                .unwrap_or_else(|error| panic!("esa failed: {error}"));

        assert!(schedule.price_per_kwh_by_year.iter().all(|price| price.is_zero()));
    }

    #[test]
    fn price_per_kwh_is_annual_payment_over_guaranteed_production() {
        let schedule =
            solve_esa(&esa(25, dec!(0), dec!(95)), &production(dec!(1200)), &EngineConfig::default())
                .unwrap_or_else(|error| panic!("esa failed: {error}"));

        assert_eq!(schedule.production.gpv_yld[0], dec!(1140.00));
        assert_eq!(schedule.price_per_kwh_by_year[0], dec!(1.0000));
    }

    #[test]
    fn esa_without_gross_payment_is_a_missing_attribute() {
        let attributes = EsaAttributes { esa_term: 25, rate_escalator: dec!(2), gross_finance_payment: None };

        assert!(matches!(
            solve_esa(&attributes, &production(dec!(1000)), &EngineConfig::default()),
            Err(ApplicationError::MissingAttribute { ref attribute, .. }) if attribute == "grossFinancePayment"
        ));
    }

    #[test]
    fn lease_uses_stored_yearly_details_and_escalates_missing_years() {
        let attributes = LeaseAttributes {
            lease_term: 20,
            rate_escalator: dec!(10),
            lease_amount: dec!(30000),
            yearly_lease_payment_details: vec![
                YearlyLeasePaymentDetail { year: 1, monthly_payment: dec!(150) },
                YearlyLeasePaymentDetail { year: 2, monthly_payment: dec!(160) },
            ],
        };

        let schedule = solve_lease(&attributes, &production(dec!(9000)), &EngineConfig::default())
            .unwrap_or_else(|error| panic!("lease failed: {error}"));

        assert_eq!(schedule.payments_by_year[0], dec!(150));
        assert_eq!(schedule.payments_by_year[1], dec!(160));
        assert_eq!(schedule.payments_by_year[2], dec!(181.50));
        assert_eq!(schedule.payments_by_year[20], Decimal::ZERO);
    }

    #[test]
    fn lease_without_payment_details_is_rejected() {
        let attributes = LeaseAttributes {
            lease_term: 20,
            rate_escalator: dec!(2.9),
            lease_amount: dec!(30000),
            yearly_lease_payment_details: Vec::new(),
        };

        assert!(matches!(
            solve_lease(&attributes, &production(dec!(9000)), &EngineConfig::default()),
            Err(ApplicationError::MissingAttribute { .. })
        ));
    }
}
