pub mod activity;
pub mod buildup;
pub mod incentives;
pub mod line_items;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::domain::finance::{
    FinanceProductAttributes, FinancialProduct, LoanAttributes, SystemDesignSummary, SystemProduction,
};
use crate::domain::partner::PartnerMarkupConfig;
use crate::domain::quote::QuoteCostBuildup;
use crate::errors::{ApplicationError, DomainError};
use crate::finance::{self, AnnotatedProduct, LeaseEsaSchedule, LoanSchedule};

use self::buildup::QuoteBuildupRequest;

/// Schedule produced for whichever finance product the quote selected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FinanceSchedule {
    Cash,
    Loan(LoanSchedule),
    LeaseOrEsa(LeaseEsaSchedule),
}

pub trait QuoteEngine: Send + Sync {
    fn build_quote_cost(
        &self,
        request: &QuoteBuildupRequest,
        partner: Option<&PartnerMarkupConfig>,
    ) -> Result<QuoteCostBuildup, ApplicationError>;

    fn solve_loan(&self, attributes: &LoanAttributes) -> Result<LoanSchedule, ApplicationError>;

    fn solve_lease_or_esa(
        &self,
        attributes: &FinanceProductAttributes,
        production: &SystemProduction,
    ) -> Result<LeaseEsaSchedule, ApplicationError>;

    fn filter_eligible_financial_products(
        &self,
        products: &[FinancialProduct],
        design: &SystemDesignSummary,
    ) -> Vec<AnnotatedProduct>;

    fn solve_finance(
        &self,
        attributes: &FinanceProductAttributes,
        production: &SystemProduction,
    ) -> Result<FinanceSchedule, ApplicationError> {
        match attributes {
            FinanceProductAttributes::Cash => Ok(FinanceSchedule::Cash),
            FinanceProductAttributes::Loan(loan) => self.solve_loan(loan).map(FinanceSchedule::Loan),
            FinanceProductAttributes::Lease(_) | FinanceProductAttributes::Esa(_) => {
                self.solve_lease_or_esa(attributes, production).map(FinanceSchedule::LeaseOrEsa)
            }
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DeterministicQuoteEngine {
    config: EngineConfig,
}

impl DeterministicQuoteEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl QuoteEngine for DeterministicQuoteEngine {
    fn build_quote_cost(
        &self,
        request: &QuoteBuildupRequest,
        partner: Option<&PartnerMarkupConfig>,
    ) -> Result<QuoteCostBuildup, ApplicationError> {
        buildup::build_quote_cost(request, partner, &self.config)
    }

    fn solve_loan(&self, attributes: &LoanAttributes) -> Result<LoanSchedule, ApplicationError> {
        finance::solve_loan(attributes, &self.config)
    }

    fn solve_lease_or_esa(
        &self,
        attributes: &FinanceProductAttributes,
        production: &SystemProduction,
    ) -> Result<LeaseEsaSchedule, ApplicationError> {
        match attributes {
            FinanceProductAttributes::Lease(lease) => finance::solve_lease(lease, production, &self.config),
            FinanceProductAttributes::Esa(esa) => finance::solve_esa(esa, production, &self.config),
            other => Err(DomainError::invalid_input(
                "type",
                format!("{} attributes have no lease or esa schedule", other.product_type()),
            )
            .into()),
        }
    }

    fn filter_eligible_financial_products(
        &self,
        products: &[FinancialProduct],
        design: &SystemDesignSummary,
    ) -> Vec<AnnotatedProduct> {
        finance::filter_eligible_financial_products(products, design)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::{
        config::EngineConfig,
        cpq::{DeterministicQuoteEngine, FinanceSchedule, QuoteEngine},
        domain::finance::{EsaAttributes, FinanceProductAttributes, LoanAttributes, SystemProduction},
        errors::{ApplicationError, DomainError},
    };

    fn production() -> SystemProduction {
        SystemProduction {
            generation_kwh: dec!(9500),
            annual_degradation: None,
            guaranteed_production: None,
        }
    }

    #[test]
    fn solve_finance_dispatches_on_product_type() {
        let engine = DeterministicQuoteEngine::new(EngineConfig::default());

        let cash = engine
            .solve_finance(&FinanceProductAttributes::Cash, &production())
            .unwrap_or_else(|error| panic!("cash failed: {error}"));
        assert_eq!(cash, FinanceSchedule::Cash);

        let loan = engine
            .solve_finance(
                &FinanceProductAttributes::Loan(LoanAttributes {
                    interest_rate: dec!(3.99),
                    loan_amount: Some(dec!(25000)),
                    loan_term: 240,
                    monthly_payment: None,
                    terms: Vec::new(),
                    reinvestment: Vec::new(),
                }),
                &production(),
            )
            .unwrap_or_else(|error| panic!("loan failed: {error}"));
        assert!(matches!(loan, FinanceSchedule::Loan(ref schedule) if schedule.entries.len() == 240));

        let esa = engine
            .solve_finance(
                &FinanceProductAttributes::Esa(EsaAttributes {
                    esa_term: 25,
                    rate_escalator: dec!(2.9),
                    gross_finance_payment: Some(dec!(110)),
                }),
                &production(),
            )
            .unwrap_or_else(|error| panic!("esa failed: {error}"));
        assert!(matches!(esa, FinanceSchedule::LeaseOrEsa(ref schedule) if schedule.years() == 25));
    }

    #[test]
    fn lease_solver_rejects_loan_attributes() {
        let engine = DeterministicQuoteEngine::default();
        let result = engine.solve_lease_or_esa(&FinanceProductAttributes::Cash, &production());

        assert!(matches!(result, Err(ApplicationError::Domain(DomainError::InvalidInput { .. }))));
    }
}
