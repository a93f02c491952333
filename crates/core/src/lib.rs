pub mod config;
pub mod cpq;
pub mod domain;
pub mod errors;
pub mod finance;
pub mod money;

pub use cpq::buildup::{build_quote_cost, QuoteBuildupRequest};
pub use cpq::incentives::{IncentiveCatalog, IncentiveSelection};
pub use cpq::{DeterministicQuoteEngine, FinanceSchedule, QuoteEngine};
pub use domain::finance::{
    FinanceProductAttributes, FinancialProduct, FinancialProductType, PaymentScheduleEntry,
    QuoteFinancing, SystemDesignSummary, SystemProduction,
};
pub use domain::partner::PartnerMarkupConfig;
pub use domain::product::{ProductCategory, SystemDesignProducts};
pub use domain::quote::{QuoteCost, QuoteCostBuildup, SubtotalRecord};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use finance::{AnnotatedProduct, LeaseEsaSchedule, LoanSchedule};
