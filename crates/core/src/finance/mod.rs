pub mod eligibility;
pub mod lease;
pub mod loan;
pub mod production;

pub use eligibility::{filter_eligible_financial_products, AnnotatedProduct, IneligibilityReason};
pub use lease::{solve_esa, solve_lease, LeaseEsaSchedule};
pub use loan::{solve_loan, LoanSchedule, LoanSummary};
pub use production::{production_tables, ProductionTables};
