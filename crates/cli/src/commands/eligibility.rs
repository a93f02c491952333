use std::path::Path;

use serde::Deserialize;
use solquote_core::config::AppConfig;
use solquote_core::{DeterministicQuoteEngine, FinancialProduct, QuoteEngine, SystemDesignSummary};

use crate::commands::{input_failure, read_input, CommandResult};

#[derive(Debug, Deserialize)]
struct EligibilityInput {
    products: Vec<FinancialProduct>,
    design: SystemDesignSummary,
}

pub fn run(config: &AppConfig, input: &Path) -> CommandResult {
    let input_doc: EligibilityInput = match read_input(input) {
        Ok(doc) => doc,
        Err(error) => return input_failure("eligibility", error),
    };

    let engine = DeterministicQuoteEngine::new(config.engine.clone());
    let annotated = engine.filter_eligible_financial_products(&input_doc.products, &input_doc.design);
    let eligible = annotated.iter().filter(|product| product.eligible).count();

    CommandResult::success_with_data(
        "eligibility",
        format!("{eligible} of {} products eligible", annotated.len()),
        &annotated,
    )
}
