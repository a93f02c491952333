use std::path::Path;

use solquote_core::config::AppConfig;
use solquote_core::domain::finance::LoanAttributes;
use solquote_core::{DeterministicQuoteEngine, QuoteEngine};

use crate::commands::{correlation_id, input_failure, read_input, CommandResult};

pub fn run(config: &AppConfig, input: &Path) -> CommandResult {
    let attributes: LoanAttributes = match read_input(input) {
        Ok(attributes) => attributes,
        Err(error) => return input_failure("loan", error),
    };

    let engine = DeterministicQuoteEngine::new(config.engine.clone());
    match engine.solve_loan(&attributes) {
        Ok(schedule) => {
            let message = match schedule.summary.payoff_month {
                Some(month) => format!("{} monthly entries, paid off in month {month}", schedule.entries.len()),
                None => format!("{} monthly entries, balance remains after term", schedule.entries.len()),
            };
            CommandResult::success_with_data("loan", message, &schedule)
        }
        Err(error) => CommandResult::engine_failure("loan", error, &correlation_id("loan", input)),
    }
}
