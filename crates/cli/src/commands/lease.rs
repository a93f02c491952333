use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use solquote_core::config::AppConfig;
use solquote_core::{
    DeterministicQuoteEngine, FinanceProductAttributes, LeaseEsaSchedule, QuoteEngine, SystemProduction,
};

use crate::commands::{correlation_id, input_failure, read_input, CommandResult};

#[derive(Debug, Deserialize)]
struct LeaseInput {
    attributes: FinanceProductAttributes,
    production: SystemProduction,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LeaseOutput {
    schedule: LeaseEsaSchedule,
    document_fields: BTreeMap<String, String>,
}

pub fn run(config: &AppConfig, input: &Path) -> CommandResult {
    let input_doc: LeaseInput = match read_input(input) {
        Ok(doc) => doc,
        Err(error) => return input_failure("lease", error),
    };

    let engine = DeterministicQuoteEngine::new(config.engine.clone());
    match engine.solve_lease_or_esa(&input_doc.attributes, &input_doc.production) {
        Ok(schedule) => {
            let message = format!(
                "{} projected over {} years ({}-year term)",
                schedule.product_type,
                schedule.years(),
                schedule.term_years
            );
            let output = LeaseOutput { document_fields: schedule.document_fields(), schedule };
            CommandResult::success_with_data("lease", message, &output)
        }
        Err(error) => CommandResult::engine_failure("lease", error, &correlation_id("lease", input)),
    }
}
