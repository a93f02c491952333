use std::path::Path;

use serde::Deserialize;
use solquote_core::config::AppConfig;
use solquote_core::{DeterministicQuoteEngine, PartnerMarkupConfig, QuoteBuildupRequest, QuoteEngine};

use crate::commands::{correlation_id, input_failure, read_input, CommandResult};

/// The partner config travels with the request; leaving it out reproduces the
/// missing-config failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildupInput {
    partner_config: Option<PartnerMarkupConfig>,
    #[serde(flatten)]
    request: QuoteBuildupRequest,
}

pub fn run(config: &AppConfig, input: &Path) -> CommandResult {
    let input_doc: BuildupInput = match read_input(input) {
        Ok(doc) => doc,
        Err(error) => return input_failure("buildup", error),
    };

    let engine = DeterministicQuoteEngine::new(config.engine.clone());
    match engine.build_quote_cost(&input_doc.request, input_doc.partner_config.as_ref()) {
        Ok(buildup) => CommandResult::success_with_data(
            "buildup",
            format!("project grand total {}", buildup.project_grand_total.net_cost),
            &buildup,
        ),
        Err(error) => CommandResult::engine_failure("buildup", error, &correlation_id("buildup", input)),
    }
}
