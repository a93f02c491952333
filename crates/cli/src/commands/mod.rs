pub mod buildup;
pub mod config;
pub mod eligibility;
pub mod lease;
pub mod loan;

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use solquote_core::ApplicationError;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success_with_data<T: Serialize>(command: &str, message: impl Into<String>, data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self::emit(command, "ok", None, message.into(), Some(data), 0),
            Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
        }
    }

    pub fn failure(command: &str, error_class: &str, message: impl Into<String>, exit_code: u8) -> Self {
        Self::emit(command, "error", Some(error_class), message.into(), None, exit_code)
    }

    /// Engine errors carry the caller-facing message and correlation id alongside the detail.
    pub fn engine_failure(command: &str, error: ApplicationError, correlation_id: &str) -> Self {
        let error_class = error_class(&error);
        let message = error.to_string();
        let interface = error.into_interface(correlation_id);
        let data = serde_json::json!({
            "correlation_id": correlation_id,
            "user_message": interface.user_message(),
        });
        Self::emit(command, "error", Some(error_class), message, Some(data), 4)
    }

    fn emit(
        command: &str,
        status: &str,
        error_class: Option<&str>,
        message: String,
        data: Option<Value>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: status.to_string(),
            error_class: error_class.map(str::to_string),
            message,
            data,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn error_class(error: &ApplicationError) -> &'static str {
    match error {
        ApplicationError::Domain(_) => "invalid_input",
        ApplicationError::NotFound { .. } => "not_found",
        ApplicationError::ReferenceIntegrity { .. } => "reference_integrity",
        ApplicationError::MissingAttribute { .. } => "missing_attribute",
        ApplicationError::Configuration(_) => "configuration",
    }
}

pub(crate) fn read_input<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read input `{}`", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("could not parse input `{}`", path.display()))
}

pub(crate) fn input_failure(command: &str, error: anyhow::Error) -> CommandResult {
    CommandResult::failure(command, "input", format!("{error:#}"), 3)
}

pub(crate) fn correlation_id(command: &str, input: &Path) -> String {
    let stem = input.file_stem().and_then(|stem| stem.to_str()).unwrap_or("input");
    format!("{command}:{stem}")
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
