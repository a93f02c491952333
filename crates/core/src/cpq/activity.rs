use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::incentive::{ReductionConfig, TaxCreditConfig};

/// Anything carrying an optional validity window.
pub trait ActivityWindow {
    fn start_date(&self) -> Option<DateTime<Utc>>;
    fn end_date(&self) -> Option<DateTime<Utc>>;
}

impl ActivityWindow for ReductionConfig {
    fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }

    fn end_date(&self) -> Option<DateTime<Utc>> {
        self.end_date
    }
}

/// Both bounds are inclusive; a missing bound never constrains.
pub fn is_active<W>(item: &W, as_of: DateTime<Utc>) -> bool
where
    W: ActivityWindow + ?Sized,
{
    let started = item.start_date().map_or(true, |start| start <= as_of);
    let not_ended = item.end_date().map_or(true, |end| end >= as_of);
    started && not_ended
}

pub fn select_active<W>(items: &[W], as_of: DateTime<Utc>) -> Vec<&W>
where
    W: ActivityWindow,
{
    items.iter().filter(|item| is_active(*item, as_of)).collect()
}

/// A tax credit date string after coercion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigDate {
    Parsed(DateTime<Utc>),
    /// Text that is neither RFC 3339 nor `YYYY-MM-DD`. Never compared.
    Unparsed(String),
}

impl ConfigDate {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
            return Self::Parsed(parsed.with_timezone(&Utc));
        }

        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|midnight| Self::Parsed(midnight.and_utc()))
            .unwrap_or_else(|| Self::Unparsed(raw.to_owned()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaxCreditActivity {
    Active,
    Inactive,
    UnparsedDate(String),
}

pub fn tax_credit_activity(config: &TaxCreditConfig, as_of: DateTime<Utc>) -> TaxCreditActivity {
    let start = config.start_date.as_deref().map(ConfigDate::parse);
    let end = config.end_date.as_deref().map(ConfigDate::parse);

    let start = match start {
        Some(ConfigDate::Unparsed(raw)) => return TaxCreditActivity::UnparsedDate(raw),
        Some(ConfigDate::Parsed(date)) => Some(date),
        None => None,
    };
    let end = match end {
        Some(ConfigDate::Unparsed(raw)) => return TaxCreditActivity::UnparsedDate(raw),
        Some(ConfigDate::Parsed(date)) => Some(date),
        None => None,
    };

    let window = ParsedWindow { start, end };
    if is_active(&window, as_of) {
        TaxCreditActivity::Active
    } else {
        TaxCreditActivity::Inactive
    }
}

/// Unparseable dates count as inactive.
pub fn is_tax_credit_active(config: &TaxCreditConfig, as_of: DateTime<Utc>) -> bool {
    match tax_credit_activity(config, as_of) {
        TaxCreditActivity::Active => true,
        TaxCreditActivity::Inactive => false,
        TaxCreditActivity::UnparsedDate(raw) => {
            tracing::warn!(
                event_name = "quote.incentive.date_unparsed",
                tax_credit_id = %config.id,
                raw_date = %raw,
                "tax credit date could not be parsed; treating config as inactive"
            );
            false
        }
    }
}

struct ParsedWindow {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl ActivityWindow for ParsedWindow {
    fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    fn end_date(&self) -> Option<DateTime<Utc>> {
        self.end
    }
}
