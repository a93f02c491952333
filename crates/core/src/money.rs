//! Decimal money helpers shared by the cost buildup and the finance solvers.
//!
//! Every amount in the engine is a [`Decimal`]; values are rounded once, when an output
//! record is materialized, never between chained operations.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Monetary amount in dollars.
pub type Money = Decimal;

/// Percentage expressed in percent units (`10` means 10%).
pub type Percentage = Decimal;

const HUNDRED: Decimal = dec!(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub total: Money,
    pub markup_amount: Money,
    pub total_with_markup: Money,
}

impl CostBreakdown {
    pub fn rounded(self, places: u32) -> Self {
        let total = round_money(self.total, places);
        let markup_amount = round_money(self.markup_amount, places);
        Self { total, markup_amount, total_with_markup: total + markup_amount }
    }
}

pub fn calculate_cost(unit_price: Money, quantity: Decimal, markup_percentage: Percentage) -> CostBreakdown {
    let total = unit_price * quantity;
    let markup_amount = percentage_of(total, markup_percentage);
    CostBreakdown { total, markup_amount, total_with_markup: total + markup_amount }
}

pub fn percentage_of(base: Money, percentage: Percentage) -> Money {
    base * percentage / HUNDRED
}

pub fn sum_money<I>(values: I) -> Money
where
    I: IntoIterator<Item = Money>,
{
    values.into_iter().fold(Decimal::ZERO, |acc, value| acc + value)
}

/// Rounds half away from zero and pads to exactly `places` decimals for output.
pub fn round_money(value: Money, places: u32) -> Money {
    let mut rounded = value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(places);
    rounded
}

/// Margin of `net_cost` over `cost` as a percentage of `net_cost`.
pub fn margin_percentage(cost: Money, net_cost: Money) -> Percentage {
    if net_cost.is_zero() {
        return Decimal::ZERO;
    }
    (net_cost - cost) / net_cost * HUNDRED
}

/// Renders `$1,234.56` style strings used by document merge fields.
pub fn format_usd(value: Money) -> String {
    let rounded = round_money(value, 2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = format!("{:.2}", rounded.abs());
    let (whole, cents) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, ch) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-${grouped}.{cents}")
    } else {
        format!("${grouped}.{cents}")
    }
}
