use std::collections::BTreeMap;

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::domain::finance::{FinancialProductType, LoanAttributes, LoanPaymentTerm, PaymentScheduleEntry};
use crate::errors::{ApplicationError, DomainError};
use crate::money::{round_money, sum_money, Money, Percentage};

const MONTHS_PER_YEAR: u32 = 12;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanSummary {
    /// Payment in force at month 1.
    pub monthly_payment: Money,
    pub total_paid: Money,
    pub total_interest: Money,
    pub total_pre_payments: Money,
    /// Month the balance reached zero, if it did within the term.
    pub payoff_month: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanSchedule {
    pub entries: Vec<PaymentScheduleEntry>,
    pub summary: LoanSummary,
}

/// Monthly rate as a fraction from an annual percentage.
pub fn monthly_rate(annual_rate: Percentage) -> Decimal {
    annual_rate / Decimal::from(MONTHS_PER_YEAR) / dec!(100)
}

/// Annuity payment that retires `principal` over `months` at `rate` per month.
pub fn level_payment(principal: Money, rate: Decimal, months: u32) -> Result<Money, DomainError> {
    if months == 0 {
        return Err(DomainError::invalid_input("loanTerm", "must be at least one month"));
    }
    if rate.is_zero() {
        return Ok(principal / Decimal::from(months));
    }

    let growth = (Decimal::ONE + rate)
        .checked_powu(u64::from(months))
        .ok_or_else(|| DomainError::InvariantViolation("annuity factor overflowed".to_owned()))?;
    Ok(principal * rate * growth / (growth - Decimal::ONE))
}

/// Principal retired this month: the regular payment net of interest plus any prepayment,
/// never more than the outstanding balance.
pub fn current_month_principal_component(
    regular_payment: Money,
    interest_paid: Money,
    pre_payment: Money,
    balance: Money,
) -> Money {
    let scheduled = (regular_payment - interest_paid).max(Decimal::ZERO);
    (scheduled + pre_payment).min(balance).max(Decimal::ZERO)
}

fn validate(attributes: &LoanAttributes) -> Result<Money, ApplicationError> {
    let principal = attributes.loan_amount.ok_or_else(|| ApplicationError::MissingAttribute {
        product: FinancialProductType::Loan.to_string(),
        attribute: "loanAmount".to_owned(),
    })?;

    if principal < Decimal::ZERO {
        return Err(DomainError::invalid_input("loanAmount", "cannot be negative").into());
    }
    if attributes.interest_rate < Decimal::ZERO {
        return Err(DomainError::invalid_input("interestRate", "cannot be negative").into());
    }
    if attributes.loan_term == 0 && principal > Decimal::ZERO {
        return Err(
            DomainError::invalid_input("loanTerm", "a balance cannot be amortized over zero months").into()
        );
    }
    if attributes.monthly_payment.is_some_and(|payment| payment < Decimal::ZERO) {
        return Err(DomainError::invalid_input("monthlyPayment", "cannot be negative").into());
    }

    for term in &attributes.terms {
        if term.start_month == 0 || term.start_month > term.end_month || term.end_month > attributes.loan_term {
            return Err(DomainError::invalid_input(
                "terms",
                format!("period {}..{} is outside the loan term", term.start_month, term.end_month),
            )
            .into());
        }
        if term.monthly_payment.is_some_and(|payment| payment < Decimal::ZERO) {
            return Err(DomainError::invalid_input("terms.monthlyPayment", "cannot be negative").into());
        }
    }

    for reinvestment in &attributes.reinvestment {
        if reinvestment.month == 0 || reinvestment.month > attributes.loan_term {
            return Err(DomainError::invalid_input(
                "reinvestment.month",
                format!("month {} is outside the loan term", reinvestment.month),
            )
            .into());
        }
        if reinvestment.amount < Decimal::ZERO {
            return Err(DomainError::invalid_input("reinvestment.amount", "cannot be negative").into());
        }
    }

    Ok(principal)
}

/// Month-by-month amortization with payment periods and prepayments.
///
/// Interest a payment cannot cover is carried into the next month's interest due; it never
/// capitalizes into the balance.
pub fn solve_loan(attributes: &LoanAttributes, config: &EngineConfig) -> Result<LoanSchedule, ApplicationError> {
    let principal = validate(attributes)?;
    let rate = monthly_rate(attributes.interest_rate);
    let term = attributes.loan_term;
    let places = config.money_decimal_places;

    let mut periods: Vec<&LoanPaymentTerm> = attributes.terms.iter().collect();
    periods.sort_by_key(|period| period.start_month);

    let mut pre_payments: BTreeMap<u32, Money> = BTreeMap::new();
    for reinvestment in &attributes.reinvestment {
        *pre_payments.entry(reinvestment.month).or_insert(Decimal::ZERO) += reinvestment.amount;
    }

    let mut payment = match attributes.monthly_payment {
        Some(payment) => payment,
        None if term == 0 => Decimal::ZERO,
        None => level_payment(principal, rate, term)?,
    };

    let mut balance = principal;
    let mut carried_interest = Decimal::ZERO;
    let mut cumulative_interest = Decimal::ZERO;
    let mut first_payment = None;
    let mut payoff_month = None;
    let mut active_until: Option<u32> = None;
    let mut entries = Vec::with_capacity(term as usize);

    for month in 1..=term {
        if balance <= Decimal::ZERO {
            payoff_month = Some(month - 1);
            break;
        }

        let mut period_started = false;
        for period in periods.iter().filter(|period| period.start_month == month) {
            payment = match period.monthly_payment {
                Some(amount) => amount,
                None => level_payment(balance, rate, term - month + 1)?,
            };
            active_until = Some(period.end_month);
            period_started = true;
        }
        // A lapsed period with no successor falls back to amortizing what is left.
        if !period_started && active_until.is_some_and(|end| month > end) {
            payment = level_payment(balance, rate, term - month + 1)?;
            active_until = None;
        }
        first_payment.get_or_insert(payment);

        let interest_due = balance * rate + carried_interest;
        let regular_payment = payment.min(balance + interest_due);
        let interest_paid = regular_payment.min(interest_due);
        carried_interest = interest_due - interest_paid;

        let requested_pre_payment = pre_payments.get(&month).copied().unwrap_or(Decimal::ZERO);
        let principal_component =
            current_month_principal_component(regular_payment, interest_paid, requested_pre_payment, balance);
        let scheduled_principal = (regular_payment - interest_paid).max(Decimal::ZERO);
        let applied_pre_payment = (principal_component - scheduled_principal).max(Decimal::ZERO);

        balance = (balance - principal_component).max(Decimal::ZERO);
        // Sub-cent residue from the annuity factor counts as paid off.
        if round_money(balance, places).is_zero() {
            balance = Decimal::ZERO;
        }
        cumulative_interest += interest_paid;

        entries.push(PaymentScheduleEntry {
            month,
            year: (month - 1) / MONTHS_PER_YEAR + 1,
            payment_amount: regular_payment,
            pre_payment_amount: Some(applied_pre_payment),
            interest_component: Some(interest_paid),
            principal_component: Some(principal_component),
            unpaid_balance: Some(balance),
            cumulative_interest: Some(cumulative_interest),
        });
    }

    if payoff_month.is_none() && balance <= Decimal::ZERO {
        payoff_month = Some(entries.len() as u32);
    }
    if balance > Decimal::ZERO {
        tracing::warn!(
            event_name = "finance.loan.balance_remaining",
            term,
            remaining = %balance,
            "loan balance is not retired within the term"
        );
    }

    let summary = LoanSummary {
        monthly_payment: round_money(first_payment.unwrap_or(payment), places),
        total_paid: round_money(
            sum_money(entries.iter().map(|entry| entry.payment_amount + entry.pre_payment_amount.unwrap_or_default())),
            places,
        ),
        total_interest: round_money(cumulative_interest, places),
        total_pre_payments: round_money(
            sum_money(entries.iter().filter_map(|entry| entry.pre_payment_amount)),
            places,
        ),
        payoff_month,
    };

    tracing::debug!(
        event_name = "finance.loan.solved",
        term,
        months = entries.len(),
        payoff_month = ?summary.payoff_month,
        "loan schedule computed"
    );

    Ok(LoanSchedule { entries: entries.into_iter().map(|entry| round_entry(entry, places)).collect(), summary })
}

fn round_entry(entry: PaymentScheduleEntry, places: u32) -> PaymentScheduleEntry {
    let round = |value: Option<Money>| value.map(|value| round_money(value, places));
    PaymentScheduleEntry {
        payment_amount: round_money(entry.payment_amount, places),
        pre_payment_amount: round(entry.pre_payment_amount),
        interest_component: round(entry.interest_component),
        principal_component: round(entry.principal_component),
        unpaid_balance: round(entry.unpaid_balance),
        cumulative_interest: round(entry.cumulative_interest),
        ..entry
    }
}
