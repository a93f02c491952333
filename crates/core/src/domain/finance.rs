use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::{Money, Percentage};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FinancialProductType {
    Cash,
    Loan,
    Lease,
    Esa,
}

impl FinancialProductType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Loan => "loan",
            Self::Lease => "lease",
            Self::Esa => "esa",
        }
    }

    pub fn is_third_party_financed(self) -> bool {
        !matches!(self, Self::Cash)
    }

    /// Lease and ESA share the third-party-owned pricing and eligibility rules.
    pub fn is_lease_family(self) -> bool {
        matches!(self, Self::Lease | Self::Esa)
    }
}

impl fmt::Display for FinancialProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Financing selected for the quote, as far as the cost buildup needs it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteFinancing {
    pub product_type: FinancialProductType,
    #[serde(default)]
    pub dealer_fee_percentage: Percentage,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanPaymentTerm {
    pub start_month: u32,
    pub end_month: u32,
    /// Re-amortize the remaining balance at `start_month` when absent.
    pub monthly_payment: Option<Money>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reinvestment {
    pub month: u32,
    pub amount: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanAttributes {
    /// Annual rate in percent.
    pub interest_rate: Percentage,
    pub loan_amount: Option<Money>,
    /// Months.
    pub loan_term: u32,
    pub monthly_payment: Option<Money>,
    #[serde(default)]
    pub terms: Vec<LoanPaymentTerm>,
    #[serde(default)]
    pub reinvestment: Vec<Reinvestment>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyLeasePaymentDetail {
    pub year: u32,
    pub monthly_payment: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseAttributes {
    /// Years.
    pub lease_term: u32,
    pub rate_escalator: Percentage,
    pub lease_amount: Money,
    #[serde(default)]
    pub yearly_lease_payment_details: Vec<YearlyLeasePaymentDetail>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EsaAttributes {
    /// Years.
    pub esa_term: u32,
    pub rate_escalator: Percentage,
    /// Year-one monthly payment.
    pub gross_finance_payment: Option<Money>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FinanceProductAttributes {
    Cash,
    Loan(LoanAttributes),
    Lease(LeaseAttributes),
    Esa(EsaAttributes),
}

impl FinanceProductAttributes {
    pub fn product_type(&self) -> FinancialProductType {
        match self {
            Self::Cash => FinancialProductType::Cash,
            Self::Loan(_) => FinancialProductType::Loan,
            Self::Lease(_) => FinancialProductType::Lease,
            Self::Esa(_) => FinancialProductType::Esa,
        }
    }
}

/// Year-one production of the design, with optional product-specific factors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemProduction {
    pub generation_kwh: Decimal,
    pub annual_degradation: Option<Percentage>,
    pub guaranteed_production: Option<Percentage>,
}

/// One row of a payment schedule. Rows are chronological.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentScheduleEntry {
    pub month: u32,
    pub year: u32,
    pub payment_amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_payment_amount: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_component: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_component: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unpaid_balance: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cumulative_interest: Option<Money>,
}

impl PaymentScheduleEntry {
    pub fn flat(month: u32, year: u32, payment_amount: Money) -> Self {
        Self {
            month,
            year,
            payment_amount,
            pre_payment_amount: None,
            interest_component: None,
            principal_component: None,
            unpaid_balance: None,
            cumulative_interest: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialProduct {
    pub id: String,
    pub name: String,
    pub product_type: FinancialProductType,
    pub min_system_kw: Option<Decimal>,
    pub max_system_kw: Option<Decimal>,
    pub min_battery_kwh: Option<Decimal>,
    pub max_battery_kwh: Option<Decimal>,
    pub min_productivity: Option<Decimal>,
    pub max_productivity: Option<Decimal>,
}

/// Sizing facts the eligibility filter checks product ranges against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemDesignSummary {
    pub system_capacity_kw: Decimal,
    #[serde(default)]
    pub battery_capacity_kwh: Decimal,
    /// Annual kWh produced per installed kW.
    pub productivity: Decimal,
}
