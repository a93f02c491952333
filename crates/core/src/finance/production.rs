use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::domain::finance::SystemProduction;
use crate::errors::DomainError;
use crate::money::{percentage_of, Percentage};

/// Year-indexed expected and guaranteed production. Index 0 is contract year 1.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionTables {
    #[serde(rename = "EPV_YLD")]
    pub epv_yld: Vec<Decimal>,
    #[serde(rename = "EPV_YLD_CUM")]
    pub epv_yld_cum: Vec<Decimal>,
    #[serde(rename = "GPV_YLD")]
    pub gpv_yld: Vec<Decimal>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProductionFactors {
    pub annual_degradation: Percentage,
    pub guaranteed_production: Percentage,
}

impl ProductionFactors {
    pub fn resolve(production: &SystemProduction, config: &EngineConfig) -> Result<Self, DomainError> {
        let annual_degradation =
            production.annual_degradation.unwrap_or(config.default_annual_degradation);
        let guaranteed_production =
            production.guaranteed_production.unwrap_or(config.default_guaranteed_production);

        check_percentage("annualDegradation", annual_degradation)?;
        check_percentage("guaranteedProduction", guaranteed_production)?;

        Ok(Self { annual_degradation, guaranteed_production })
    }
}

fn check_percentage(field: &str, value: Percentage) -> Result<(), DomainError> {
    if value < Decimal::ZERO || value > dec!(100) {
        return Err(DomainError::invalid_input(field, "must be between 0 and 100"));
    }
    Ok(())
}

/// Geometric degradation: `EPV[n] = EPV[n-1] * (1 - degradation/100)`.
pub fn production_tables(
    production: &SystemProduction,
    years: u32,
    config: &EngineConfig,
) -> Result<ProductionTables, DomainError> {
    if production.generation_kwh < Decimal::ZERO {
        return Err(DomainError::invalid_input("generationKWh", "cannot be negative"));
    }

    let factors = ProductionFactors::resolve(production, config)?;
    let retention = Decimal::ONE - factors.annual_degradation / dec!(100);

    let capacity = years as usize;
    let mut tables = ProductionTables {
        epv_yld: Vec::with_capacity(capacity),
        epv_yld_cum: Vec::with_capacity(capacity),
        gpv_yld: Vec::with_capacity(capacity),
    };

    let mut expected = production.generation_kwh;
    let mut cumulative = Decimal::ZERO;
    for year in 0..years {
        if year > 0 {
            expected *= retention;
        }
        cumulative += expected;

        tables.epv_yld.push(expected);
        tables.epv_yld_cum.push(cumulative);
        tables.gpv_yld.push(percentage_of(expected, factors.guaranteed_production));
    }

    Ok(tables)
}
