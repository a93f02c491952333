use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Percentage;

/// Labor markup band keyed by system size.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaborFeeSchedule {
    pub min_system_kw: Decimal,
    pub max_system_kw: Decimal,
    pub markup_percentage: Percentage,
}

impl LaborFeeSchedule {
    pub fn covers(&self, system_kw: Decimal) -> bool {
        self.min_system_kw <= system_kw && system_kw <= self.max_system_kw
    }
}

/// Partner-level pricing configuration. Read-only to the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerMarkupConfig {
    pub partner_id: String,
    pub adder_markup: Percentage,
    pub soft_cost_markup: Percentage,
    pub swell_standard_markup: Percentage,
    #[serde(default)]
    pub labor_fee_schedules: Vec<LaborFeeSchedule>,
    #[serde(default)]
    pub sales_origination_manager_fee: Percentage,
    #[serde(default)]
    pub sales_origination_sales_fee: Percentage,
    #[serde(default)]
    pub cash_discount: Percentage,
}

impl PartnerMarkupConfig {
    /// First labor band covering `system_kw`; zero markup when no band matches.
    pub fn labor_markup(&self, system_kw: Decimal) -> Percentage {
        self.labor_fee_schedules
            .iter()
            .find(|schedule| schedule.covers(system_kw))
            .map(|schedule| schedule.markup_percentage)
            .unwrap_or(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::{LaborFeeSchedule, PartnerMarkupConfig};

    #[test]
    fn labor_markup_uses_first_band_covering_system_size() {
        let partner = PartnerMarkupConfig {
            partner_id: "partner-1".to_owned(),
            adder_markup: dec!(10),
            soft_cost_markup: dec!(5),
            swell_standard_markup: dec!(20),
            labor_fee_schedules: vec![
                LaborFeeSchedule {
                    min_system_kw: dec!(0),
                    max_system_kw: dec!(10),
                    markup_percentage: dec!(15),
                },
                LaborFeeSchedule {
                    min_system_kw: dec!(10),
                    max_system_kw: dec!(25),
                    markup_percentage: dec!(12),
                },
            ],
            sales_origination_manager_fee: Decimal::ZERO,
            sales_origination_sales_fee: Decimal::ZERO,
            cash_discount: Decimal::ZERO,
        };

        assert_eq!(partner.labor_markup(dec!(8.4)), dec!(15));
        assert_eq!(partner.labor_markup(dec!(10)), dec!(15));
        assert_eq!(partner.labor_markup(dec!(12)), dec!(12));
        assert_eq!(partner.labor_markup(dec!(40)), Decimal::ZERO);
    }
}
