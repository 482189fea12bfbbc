use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CapexOptionError;
use crate::types::*;
use crate::CapexOptionResult;

/// The eight contractual quantities tracked per schedule period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    BasePrice,
    InterestRate,
    FxAdjustment,
    IncentiveRate,
    NameplateCapacity,
    CapexLoan,
    AccruedCapex,
    FirstDeduction,
}

impl Quantity {
    pub const ALL: [Quantity; 8] = [
        Quantity::BasePrice,
        Quantity::InterestRate,
        Quantity::FxAdjustment,
        Quantity::IncentiveRate,
        Quantity::NameplateCapacity,
        Quantity::CapexLoan,
        Quantity::AccruedCapex,
        Quantity::FirstDeduction,
    ];

    pub fn field_name(self) -> &'static str {
        match self {
            Quantity::BasePrice => "base_price",
            Quantity::InterestRate => "interest_rate",
            Quantity::FxAdjustment => "fx_adjustment",
            Quantity::IncentiveRate => "incentive_rate",
            Quantity::NameplateCapacity => "nameplate_capacity",
            Quantity::CapexLoan => "capex_loan",
            Quantity::AccruedCapex => "accrued_capex",
            Quantity::FirstDeduction => "first_deduction",
        }
    }
}

/// Coarse-period contractual schedule (e.g. one value per half year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodicParameterSet {
    /// Unit price of project output
    pub base_price: Vec<Money>,
    /// Contractual interest uplift applied to the base price
    pub interest_rate: Vec<Rate>,
    /// FX adjustment factor
    pub fx_adjustment: Vec<Decimal>,
    /// Incentive rate added on top of the FX-adjusted price
    pub incentive_rate: Vec<Rate>,
    /// Nameplate capacity (output units)
    pub nameplate_capacity: Vec<Decimal>,
    /// Outstanding capex loan balance
    pub capex_loan: Vec<Money>,
    /// Capex accrued to date
    pub accrued_capex: Vec<Money>,
    /// First-deduction amount
    pub first_deduction: Vec<Money>,
}

impl PeriodicParameterSet {
    pub fn series(&self, quantity: Quantity) -> &[Decimal] {
        match quantity {
            Quantity::BasePrice => &self.base_price,
            Quantity::InterestRate => &self.interest_rate,
            Quantity::FxAdjustment => &self.fx_adjustment,
            Quantity::IncentiveRate => &self.incentive_rate,
            Quantity::NameplateCapacity => &self.nameplate_capacity,
            Quantity::CapexLoan => &self.capex_loan,
            Quantity::AccruedCapex => &self.accrued_capex,
            Quantity::FirstDeduction => &self.first_deduction,
        }
    }

    /// Number of coarse periods P. Only meaningful after `validate`.
    pub fn periods(&self) -> usize {
        self.base_price.len()
    }

    /// All eight sequences must be non-empty and share one length.
    pub fn validate(&self) -> CapexOptionResult<()> {
        let expected = self.periods();
        for quantity in Quantity::ALL {
            let actual = self.series(quantity).len();
            if actual == 0 {
                return Err(CapexOptionError::EmptySchedule(
                    quantity.field_name().into(),
                ));
            }
            if actual != expected {
                return Err(CapexOptionError::ShapeMismatch {
                    context: format!("periodic schedule '{}'", quantity.field_name()),
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn flat_schedule(periods: usize) -> PeriodicParameterSet {
        PeriodicParameterSet {
            base_price: vec![dec!(60); periods],
            interest_rate: vec![dec!(0.05); periods],
            fx_adjustment: vec![dec!(1); periods],
            incentive_rate: vec![dec!(0.1); periods],
            nameplate_capacity: vec![dec!(40000000); periods],
            capex_loan: vec![dec!(1500); periods],
            accrued_capex: vec![dec!(250); periods],
            first_deduction: vec![dec!(100); periods],
        }
    }

    #[test]
    fn test_valid_schedule() {
        let schedule = flat_schedule(11);
        assert!(schedule.validate().is_ok());
        assert_eq!(schedule.periods(), 11);
    }

    #[test]
    fn test_empty_schedule_rejected() {
        let schedule = flat_schedule(0);
        match schedule.validate() {
            Err(CapexOptionError::EmptySchedule(name)) => assert_eq!(name, "base_price"),
            other => panic!("expected EmptySchedule, got {:?}", other),
        }
    }

    #[test]
    fn test_single_empty_quantity_rejected() {
        let mut schedule = flat_schedule(3);
        schedule.first_deduction.clear();
        assert!(matches!(
            schedule.validate(),
            Err(CapexOptionError::EmptySchedule(_))
        ));
    }

    #[test]
    fn test_ragged_schedule_rejected() {
        let mut schedule = flat_schedule(4);
        schedule.accrued_capex.push(dec!(1));
        match schedule.validate() {
            Err(CapexOptionError::ShapeMismatch {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 4);
                assert_eq!(actual, 5);
            }
            other => panic!("expected ShapeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_quantity_lookup() {
        let schedule = flat_schedule(2);
        assert_eq!(schedule.series(Quantity::CapexLoan), &[dec!(1500), dec!(1500)]);
        assert_eq!(Quantity::NameplateCapacity.field_name(), "nameplate_capacity");
    }

    #[test]
    fn test_deserialize_from_json() {
        let json = r#"{
            "base_price": ["58.0"],
            "interest_rate": ["0.045"],
            "fx_adjustment": ["1.0"],
            "incentive_rate": ["0.12"],
            "nameplate_capacity": ["44000000"],
            "capex_loan": ["1500"],
            "accrued_capex": ["240"],
            "first_deduction": ["120"]
        }"#;
        let schedule: PeriodicParameterSet = serde_json::from_str(json).unwrap();
        assert_eq!(schedule.periods(), 1);
        assert_eq!(schedule.interest_rate[0], dec!(0.045));
    }
}
