use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::expansion::DailyParameterSeries;
use crate::types::*;
use crate::CapexOptionResult;

/// Capacity is quoted in base units; the exercise price is in millions.
const CAPACITY_SCALE: Decimal = dec!(1000000);

/// Per-step exercise price, indexed by the lattice down-move count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExercisePriceSeries(Vec<Money>);

impl ExercisePriceSeries {
    pub fn new(prices: Vec<Money>) -> Self {
        Self(prices)
    }

    /// Flat exercise price over `total_steps + 1` indices.
    pub fn constant(price: Money, total_steps: usize) -> Self {
        Self(vec![price; total_steps + 1])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Money] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<Money> {
        self.0
    }
}

impl std::ops::Index<usize> for ExercisePriceSeries {
    type Output = Money;

    fn index(&self, index: usize) -> &Money {
        &self.0[index]
    }
}

/// Exercise price at a single fine step.
#[allow(clippy::too_many_arguments)]
pub fn exercise_price_at(
    base_price: Money,
    interest_rate: Rate,
    fx_adjustment: Decimal,
    incentive_rate: Rate,
    nameplate_capacity: Decimal,
    capex_loan: Money,
    accrued_capex: Money,
    first_deduction: Money,
    stake_fraction: Rate,
) -> Money {
    let unit_price = (Decimal::ONE + interest_rate) * fx_adjustment + incentive_rate;
    let revenue = base_price * unit_price * nameplate_capacity / CAPACITY_SCALE;
    (revenue - capex_loan - accrued_capex - first_deduction) * stake_fraction
}

/// Derive the exercise-price schedule from expanded daily parameters.
pub fn exercise_prices(
    daily: &DailyParameterSeries,
    stake_fraction: Rate,
) -> CapexOptionResult<ExercisePriceSeries> {
    let len = daily.common_len()?;
    let prices = (0..len)
        .map(|i| {
            exercise_price_at(
                daily.base_price[i],
                daily.interest_rate[i],
                daily.fx_adjustment[i],
                daily.incentive_rate[i],
                daily.nameplate_capacity[i],
                daily.capex_loan[i],
                daily.accrued_capex[i],
                daily.first_deduction[i],
                stake_fraction,
            )
        })
        .collect();
    Ok(ExercisePriceSeries(prices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CapexOptionError;

    fn daily(len: usize) -> DailyParameterSeries {
        DailyParameterSeries {
            base_price: vec![dec!(58); len],
            interest_rate: vec![dec!(0.045); len],
            fx_adjustment: vec![dec!(1); len],
            incentive_rate: vec![dec!(0.12); len],
            nameplate_capacity: vec![dec!(44000000); len],
            capex_loan: vec![dec!(1500); len],
            accrued_capex: vec![dec!(240); len],
            first_deduction: vec![dec!(120); len],
        }
    }

    #[test]
    fn test_exercise_price_formula() {
        // 58 * (1.045 * 1 + 0.12) * 44e6 / 1e6 = 2973.08
        // (2973.08 - 1500 - 240 - 120) * 0.3 = 333.924
        let prices = exercise_prices(&daily(3), dec!(0.3)).unwrap();
        assert_eq!(prices.len(), 3);
        for i in 0..3 {
            assert_eq!(prices[i], dec!(333.924));
        }
    }

    #[test]
    fn test_exercise_price_can_be_negative() {
        let mut d = daily(1);
        d.capex_loan = vec![dec!(5000)];
        let prices = exercise_prices(&d, dec!(1)).unwrap();
        assert!(prices[0] < Decimal::ZERO);
    }

    #[test]
    fn test_exercise_prices_length_mismatch() {
        let mut d = daily(4);
        d.incentive_rate.push(dec!(0.1));
        assert!(matches!(
            exercise_prices(&d, dec!(0.3)),
            Err(CapexOptionError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_constant_series() {
        let series = ExercisePriceSeries::constant(dec!(100), 4);
        assert_eq!(series.len(), 5);
        assert!(series.as_slice().iter().all(|&k| k == dec!(100)));
    }
}
