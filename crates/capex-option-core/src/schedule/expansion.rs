use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::periodic::{PeriodicParameterSet, Quantity};
use crate::error::CapexOptionError;
use crate::types::*;
use crate::CapexOptionResult;

/// Dense per-step parameter sequences, each of length D+1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyParameterSeries {
    pub base_price: Vec<Money>,
    pub interest_rate: Vec<Rate>,
    pub fx_adjustment: Vec<Decimal>,
    pub incentive_rate: Vec<Rate>,
    pub nameplate_capacity: Vec<Decimal>,
    pub capex_loan: Vec<Money>,
    pub accrued_capex: Vec<Money>,
    pub first_deduction: Vec<Money>,
}

impl DailyParameterSeries {
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

    /// Common length of the eight series, or `ShapeMismatch` naming the first
    /// series that disagrees with `base_price`.
    pub fn common_len(&self) -> CapexOptionResult<usize> {
        let expected = self.base_price.len();
        for quantity in Quantity::ALL {
            let actual = self.series(quantity).len();
            if actual != expected {
                return Err(CapexOptionError::ShapeMismatch {
                    context: format!("daily series '{}'", quantity.field_name()),
                    expected,
                    actual,
                });
            }
        }
        Ok(expected)
    }
}

/// How far the periodic schedule reaches relative to the lattice horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleCoverage {
    /// Number of fine steps covered by the schedule: P × S
    pub nominal_span: usize,
    /// Number of fine indices required by the lattice: D + 1
    pub required_steps: usize,
    /// Fine indices served by clamping to the final period
    pub clamped_steps: usize,
}

impl ScheduleCoverage {
    pub fn new(periods: usize, total_steps: usize, steps_per_bucket: usize) -> Self {
        let nominal_span = periods.saturating_mul(steps_per_bucket);
        let required_steps = total_steps + 1;
        Self {
            nominal_span,
            required_steps,
            clamped_steps: required_steps.saturating_sub(nominal_span),
        }
    }

    pub fn is_clamped(&self) -> bool {
        self.clamped_steps > 0
    }
}

/// Coarse bucket serving fine index `step`, clamped to the final bucket.
pub fn bucket_index(step: usize, steps_per_bucket: usize, periods: usize) -> usize {
    (step / steps_per_bucket).min(periods.saturating_sub(1))
}

/// Step-broadcast one periodic sequence onto fine indices `0..=total_steps`.
pub fn expand(
    periodic: &[Decimal],
    total_steps: usize,
    steps_per_bucket: usize,
) -> CapexOptionResult<Vec<Decimal>> {
    if periodic.is_empty() {
        return Err(CapexOptionError::EmptySchedule("periodic sequence".into()));
    }
    if steps_per_bucket == 0 {
        return Err(CapexOptionError::InvalidInput {
            field: "steps_per_bucket".into(),
            reason: "must be at least 1".into(),
        });
    }
    Ok((0..=total_steps)
        .map(|step| periodic[bucket_index(step, steps_per_bucket, periodic.len())])
        .collect())
}

/// Expand every quantity of a periodic schedule independently.
pub fn expand_schedule(
    schedule: &PeriodicParameterSet,
    total_steps: usize,
    steps_per_bucket: usize,
) -> CapexOptionResult<DailyParameterSeries> {
    schedule.validate()?;

    let expand_one = |quantity: Quantity| {
        expand(schedule.series(quantity), total_steps, steps_per_bucket)
    };

    let coverage = ScheduleCoverage::new(schedule.periods(), total_steps, steps_per_bucket);
    if coverage.is_clamped() {
        tracing::debug!(
            nominal_span = coverage.nominal_span,
            required_steps = coverage.required_steps,
            clamped_steps = coverage.clamped_steps,
            "schedule shorter than lattice horizon, clamping to final period"
        );
    }

    Ok(DailyParameterSeries {
        base_price: expand_one(Quantity::BasePrice)?,
        interest_rate: expand_one(Quantity::InterestRate)?,
        fx_adjustment: expand_one(Quantity::FxAdjustment)?,
        incentive_rate: expand_one(Quantity::IncentiveRate)?,
        nameplate_capacity: expand_one(Quantity::NameplateCapacity)?,
        capex_loan: expand_one(Quantity::CapexLoan)?,
        accrued_capex: expand_one(Quantity::AccruedCapex)?,
        first_deduction: expand_one(Quantity::FirstDeduction)?,
    })
}
