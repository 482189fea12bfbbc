use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::CapexOptionError;
use crate::lattice::{self, ExerciseBoundary, Lattice, MarketParameters, SolveOptions};
use crate::schedule::{
    exercise_prices, expand_schedule, ExercisePriceSeries, PeriodicParameterSet,
    ScheduleCoverage,
};
use crate::types::*;
use crate::CapexOptionResult;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapexOptionInput {
    /// Periodic contractual schedule (one value per coarse period)
    pub schedule: PeriodicParameterSet,
    /// Participation duration in years
    pub duration_years: Years,
    /// Lattice steps per year (default 252)
    #[serde(default = "default_trading_days")]
    pub trading_days_per_year: u32,
    /// Fine steps covered by each schedule period (default 126 = 6 x 21)
    #[serde(default = "default_steps_per_bucket")]
    pub steps_per_bucket: usize,
    /// Fraction of the project held (scales A0 and the exercise price)
    pub stake_fraction: Rate,
    /// Annualised volatility of the project value
    pub volatility: Rate,
    /// Continuously-compounded risk-free rate
    pub risk_free_rate: Rate,
    /// Full (100%) value of the underlying project
    pub underlying_full_value: Money,
    /// Return the per-step exercise prices with the result
    #[serde(default)]
    pub include_exercise_prices: bool,
    /// Return the full asset/option lattice with the result
    #[serde(default)]
    pub include_lattice: bool,
    /// Bump-and-reprice delta and vega
    #[serde(default)]
    pub compute_sensitivities: bool,
}

fn default_trading_days() -> u32 {
    252
}

fn default_steps_per_bucket() -> usize {
    126
}

/// Lattice parameters as used for the valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub initial_value: Money,
    pub dt: Years,
    pub up: Decimal,
    pub down: Decimal,
    pub prob_up: Decimal,
    pub discount: Decimal,
}

impl From<&MarketParameters> for MarketSnapshot {
    fn from(params: &MarketParameters) -> Self {
        Self {
            initial_value: params.initial_value(),
            dt: params.dt(),
            up: params.up(),
            down: params.down(),
            prob_up: params.prob_up(),
            discount: params.discount(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sensitivities {
    /// dV/dA0
    pub delta: Decimal,
    /// dV/dsigma
    pub vega: Decimal,
}

/// Exercise-price schedule on the lattice grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseSchedule {
    pub total_steps: usize,
    pub coverage: ScheduleCoverage,
    pub exercise_prices: ExercisePriceSeries,
}

#[derive(Debug, Clone, Serialize)]
pub struct CapexOptionOutput {
    /// Fair value of the option at time zero
    pub option_value: Money,
    /// max(0, A0 - K_0)
    pub intrinsic_value: Money,
    /// A0 - K_0
    pub static_npv: Money,
    /// option_value - intrinsic_value
    pub option_premium: Money,
    /// Whether exercising at time zero is optimal
    pub early_exercise_optimal: bool,
    /// Number of lattice steps D
    pub total_steps: usize,
    pub coverage: ScheduleCoverage,
    pub market: MarketSnapshot,
    /// Exercise threshold at each time step where early exercise occurs
    pub optimal_exercise_boundary: Vec<ExerciseBoundary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise_prices: Option<ExercisePriceSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lattice: Option<Lattice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivities: Option<Sensitivities>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_input(input: &CapexOptionInput) -> CapexOptionResult<()> {
    if input.duration_years <= Decimal::ZERO {
        return Err(CapexOptionError::InvalidInput {
            field: "duration_years".into(),
            reason: "must be positive".into(),
        });
    }
    if input.trading_days_per_year == 0 {
        return Err(CapexOptionError::InvalidInput {
            field: "trading_days_per_year".into(),
            reason: "must be at least 1".into(),
        });
    }
    if input.steps_per_bucket == 0 {
        return Err(CapexOptionError::InvalidInput {
            field: "steps_per_bucket".into(),
            reason: "must be at least 1".into(),
        });
    }
    if input.stake_fraction <= Decimal::ZERO || input.stake_fraction > Decimal::ONE {
        return Err(CapexOptionError::InvalidInput {
            field: "stake_fraction".into(),
            reason: "must be in (0, 1]".into(),
        });
    }
    if input.underlying_full_value <= Decimal::ZERO {
        return Err(CapexOptionError::InvalidInput {
            field: "underlying_full_value".into(),
            reason: "must be positive".into(),
        });
    }
    Ok(())
}

/// D = trading days per year x duration; must be a whole number of steps.
pub fn total_steps(input: &CapexOptionInput) -> CapexOptionResult<usize> {
    let steps = input.duration_years * Decimal::from(input.trading_days_per_year);
    if !steps.fract().is_zero() {
        return Err(CapexOptionError::InvalidInput {
            field: "duration_years".into(),
            reason: format!(
                "duration x trading days ({}) must be a whole number of steps",
                steps.normalize()
            ),
        });
    }
    steps
        .to_usize()
        .filter(|&d| d > 0)
        .ok_or_else(|| CapexOptionError::InvalidInput {
            field: "duration_years".into(),
            reason: "yields no lattice steps".into(),
        })
}

// ---------------------------------------------------------------------------
// Pipeline stages
// ---------------------------------------------------------------------------

/// Expand the periodic schedule and derive the per-step exercise prices.
pub fn build_exercise_schedule(input: &CapexOptionInput) -> CapexOptionResult<ExerciseSchedule> {
    validate_input(input)?;
    let steps = total_steps(input)?;
    let daily = expand_schedule(&input.schedule, steps, input.steps_per_bucket)?;
    let prices = exercise_prices(&daily, input.stake_fraction)?;
    Ok(ExerciseSchedule {
        total_steps: steps,
        coverage: ScheduleCoverage::new(input.schedule.periods(), steps, input.steps_per_bucket),
        exercise_prices: prices,
    })
}

/// Market parameters for the lattice; A0 is the stake share of the full value.
pub fn market_parameters(
    input: &CapexOptionInput,
    steps: usize,
) -> CapexOptionResult<MarketParameters> {
    MarketParameters::new(
        input.volatility,
        input.risk_free_rate,
        input.duration_years,
        steps,
        input.underlying_full_value * input.stake_fraction,
    )
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn value_capex_option(
    input: &CapexOptionInput,
) -> CapexOptionResult<ComputationOutput<CapexOptionOutput>> {
    let start = Instant::now();

    let schedule = build_exercise_schedule(input)?;
    let params = market_parameters(input, schedule.total_steps)?;
    let exercise = &schedule.exercise_prices;

    let options = SolveOptions {
        retain_lattice: input.include_lattice,
        cancel: None,
    };
    let solution = lattice::solve(exercise, &params, &options)?;

    let option_value = solution.option_value;
    let static_npv = params.initial_value() - exercise[0];
    let intrinsic_value = static_npv.max(Decimal::ZERO);
    let option_premium = (option_value - intrinsic_value).max(Decimal::ZERO);

    let mut warnings = Vec::new();
    if schedule.coverage.is_clamped() {
        warnings.push(format!(
            "Schedule covers {} steps but the lattice needs {}; {} steps use the final period",
            schedule.coverage.nominal_span,
            schedule.coverage.required_steps,
            schedule.coverage.clamped_steps
        ));
    }
    let negative_strikes = exercise
        .as_slice()
        .iter()
        .filter(|k| **k < Decimal::ZERO)
        .count();
    if negative_strikes > 0 {
        warnings.push(format!(
            "{} exercise prices are negative (costs exceed revenue)",
            negative_strikes
        ));
    }
    if solution.early_exercise_at_root {
        warnings.push("Immediate exercise appears optimal".into());
    }

    let sensitivities = if input.compute_sensitivities {
        sensitivities_or_warn(exercise, &params, &mut warnings)?
    } else {
        None
    };

    let output = CapexOptionOutput {
        option_value,
        intrinsic_value,
        static_npv,
        option_premium,
        early_exercise_optimal: solution.early_exercise_at_root,
        total_steps: schedule.total_steps,
        coverage: schedule.coverage,
        market: MarketSnapshot::from(&params),
        optimal_exercise_boundary: solution.exercise_boundary,
        exercise_prices: input
            .include_exercise_prices
            .then(|| schedule.exercise_prices.clone()),
        lattice: solution.lattice,
        sensitivities,
    };

    let assumptions = serde_json::json!({
        "model": "CRR Binomial Lattice",
        "exercise": "American, step-changing exercise price",
        "steps": schedule.total_steps,
        "trading_days_per_year": input.trading_days_per_year,
        "steps_per_bucket": input.steps_per_bucket,
        "schedule_periods": input.schedule.periods(),
        "stake_fraction": input.stake_fraction.to_string(),
        "volatility": input.volatility.to_string(),
        "risk_free_rate": input.risk_free_rate.to_string(),
        "duration_years": input.duration_years.to_string(),
    });

    let elapsed = start.elapsed().as_micros() as u64;
    tracing::debug!(
        option_value = %output.option_value,
        steps = output.total_steps,
        elapsed_us = elapsed,
        "capex option valued"
    );

    Ok(with_metadata(
        "CRR Binomial Lattice — Capex Project Option Valuation",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(feature = "sensitivities")]
fn sensitivities_or_warn(
    exercise: &ExercisePriceSeries,
    params: &MarketParameters,
    warnings: &mut Vec<String>,
) -> CapexOptionResult<Option<Sensitivities>> {
    match super::sensitivities::compute_sensitivities(exercise, params) {
        Ok(greeks) => Ok(Some(greeks)),
        Err(CapexOptionError::InvalidMarketParameter { parameter, reason }) => {
            warnings.push(format!(
                "Sensitivities skipped: bumped {} is invalid ({})",
                parameter, reason
            ));
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(not(feature = "sensitivities"))]
fn sensitivities_or_warn(
    _exercise: &ExercisePriceSeries,
    _params: &MarketParameters,
    warnings: &mut Vec<String>,
) -> CapexOptionResult<Option<Sensitivities>> {
    warnings.push("Sensitivities requested but the 'sensitivities' feature is disabled".into());
    Ok(None)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
