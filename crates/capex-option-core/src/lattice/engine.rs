use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

use super::params::MarketParameters;
use super::storage::TriangularGrid;
use crate::decimal_math::checked_pow_decimal;
use crate::error::CapexOptionError;
use crate::schedule::ExercisePriceSeries;
use crate::types::*;
use crate::CapexOptionResult;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Deepest node per time step where exercising now beats holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseBoundary {
    pub time_step: usize,
    pub down_moves: usize,
    pub threshold_value: Money,
}

/// Retained asset-price and option-value grids.
#[derive(Debug, Clone, Serialize)]
pub struct Lattice {
    pub asset_price: TriangularGrid,
    pub option_value: TriangularGrid,
}

impl Lattice {
    pub fn steps(&self) -> usize {
        self.asset_price.steps()
    }

    pub fn asset_price(&self, j: usize, i: usize) -> Option<Decimal> {
        self.asset_price.get(j, i)
    }

    pub fn option_value(&self, j: usize, i: usize) -> Option<Decimal> {
        self.option_value.get(j, i)
    }

    pub fn root_value(&self) -> Decimal {
        self.option_value.row(0)[0]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SolveOptions<'a> {
    /// Keep the full (D+1)-row lattice instead of two rolling rows
    pub retain_lattice: bool,
    /// Checked once per time step; when set the solve stops with `Cancelled`
    pub cancel: Option<&'a AtomicBool>,
}

#[derive(Debug, Clone)]
pub struct LatticeSolution {
    pub option_value: Money,
    pub lattice: Option<Lattice>,
    pub exercise_boundary: Vec<ExerciseBoundary>,
    pub early_exercise_at_root: bool,
}

// ---------------------------------------------------------------------------
// Node arithmetic
// ---------------------------------------------------------------------------

/// A0 * u^(D-j) * d^j using the net exponent, since d = 1/u.
fn terminal_asset_price(params: &MarketParameters, j: usize) -> CapexOptionResult<Decimal> {
    let steps = params.steps();
    let ups = (steps - j) as u32;
    let downs = j as u32;
    let overflow = || CapexOptionError::InvalidMarketParameter {
        parameter: "volatility".into(),
        reason: format!(
            "terminal lattice spread u^{} exceeds the representable Decimal range",
            steps
        ),
    };

    if ups >= downs {
        let growth = checked_pow_decimal(params.up(), ups - downs).ok_or_else(overflow)?;
        params
            .initial_value()
            .checked_mul(growth)
            .ok_or_else(overflow)
    } else {
        let shrink = checked_pow_decimal(params.up(), downs - ups).ok_or_else(overflow)?;
        Ok(params.initial_value() / shrink)
    }
}

fn immediate_exercise(asset: Decimal, strike: Money) -> Decimal {
    (asset - strike).max(Decimal::ZERO)
}

fn continuation(params: &MarketParameters, value_up: Decimal, value_down: Decimal) -> Decimal {
    params.discount() * (params.prob_up() * value_up + params.prob_down() * value_down)
}

fn check_cancelled(options: &SolveOptions<'_>, time_step: usize) -> CapexOptionResult<()> {
    match options.cancel {
        Some(flag) if flag.load(Ordering::Relaxed) => {
            tracing::debug!(time_step, "lattice solve cancelled");
            Err(CapexOptionError::Cancelled { time_step })
        }
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Backward-induct the lattice.
///
/// Two rows are live at a time: the asset row for step i is the step i+1 row
/// divided by u (dropping its last node), and option values are overwritten
/// in place since node j only reads j and j+1 of the later row. With
/// `retain_lattice` each finished row is also copied into triangular grids,
/// so both storage modes share the exact same arithmetic.
pub fn solve(
    exercise: &ExercisePriceSeries,
    params: &MarketParameters,
    options: &SolveOptions<'_>,
) -> CapexOptionResult<LatticeSolution> {
    let steps = params.steps();
    if exercise.len() != steps + 1 {
        return Err(CapexOptionError::ShapeMismatch {
            context: "exercise price series".into(),
            expected: steps + 1,
            actual: exercise.len(),
        });
    }

    let _span = tracing::debug_span!("lattice_solve", steps).entered();
    tracing::debug!(
        up = %params.up(),
        down = %params.down(),
        prob_up = %params.prob_up(),
        retain = options.retain_lattice,
        "starting backward induction"
    );

    check_cancelled(options, steps)?;

    let mut asset_row = (0..=steps)
        .map(|j| terminal_asset_price(params, j))
        .collect::<CapexOptionResult<Vec<_>>>()?;
    let mut value_row: Vec<Decimal> = asset_row
        .iter()
        .zip(exercise.as_slice())
        .map(|(&asset, &strike)| immediate_exercise(asset, strike))
        .collect();

    let mut grids = options
        .retain_lattice
        .then(|| (TriangularGrid::new(steps), TriangularGrid::new(steps)));
    if let Some((asset_grid, value_grid)) = grids.as_mut() {
        asset_grid.row_mut(steps).copy_from_slice(&asset_row);
        value_grid.row_mut(steps).copy_from_slice(&value_row);
    }

    let up = params.up();
    let mut exercise_boundary = Vec::new();
    let mut early_exercise_at_root = false;

    for i in (0..steps).rev() {
        check_cancelled(options, i)?;

        asset_row.truncate(i + 1);
        for asset in asset_row.iter_mut() {
            *asset /= up;
        }

        let mut deepest_exercise: Option<usize> = None;
        for j in 0..=i {
            let hold = continuation(params, value_row[j], value_row[j + 1]);
            let exercise_now = immediate_exercise(asset_row[j], exercise[j]);
            if exercise_now > hold && exercise_now > Decimal::ZERO {
                deepest_exercise = Some(j);
            }
            value_row[j] = exercise_now.max(hold);
        }
        value_row.truncate(i + 1);

        if i == 0 {
            let exercise_now = immediate_exercise(asset_row[0], exercise[0]);
            early_exercise_at_root =
                exercise_now > Decimal::ZERO && exercise_now >= value_row[0];
        }

        if let Some(j) = deepest_exercise {
            exercise_boundary.push(ExerciseBoundary {
                time_step: i,
                down_moves: j,
                threshold_value: asset_row[j],
            });
        }

        if let Some((asset_grid, value_grid)) = grids.as_mut() {
            asset_grid.row_mut(i).copy_from_slice(&asset_row);
            value_grid.row_mut(i).copy_from_slice(&value_row);
        }
    }

    exercise_boundary.reverse();

    let option_value = value_row[0];

    tracing::debug!(%option_value, early_exercise_at_root, "lattice solved");

    Ok(LatticeSolution {
        option_value,
        lattice: grids.map(|(asset_price, option_value)| Lattice {
            asset_price,
            option_value,
        }),
        exercise_boundary,
        early_exercise_at_root,
    })
}

/// Fair value at time zero using rolling O(D) storage.
pub fn price(
    exercise: &ExercisePriceSeries,
    params: &MarketParameters,
) -> CapexOptionResult<Money> {
    solve(exercise, params, &SolveOptions::default()).map(|s| s.option_value)
}

/// Solve and keep the full lattice for inspection.
pub fn build_lattice(
    exercise: &ExercisePriceSeries,
    params: &MarketParameters,
) -> CapexOptionResult<Lattice> {
    let options = SolveOptions {
        retain_lattice: true,
        cancel: None,
    };
    solve(exercise, params, &options)?
        .lattice
        .ok_or_else(|| CapexOptionError::InvalidInput {
            field: "retain_lattice".into(),
            reason: "lattice was not retained".into(),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
