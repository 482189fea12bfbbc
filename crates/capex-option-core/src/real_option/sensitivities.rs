use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::valuation::Sensitivities;
use crate::error::CapexOptionError;
use crate::lattice::{self, MarketParameters};
use crate::schedule::ExercisePriceSeries;
use crate::CapexOptionResult;

/// Central finite differences, repricing the full lattice for each bump.
///
/// Delta bumps A0 by 1% each way; vega bumps sigma by 0.01 absolute, with
/// the lower leg floored at 0.001. A sigma leg the lattice rejects (p
/// outside [0, 1] or an unrepresentable spread) collapses onto the base
/// sigma, giving a one-sided difference.
pub fn compute_sensitivities(
    exercise: &ExercisePriceSeries,
    params: &MarketParameters,
) -> CapexOptionResult<Sensitivities> {
    let s = params.initial_value();
    let ds = s * dec!(0.01);

    let v_up = lattice::price(exercise, &params.with_initial_value(s + ds)?)?;
    let v_down = lattice::price(exercise, &params.with_initial_value(s - ds)?)?;
    let delta = (v_up - v_down) / (dec!(2) * ds);

    let sigma = params.volatility();
    let mut base_value = None;
    let (vol_up, v_up_vol) = vol_leg(exercise, params, sigma + dec!(0.01), &mut base_value)?;
    let (vol_down, v_down_vol) = vol_leg(
        exercise,
        params,
        (sigma - dec!(0.01)).max(dec!(0.001)),
        &mut base_value,
    )?;
    let actual_shift = vol_up - vol_down;
    let vega = if actual_shift != Decimal::ZERO {
        (v_up_vol - v_down_vol) / actual_shift
    } else {
        Decimal::ZERO
    };

    tracing::debug!(%delta, %vega, %vol_up, %vol_down, "sensitivities computed");
    Ok(Sensitivities { delta, vega })
}

/// Price one vega leg; falls back to the (lazily priced) base market when
/// the bumped sigma does not give a valid lattice.
fn vol_leg(
    exercise: &ExercisePriceSeries,
    params: &MarketParameters,
    volatility: Decimal,
    base_value: &mut Option<Decimal>,
) -> CapexOptionResult<(Decimal, Decimal)> {
    let bumped = params
        .with_volatility(volatility)
        .and_then(|bumped| lattice::price(exercise, &bumped));
    match bumped {
        Ok(value) => Ok((volatility, value)),
        Err(CapexOptionError::InvalidMarketParameter { parameter, reason }) => {
            tracing::debug!(%volatility, %parameter, %reason, "vega leg rejected, using base sigma");
            let value = match *base_value {
                Some(v) => v,
                None => {
                    let v = lattice::price(exercise, params)?;
                    *base_value = Some(v);
                    v
                }
            };
            Ok((params.volatility(), value))
        }
        Err(e) => Err(e),
    }
}
