use rust_decimal::Decimal;
use serde::Serialize;

use crate::decimal_math::{exp_decimal, sqrt_decimal};
use crate::error::CapexOptionError;
use crate::types::*;
use crate::CapexOptionResult;

fn out_of_range(parameter: &str, quantity: &str) -> CapexOptionError {
    CapexOptionError::InvalidMarketParameter {
        parameter: parameter.into(),
        reason: format!("{} exceeds the representable Decimal range", quantity),
    }
}

/// CRR lattice parameters for one engine invocation.
///
/// Constructed only through [`MarketParameters::new`], which derives the
/// up/down factors and the risk-neutral probability and rejects
/// arbitrage-inconsistent combinations (p outside [0, 1]).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketParameters {
    volatility: Rate,
    risk_free_rate: Rate,
    duration: Years,
    steps: usize,
    initial_value: Money,
    dt: Years,
    up: Decimal,
    down: Decimal,
    prob_up: Decimal,
    prob_down: Decimal,
    discount: Decimal,
}

impl MarketParameters {
    pub fn new(
        volatility: Rate,
        risk_free_rate: Rate,
        duration: Years,
        steps: usize,
        initial_value: Money,
    ) -> CapexOptionResult<Self> {
        if volatility <= Decimal::ZERO {
            return Err(CapexOptionError::InvalidMarketParameter {
                parameter: "volatility".into(),
                reason: "must be positive".into(),
            });
        }
        if steps == 0 {
            return Err(CapexOptionError::InvalidMarketParameter {
                parameter: "steps".into(),
                reason: "must be at least 1 (dt undefined)".into(),
            });
        }
        if u32::try_from(steps).is_err() {
            return Err(CapexOptionError::InvalidInput {
                field: "steps".into(),
                reason: format!("must not exceed {}", u32::MAX),
            });
        }
        if duration <= Decimal::ZERO {
            return Err(CapexOptionError::InvalidMarketParameter {
                parameter: "dt".into(),
                reason: "duration must be positive".into(),
            });
        }
        if initial_value <= Decimal::ZERO {
            return Err(CapexOptionError::InvalidMarketParameter {
                parameter: "initial_value".into(),
                reason: "must be positive".into(),
            });
        }

        let dt = duration / Decimal::from(steps as u64);
        let up = volatility
            .checked_mul(sqrt_decimal(dt))
            .and_then(exp_decimal)
            .ok_or_else(|| out_of_range("volatility", "exp(sigma * sqrt(dt))"))?;
        let down = Decimal::ONE / up;
        if up <= down {
            return Err(CapexOptionError::InvalidMarketParameter {
                parameter: "volatility".into(),
                reason: "sigma * sqrt(dt) too small to separate up and down moves".into(),
            });
        }
        let rate_dt = risk_free_rate
            .checked_mul(dt)
            .ok_or_else(|| out_of_range("risk_free_rate", "r * dt"))?;
        let growth =
            exp_decimal(rate_dt).ok_or_else(|| out_of_range("risk_free_rate", "exp(r * dt)"))?;
        let discount =
            exp_decimal(-rate_dt).ok_or_else(|| out_of_range("risk_free_rate", "exp(-r * dt)"))?;
        let prob_up = (growth - down) / (up - down);
        if prob_up < Decimal::ZERO || prob_up > Decimal::ONE {
            return Err(CapexOptionError::InvalidMarketParameter {
                parameter: "risk_neutral_probability".into(),
                reason: format!(
                    "p = {} outside [0, 1]; require d <= exp(r*dt) <= u",
                    prob_up.round_dp(6)
                ),
            });
        }

        Ok(Self {
            volatility,
            risk_free_rate,
            duration,
            steps,
            initial_value,
            dt,
            up,
            down,
            prob_up,
            prob_down: Decimal::ONE - prob_up,
            discount,
        })
    }

    pub fn volatility(&self) -> Rate {
        self.volatility
    }

    pub fn risk_free_rate(&self) -> Rate {
        self.risk_free_rate
    }

    pub fn duration(&self) -> Years {
        self.duration
    }

    /// Number of lattice steps D.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Initial underlying value A0.
    pub fn initial_value(&self) -> Money {
        self.initial_value
    }

    pub fn dt(&self) -> Years {
        self.dt
    }

    pub fn up(&self) -> Decimal {
        self.up
    }

    pub fn down(&self) -> Decimal {
        self.down
    }

    /// Risk-neutral up probability p.
    pub fn prob_up(&self) -> Decimal {
        self.prob_up
    }

    pub fn prob_down(&self) -> Decimal {
        self.prob_down
    }

    /// One-step discount factor exp(-r dt).
    pub fn discount(&self) -> Decimal {
        self.discount
    }

    /// Same market with a different initial value (bump-and-reprice).
    pub fn with_initial_value(&self, initial_value: Money) -> CapexOptionResult<Self> {
        Self::new(
            self.volatility,
            self.risk_free_rate,
            self.duration,
            self.steps,
            initial_value,
        )
    }

    /// Same market with a different volatility (bump-and-reprice).
    pub fn with_volatility(&self, volatility: Rate) -> CapexOptionResult<Self> {
        Self::new(
            volatility,
            self.risk_free_rate,
            self.duration,
            self.steps,
            self.initial_value,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal_math::abs_decimal;
    use rust_decimal_macros::dec;

    fn approx_eq(a: Decimal, b: Decimal, tol: Decimal) -> bool {
        abs_decimal(a - b) < tol
    }

    #[test]
    fn test_reference_parameters() {
        let params =
            MarketParameters::new(dec!(0.5282), dec!(0.0438), dec!(5), 1260, dec!(1104.93))
                .unwrap();
        assert_eq!(params.dt(), dec!(5) / dec!(1260));
        let tol = dec!(0.000000000001);
        assert!(approx_eq(params.up(), dec!(1.0338332254814198), tol));
        assert!(approx_eq(params.down(), dec!(0.9672740006342272), tol));
        assert!(approx_eq(
            params.prob_up(),
            dec!(0.4942939775946091),
            dec!(0.0000000001)
        ));
        assert_eq!(params.prob_up() + params.prob_down(), Decimal::ONE);
        assert!(params.up() > params.down());
        assert!(params.discount() < Decimal::ONE);
    }

    #[test]
    fn test_up_down_reciprocal() {
        let params =
            MarketParameters::new(dec!(0.3), dec!(0.05), dec!(1), 12, dec!(100)).unwrap();
        assert!(approx_eq(
            params.up() * params.down(),
            Decimal::ONE,
            dec!(0.00000000000000000001)
        ));
    }

    #[test]
    fn test_non_positive_volatility_rejected() {
        for sigma in [Decimal::ZERO, dec!(-0.2)] {
            let err = MarketParameters::new(sigma, dec!(0.05), dec!(1), 10, dec!(100));
            assert!(matches!(
                err,
                Err(CapexOptionError::InvalidMarketParameter { ref parameter, .. })
                    if parameter == "volatility"
            ));
        }
    }

    #[test]
    fn test_zero_steps_rejected() {
        assert!(matches!(
            MarketParameters::new(dec!(0.3), dec!(0.05), dec!(1), 0, dec!(100)),
            Err(CapexOptionError::InvalidMarketParameter { .. })
        ));
    }

    #[test]
    fn test_non_positive_duration_rejected() {
        assert!(matches!(
            MarketParameters::new(dec!(0.3), dec!(0.05), Decimal::ZERO, 10, dec!(100)),
            Err(CapexOptionError::InvalidMarketParameter { ref parameter, .. })
                if parameter == "dt"
        ));
    }

    #[test]
    fn test_non_positive_initial_value_rejected() {
        assert!(MarketParameters::new(dec!(0.3), dec!(0.05), dec!(1), 10, dec!(-5)).is_err());
    }

    #[test]
    fn test_arbitrage_inconsistent_probability_rejected() {
        // Tiny volatility with a large rate pushes exp(r dt) above u
        let err = MarketParameters::new(dec!(0.01), dec!(0.5), dec!(1), 1, dec!(100));
        assert!(matches!(
            err,
            Err(CapexOptionError::InvalidMarketParameter { ref parameter, .. })
                if parameter == "risk_neutral_probability"
        ));
    }

    #[test]
    fn test_extreme_volatility_is_an_error_not_a_panic() {
        // sigma * sqrt(dt) = 70 puts u = e^70 past the Decimal range
        let err = MarketParameters::new(dec!(70), dec!(0.05), dec!(1), 1, dec!(100));
        assert!(matches!(
            err,
            Err(CapexOptionError::InvalidMarketParameter { ref parameter, .. })
                if parameter == "volatility"
        ));
    }

    #[test]
    fn test_extreme_rate_is_an_error_not_a_panic() {
        let err = MarketParameters::new(dec!(50), dec!(70), dec!(1), 1, dec!(100));
        assert!(matches!(
            err,
            Err(CapexOptionError::InvalidMarketParameter { ref parameter, .. })
                if parameter == "risk_free_rate"
        ));
    }

    #[test]
    fn test_bumped_copies() {
        let base = MarketParameters::new(dec!(0.3), dec!(0.05), dec!(1), 10, dec!(100)).unwrap();
        let bumped = base.with_initial_value(dec!(101)).unwrap();
        assert_eq!(bumped.initial_value(), dec!(101));
        assert_eq!(bumped.up(), base.up());
        let vol = base.with_volatility(dec!(0.31)).unwrap();
        assert!(vol.up() > base.up());
    }
}
