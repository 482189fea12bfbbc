use capex_option_core::lattice::{self, MarketParameters, SolveOptions};
use capex_option_core::schedule::ExercisePriceSeries;
use capex_option_core::CapexOptionError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn within(a: Decimal, b: Decimal, tol: Decimal) -> bool {
    (a - b).abs() < tol
}

// ===========================================================================
// Convergence and reference values
// ===========================================================================

#[test]
fn test_constant_strike_converges_to_black_scholes() {
    // Without dividends an American call is worth the European call.
    // Black-Scholes: S=100, K=100, sigma=20%, r=5%, T=1 -> 10.4506
    let params = MarketParameters::new(dec!(0.2), dec!(0.05), dec!(1), 252, dec!(100)).unwrap();
    let exercise = ExercisePriceSeries::constant(dec!(100), 252);
    let value = lattice::price(&exercise, &params).unwrap();
    assert!(
        within(value, dec!(10.4506), dec!(0.05)),
        "lattice value {} should approximate Black-Scholes 10.4506",
        value
    );
    // Independent 252-step CRR evaluation: 10.442652132
    assert!(within(value, dec!(10.442652132), dec!(0.000001)));
}

#[test]
fn test_no_early_exercise_premium_with_constant_strike() {
    let params = MarketParameters::new(dec!(0.3), dec!(0.05), dec!(1), 60, dec!(100)).unwrap();
    let exercise = ExercisePriceSeries::constant(dec!(95), 60);
    let solved = lattice::solve(&exercise, &params, &SolveOptions::default()).unwrap();
    assert!(solved.exercise_boundary.is_empty());
    assert!(!solved.early_exercise_at_root);
}

#[test]
fn test_rising_strike_can_trigger_early_exercise() {
    // Strike climbs sharply with each down move: deep in-the-money nodes
    // prefer to lock in the current spread
    let steps = 50;
    let params = MarketParameters::new(dec!(0.2), dec!(0.01), dec!(1), steps, dec!(100)).unwrap();
    let exercise = ExercisePriceSeries::new(
        (0..=steps)
            .map(|j| dec!(20) + dec!(5) * Decimal::from(j as u64))
            .collect(),
    );
    let solved = lattice::solve(&exercise, &params, &SolveOptions::default()).unwrap();
    assert!(!solved.exercise_boundary.is_empty());
    assert!(solved.early_exercise_at_root);
    assert!(within(solved.option_value, dec!(80), dec!(0.0000001)));
}

// ===========================================================================
// Lattice invariants
// ===========================================================================

#[test]
fn test_lattice_invariants_hold_everywhere() {
    let steps = 60;
    let params = MarketParameters::new(dec!(0.45), dec!(0.04), dec!(2), steps, dec!(250)).unwrap();
    let exercise = ExercisePriceSeries::new(
        (0..=steps)
            .map(|j| dec!(200) + Decimal::from((j % 7) as u64) * dec!(3))
            .collect(),
    );
    let full = lattice::build_lattice(&exercise, &params).unwrap();

    for i in 0..steps {
        for j in 0..=i {
            let asset = full.asset_price(j, i).unwrap();
            let value = full.option_value(j, i).unwrap();
            assert_eq!(asset, full.asset_price(j, i + 1).unwrap() / params.up());
            assert!(value >= Decimal::ZERO);
            assert!(value >= (asset - exercise[j]).max(Decimal::ZERO));
        }
    }
    for j in 0..=steps {
        let asset = full.asset_price(j, steps).unwrap();
        assert_eq!(
            full.option_value(j, steps).unwrap(),
            (asset - exercise[j]).max(Decimal::ZERO)
        );
    }
    assert!(full.asset_price(steps, steps - 1).is_none());
}

#[test]
fn test_idempotent() {
    let params = MarketParameters::new(dec!(0.35), dec!(0.03), dec!(1), 80, dec!(120)).unwrap();
    let exercise = ExercisePriceSeries::new(
        (0..=80)
            .map(|j| dec!(100) + Decimal::from(j as u64) / dec!(4))
            .collect(),
    );
    let first = lattice::price(&exercise, &params).unwrap();
    let second = lattice::price(&exercise, &params).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, lattice::build_lattice(&exercise, &params).unwrap().root_value());
}

#[test]
fn test_shape_mismatch_is_fatal() {
    let params = MarketParameters::new(dec!(0.35), dec!(0.03), dec!(1), 10, dec!(120)).unwrap();
    let exercise = ExercisePriceSeries::constant(dec!(100), 12);
    assert!(matches!(
        lattice::price(&exercise, &params),
        Err(CapexOptionError::ShapeMismatch { expected: 11, actual: 13, .. })
    ));
}
