use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use capex_option_core::real_option::valuation::{self, CapexOptionInput};

use crate::input;

/// Arguments for capex option pricing
#[derive(Args)]
pub struct PriceArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// Override annualised volatility
    #[arg(long)]
    pub volatility: Option<Decimal>,

    /// Override continuously-compounded risk-free rate
    #[arg(long)]
    pub risk_free_rate: Option<Decimal>,

    /// Override lattice steps per schedule period
    #[arg(long)]
    pub steps_per_bucket: Option<usize>,

    /// Include the full asset/option lattice in the output
    #[arg(long)]
    pub include_lattice: bool,

    /// Compute delta and vega by bump-and-reprice
    #[arg(long)]
    pub sensitivities: bool,
}

/// Arguments for exercise-price schedule expansion
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// Override lattice steps per schedule period
    #[arg(long)]
    pub steps_per_bucket: Option<usize>,
}

fn load_input(
    path: Option<&str>,
    command: &str,
) -> Result<CapexOptionInput, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        input::file::read_input(path)
    } else if let Some(data) = input::stdin::read_stdin()? {
        Ok(serde_json::from_value(data)?)
    } else {
        Err(format!("--input <file.json|file.yaml> or stdin required for {}", command).into())
    }
}

fn apply_overrides(mut option_input: CapexOptionInput, args: &PriceArgs) -> CapexOptionInput {
    if let Some(v) = args.volatility {
        option_input.volatility = v;
    }
    if let Some(r) = args.risk_free_rate {
        option_input.risk_free_rate = r;
    }
    if let Some(s) = args.steps_per_bucket {
        option_input.steps_per_bucket = s;
    }
    if args.include_lattice {
        option_input.include_lattice = true;
    }
    if args.sensitivities {
        option_input.compute_sensitivities = true;
    }
    option_input
}

pub fn run_price(args: PriceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let option_input = load_input(args.input.as_deref(), "capex option pricing")?;
    let option_input = apply_overrides(option_input, &args);
    tracing::info!(
        volatility = %option_input.volatility,
        risk_free_rate = %option_input.risk_free_rate,
        steps_per_bucket = option_input.steps_per_bucket,
        "pricing capex option"
    );
    let result = valuation::value_capex_option(&option_input)?;
    tracing::info!(
        option_value = %result.result.option_value,
        elapsed_us = result.metadata.computation_time_us,
        "valuation complete"
    );
    Ok(serde_json::to_value(result)?)
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut option_input = load_input(args.input.as_deref(), "schedule expansion")?;
    if let Some(s) = args.steps_per_bucket {
        option_input.steps_per_bucket = s;
    }
    let schedule = valuation::build_exercise_schedule(&option_input)?;
    if schedule.coverage.is_clamped() {
        tracing::warn!(
            clamped_steps = schedule.coverage.clamped_steps,
            "schedule shorter than the lattice horizon"
        );
    }

    let rows: Vec<Value> = schedule
        .exercise_prices
        .as_slice()
        .iter()
        .enumerate()
        .map(|(step, price)| json!({ "step": step, "exercise_price": price }))
        .collect();

    Ok(json!({
        "total_steps": schedule.total_steps,
        "coverage": schedule.coverage,
        "results": rows,
    }))
}
