pub mod valuation;

#[cfg(feature = "sensitivities")]
pub mod sensitivities;

pub use valuation::{
    build_exercise_schedule, value_capex_option, CapexOptionInput, CapexOptionOutput,
};
