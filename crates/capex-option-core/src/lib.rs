pub mod error;
pub mod lattice;
pub mod schedule;
pub mod types;

mod decimal_math;

#[cfg(feature = "valuation")]
pub mod real_option;

pub use error::CapexOptionError;
pub use types::*;

/// Standard result type for all capex-option operations
pub type CapexOptionResult<T> = Result<T, CapexOptionError>;
