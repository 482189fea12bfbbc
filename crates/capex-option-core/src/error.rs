use thiserror::Error;

#[derive(Debug, Error)]
pub enum CapexOptionError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Shape mismatch in {context}: expected length {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid market parameter: {parameter} — {reason}")]
    InvalidMarketParameter { parameter: String, reason: String },

    #[error("Empty schedule: {0} has no periods to expand")]
    EmptySchedule(String),

    #[error("Lattice solve cancelled at time step {time_step}")]
    Cancelled { time_step: usize },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CapexOptionError {
    fn from(e: serde_json::Error) -> Self {
        CapexOptionError::SerializationError(e.to_string())
    }
}
