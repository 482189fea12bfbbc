pub mod exercise;
pub mod expansion;
pub mod periodic;

pub use exercise::{exercise_prices, ExercisePriceSeries};
pub use expansion::{expand, expand_schedule, DailyParameterSeries, ScheduleCoverage};
pub use periodic::{PeriodicParameterSet, Quantity};
