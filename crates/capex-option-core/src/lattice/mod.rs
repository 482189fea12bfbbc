pub mod engine;
pub mod params;
pub mod storage;

pub use engine::{
    build_lattice, price, solve, ExerciseBoundary, Lattice, LatticeSolution, SolveOptions,
};
pub use params::MarketParameters;
pub use storage::TriangularGrid;
