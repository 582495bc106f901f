//! Generic search framework (spec §4.4): an A* engine and a simulated-
//! annealing engine, each parameterized by a `Problem` trait rather than
//! baked into the router/placement engines directly.

pub mod annealing;
pub mod astar;

pub use annealing::{AnnealingEngine, AnnealingProblem};
pub use astar::{AstarEngine, AstarOutcome, AstarProblem};
