//! Uniform solve interface over interchangeable QP backends.
//!
//! Each backend is an adapter implementing [`QpSolver`]. Adapters are
//! allocated by [`BackendKind`] through the [`registry`], which only offers
//! backends enabled as Cargo features.

mod config;
mod reformulate;
mod solver;
mod sparse;
mod warm_start;

pub mod registry;

#[cfg(feature = "clarabel")]
mod clarabel_backend;
#[cfg(feature = "osqp")]
mod osqp_backend;
#[cfg(feature = "quadprog")]
mod quadprog_backend;
#[cfg(feature = "totsu")]
mod totsu_backend;

pub use config::{ClarabelConfig, OsqpConfig, QuadProgConfig, SolverConfig, TotsuConfig};
pub use reformulate::{
    one_sided_with_bounds, row_major, stacked_ranges, stacked_ranges_with_bounds, OneSided,
    Ranges, INFINITY_BOUND,
};
pub use registry::{
    allocate, allocate_from_config, allocate_with_config, available_backends, is_available,
    resolve_any, Solver,
};
pub use solver::QpSolver;
pub use sparse::{CscBuffers, Triangle};
pub use warm_start::{StartState, WarmStart};

#[cfg(feature = "clarabel")]
pub use clarabel_backend::ClarabelSolver;
#[cfg(feature = "osqp")]
pub use osqp_backend::OsqpSolver;
#[cfg(feature = "quadprog")]
pub use quadprog_backend::QuadProgSolver;
#[cfg(feature = "totsu")]
pub use totsu_backend::TotsuSolver;

pub use qpcollection_types::{BackendKind, QpCoeffs, QpDims, QpError, QpProblem, Result};
