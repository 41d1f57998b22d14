use qpcollection_types::{BackendKind, QpError, Result};
use serde::{Deserialize, Serialize};

/// Solver selection plus per-backend settings.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// backend = "OSQP"
///
/// [osqp]
/// force_initialize = false
/// eps_abs = 1e-7
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub backend: BackendKind,
    pub quadprog: QuadProgConfig,
    pub osqp: OsqpConfig,
    pub clarabel: ClarabelConfig,
    pub totsu: TotsuConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            backend: BackendKind::Any,
            quadprog: QuadProgConfig::default(),
            osqp: OsqpConfig::default(),
            clarabel: ClarabelConfig::default(),
            totsu: TotsuConfig::default(),
        }
    }
}

impl SolverConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| QpError::Config(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadProgConfig {
    /// Always factorize the objective from scratch
    pub force_initialize: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsqpConfig {
    /// Rebuild the workspace on every solve instead of updating it
    pub force_initialize: bool,
    /// Treat hitting `max_iter` as success
    pub accept_max_iterations: bool,
    pub max_iter: u32,
    pub eps_abs: f64,
    pub eps_rel: f64,
    pub polish: bool,
    pub verbose: bool,
}

impl Default for OsqpConfig {
    fn default() -> Self {
        OsqpConfig {
            force_initialize: true,
            accept_max_iterations: false,
            max_iter: 10_000,
            eps_abs: 1e-6,
            eps_rel: 1e-6,
            polish: true,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClarabelConfig {
    /// Set up a fresh solver on every solve instead of updating its data
    pub force_initialize: bool,
    /// Treat hitting `max_iter` as success
    pub accept_max_iterations: bool,
    pub max_iter: u32,
    pub tol_gap_abs: f64,
    pub tol_gap_rel: f64,
    pub verbose: bool,
}

impl Default for ClarabelConfig {
    fn default() -> Self {
        ClarabelConfig {
            force_initialize: false,
            accept_max_iterations: false,
            max_iter: 200,
            tol_gap_abs: 1e-8,
            tol_gap_rel: 1e-8,
            verbose: false,
        }
    }
}

/// Totsu has no hot start and returns no iterate when it stops early, so
/// hitting `max_iter` is always a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TotsuConfig {
    pub max_iter: usize,
    /// Convergence tolerance on the residuals and duality gap
    pub eps_acc: f64,
}

impl Default for TotsuConfig {
    fn default() -> Self {
        TotsuConfig {
            max_iter: 100_000,
            eps_acc: 1e-6,
        }
    }
}
