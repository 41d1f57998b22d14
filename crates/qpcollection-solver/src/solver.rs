use nalgebra::{DMatrix, DVector};
use qpcollection_types::{BackendKind, QpCoeffs, QpDims, QpProblem, Result};

use crate::warm_start::{StartState, WarmStart};

/// Common contract of every QP backend adapter.
///
/// Minimizes `0.5 * x' obj_mat x + obj_vec' x` subject to
/// `eq_mat x = eq_vec`, `ineq_mat x <= ineq_vec` and `x_min <= x <= x_max`.
///
/// Numerical failure is not an error: the returned vector is whatever the
/// backend produced and [`QpSolver::solve_failed`] reports `true`. An `Err`
/// means the arguments disagree with the declared dimensions, in which case
/// the backend was never called and the adapter state is unchanged.
pub trait QpSolver {
    fn kind(&self) -> BackendKind;

    /// Whether the most recent solve failed
    fn solve_failed(&self) -> bool;

    /// Path the next solve of an unchanged shape would take
    fn start_state(&self) -> StartState;

    /// Path that produced the most recent result, `None` before the first solve
    fn last_start(&self) -> Option<StartState>;

    /// Every path tried by the most recent solve, in order.
    ///
    /// A hot start that failed and was retried cold reads `[Warm, Cold]`.
    fn last_attempts(&self) -> &[StartState];

    #[allow(clippy::too_many_arguments)]
    fn solve_coeffs(
        &mut self,
        dim_var: usize,
        dim_eq: usize,
        dim_ineq: usize,
        obj_mat: &DMatrix<f64>,
        obj_vec: &DVector<f64>,
        eq_mat: &DMatrix<f64>,
        eq_vec: &DVector<f64>,
        ineq_mat: &DMatrix<f64>,
        ineq_vec: &DVector<f64>,
        x_min: &DVector<f64>,
        x_max: &DVector<f64>,
    ) -> Result<DVector<f64>>;

    fn solve(&mut self, qp: &QpProblem) -> Result<DVector<f64>> {
        self.solve_coeffs(
            qp.dim_var,
            qp.dim_eq,
            qp.dim_ineq,
            &qp.obj_mat,
            &qp.obj_vec,
            &qp.eq_mat,
            &qp.eq_vec,
            &qp.ineq_mat,
            &qp.ineq_vec,
            &qp.x_min,
            &qp.x_max,
        )
    }

    /// Log the backend kind; with `verbose` also the warm-start state at debug level
    fn print_info(&self, verbose: bool, header: &str) {
        tracing::info!("{}solver kind: {}", header, self.kind());
        if verbose {
            tracing::debug!(
                "{}start state: {:?}, last attempts: {:?}",
                header,
                self.start_state(),
                self.last_attempts()
            );
        }
    }
}

/// Outcome of one native call
#[derive(Debug, Clone)]
pub(crate) struct Attempt {
    pub x: DVector<f64>,
    /// Backend status text when the call did not succeed
    pub failure: Option<String>,
}

impl Attempt {
    pub fn solved(x: DVector<f64>) -> Self {
        Attempt { x, failure: None }
    }

    pub fn failed(x: DVector<f64>, reason: impl Into<String>) -> Self {
        Attempt {
            x,
            failure: Some(reason.into()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// Outcome of a problem with no decision variables.
    ///
    /// Nothing is passed to the backend. The empty point is feasible unless
    /// an equality asks for a nonzero value or an inequality bound is negative.
    pub fn without_variables(qp: &QpCoeffs<'_>) -> Self {
        let x = DVector::zeros(0);
        if let Some(row) = qp.eq_vec.iter().position(|&b| b != 0.0) {
            return Attempt::failed(x, format!("equality row {} is infeasible", row));
        }
        if let Some(row) = qp.ineq_vec.iter().position(|&d| d < 0.0) {
            return Attempt::failed(x, format!("inequality row {} is infeasible", row));
        }
        Attempt::solved(x)
    }
}

/// Keep a successful hot attempt, otherwise run `cold`.
///
/// `hot` is `None` when no hot attempt was made. Returns the paths tried
/// together with the outcome that counts.
pub(crate) fn hot_then_cold(
    kind: BackendKind,
    hot: Option<Attempt>,
    cold: impl FnOnce() -> Attempt,
) -> (Vec<StartState>, Attempt) {
    match hot {
        Some(attempt) if attempt.succeeded() => (vec![StartState::Warm], attempt),
        Some(attempt) => {
            tracing::debug!(
                "{} hot start failed ({}), reinitializing",
                kind,
                attempt.failure.as_deref().unwrap_or("unknown")
            );
            (vec![StartState::Warm, StartState::Cold], cold())
        }
        None => (vec![StartState::Cold], cold()),
    }
}

/// Bookkeeping shared by all adapters: warm-start tracking, the failure
/// flag and the last solution buffer.
#[derive(Debug, Clone)]
pub(crate) struct SolveState {
    pub warm: WarmStart,
    pub failed: bool,
    pub last_start: Option<StartState>,
    pub attempts: Vec<StartState>,
    pub solution: DVector<f64>,
}

impl Default for SolveState {
    fn default() -> Self {
        SolveState {
            warm: WarmStart::new(),
            failed: false,
            last_start: None,
            attempts: Vec::new(),
            solution: DVector::zeros(0),
        }
    }
}

impl SolveState {
    /// Previous solution when it still fits, zeros otherwise
    pub fn stale_solution(&self, dim_var: usize) -> DVector<f64> {
        if self.solution.len() == dim_var {
            self.solution.clone()
        } else {
            DVector::zeros(dim_var)
        }
    }

    /// Record the outcome of a solve and hand back its solution
    pub fn finish(
        &mut self,
        kind: BackendKind,
        dims: QpDims,
        attempts: Vec<StartState>,
        attempt: Attempt,
    ) -> DVector<f64> {
        if let Some(reason) = &attempt.failure {
            tracing::warn!("{} solve failed ({}): {}", kind, dims, reason);
        }
        self.warm.record(dims, attempt.succeeded());
        self.failed = !attempt.succeeded();
        self.last_start = attempts.last().copied();
        self.attempts = attempts;
        self.solution = attempt.x;
        self.solution.clone()
    }
}
