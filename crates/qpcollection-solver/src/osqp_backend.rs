use nalgebra::{DMatrix, DVector};
use osqp::{Problem, Settings, Status};
use qpcollection_types::{BackendKind, QpCoeffs, QpDims, Result};
use std::time::Duration;

use crate::config::OsqpConfig;
use crate::reformulate::{stacked_ranges_with_bounds, Ranges};
use crate::solver::{hot_then_cold, Attempt, QpSolver, SolveState};
use crate::sparse::{timed, CscBuffers, Triangle};
use crate::warm_start::StartState;

/// OSQP treats bounds at or beyond this magnitude as infinite
const OSQP_INFINITY: f64 = 1e30;

/// ADMM adapter over the `osqp` crate.
///
/// Constraints are passed as `l <= [A; C; I] x <= u`. A hot solve updates
/// the objective, constraint matrix and bounds of the live workspace in place,
/// so OSQP warm starts from its previous iterate. That requires the sparsity
/// patterns of `P` and `A` to be unchanged.
pub struct OsqpSolver {
    config: OsqpConfig,
    state: SolveState,
    workspace: Option<Problem>,
    // Sparse copies handed to the backend
    p: CscBuffers,
    a: CscBuffers,
    sparse_duration: Duration,
}

impl OsqpSolver {
    pub fn new() -> Self {
        Self::with_config(OsqpConfig::default())
    }

    pub fn with_config(config: OsqpConfig) -> Self {
        OsqpSolver {
            config,
            state: SolveState::default(),
            workspace: None,
            p: CscBuffers::default(),
            a: CscBuffers::default(),
            sparse_duration: Duration::ZERO,
        }
    }

    pub fn config(&self) -> &OsqpConfig {
        &self.config
    }

    pub fn set_force_initialize(&mut self, force_initialize: bool) {
        self.config.force_initialize = force_initialize;
    }

    /// Time spent converting dense matrices to CSC in the last solve
    pub fn sparse_duration(&self) -> Duration {
        self.sparse_duration
    }

    fn settings(&self) -> Settings {
        Settings::default()
            .verbose(self.config.verbose)
            .warm_start(true)
            .polish(self.config.polish)
            .max_iter(self.config.max_iter)
            .eps_abs(self.config.eps_abs)
            .eps_rel(self.config.eps_rel)
    }

    fn solve_checked(&mut self, qp: &QpCoeffs<'_>) -> DVector<f64> {
        let dims = qp.dims();
        if dims.dim_var == 0 {
            self.workspace = None;
            let attempt = Attempt::without_variables(qp);
            return self.state.finish(BackendKind::Osqp, dims, vec![StartState::Cold], attempt);
        }

        let ranges = stacked_ranges_with_bounds(qp);

        let ((p, a), elapsed) = timed(|| {
            (
                CscBuffers::from_dense(qp.obj_mat, Triangle::Upper),
                CscBuffers::from_dense(&ranges.mat, Triangle::Full),
            )
        });
        self.sparse_duration = elapsed;
        tracing::debug!(
            "OSQP sparse conversion took {:?} (P nnz {}, A nnz {})",
            elapsed,
            p.nnz(),
            a.nnz()
        );

        let same_pattern = p.same_pattern(&self.p) && a.same_pattern(&self.a);
        self.p = p;
        self.a = a;

        if let Some(row) = ranges.first_crossed_row() {
            self.workspace = None;
            let attempt = Attempt::failed(
                self.state.stale_solution(dims.dim_var),
                format!("lower bound exceeds upper bound in constraint row {}", row),
            );
            return self.state.finish(BackendKind::Osqp, dims, vec![StartState::Cold], attempt);
        }

        let plan = self.state.warm.plan(dims, self.config.force_initialize);
        let hot = match plan {
            StartState::Warm if same_pattern => self.hot_solve(qp, &ranges),
            StartState::Warm => {
                tracing::debug!("OSQP sparsity pattern changed, reinitializing");
                None
            }
            StartState::Cold => None,
        };

        let (attempts, attempt) =
            hot_then_cold(BackendKind::Osqp, hot, || self.cold_solve(qp, &ranges));

        self.state.finish(BackendKind::Osqp, dims, attempts, attempt)
    }

    fn hot_solve(&mut self, qp: &QpCoeffs<'_>, ranges: &Ranges) -> Option<Attempt> {
        let stale = self.state.stale_solution(qp.dims().dim_var);
        let problem = self.workspace.as_mut()?;

        problem.update_P(self.p.as_osqp());
        problem.update_lin_cost(qp.obj_vec.as_slice());
        problem.update_A(self.a.as_osqp());
        problem.update_bounds(&clip(&ranges.lower), &clip(&ranges.upper));

        Some(run(problem, self.config.accept_max_iterations, stale))
    }

    fn cold_solve(&mut self, qp: &QpCoeffs<'_>, ranges: &Ranges) -> Attempt {
        let stale = self.state.stale_solution(qp.dims().dim_var);
        self.workspace = None;

        let setup = Problem::new(
            self.p.as_osqp(),
            qp.obj_vec.as_slice(),
            self.a.as_osqp(),
            &clip(&ranges.lower),
            &clip(&ranges.upper),
            &self.settings(),
        );
        match setup {
            Ok(problem) => {
                let problem = self.workspace.insert(problem);
                run(problem, self.config.accept_max_iterations, stale)
            }
            Err(e) => Attempt::failed(stale, format!("setup failed: {:?}", e)),
        }
    }
}

impl Default for OsqpSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl QpSolver for OsqpSolver {
    fn kind(&self) -> BackendKind {
        BackendKind::Osqp
    }

    fn solve_failed(&self) -> bool {
        self.state.failed
    }

    fn start_state(&self) -> StartState {
        if self.config.force_initialize {
            return StartState::Cold;
        }
        self.state.warm.state()
    }

    fn last_start(&self) -> Option<StartState> {
        self.state.last_start
    }

    fn last_attempts(&self) -> &[StartState] {
        &self.state.attempts
    }

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
    ) -> Result<DVector<f64>> {
        let qp = QpCoeffs::new(
            QpDims::new(dim_var, dim_eq, dim_ineq),
            obj_mat,
            obj_vec,
            eq_mat,
            eq_vec,
            ineq_mat,
            ineq_vec,
            x_min,
            x_max,
        )?;
        Ok(self.solve_checked(&qp))
    }
}

fn run(problem: &mut Problem, accept_max_iterations: bool, stale: DVector<f64>) -> Attempt {
    let status = problem.solve();
    let x = status
        .x()
        .map(|x| DVector::from_vec(x.to_vec()))
        .unwrap_or(stale);

    match status {
        Status::Solved(_) => Attempt::solved(x),
        Status::MaxIterationsReached(_) if accept_max_iterations => Attempt::solved(x),
        other => Attempt::failed(x, status_name(&other)),
    }
}

fn clip(bounds: &DVector<f64>) -> Vec<f64> {
    bounds
        .iter()
        .map(|v| v.clamp(-OSQP_INFINITY, OSQP_INFINITY))
        .collect()
}

fn status_name(status: &Status<'_>) -> &'static str {
    match status {
        Status::Solved(_) => "solved",
        Status::SolvedInaccurate(_) => "solved inaccurate",
        Status::MaxIterationsReached(_) => "maximum iterations reached",
        Status::TimeLimitReached(_) => "time limit reached",
        Status::PrimalInfeasible(_) => "primal infeasible",
        Status::PrimalInfeasibleInaccurate(_) => "primal infeasible inaccurate",
        Status::DualInfeasible(_) => "dual infeasible",
        Status::DualInfeasibleInaccurate(_) => "dual infeasible inaccurate",
        _ => "unsolved",
    }
}
