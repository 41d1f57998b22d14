use clarabel::algebra::CscMatrix;
use clarabel::solver::{DefaultSettings, DefaultSolver, IPSolver, SolverStatus, SupportedConeT};
use nalgebra::{DMatrix, DVector};
use qpcollection_types::{BackendKind, QpCoeffs, QpDims, Result};
use std::time::Duration;

use crate::config::ClarabelConfig;
use crate::reformulate::{one_sided_with_bounds, vstack};
use crate::solver::{hot_then_cold, Attempt, QpSolver, SolveState};
use crate::sparse::{timed, CscBuffers, Triangle};
use crate::warm_start::StartState;

/// Interior-point adapter over the `clarabel` crate (pure Rust).
///
/// Clarabel takes `A x + s = b` with `s` in a product cone. Equalities go
/// into a zero cone and the inequalities plus the finite box bounds into a
/// nonnegative cone.
///
/// The solver is kept between calls. A hot solve overwrites its `P`, `q`,
/// `A` and `b` in place and reuses the KKT factorization structure, which
/// requires the sparsity patterns of `P` and `A` to be unchanged. Presolve
/// is disabled because Clarabel refuses data updates with it on; rows with
/// infinite right-hand sides are pruned before setup instead.
pub struct ClarabelSolver {
    config: ClarabelConfig,
    state: SolveState,
    workspace: Option<DefaultSolver<f64>>,
    // Matrices handed to the backend
    p: CscMatrix<f64>,
    a: CscMatrix<f64>,
    sparse_duration: Duration,
}

/// Constraint data in cone form
struct ConeForm {
    mat: DMatrix<f64>,
    b: Vec<f64>,
    cones: Vec<SupportedConeT<f64>>,
}

impl ClarabelSolver {
    pub fn new() -> Self {
        Self::with_config(ClarabelConfig::default())
    }

    pub fn with_config(config: ClarabelConfig) -> Self {
        ClarabelSolver {
            config,
            state: SolveState::default(),
            workspace: None,
            p: CscBuffers::default().into_clarabel(),
            a: CscBuffers::default().into_clarabel(),
            sparse_duration: Duration::ZERO,
        }
    }

    pub fn config(&self) -> &ClarabelConfig {
        &self.config
    }

    pub fn set_force_initialize(&mut self, force_initialize: bool) {
        self.config.force_initialize = force_initialize;
    }

    /// Time spent converting dense matrices to CSC in the last solve
    pub fn sparse_duration(&self) -> Duration {
        self.sparse_duration
    }

    fn settings(&self) -> DefaultSettings<f64> {
        let mut settings = DefaultSettings::default();
        settings.verbose = self.config.verbose;
        settings.max_iter = self.config.max_iter;
        settings.tol_gap_abs = self.config.tol_gap_abs;
        settings.tol_gap_rel = self.config.tol_gap_rel;
        settings.presolve_enable = false;
        settings
    }

    fn solve_checked(&mut self, qp: &QpCoeffs<'_>) -> DVector<f64> {
        let dims = qp.dims();
        if dims.dim_var == 0 {
            self.workspace = None;
            let attempt = Attempt::without_variables(qp);
            return self
                .state
                .finish(BackendKind::Clarabel, dims, vec![StartState::Cold], attempt);
        }

        let form = cone_form(qp);
        let ((p, a), elapsed) = timed(|| {
            (
                CscBuffers::from_dense(qp.obj_mat, Triangle::Upper),
                CscBuffers::from_dense(&form.mat, Triangle::Full),
            )
        });
        self.sparse_duration = elapsed;
        tracing::debug!(
            "Clarabel sparse conversion took {:?} (P nnz {}, A nnz {})",
            elapsed,
            p.nnz(),
            a.nnz()
        );

        let p = p.into_clarabel();
        let a = a.into_clarabel();
        let same_pattern = same_pattern(&p, &self.p) && same_pattern(&a, &self.a);
        self.p = p;
        self.a = a;

        let hot = match self.state.warm.plan(dims, self.config.force_initialize) {
            StartState::Warm if same_pattern => self.hot_solve(qp, &form),
            StartState::Warm => {
                tracing::debug!("Clarabel sparsity pattern changed, reinitializing");
                None
            }
            StartState::Cold => None,
        };
        let (attempts, attempt) =
            hot_then_cold(BackendKind::Clarabel, hot, || self.cold_solve(qp, &form));

        self.state.finish(BackendKind::Clarabel, dims, attempts, attempt)
    }

    fn hot_solve(&mut self, qp: &QpCoeffs<'_>, form: &ConeForm) -> Option<Attempt> {
        let stale = self.state.stale_solution(qp.dims().dim_var);
        let solver = self.workspace.as_mut()?;

        let q = qp.obj_vec.as_slice().to_vec();
        if let Err(e) = solver.update_data(&self.p, &q, &self.a, &form.b) {
            return Some(Attempt::failed(stale, format!("data update failed: {}", e)));
        }

        solver.solve();
        Some(outcome(solver, self.config.accept_max_iterations))
    }

    fn cold_solve(&mut self, qp: &QpCoeffs<'_>, form: &ConeForm) -> Attempt {
        self.workspace = None;

        let solver = DefaultSolver::new(
            &self.p,
            qp.obj_vec.as_slice(),
            &self.a,
            &form.b,
            &form.cones,
            self.settings(),
        );
        let solver = self.workspace.insert(solver);
        solver.solve();
        outcome(solver, self.config.accept_max_iterations)
    }
}

impl Default for ClarabelSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl QpSolver for ClarabelSolver {
    fn kind(&self) -> BackendKind {
        BackendKind::Clarabel
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

fn outcome(solver: &DefaultSolver<f64>, accept_max_iterations: bool) -> Attempt {
    tracing::debug!(
        "Clarabel finished in {} iterations: {:?}",
        solver.info.iterations,
        solver.solution.status
    );

    let x = DVector::from_vec(solver.solution.x.clone());
    match &solver.solution.status {
        SolverStatus::Solved => Attempt::solved(x),
        SolverStatus::MaxIterations if accept_max_iterations => Attempt::solved(x),
        status => Attempt::failed(x, format!("{:?}", status)),
    }
}

/// Same shape and same nonzero positions
fn same_pattern(lhs: &CscMatrix<f64>, rhs: &CscMatrix<f64>) -> bool {
    lhs.m == rhs.m && lhs.n == rhs.n && lhs.colptr == rhs.colptr && lhs.rowval == rhs.rowval
}

/// `[A; C; I; -I] x + s = [b; d; x_max; -x_min]` with unbounded rows removed.
///
/// When nothing is left a single `0 x <= 1` row keeps the cone non-empty.
fn cone_form(qp: &QpCoeffs<'_>) -> ConeForm {
    let n = qp.dims().dim_var;
    let dim_eq = qp.dims().dim_eq;
    let one_sided = one_sided_with_bounds(qp).prune_unbounded();

    let mut cones = Vec::new();
    if dim_eq > 0 {
        cones.push(SupportedConeT::ZeroConeT(dim_eq));
    }
    if one_sided.num_rows() > 0 {
        cones.push(SupportedConeT::NonnegativeConeT(one_sided.num_rows()));
    }

    if cones.is_empty() {
        return ConeForm {
            mat: DMatrix::zeros(1, n),
            b: vec![1.0],
            cones: vec![SupportedConeT::NonnegativeConeT(1)],
        };
    }

    ConeForm {
        mat: vstack(&[qp.eq_mat, &one_sided.mat], n),
        b: qp
            .eq_vec
            .iter()
            .chain(one_sided.rhs.iter())
            .copied()
            .collect(),
        cones,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qpcollection_types::QpProblem;

    fn constrained() -> QpProblem {
        // min 0.5 |x|^2 - 2 x0 - x1, x0 + x1 <= 1, x >= 0
        let mut qp = QpProblem::new(2, 0, 1);
        qp.obj_mat = DMatrix::identity(2, 2);
        qp.obj_vec = DVector::from_vec(vec![-2.0, -1.0]);
        qp.ineq_mat = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        qp.ineq_vec = DVector::from_vec(vec![1.0]);
        qp.x_min = DVector::zeros(2);
        qp
    }

    #[test]
    fn test_constrained_qp() {
        let mut solver = ClarabelSolver::new();
        let x = solver.solve(&constrained()).unwrap();

        assert!(!solver.solve_failed());
        assert!((x[0] - 1.0).abs() < 1e-4, "x[0] = {}", x[0]);
        assert!(x[1].abs() < 1e-4, "x[1] = {}", x[1]);
    }

    #[test]
    fn test_cone_form_prunes_default_bounds() {
        let mut qp = QpProblem::new(2, 1, 0);
        qp.eq_mat = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        qp.eq_vec = DVector::from_vec(vec![1.0]);
        qp.x_min = DVector::from_vec(vec![0.0, f64::NEG_INFINITY]);

        let form = cone_form(&qp.coeffs().unwrap());

        // equality row plus the single finite bound x0 >= 0
        assert_eq!(form.mat.nrows(), 2);
        assert_eq!(form.b, vec![1.0, 0.0]);
        assert_eq!(form.cones.len(), 2);
        assert!(matches!(form.cones[0], SupportedConeT::ZeroConeT(1)));
        assert!(matches!(form.cones[1], SupportedConeT::NonnegativeConeT(1)));
    }

    #[test]
    fn test_unconstrained_gets_placeholder_row() {
        let qp = QpProblem::new(3, 0, 0);
        let form = cone_form(&qp.coeffs().unwrap());

        assert_eq!(form.mat, DMatrix::<f64>::zeros(1, 3));
        assert_eq!(form.b, vec![1.0]);
        assert!(matches!(form.cones[0], SupportedConeT::NonnegativeConeT(1)));
    }

    #[test]
    fn test_infeasible_qp() {
        // x <= -1 and x >= 0
        let mut qp = QpProblem::new(1, 0, 1);
        qp.obj_mat = DMatrix::identity(1, 1);
        qp.ineq_mat = DMatrix::from_element(1, 1, 1.0);
        qp.ineq_vec = DVector::from_element(1, -1.0);
        qp.x_min = DVector::zeros(1);

        let mut solver = ClarabelSolver::new();
        let x = solver.solve(&qp).unwrap();

        assert!(solver.solve_failed());
        assert_eq!(x.len(), 1);
        assert_eq!(solver.last_start(), Some(StartState::Cold));
    }

    #[test]
    fn test_hot_start_updates_data() {
        let mut qp = constrained();
        let mut solver = ClarabelSolver::new();

        solver.solve(&qp).unwrap();
        assert_eq!(solver.last_start(), Some(StartState::Cold));
        assert_eq!(solver.start_state(), StartState::Warm);

        // same pattern, new objective direction
        qp.obj_vec = DVector::from_vec(vec![-1.0, -2.0]);
        let x = solver.solve(&qp).unwrap();

        assert_eq!(solver.last_attempts(), &[StartState::Warm]);
        assert!(!solver.solve_failed());
        assert!(x[0].abs() < 1e-4, "x[0] = {}", x[0]);
        assert!((x[1] - 1.0).abs() < 1e-4, "x[1] = {}", x[1]);
    }

    #[test]
    fn test_pattern_change_reinitializes() {
        let mut qp = constrained();
        let mut solver = ClarabelSolver::new();
        solver.solve(&qp).unwrap();

        qp.obj_mat[(0, 1)] = 0.5;
        qp.obj_mat[(1, 0)] = 0.5;
        solver.solve(&qp).unwrap();

        assert_eq!(solver.last_attempts(), &[StartState::Cold]);
        assert!(!solver.solve_failed());
    }

    #[test]
    fn test_dimension_change_reinitializes() {
        let mut solver = ClarabelSolver::new();
        solver.solve(&constrained()).unwrap();

        let mut bigger = QpProblem::new(3, 0, 0);
        bigger.obj_mat = DMatrix::identity(3, 3);
        bigger.obj_vec = DVector::from_vec(vec![1.0, -1.0, 2.0]);
        let x = solver.solve(&bigger).unwrap();

        assert_eq!(solver.last_attempts(), &[StartState::Cold]);
        assert!(!solver.solve_failed());
        assert!((x[1] - 1.0).abs() < 1e-4, "x[1] = {}", x[1]);
    }

    #[test]
    fn test_failed_hot_start_retries_cold() {
        let mut qp = constrained();
        let mut solver = ClarabelSolver::new();
        solver.solve(&qp).unwrap();

        // x0 + x1 <= -1 with x >= 0 keeps the pattern but is infeasible
        qp.ineq_vec[0] = -1.0;
        solver.solve(&qp).unwrap();

        assert_eq!(solver.last_attempts(), &[StartState::Warm, StartState::Cold]);
        assert!(solver.solve_failed());
        assert_eq!(solver.start_state(), StartState::Cold);
    }

    #[test]
    fn test_force_initialize() {
        let qp = constrained();
        let mut solver = ClarabelSolver::new();
        solver.set_force_initialize(true);

        solver.solve(&qp).unwrap();
        let x = solver.solve(&qp).unwrap();

        assert_eq!(solver.last_attempts(), &[StartState::Cold]);
        assert_eq!(solver.start_state(), StartState::Cold);
        assert!((x[0] - 1.0).abs() < 1e-4);
    }
}
