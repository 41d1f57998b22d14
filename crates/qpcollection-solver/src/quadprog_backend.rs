use nalgebra::{Cholesky, DMatrix, DVector};
use qpcollection_types::{BackendKind, QpCoeffs, QpDims, Result};

use crate::config::QuadProgConfig;
use crate::reformulate::{one_sided_with_bounds, row_major, vstack};
use crate::solver::{hot_then_cold, Attempt, QpSolver, SolveState};
use crate::warm_start::StartState;

/// Dense Goldfarb-Idnani adapter over the `quadprog` crate.
///
/// Equalities go first (`meq = dim_eq`), followed by the inequalities and
/// the box bounds folded in as `x <= x_max` and `-x <= -x_min` rows.
///
/// The backend is always called with a pre-factorized objective. A cold
/// solve computes the inverse upper Cholesky factor of `obj_mat` and caches
/// it; a hot solve reuses the cached factor when `obj_mat` is unchanged.
pub struct QuadProgSolver {
    config: QuadProgConfig,
    state: SolveState,
    /// Objective matrix together with the inverse of its upper Cholesky factor
    factor: Option<(DMatrix<f64>, DMatrix<f64>)>,
}

/// Constraint block in the layout `quadprog::solve_qp` expects
struct Layout {
    amat: Vec<f64>,
    bvec: Vec<f64>,
    meq: usize,
}

impl QuadProgSolver {
    pub fn new() -> Self {
        Self::with_config(QuadProgConfig::default())
    }

    pub fn with_config(config: QuadProgConfig) -> Self {
        QuadProgSolver {
            config,
            state: SolveState::default(),
            factor: None,
        }
    }

    pub fn config(&self) -> &QuadProgConfig {
        &self.config
    }

    pub fn set_force_initialize(&mut self, force_initialize: bool) {
        self.config.force_initialize = force_initialize;
    }

    fn solve_checked(&mut self, qp: &QpCoeffs<'_>) -> DVector<f64> {
        let dims = qp.dims();
        if dims.dim_var == 0 {
            let attempt = Attempt::without_variables(qp);
            return self
                .state
                .finish(BackendKind::QuadProg, dims, vec![StartState::Cold], attempt);
        }

        let layout = layout(qp);
        let hot = match self.state.warm.plan(dims, self.config.force_initialize) {
            StartState::Warm => self.hot_solve(qp, &layout),
            StartState::Cold => None,
        };
        let (attempts, attempt) =
            hot_then_cold(BackendKind::QuadProg, hot, || self.cold_solve(qp, &layout));

        self.state.finish(BackendKind::QuadProg, dims, attempts, attempt)
    }

    /// `None` when the cached factor does not belong to this objective
    fn hot_solve(&self, qp: &QpCoeffs<'_>, layout: &Layout) -> Option<Attempt> {
        let (obj_mat, r_inv) = self.factor.as_ref()?;
        if obj_mat != qp.obj_mat {
            tracing::debug!("QuadProg objective changed, reinitializing");
            return None;
        }
        Some(self.call_backend(r_inv, qp, layout))
    }

    fn cold_solve(&mut self, qp: &QpCoeffs<'_>, layout: &Layout) -> Attempt {
        self.factor = None;
        let r_inv = match inverse_upper_factor(qp.obj_mat) {
            Some(r_inv) => r_inv,
            None => {
                return Attempt::failed(
                    self.state.stale_solution(qp.dims().dim_var),
                    "objective matrix is not positive definite",
                )
            }
        };
        let attempt = self.call_backend(&r_inv, qp, layout);
        self.factor = Some((qp.obj_mat.clone(), r_inv));
        attempt
    }

    fn call_backend(&self, r_inv: &DMatrix<f64>, qp: &QpCoeffs<'_>, layout: &Layout) -> Attempt {
        // The backend uses the factor as workspace
        let mut qmat = r_inv.as_slice().to_vec();
        match quadprog::solve_qp(
            &mut qmat,
            qp.obj_vec.as_slice(),
            &layout.amat,
            &layout.bvec,
            layout.meq,
            true,
        ) {
            Ok(solution) => Attempt::solved(DVector::from_vec(solution.sol)),
            Err(reason) => Attempt::failed(self.state.stale_solution(qp.dims().dim_var), reason),
        }
    }
}

impl Default for QuadProgSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl QpSolver for QuadProgSolver {
    fn kind(&self) -> BackendKind {
        BackendKind::QuadProg
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

/// `[A; C; I; -I]` row-major with rhs `[b; d; x_max; -x_min]`
fn layout(qp: &QpCoeffs<'_>) -> Layout {
    let one_sided = one_sided_with_bounds(qp);
    let mat = vstack(&[qp.eq_mat, &one_sided.mat], qp.dims().dim_var);
    let bvec = qp
        .eq_vec
        .iter()
        .chain(one_sided.rhs.iter())
        .copied()
        .collect();

    Layout {
        amat: row_major(&mat),
        bvec,
        meq: qp.dims().dim_eq,
    }
}

/// `R^-1` where `obj_mat = R' R` and `R` is upper triangular.
///
/// Column-major storage of the result is what `quadprog` reads as the
/// factorized objective.
fn inverse_upper_factor(obj_mat: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let n = obj_mat.nrows();
    let chol = Cholesky::new(obj_mat.clone())?;
    chol.l()
        .transpose()
        .solve_upper_triangular(&DMatrix::identity(n, n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use qpcollection_types::QpProblem;

    fn scenario_a() -> QpProblem {
        let mut qp = QpProblem::new(2, 0, 0);
        qp.obj_mat = DMatrix::from_row_slice(2, 2, &[3.0, 2.0, 2.0, 4.0]);
        qp.obj_vec = DVector::from_vec(vec![3.0, 1.0]);
        qp
    }

    #[test]
    fn test_inverse_factor() {
        let q = DMatrix::from_row_slice(2, 2, &[4.0, 2.0, 2.0, 3.0]);
        let r_inv = inverse_upper_factor(&q).unwrap();

        // Q^-1 = R^-1 R^-T
        let q_inv = &r_inv * r_inv.transpose();
        let identity = &q * q_inv;
        assert!((identity - DMatrix::<f64>::identity(2, 2)).norm() < 1e-12);
        assert_eq!(r_inv[(1, 0)], 0.0);
    }

    #[test]
    fn test_indefinite_objective_fails() {
        let mut qp = scenario_a();
        qp.obj_mat = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -1.0]);

        let mut solver = QuadProgSolver::new();
        let x = solver.solve(&qp).unwrap();

        assert!(solver.solve_failed());
        assert_eq!(x, DVector::<f64>::zeros(2));
    }

    #[test]
    fn test_layout_puts_equalities_first() {
        let mut qp = QpProblem::new(2, 1, 1);
        qp.eq_mat = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        qp.eq_vec = DVector::from_vec(vec![1.0]);
        qp.ineq_mat = DMatrix::from_row_slice(1, 2, &[2.0, 3.0]);
        qp.ineq_vec = DVector::from_vec(vec![4.0]);
        qp.x_min = DVector::from_vec(vec![0.0, -1.0]);
        qp.x_max = DVector::from_vec(vec![5.0, 6.0]);

        let layout = layout(&qp.coeffs().unwrap());

        assert_eq!(layout.meq, 1);
        assert_eq!(layout.bvec, vec![1.0, 4.0, 5.0, 6.0, -0.0, 1.0]);
        assert_eq!(
            layout.amat,
            vec![1.0, 1.0, 2.0, 3.0, 1.0, 0.0, 0.0, 1.0, -1.0, -0.0, -0.0, -1.0]
        );
    }

    #[test]
    fn test_hot_start_reuses_factor() {
        let qp = scenario_a();
        let mut solver = QuadProgSolver::new();

        solver.solve(&qp).unwrap();
        assert_eq!(solver.last_start(), Some(StartState::Cold));

        let x = solver.solve(&qp).unwrap();
        assert_eq!(solver.last_start(), Some(StartState::Warm));
        assert_eq!(solver.last_attempts(), &[StartState::Warm]);
        assert!(!solver.solve_failed());
        assert!((x[0] + 1.25).abs() < 1e-9);
        assert!((x[1] - 0.375).abs() < 1e-9);
    }

    #[test]
    fn test_changed_objective_falls_back_to_cold() {
        let mut qp = scenario_a();
        let mut solver = QuadProgSolver::new();
        solver.solve(&qp).unwrap();

        qp.obj_mat = DMatrix::identity(2, 2);
        let x = solver.solve(&qp).unwrap();

        // no hot attempt is made against a stale factor
        assert_eq!(solver.last_attempts(), &[StartState::Cold]);
        assert_eq!(solver.last_start(), Some(StartState::Cold));
        assert!(!solver.solve_failed());
        assert!((x[0] + 3.0).abs() < 1e-9);
        assert!((x[1] + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_force_initialize() {
        let qp = scenario_a();
        let mut solver = QuadProgSolver::new();
        solver.set_force_initialize(true);

        solver.solve(&qp).unwrap();
        solver.solve(&qp).unwrap();

        assert_eq!(solver.last_start(), Some(StartState::Cold));
        assert_eq!(solver.start_state(), StartState::Cold);
    }

    #[test]
    fn test_no_variables_skips_backend() {
        let mut solver = QuadProgSolver::new();

        let x = solver.solve(&QpProblem::new(0, 0, 0)).unwrap();
        assert_eq!(x.len(), 0);
        assert!(!solver.solve_failed());
        assert!(solver.factor.is_none());

        let mut qp = QpProblem::new(0, 1, 0);
        qp.eq_vec[0] = 2.0;
        let x = solver.solve(&qp).unwrap();
        assert_eq!(x.len(), 0);
        assert!(solver.solve_failed());
    }
}
