use nalgebra::{DMatrix, DVector};
use qpcollection_types::{BackendKind, QpCoeffs, QpDims, Result};
use totsu::prelude::{FloatGeneric, MatType, Solver as ConicSolver};
use totsu::{MatBuild, ProbQP};

use crate::config::TotsuConfig;
use crate::reformulate::one_sided_with_bounds;
use crate::solver::{Attempt, QpSolver, SolveState};
use crate::warm_start::StartState;

type La = FloatGeneric<f64>;

/// First-order conic adapter over the `totsu` crate (pure Rust).
///
/// Totsu takes `G x <= h, A x = b`. The box bounds are folded into `G` and
/// rows with an infinite right-hand side are dropped. The crate starts every
/// solve from scratch, so there is no hot path.
pub struct TotsuSolver {
    config: TotsuConfig,
    state: SolveState,
}

impl TotsuSolver {
    pub fn new() -> Self {
        Self::with_config(TotsuConfig::default())
    }

    pub fn with_config(config: TotsuConfig) -> Self {
        TotsuSolver {
            config,
            state: SolveState::default(),
        }
    }

    pub fn config(&self) -> &TotsuConfig {
        &self.config
    }

    fn solve_checked(&mut self, qp: &QpCoeffs<'_>) -> DVector<f64> {
        let dims = qp.dims();
        let attempt = if dims.dim_var == 0 {
            Attempt::without_variables(qp)
        } else {
            self.cold_solve(qp)
        };
        self.state
            .finish(BackendKind::Totsu, dims, vec![StartState::Cold], attempt)
    }

    fn cold_solve(&self, qp: &QpCoeffs<'_>) -> Attempt {
        let n = qp.dims().dim_var;
        let one_sided = one_sided_with_bounds(qp).prune_unbounded();

        let sym_p = MatBuild::<La>::new(MatType::SymPack(n)).by_fn(|r, c| qp.obj_mat[(r, c)]);
        let vec_q = column(qp.obj_vec);
        let mat_g = general(&one_sided.mat);
        let vec_h = column(&one_sided.rhs);
        let mat_a = general(qp.eq_mat);
        let vec_b = column(qp.eq_vec);

        let max_iter = self.config.max_iter;
        let eps_acc = self.config.eps_acc;
        let solver = ConicSolver::<La>::new().par(|p| {
            p.max_iter = Some(max_iter);
            p.eps_acc = eps_acc;
        });

        let mut prob = ProbQP::new(sym_p, vec_q, mat_g, vec_h, mat_a, vec_b, solver.par.eps_zero);
        match solver.solve(prob.problem()) {
            // the primal part is followed by the epigraph variable
            Ok((x, _)) => Attempt::solved(DVector::from_column_slice(&x[..n])),
            Err(e) => Attempt::failed(self.state.stale_solution(n), e.to_string()),
        }
    }
}

impl Default for TotsuSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl QpSolver for TotsuSolver {
    fn kind(&self) -> BackendKind {
        BackendKind::Totsu
    }

    fn solve_failed(&self) -> bool {
        self.state.failed
    }

    /// No hot start: always cold
    fn start_state(&self) -> StartState {
        StartState::Cold
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

fn general(mat: &DMatrix<f64>) -> MatBuild<La> {
    MatBuild::new(MatType::General(mat.nrows(), mat.ncols())).by_fn(|r, c| mat[(r, c)])
}

fn column(vec: &DVector<f64>) -> MatBuild<La> {
    MatBuild::new(MatType::General(vec.len(), 1)).by_fn(|r, _| vec[r])
}
