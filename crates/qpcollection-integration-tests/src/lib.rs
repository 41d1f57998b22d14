//! Sample problems with known optima, shared by the cross-backend tests and
//! the demos.

use nalgebra::{DMatrix, DVector};
use qpcollection_types::{BackendKind, QpProblem};

/// A QP together with its ground-truth solution
#[derive(Debug, Clone)]
pub struct SampleQp {
    pub name: &'static str,
    pub problem: QpProblem,
    pub solution: DVector<f64>,
}

/// Accepted distance between a backend's solution and the ground truth
pub fn tolerance(kind: BackendKind) -> f64 {
    match kind {
        BackendKind::QuadProg => 1e-6,
        BackendKind::Clarabel => 1e-4,
        BackendKind::Osqp | BackendKind::Totsu => 1e-3,
        BackendKind::Uninitialized | BackendKind::Any => 0.0,
    }
}

/// Identity objective with equalities, inequalities and a finite box
pub fn identity_obj() -> SampleQp {
    let mut qp = QpProblem::new(6, 3, 2);
    qp.obj_mat = DMatrix::identity(6, 6);
    qp.obj_vec = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    qp.eq_mat = DMatrix::from_row_slice(
        3,
        6,
        &[
            1.0, -1.0, 1.0, 0.0, 3.0, 1.0, //
            -1.0, 0.0, -3.0, -4.0, 5.0, 6.0, //
            2.0, 5.0, 3.0, 0.0, 1.0, 0.0,
        ],
    );
    qp.eq_vec = DVector::from_vec(vec![1.0, 2.0, 3.0]);
    qp.ineq_mat = DMatrix::from_row_slice(
        2,
        6,
        &[
            0.0, 1.0, 0.0, 1.0, 2.0, -1.0, //
            -1.0, 0.0, 2.0, 1.0, 1.0, 0.0,
        ],
    );
    qp.ineq_vec = DVector::from_vec(vec![-1.0, 2.5]);
    qp.x_min = DVector::from_vec(vec![-1000.0, -10000.0, 0.0, -1000.0, -1000.0, -1000.0]);
    qp.x_max = DVector::from_vec(vec![10000.0, 100.0, 1.5, 100.0, 100.0, 1000.0]);

    SampleQp {
        name: "identity_obj",
        problem: qp,
        solution: DVector::from_vec(vec![
            1.7975426, -0.3381487, 0.1633880, -4.9884023, 0.6054943, -3.1155623,
        ]),
    }
}

/// No constraints and an infinite box
pub fn unconstrained() -> SampleQp {
    let mut qp = QpProblem::new(2, 0, 0);
    qp.obj_mat = DMatrix::from_row_slice(2, 2, &[3.0, 2.0, 2.0, 4.0]);
    qp.obj_vec = DVector::from_vec(vec![3.0, 1.0]);
    qp.x_min = DVector::from_element(2, f64::NEG_INFINITY);
    qp.x_max = DVector::from_element(2, f64::INFINITY);

    SampleQp {
        name: "unconstrained",
        problem: qp,
        solution: DVector::from_vec(vec![-1.25, 0.375]),
    }
}

/// One equality and nonnegative variables
pub fn only_eq_const() -> SampleQp {
    let mut qp = QpProblem::new(2, 1, 0);
    qp.obj_mat = DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]);
    qp.obj_vec = DVector::from_vec(vec![1.0, 1.0]);
    qp.eq_mat = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
    qp.eq_vec = DVector::from_vec(vec![1.0]);
    qp.x_min = DVector::zeros(2);
    qp.x_max = DVector::from_element(2, f64::INFINITY);

    SampleQp {
        name: "only_eq_const",
        problem: qp,
        solution: DVector::from_vec(vec![0.25, 0.75]),
    }
}

pub fn all() -> Vec<SampleQp> {
    vec![identity_obj(), unconstrained(), only_eq_const()]
}

/// `x <= -1` together with `x >= 0`
pub fn infeasible() -> QpProblem {
    let mut qp = QpProblem::new(1, 0, 1);
    qp.obj_mat = DMatrix::identity(1, 1);
    qp.ineq_mat = DMatrix::from_element(1, 1, 1.0);
    qp.ineq_vec = DVector::from_element(1, -1.0);
    qp.x_min = DVector::zeros(1);
    qp
}
