//! Conversions from the canonical constraint layout to backend layouts.
//!
//! The canonical form carries equalities `A x = b`, one-sided inequalities
//! `C x <= d` and box bounds `x_min <= x <= x_max`. Backends differ in
//! whether they take bounds natively, accept two-sided rows, or need the
//! matrix in a particular storage order.

use nalgebra::{DMatrix, DVector};
use qpcollection_types::QpCoeffs;

/// Magnitude at or beyond which a bound is treated as infinite
pub const INFINITY_BOUND: f64 = 1e20;

/// One-sided constraint block: `mat * x <= rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct OneSided {
    pub mat: DMatrix<f64>,
    pub rhs: DVector<f64>,
}

impl OneSided {
    pub fn num_rows(&self) -> usize {
        self.rhs.len()
    }

    /// Drop rows whose right-hand side is effectively `+inf`
    pub fn prune_unbounded(self) -> OneSided {
        let keep: Vec<usize> = (0..self.num_rows())
            .filter(|&i| self.rhs[i] < INFINITY_BOUND)
            .collect();
        if keep.len() == self.num_rows() {
            return self;
        }
        OneSided {
            mat: self.mat.select_rows(keep.iter()),
            rhs: self.rhs.select_rows(keep.iter()),
        }
    }
}

/// Two-sided constraint block: `lower <= mat * x <= upper`
#[derive(Debug, Clone, PartialEq)]
pub struct Ranges {
    pub mat: DMatrix<f64>,
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
}

impl Ranges {
    pub fn num_rows(&self) -> usize {
        self.lower.len()
    }

    /// First row index whose lower bound exceeds its upper bound
    pub fn first_crossed_row(&self) -> Option<usize> {
        self.lower
            .iter()
            .zip(self.upper.iter())
            .position(|(lo, hi)| lo > hi)
    }
}

/// Fold box bounds into the inequality block.
///
/// `[C; I; -I] x <= [d; x_max; -x_min]`, adding `2 * dim_var` rows.
pub fn one_sided_with_bounds(qp: &QpCoeffs<'_>) -> OneSided {
    let n = qp.dims().dim_var;
    let identity = DMatrix::<f64>::identity(n, n);
    let neg_identity = -&identity;

    let mat = vstack(&[qp.ineq_mat, &identity, &neg_identity], n);
    let rhs = DVector::from_iterator(
        qp.ineq_vec.len() + 2 * n,
        qp.ineq_vec
            .iter()
            .copied()
            .chain(qp.x_max.iter().copied())
            .chain(qp.x_min.iter().map(|v| -v)),
    );

    OneSided { mat, rhs }
}

/// Stack equality and inequality rows, leaving bounds to the backend
pub fn stacked_ranges(qp: &QpCoeffs<'_>) -> Ranges {
    let dims = qp.dims();
    let rows = dims.dim_eq + dims.dim_ineq;

    let mat = vstack(&[qp.eq_mat, qp.ineq_mat], dims.dim_var);
    let lower = DVector::from_iterator(
        rows,
        qp.eq_vec
            .iter()
            .copied()
            .chain(std::iter::repeat(f64::NEG_INFINITY).take(dims.dim_ineq)),
    );
    let upper = DVector::from_iterator(rows, qp.eq_vec.iter().chain(qp.ineq_vec.iter()).copied());

    Ranges { mat, lower, upper }
}

/// Stack equality, inequality and bound rows into one range block.
///
/// Equality rows are pinned (`lo = hi = b`), inequality rows get
/// `lo = -inf`, and the bounds become identity rows.
pub fn stacked_ranges_with_bounds(qp: &QpCoeffs<'_>) -> Ranges {
    let dims = qp.dims();
    let n = dims.dim_var;
    let rows = dims.dim_eq + dims.dim_ineq + n;
    let identity = DMatrix::<f64>::identity(n, n);

    let mat = vstack(&[qp.eq_mat, qp.ineq_mat, &identity], n);
    let lower = DVector::from_iterator(
        rows,
        qp.eq_vec
            .iter()
            .copied()
            .chain(std::iter::repeat(f64::NEG_INFINITY).take(dims.dim_ineq))
            .chain(qp.x_min.iter().copied()),
    );
    let upper = DVector::from_iterator(
        rows,
        qp.eq_vec
            .iter()
            .chain(qp.ineq_vec.iter())
            .chain(qp.x_max.iter())
            .copied(),
    );

    Ranges { mat, lower, upper }
}

/// Stack matrices with `ncols` columns on top of each other
pub fn vstack(blocks: &[&DMatrix<f64>], ncols: usize) -> DMatrix<f64> {
    let nrows = blocks.iter().map(|b| b.nrows()).sum();
    let mut out = DMatrix::zeros(nrows, ncols);
    let mut offset = 0;
    for block in blocks {
        debug_assert_eq!(block.ncols(), ncols);
        out.rows_mut(offset, block.nrows()).copy_from(*block);
        offset += block.nrows();
    }
    out
}

/// Entries of `mat` in row-major order
pub fn row_major(mat: &DMatrix<f64>) -> Vec<f64> {
    mat.transpose().as_slice().to_vec()
}
