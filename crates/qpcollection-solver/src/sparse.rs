use nalgebra::DMatrix;
use std::time::{Duration, Instant};

/// Which part of a dense matrix to keep when converting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Triangle {
    Full,
    /// Entries with row <= col (objective matrices)
    Upper,
}

/// Compressed sparse column storage owned by an adapter.
///
/// Backends may keep pointers into these buffers for the duration of a
/// native call, so adapters hold them as fields rather than temporaries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CscBuffers {
    pub nrows: usize,
    pub ncols: usize,
    pub colptr: Vec<usize>,
    pub rowval: Vec<usize>,
    pub nzval: Vec<f64>,
}

impl CscBuffers {
    /// Convert a dense matrix, dropping exact zeros
    pub fn from_dense(mat: &DMatrix<f64>, triangle: Triangle) -> Self {
        let mut colptr = Vec::with_capacity(mat.ncols() + 1);
        let mut rowval = Vec::new();
        let mut nzval = Vec::new();

        colptr.push(0);
        for col in 0..mat.ncols() {
            let last_row = match triangle {
                Triangle::Full => mat.nrows(),
                Triangle::Upper => (col + 1).min(mat.nrows()),
            };
            for row in 0..last_row {
                let val = mat[(row, col)];
                if val != 0.0 {
                    rowval.push(row);
                    nzval.push(val);
                }
            }
            colptr.push(nzval.len());
        }

        CscBuffers {
            nrows: mat.nrows(),
            ncols: mat.ncols(),
            colptr,
            rowval,
            nzval,
        }
    }

    pub fn nnz(&self) -> usize {
        self.nzval.len()
    }

    /// Same shape and same nonzero positions
    pub fn same_pattern(&self, other: &CscBuffers) -> bool {
        self.nrows == other.nrows
            && self.ncols == other.ncols
            && self.colptr == other.colptr
            && self.rowval == other.rowval
    }

    /// Hand the buffers over to a `clarabel` matrix without copying
    #[cfg(feature = "clarabel")]
    pub fn into_clarabel(self) -> clarabel::algebra::CscMatrix<f64> {
        clarabel::algebra::CscMatrix {
            m: self.nrows,
            n: self.ncols,
            colptr: self.colptr,
            rowval: self.rowval,
            nzval: self.nzval,
        }
    }

    #[cfg(feature = "osqp")]
    pub fn as_osqp(&self) -> osqp::CscMatrix<'_> {
        use std::borrow::Cow;

        osqp::CscMatrix {
            nrows: self.nrows,
            ncols: self.ncols,
            indptr: Cow::Borrowed(&self.colptr[..]),
            indices: Cow::Borrowed(&self.rowval[..]),
            data: Cow::Borrowed(&self.nzval[..]),
        }
    }
}

/// Run `f` and return its result with the elapsed wall-clock time
pub fn timed<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let out = f();
    (out, start.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_conversion() {
        let mat = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 2.0, 0.0, 3.0, 4.0]);
        let csc = CscBuffers::from_dense(&mat, Triangle::Full);

        assert_eq!(csc.colptr, vec![0, 1, 2, 4]);
        assert_eq!(csc.rowval, vec![0, 1, 0, 1]);
        assert_eq!(csc.nzval, vec![1.0, 3.0, 2.0, 4.0]);
        assert_eq!(csc.nnz(), 4);
    }

    #[test]
    fn test_upper_triangle_conversion() {
        let mat = DMatrix::from_row_slice(2, 2, &[3.0, 2.0, 2.0, 4.0]);
        let csc = CscBuffers::from_dense(&mat, Triangle::Upper);

        assert_eq!(csc.colptr, vec![0, 1, 3]);
        assert_eq!(csc.rowval, vec![0, 0, 1]);
        assert_eq!(csc.nzval, vec![3.0, 2.0, 4.0]);
    }

    #[test]
    fn test_pattern_comparison_ignores_values() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]);
        let b = DMatrix::from_row_slice(2, 2, &[5.0, 0.0, 0.0, -2.0]);
        let c = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 0.0, 1.0]);

        let csc_a = CscBuffers::from_dense(&a, Triangle::Full);
        assert!(csc_a.same_pattern(&CscBuffers::from_dense(&b, Triangle::Full)));
        assert!(!csc_a.same_pattern(&CscBuffers::from_dense(&c, Triangle::Full)));
    }

    #[test]
    fn test_empty_matrix() {
        let mat = DMatrix::<f64>::zeros(0, 3);
        let csc = CscBuffers::from_dense(&mat, Triangle::Full);

        assert_eq!(csc.colptr, vec![0, 0, 0, 0]);
        assert_eq!(csc.nnz(), 0);
    }
}
