use nalgebra::{DMatrix, DVector};
use std::io::{self, Write};

use crate::dims::QpDims;
use crate::error::{QpError, Result};

/// QP coefficients in canonical form:
/// minimize 0.5 * x^T Q x + c^T x
/// subject to A x = b, C x <= d, x_min <= x <= x_max
#[derive(Debug, Clone, PartialEq)]
pub struct QpProblem {
    /// Dimension of decision variable
    pub dim_var: usize,
    /// Dimension of equality constraint
    pub dim_eq: usize,
    /// Dimension of inequality constraint
    pub dim_ineq: usize,
    /// Objective matrix Q (symmetric PSD, not checked)
    pub obj_mat: DMatrix<f64>,
    /// Objective vector c
    pub obj_vec: DVector<f64>,
    /// Equality constraint matrix A
    pub eq_mat: DMatrix<f64>,
    /// Equality constraint vector b
    pub eq_vec: DVector<f64>,
    /// Inequality constraint matrix C
    pub ineq_mat: DMatrix<f64>,
    /// Inequality constraint vector d
    pub ineq_vec: DVector<f64>,
    /// Lower bound on x
    pub x_min: DVector<f64>,
    /// Upper bound on x
    pub x_max: DVector<f64>,
}

impl QpProblem {
    /// Create a zero-filled problem with an unconstrained box
    pub fn new(dim_var: usize, dim_eq: usize, dim_ineq: usize) -> Self {
        QpProblem {
            dim_var,
            dim_eq,
            dim_ineq,
            obj_mat: DMatrix::zeros(dim_var, dim_var),
            obj_vec: DVector::zeros(dim_var),
            eq_mat: DMatrix::zeros(dim_eq, dim_var),
            eq_vec: DVector::zeros(dim_eq),
            ineq_mat: DMatrix::zeros(dim_ineq, dim_var),
            ineq_vec: DVector::zeros(dim_ineq),
            x_min: DVector::from_element(dim_var, f64::MIN),
            x_max: DVector::from_element(dim_var, f64::MAX),
        }
    }

    /// Resize and zero-fill every coefficient.
    ///
    /// Bounds are reset to the most negative and most positive finite values,
    /// so the box is effectively unconstrained.
    pub fn setup(&mut self, dim_var: usize, dim_eq: usize, dim_ineq: usize) {
        *self = QpProblem::new(dim_var, dim_eq, dim_ineq);
    }

    pub fn dims(&self) -> QpDims {
        QpDims::new(self.dim_var, self.dim_eq, self.dim_ineq)
    }

    /// Borrow the coefficients as a validated view
    pub fn coeffs(&self) -> Result<QpCoeffs<'_>> {
        QpCoeffs::new(
            self.dims(),
            &self.obj_mat,
            &self.obj_vec,
            &self.eq_mat,
            &self.eq_vec,
            &self.ineq_mat,
            &self.ineq_vec,
            &self.x_min,
            &self.x_max,
        )
    }

    /// Validate model dimensions
    pub fn validate(&self) -> Result<()> {
        self.coeffs().map(|_| ())
    }

    /// Log the dimensions; with `verbose` the full dump goes to debug level
    pub fn print_info(&self, verbose: bool, header: &str) {
        tracing::info!("{}{}", header, self.dims());
        if verbose {
            tracing::debug!("{}coefficients:\n{}", header, self.dump_to_string());
        }
    }

    /// Write every field in a fixed order for debugging.
    ///
    /// Matrices are written one row per line; vectors on a single line.
    pub fn dump<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "dim_var: {}", self.dim_var)?;
        writeln!(out, "dim_eq: {}", self.dim_eq)?;
        writeln!(out, "dim_ineq: {}", self.dim_ineq)?;
        write_matrix(out, "obj_mat", &self.obj_mat)?;
        write_vector(out, "obj_vec", &self.obj_vec)?;
        write_matrix(out, "eq_mat", &self.eq_mat)?;
        write_vector(out, "eq_vec", &self.eq_vec)?;
        write_matrix(out, "ineq_mat", &self.ineq_mat)?;
        write_vector(out, "ineq_vec", &self.ineq_vec)?;
        write_vector(out, "x_min", &self.x_min)?;
        write_vector(out, "x_max", &self.x_max)
    }

    pub fn dump_to_string(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.dump(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Default for QpProblem {
    fn default() -> Self {
        QpProblem::new(0, 0, 0)
    }
}

fn write_matrix<W: Write>(out: &mut W, name: &str, mat: &DMatrix<f64>) -> io::Result<()> {
    writeln!(out, "{}:", name)?;
    for row in mat.row_iter() {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(out, "{}", line.join(" "))?;
    }
    Ok(())
}

fn write_vector<W: Write>(out: &mut W, name: &str, vec: &DVector<f64>) -> io::Result<()> {
    let line: Vec<String> = vec.iter().map(|v| v.to_string()).collect();
    writeln!(out, "{}:\n{}", name, line.join(" "))
}

/// Borrowed view over the solve arguments whose shapes have been checked
/// against the declared dimensions.
#[derive(Debug, Clone, Copy)]
pub struct QpCoeffs<'a> {
    dims: QpDims,
    pub obj_mat: &'a DMatrix<f64>,
    pub obj_vec: &'a DVector<f64>,
    pub eq_mat: &'a DMatrix<f64>,
    pub eq_vec: &'a DVector<f64>,
    pub ineq_mat: &'a DMatrix<f64>,
    pub ineq_vec: &'a DVector<f64>,
    pub x_min: &'a DVector<f64>,
    pub x_max: &'a DVector<f64>,
}

impl<'a> QpCoeffs<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dims: QpDims,
        obj_mat: &'a DMatrix<f64>,
        obj_vec: &'a DVector<f64>,
        eq_mat: &'a DMatrix<f64>,
        eq_vec: &'a DVector<f64>,
        ineq_mat: &'a DMatrix<f64>,
        ineq_vec: &'a DVector<f64>,
        x_min: &'a DVector<f64>,
        x_max: &'a DVector<f64>,
    ) -> Result<Self> {
        let QpDims { dim_var, dim_eq, dim_ineq } = dims;

        check_matrix("obj_mat", obj_mat, dim_var, dim_var)?;
        check_vector("obj_vec", obj_vec, dim_var)?;
        check_matrix("eq_mat", eq_mat, dim_eq, dim_var)?;
        check_vector("eq_vec", eq_vec, dim_eq)?;
        check_matrix("ineq_mat", ineq_mat, dim_ineq, dim_var)?;
        check_vector("ineq_vec", ineq_vec, dim_ineq)?;
        check_vector("x_min", x_min, dim_var)?;
        check_vector("x_max", x_max, dim_var)?;

        Ok(QpCoeffs {
            dims,
            obj_mat,
            obj_vec,
            eq_mat,
            eq_vec,
            ineq_mat,
            ineq_vec,
            x_min,
            x_max,
        })
    }

    pub fn dims(&self) -> QpDims {
        self.dims
    }
}

fn check_matrix(name: &str, mat: &DMatrix<f64>, rows: usize, cols: usize) -> Result<()> {
    if mat.nrows() != rows || mat.ncols() != cols {
        return Err(QpError::DimensionMismatch(format!(
            "{} must be {}x{}, got {}x{}",
            name,
            rows,
            cols,
            mat.nrows(),
            mat.ncols()
        )));
    }
    Ok(())
}

fn check_vector(name: &str, vec: &DVector<f64>, len: usize) -> Result<()> {
    if vec.len() != len {
        return Err(QpError::DimensionMismatch(format!(
            "{} must have length {}, got {}",
            name,
            len,
            vec.len()
        )));
    }
    Ok(())
}
