use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::QpError;

/// Problem dimensions: decision variables, equality rows, inequality rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct QpDims {
    pub dim_var: usize,
    pub dim_eq: usize,
    pub dim_ineq: usize,
}

impl QpDims {
    pub fn new(dim_var: usize, dim_eq: usize, dim_ineq: usize) -> Self {
        QpDims { dim_var, dim_eq, dim_ineq }
    }

    /// Equality plus inequality rows
    pub fn num_constraints(&self) -> usize {
        self.dim_eq + self.dim_ineq
    }
}

impl TryFrom<(i64, i64, i64)> for QpDims {
    type Error = QpError;

    fn try_from((dim_var, dim_eq, dim_ineq): (i64, i64, i64)) -> Result<Self, Self::Error> {
        let check = |name: &str, value: i64| {
            usize::try_from(value)
                .map_err(|_| QpError::InvalidDimension(format!("{} must be >= 0, got {}", name, value)))
        };
        Ok(QpDims {
            dim_var: check("dim_var", dim_var)?,
            dim_eq: check("dim_eq", dim_eq)?,
            dim_ineq: check("dim_ineq", dim_ineq)?,
        })
    }
}

impl fmt::Display for QpDims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dim_var: {}, dim_eq: {}, dim_ineq: {}",
            self.dim_var, self.dim_eq, self.dim_ineq
        )
    }
}
