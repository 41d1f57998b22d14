
mod backend_kind;
mod dims;
mod problem;
mod error;

pub use backend_kind::BackendKind;
pub use dims::QpDims;
pub use problem::{QpCoeffs, QpProblem};
pub use error::{QpError, Result};
