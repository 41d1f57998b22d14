use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::QpError;

/// Symbolic backend identifier.
///
/// The declaration order of the concrete kinds is the priority order used
/// when resolving [`BackendKind::Any`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BackendKind {
    /// Placeholder for a solver that was never assigned a backend
    Uninitialized,
    /// First compiled-in backend, resolved at allocation time
    Any,
    /// Goldfarb-Idnani dual active-set method (dense)
    QuadProg,
    /// Operator splitting method (sparse)
    #[serde(rename = "OSQP")]
    Osqp,
    /// Interior point method (sparse)
    Clarabel,
    /// First-order primal-dual conic method (dense)
    Totsu,
}

impl BackendKind {
    /// Concrete backends in resolution priority order
    pub fn concrete() -> &'static [BackendKind] {
        &[
            BackendKind::QuadProg,
            BackendKind::Osqp,
            BackendKind::Clarabel,
            BackendKind::Totsu,
        ]
    }

    /// Canonical name, accepted back by `FromStr`
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Uninitialized => "Uninitialized",
            BackendKind::Any => "Any",
            BackendKind::QuadProg => "QuadProg",
            BackendKind::Osqp => "OSQP",
            BackendKind::Clarabel => "Clarabel",
            BackendKind::Totsu => "Totsu",
        }
    }

    /// Whether this kind names an actual backend rather than a sentinel
    pub fn is_concrete(&self) -> bool {
        !matches!(self, BackendKind::Uninitialized | BackendKind::Any)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = QpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Uninitialized" => Ok(BackendKind::Uninitialized),
            "Any" => Ok(BackendKind::Any),
            "QuadProg" => Ok(BackendKind::QuadProg),
            "OSQP" => Ok(BackendKind::Osqp),
            "Clarabel" => Ok(BackendKind::Clarabel),
            "Totsu" => Ok(BackendKind::Totsu),
            _ => Err(QpError::UnknownBackendName(s.to_string())),
        }
    }
}
