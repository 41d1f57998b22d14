//! Backend availability and allocation.
//!
//! Which backends exist is decided at build time by Cargo features, so the
//! availability table is a constant. Allocation always hands out a fresh
//! adapter; nothing is cached or shared.

use nalgebra::{DMatrix, DVector};
use qpcollection_types::{BackendKind, QpError, Result};

use crate::config::SolverConfig;
use crate::solver::QpSolver;
use crate::warm_start::StartState;

#[cfg(feature = "clarabel")]
use crate::clarabel_backend::ClarabelSolver;
#[cfg(feature = "osqp")]
use crate::osqp_backend::OsqpSolver;
#[cfg(feature = "quadprog")]
use crate::quadprog_backend::QuadProgSolver;
#[cfg(feature = "totsu")]
use crate::totsu_backend::TotsuSolver;

/// Compiled-in availability, in priority order
const AVAILABILITY: [(BackendKind, bool); 4] = [
    (BackendKind::QuadProg, cfg!(feature = "quadprog")),
    (BackendKind::Osqp, cfg!(feature = "osqp")),
    (BackendKind::Clarabel, cfg!(feature = "clarabel")),
    (BackendKind::Totsu, cfg!(feature = "totsu")),
];

/// Whether `kind` can be allocated
pub fn is_available(kind: BackendKind) -> bool {
    match kind {
        BackendKind::Uninitialized => false,
        BackendKind::Any => AVAILABILITY.iter().any(|&(_, available)| available),
        concrete => AVAILABILITY
            .iter()
            .any(|&(k, available)| k == concrete && available),
    }
}

/// Compiled-in concrete backends in priority order
pub fn available_backends() -> Vec<BackendKind> {
    AVAILABILITY
        .iter()
        .filter(|(_, available)| *available)
        .map(|(kind, _)| *kind)
        .collect()
}

/// Highest-priority available backend
pub fn resolve_any() -> Result<BackendKind> {
    AVAILABILITY
        .iter()
        .find(|(_, available)| *available)
        .map(|(kind, _)| *kind)
        .ok_or(QpError::NoBackendAvailable)
}

/// Allocate a fresh adapter with default settings
pub fn allocate(kind: BackendKind) -> Result<Solver> {
    allocate_with_config(kind, &SolverConfig::default())
}

/// Allocate a fresh adapter using the matching section of `config`
pub fn allocate_with_config(kind: BackendKind, config: &SolverConfig) -> Result<Solver> {
    let kind = match kind {
        BackendKind::Any => resolve_any()?,
        other => other,
    };
    if !is_available(kind) {
        return Err(QpError::BackendUnavailable(kind));
    }

    match kind {
        #[cfg(feature = "quadprog")]
        BackendKind::QuadProg => Ok(Solver::QuadProg(QuadProgSolver::with_config(
            config.quadprog.clone(),
        ))),
        #[cfg(feature = "osqp")]
        BackendKind::Osqp => Ok(Solver::Osqp(OsqpSolver::with_config(config.osqp.clone()))),
        #[cfg(feature = "clarabel")]
        BackendKind::Clarabel => Ok(Solver::Clarabel(ClarabelSolver::with_config(
            config.clarabel.clone(),
        ))),
        #[cfg(feature = "totsu")]
        BackendKind::Totsu => Ok(Solver::Totsu(TotsuSolver::with_config(config.totsu.clone()))),
        other => Err(QpError::BackendUnavailable(other)),
    }
}

/// Allocate the backend named in `config.backend`
pub fn allocate_from_config(config: &SolverConfig) -> Result<Solver> {
    allocate_with_config(config.backend, config)
}

/// Any compiled-in adapter
pub enum Solver {
    #[cfg(feature = "quadprog")]
    QuadProg(QuadProgSolver),
    #[cfg(feature = "osqp")]
    Osqp(OsqpSolver),
    #[cfg(feature = "clarabel")]
    Clarabel(ClarabelSolver),
    #[cfg(feature = "totsu")]
    Totsu(TotsuSolver),
}

macro_rules! dispatch {
    ($self:expr, $solver:ident => $body:expr) => {
        match $self {
            #[cfg(feature = "quadprog")]
            Solver::QuadProg($solver) => $body,
            #[cfg(feature = "osqp")]
            Solver::Osqp($solver) => $body,
            #[cfg(feature = "clarabel")]
            Solver::Clarabel($solver) => $body,
            #[cfg(feature = "totsu")]
            Solver::Totsu($solver) => $body,
            // Only reachable as a type when no backend feature is enabled
            #[allow(unreachable_patterns)]
            _ => unreachable!("no QP backend compiled in"),
        }
    };
}

impl QpSolver for Solver {
    fn kind(&self) -> BackendKind {
        dispatch!(self, s => s.kind())
    }

    fn solve_failed(&self) -> bool {
        dispatch!(self, s => s.solve_failed())
    }

    fn start_state(&self) -> StartState {
        dispatch!(self, s => s.start_state())
    }

    fn last_start(&self) -> Option<StartState> {
        dispatch!(self, s => s.last_start())
    }

    fn last_attempts(&self) -> &[StartState] {
        dispatch!(self, s => s.last_attempts())
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
        dispatch!(self, s => s.solve_coeffs(
            dim_var, dim_eq, dim_ineq, obj_mat, obj_vec, eq_mat, eq_vec, ineq_mat, ineq_vec,
            x_min, x_max,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        assert!(!is_available(BackendKind::Uninitialized));
        assert_eq!(
            is_available(BackendKind::Any),
            !available_backends().is_empty()
        );
        assert!(matches!(
            allocate(BackendKind::Uninitialized),
            Err(QpError::BackendUnavailable(BackendKind::Uninitialized))
        ));
    }

    #[test]
    fn test_availability_matches_features() {
        assert_eq!(is_available(BackendKind::QuadProg), cfg!(feature = "quadprog"));
        assert_eq!(is_available(BackendKind::Osqp), cfg!(feature = "osqp"));
        assert_eq!(is_available(BackendKind::Clarabel), cfg!(feature = "clarabel"));
        assert_eq!(is_available(BackendKind::Totsu), cfg!(feature = "totsu"));
    }

    #[test]
    fn test_available_backends_in_priority_order() {
        let available = available_backends();
        let expected: Vec<BackendKind> = BackendKind::concrete()
            .iter()
            .copied()
            .filter(|&kind| is_available(kind))
            .collect();
        assert_eq!(available, expected);
    }

    #[test]
    fn test_allocate_any_resolves_first_available() {
        match resolve_any() {
            Ok(kind) => {
                assert_eq!(Some(&kind), available_backends().first());
                assert_eq!(allocate(BackendKind::Any).unwrap().kind(), kind);
            }
            Err(e) => assert!(matches!(e, QpError::NoBackendAvailable)),
        }
    }

    #[test]
    fn test_each_available_backend_allocates_its_kind() {
        for kind in available_backends() {
            let solver = allocate(kind).unwrap();
            assert_eq!(solver.kind(), kind);
            assert!(!solver.solve_failed());
            assert_eq!(solver.last_start(), None);
            assert!(solver.last_attempts().is_empty());
        }
    }

    #[test]
    fn test_config_reaches_adapter() {
        let mut config = SolverConfig::default();
        config.quadprog.force_initialize = true;
        config.osqp.force_initialize = false;
        config.clarabel.force_initialize = true;
        config.totsu.max_iter = 500;

        for kind in available_backends() {
            let solver = allocate_with_config(kind, &config).unwrap();
            match solver {
                #[cfg(feature = "quadprog")]
                Solver::QuadProg(s) => assert!(s.config().force_initialize),
                #[cfg(feature = "osqp")]
                Solver::Osqp(s) => assert!(!s.config().force_initialize),
                #[cfg(feature = "clarabel")]
                Solver::Clarabel(s) => assert!(s.config().force_initialize),
                #[cfg(feature = "totsu")]
                Solver::Totsu(s) => assert_eq!(s.config().max_iter, 500),
            }
        }
    }
}
