use qpcollection_integration_tests as samples;
use qpcollection_solver::{
    allocate, allocate_from_config, allocate_with_config, available_backends, is_available,
    resolve_any, BackendKind, QpError, QpSolver, SolverConfig, StartState,
};

#[test]
fn test_resolve_any_is_deterministic() {
    let first = resolve_any().unwrap();
    for _ in 0..5 {
        assert_eq!(resolve_any().unwrap(), first);
    }
    assert_eq!(available_backends()[0], first);
    assert!(is_available(BackendKind::Any));
}

#[test]
fn test_default_features_available() {
    assert!(is_available(BackendKind::QuadProg));
    assert!(is_available(BackendKind::Clarabel));
    assert_eq!(resolve_any().unwrap(), BackendKind::QuadProg);
}

#[test]
fn test_unknown_name_rejected() {
    for name in ["", "quadprog", "osqp", "Gurobi", "QuadProg "] {
        let err = name.parse::<BackendKind>().unwrap_err();
        assert!(matches!(err, QpError::UnknownBackendName(ref n) if n == name));
    }
}

#[test]
fn test_names_round_trip_to_allocation() {
    for kind in available_backends() {
        let parsed: BackendKind = kind.to_string().parse().unwrap();
        assert_eq!(allocate(parsed).unwrap().kind(), kind);
    }
}

#[test]
fn test_unavailable_kind_is_an_error() {
    for kind in BackendKind::concrete() {
        if !is_available(*kind) {
            assert!(matches!(
                allocate(*kind),
                Err(QpError::BackendUnavailable(k)) if k == *kind
            ));
        }
    }
}

#[test]
fn test_allocations_are_independent() {
    let sample = samples::unconstrained();
    let mut first = allocate(BackendKind::QuadProg).unwrap();
    let second = allocate(BackendKind::QuadProg).unwrap();

    first.solve(&sample.problem).unwrap();

    assert_eq!(first.last_start(), Some(StartState::Cold));
    assert_eq!(second.last_start(), None);
    assert_eq!(second.start_state(), StartState::Cold);
}

#[test]
fn test_warm_state_transitions() {
    let mut solver = allocate(BackendKind::QuadProg).unwrap();
    let sample = samples::only_eq_const();

    solver.solve(&sample.problem).unwrap();
    assert_eq!(solver.last_start(), Some(StartState::Cold));

    solver.solve(&sample.problem).unwrap();
    assert_eq!(solver.last_start(), Some(StartState::Warm));

    // Different dim_var
    let other = samples::identity_obj();
    let x = solver.solve(&other.problem).unwrap();
    assert_eq!(solver.last_start(), Some(StartState::Cold));
    assert!(!solver.solve_failed());
    assert!((&x - &other.solution).norm() < samples::tolerance(BackendKind::QuadProg));

    // Infeasible of the same shape as the cached one after a success
    let mut infeasible = samples::infeasible();
    infeasible.ineq_vec[0] = 1.0;
    solver.solve(&infeasible).unwrap();
    assert_eq!(solver.start_state(), StartState::Warm);

    infeasible.ineq_vec[0] = -1.0;
    solver.solve(&infeasible).unwrap();
    assert_eq!(solver.last_attempts(), &[StartState::Warm, StartState::Cold]);
    assert!(solver.solve_failed());
    assert_eq!(solver.last_start(), Some(StartState::Cold));
    assert_eq!(solver.start_state(), StartState::Cold);
}

#[test]
fn test_repeat_solve_takes_hot_path() {
    let mut config = SolverConfig::default();
    config.osqp.force_initialize = false;
    let sample = samples::only_eq_const();

    for kind in available_backends() {
        let mut solver = allocate_with_config(kind, &config).unwrap();
        solver.solve(&sample.problem).unwrap();
        let x = solver.solve(&sample.problem).unwrap();

        let expected: &[StartState] = match kind {
            // no native hot start
            BackendKind::Totsu => &[StartState::Cold],
            _ => &[StartState::Warm],
        };
        assert_eq!(solver.last_attempts(), expected, "{}", kind);
        assert!(!solver.solve_failed(), "{} failed", kind);
        assert!((&x - &sample.solution).norm() < samples::tolerance(kind), "{}", kind);
    }
}

#[test]
fn test_allocate_from_toml_config() {
    let config = SolverConfig::from_toml_str(
        r#"
        backend = "Clarabel"

        [clarabel]
        max_iter = 50
        "#,
    )
    .unwrap();

    let mut solver = allocate_from_config(&config).unwrap();
    assert_eq!(solver.kind(), BackendKind::Clarabel);

    let sample = samples::only_eq_const();
    let x = solver.solve(&sample.problem).unwrap();
    assert!(!solver.solve_failed());
    assert!((&x - &sample.solution).norm() < samples::tolerance(BackendKind::Clarabel));
}

#[test]
fn test_start_state_serializes() {
    let json = serde_json::to_string(&StartState::Warm).unwrap();
    assert_eq!(json, "\"Warm\"");
    let kind: BackendKind = serde_json::from_str("\"OSQP\"").unwrap();
    assert_eq!(kind, BackendKind::Osqp);
}
