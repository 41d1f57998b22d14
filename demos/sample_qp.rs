//! Solve the sample problems with every compiled-in backend.
//!
//! Usage: `cargo run --example sample_qp [config.toml]`
//! Set `RUST_LOG=debug` to see the coefficients, warm-start and sparse
//! conversion details.

use qpcollection_integration_tests as samples;
use qpcollection_solver::{allocate_with_config, available_backends, QpSolver, SolverConfig};
use std::time::Instant;

fn main() {
    tracing_subscriber::fmt::init();

    println!("=== QP Solver Collection Demo ===\n");

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    eprintln!("Cannot read {}: {}", path, e);
                    std::process::exit(1);
                }
            };
            match SolverConfig::from_toml_str(&text) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(1);
                }
            }
        }
        None => SolverConfig::default(),
    };

    let backends = available_backends();
    println!(
        "Available backends: {}",
        backends
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();

    for sample in samples::all() {
        println!("--- {} ---", sample.name);
        sample.problem.print_info(true, "  ");

        for &kind in &backends {
            let mut solver = match allocate_with_config(kind, &config) {
                Ok(solver) => solver,
                Err(e) => {
                    println!("  {}: {}", kind, e);
                    continue;
                }
            };
            solver.print_info(true, "  ");

            // Second solve exercises the warm path where supported
            for _ in 0..2 {
                let start = Instant::now();
                match solver.solve(&sample.problem) {
                    Ok(x) => {
                        let error = (&x - &sample.solution).norm();
                        println!(
                            "  {:<9} {:?} failed={} error={:.2e} time={:?}",
                            kind.to_string(),
                            solver.last_attempts(),
                            solver.solve_failed(),
                            error,
                            start.elapsed()
                        );
                    }
                    Err(e) => println!("  {}: {}", kind, e),
                }
            }
        }
        println!();
    }

    println!("--- infeasible ---");
    for &kind in &backends {
        if let Ok(mut solver) = allocate_with_config(kind, &config) {
            let result = solver.solve(&samples::infeasible());
            println!(
                "  {:<9} ok={} failed={}",
                kind.to_string(),
                result.is_ok(),
                solver.solve_failed()
            );
        }
    }
}
