// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Coarse Eigenvalue Solver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Power iteration on `A φ = (1/k) M φ`.
//!
//! The fission source is kept normalised to sum `N` (number of unknowns).
//! Each iteration solves `A φ_new = s_old`, forms `s_new = M φ_new` and
//! takes `k = Σ s_new / Σ s_old`. Convergence is judged on the pointwise
//! source ratio `‖(k s_old + δ)/(s_new + δ) − 1‖₂ / N`.

use std::time::Instant;

use cmfd_math::solver::LinearSolver;
use cmfd_math::sparse::CsrMatrix;
use cmfd_types::config::EigenSolverConfig;
use cmfd_types::constants::SOURCE_RATIO_SHIFT;
use cmfd_types::error::{CmfdError, CmfdResult};
use cmfd_types::state::{EigenResult, EigenStatus};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerIteration {
    pub max_iterations: usize,
    pub convergence_criteria: f64,
}

impl PowerIteration {
    pub fn from_config(config: &EigenSolverConfig) -> Self {
        PowerIteration {
            max_iterations: config.max_iterations,
            convergence_criteria: config.convergence_criteria,
        }
    }
}

impl Default for PowerIteration {
    fn default() -> Self {
        Self::from_config(&EigenSolverConfig::default())
    }
}

/// Eigenvalue summary plus both flux vectors, each rescaled so that its
/// fission source sums to `N`.
#[derive(Debug, Clone)]
pub struct EigenSolution {
    pub result: EigenResult,
    pub phi_new: Vec<f64>,
    pub phi_old: Vec<f64>,
}

impl PowerIteration {
    /// Run the power iteration. `phi_old` is the starting flux and the
    /// initial guess of the first linear solve.
    pub fn solve(
        &self,
        loss: &CsrMatrix,
        production: &CsrMatrix,
        phi_old: &[f64],
        solver: &dyn LinearSolver,
    ) -> CmfdResult<EigenSolution> {
        let n = phi_old.len();
        if loss.n_rows() != n || loss.n_cols() != n || production.n_rows() != n || production.n_cols() != n {
            return Err(CmfdError::LinAlg(format!(
                "operators {}x{} and {}x{} do not match flux of length {n}",
                loss.n_rows(),
                loss.n_cols(),
                production.n_rows(),
                production.n_cols()
            )));
        }
        if n == 0 {
            return Err(CmfdError::LinAlg("empty eigenproblem".to_string()));
        }
        let start = Instant::now();
        let norm = n as f64;

        let mut phi_old = phi_old.to_vec();
        let mut phi_new = phi_old.clone();

        let mut s_old = production.matvec(&phi_old);
        let initial: f64 = s_old.iter().sum();
        if !(initial.is_finite() && initial > 0.0) {
            return Err(CmfdError::PhysicsViolation(format!(
                "initial fission source sums to {initial}, must be positive"
            )));
        }
        scale(&mut s_old, norm / initial);

        let mut s_new = vec![0.0; n];
        let mut k_eff = 1.0;
        let mut residual = f64::INFINITY;
        let mut iterations = 0;
        let mut status = EigenStatus::MaxItersReached;

        for iter in 0..self.max_iterations {
            let stats = solver.solve(loss, &s_old, &mut phi_new)?;
            if !stats.converged {
                log::warn!(
                    "{} did not converge in iteration {iter}: residual {:.3e} after {} steps",
                    solver.name(),
                    stats.residual,
                    stats.iterations
                );
            }

            production.matvec_into(&phi_new, &mut s_new);
            let sum_new: f64 = s_new.iter().sum();
            let sum_old: f64 = s_old.iter().sum();
            k_eff = sum_new / sum_old;
            if !(k_eff.is_finite() && sum_new > 0.0) {
                return Err(CmfdError::SolverDiverged {
                    iteration: iter,
                    message: format!("k_eff = {k_eff}, fission source sum = {sum_new}"),
                });
            }

            scale(&mut s_old, k_eff);
            residual = source_error(&s_old, &s_new) / norm;

            scale(&mut s_new, norm / sum_new);
            std::mem::swap(&mut s_old, &mut s_new);
            iterations = iter + 1;

            log::info!("iteration: {iter}, k_eff = {k_eff:.6}, error = {residual:.3e}");

            if residual < self.convergence_criteria {
                status = EigenStatus::Converged;
                break;
            }
        }

        if status == EigenStatus::MaxItersReached {
            log::warn!(
                "power iteration hit the cap of {} iterations, error {residual:.3e}",
                self.max_iterations
            );
        }

        normalize_source(production, &mut phi_new, norm)?;
        normalize_source(production, &mut phi_old, norm)?;
        if phi_new.iter().any(|v| !v.is_finite()) {
            return Err(CmfdError::SolverDiverged {
                iteration: iterations,
                message: "non-finite coarse flux".to_string(),
            });
        }

        let solve_time_ms = start.elapsed().as_secs_f64() * 1e3;
        Ok(EigenSolution {
            result: EigenResult {
                k_eff,
                status,
                iterations,
                residual,
                solve_time_ms,
            },
            phi_new,
            phi_old,
        })
    }
}

fn scale(v: &mut [f64], factor: f64) {
    for x in v.iter_mut() {
        *x *= factor;
    }
}

/// `‖(a + δ)/(b + δ) − 1‖₂`
fn source_error(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let r = (x + SOURCE_RATIO_SHIFT) / (y + SOURCE_RATIO_SHIFT) - 1.0;
            r * r
        })
        .sum::<f64>()
        .sqrt()
}

/// Scale `phi` so that `Σ M φ = norm`.
fn normalize_source(production: &CsrMatrix, phi: &mut [f64], norm: f64) -> CmfdResult<()> {
    let total: f64 = production.matvec(phi).iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(CmfdError::PhysicsViolation(format!(
            "fission source sums to {total}, cannot normalise flux"
        )));
    }
    scale(phi, norm / total);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmfd_math::solver::{GmresSolver, SorSolver};
    use cmfd_math::sparse::SparseBuilder;

    fn dense(n: usize, entries: &[(usize, usize, f64)]) -> CsrMatrix {
        let mut b = SparseBuilder::new(n, n);
        for &(i, j, v) in entries {
            b.add(i, j, v).unwrap();
        }
        b.build()
    }

    #[test]
    fn test_critical_single_unknown() {
        let a = dense(1, &[(0, 0, 2.0)]);
        let m = dense(1, &[(0, 0, 2.0)]);
        let sol = PowerIteration::default()
            .solve(&a, &m, &[1.0], &GmresSolver::default())
            .unwrap();
        assert!((sol.result.k_eff - 1.0).abs() < 1e-12);
        assert_eq!(sol.result.status, EigenStatus::Converged);
        assert_eq!(sol.result.iterations, 1);
        // Σ M φ = 1
        assert!((2.0 * sol.phi_new[0] - 1.0).abs() < 1e-12);
        assert!((2.0 * sol.phi_old[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_two_group_infinite_medium() {
        // A = [[Σa1 + Σ12, 0], [-Σ12, Σa2]], M = [[νΣf1, νΣf2], [0, 0]]
        let (sa1, sa2, s12, nf1, nf2) = (0.01, 0.08, 0.02, 0.005, 0.12);
        let a = dense(2, &[(0, 0, sa1 + s12), (1, 0, -s12), (1, 1, sa2)]);
        let m = dense(2, &[(0, 0, nf1), (0, 1, nf2)]);
        let expected = (nf1 + nf2 * s12 / sa2) / (sa1 + s12);

        let solver = SorSolver {
            omega: 1.0,
            ..Default::default()
        };
        let power = PowerIteration {
            max_iterations: 500,
            convergence_criteria: 1e-10,
        };
        let sol = power.solve(&a, &m, &[1.0, 1.0], &solver).unwrap();
        assert!(sol.result.converged());
        assert!((sol.result.k_eff - expected).abs() < 1e-8, "k = {}", sol.result.k_eff);
        // spectrum φ2/φ1 = Σ12/Σa2
        let ratio = sol.phi_new[1] / sol.phi_new[0];
        assert!((ratio - s12 / sa2).abs() < 1e-6);
        let source: f64 = m.matvec(&sol.phi_new).iter().sum();
        assert!((source - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_cap_reports_status() {
        let a = dense(2, &[(0, 0, 1.0), (0, 1, -0.5), (1, 0, -0.5), (1, 1, 1.0)]);
        let m = dense(2, &[(0, 0, 1.0), (1, 1, 0.3)]);
        let power = PowerIteration {
            max_iterations: 2,
            convergence_criteria: 1e-14,
        };
        let sol = power.solve(&a, &m, &[1.0, 0.1], &GmresSolver::default()).unwrap();
        assert_eq!(sol.result.status, EigenStatus::MaxItersReached);
        assert_eq!(sol.result.iterations, 2);
        assert!(sol.result.residual > 0.0);
    }

    #[test]
    fn test_zero_source_rejected() {
        let a = dense(2, &[(0, 0, 1.0), (1, 1, 1.0)]);
        let m = dense(2, &[]);
        let err = PowerIteration::default().solve(&a, &m, &[1.0, 1.0], &GmresSolver::default());
        assert!(matches!(err, Err(CmfdError::PhysicsViolation(_))));
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let a = dense(2, &[(0, 0, 1.0), (1, 1, 1.0)]);
        let m = dense(2, &[(0, 0, 1.0)]);
        let err = PowerIteration::default().solve(&a, &m, &[1.0], &GmresSolver::default());
        assert!(matches!(err, Err(CmfdError::LinAlg(_))));
    }

    #[test]
    fn test_zero_iterations_keeps_initial_flux_shape() {
        let a = dense(1, &[(0, 0, 1.0)]);
        let m = dense(1, &[(0, 0, 4.0)]);
        let power = PowerIteration {
            max_iterations: 0,
            convergence_criteria: 1e-5,
        };
        let sol = power.solve(&a, &m, &[3.0], &GmresSolver::default()).unwrap();
        assert_eq!(sol.result.iterations, 0);
        assert_eq!(sol.result.status, EigenStatus::MaxItersReached);
        assert!((sol.phi_new[0] - 0.25).abs() < 1e-15);
    }
}
