// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Linear Solver Capability
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Injected sparse linear-solve capability.
//!
//! The eigenvalue solver only needs "solve `A x = b` starting from `x`".
//! [`LinearSolver`] is that contract; [`GmresSolver`] and [`SorSolver`]
//! are the shipped implementations and [`solver_from_config`] picks one
//! from a [`LinearSolverConfig`].

use cmfd_types::config::{LinearMethod, LinearSolverConfig};
use cmfd_types::error::{CmfdError, CmfdResult};

use crate::gmres::{gmres_solve, vec_norm, GmresConfig};
use crate::sor::sor_step;
use crate::sparse::CsrMatrix;

/// Outcome of one linear solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveStats {
    pub iterations: usize,
    /// Final L2 residual ‖b - A x‖.
    pub residual: f64,
    pub converged: bool,
}

/// Sparse linear-solve contract.
///
/// `x` is the initial guess on entry and the solution on exit. Hitting the
/// iteration limit is reported through [`SolveStats::converged`]; errors are
/// reserved for malformed input or a non-finite result.
pub trait LinearSolver: Send + Sync {
    fn solve(&self, a: &CsrMatrix, b: &[f64], x: &mut [f64]) -> CmfdResult<SolveStats>;

    /// Short name used in log lines.
    fn name(&self) -> &'static str;
}

fn check_dimensions(a: &CsrMatrix, b: &[f64], x: &[f64]) -> CmfdResult<()> {
    if a.n_rows() != a.n_cols() {
        return Err(CmfdError::LinAlg(format!(
            "operator must be square, got {}x{}",
            a.n_rows(),
            a.n_cols()
        )));
    }
    if b.len() != a.n_rows() || x.len() != a.n_rows() {
        return Err(CmfdError::LinAlg(format!(
            "dimension mismatch: operator {}, rhs {}, solution {}",
            a.n_rows(),
            b.len(),
            x.len()
        )));
    }
    Ok(())
}

fn check_finite(x: &[f64], solver: &str) -> CmfdResult<()> {
    if x.iter().any(|v| !v.is_finite()) {
        return Err(CmfdError::LinAlg(format!(
            "{solver} produced a non-finite solution"
        )));
    }
    Ok(())
}

/// Restarted GMRES(m) with SOR left preconditioning.
#[derive(Debug, Clone, Default)]
pub struct GmresSolver {
    pub config: GmresConfig,
}

impl GmresSolver {
    pub fn new(config: GmresConfig) -> Self {
        GmresSolver { config }
    }
}

impl LinearSolver for GmresSolver {
    fn solve(&self, a: &CsrMatrix, b: &[f64], x: &mut [f64]) -> CmfdResult<SolveStats> {
        check_dimensions(a, b, x)?;
        let result = gmres_solve(a, b, x, &self.config);
        check_finite(x, self.name())?;
        Ok(SolveStats {
            iterations: result.iterations,
            residual: result.residual,
            converged: result.converged,
        })
    }

    fn name(&self) -> &'static str {
        "gmres"
    }
}

/// Stand-alone SOR iteration with a residual stopping test.
#[derive(Debug, Clone)]
pub struct SorSolver {
    pub omega: f64,
    pub max_sweeps: usize,
    pub rtol: f64,
    pub atol: f64,
    /// Sweeps between residual evaluations.
    pub check_every: usize,
}

impl Default for SorSolver {
    fn default() -> Self {
        SorSolver {
            omega: 1.5,
            max_sweeps: 3000,
            rtol: 1e-10,
            atol: 1e-10,
            check_every: 5,
        }
    }
}

impl LinearSolver for SorSolver {
    fn solve(&self, a: &CsrMatrix, b: &[f64], x: &mut [f64]) -> CmfdResult<SolveStats> {
        check_dimensions(a, b, x)?;
        if let Some(row) = a.diagonal().iter().position(|d| *d == 0.0) {
            return Err(CmfdError::LinAlg(format!(
                "SOR needs a non-zero diagonal, row {row} is zero"
            )));
        }

        let tol = (self.rtol * vec_norm(b)).max(self.atol);
        let mut residual_vec = vec![0.0; b.len()];
        let mut residual = residual_norm(a, b, x, &mut residual_vec);
        let mut sweeps = 0;
        let check_every = self.check_every.max(1);

        while residual > tol && sweeps < self.max_sweeps {
            sor_step(a, b, x, self.omega);
            sweeps += 1;
            if sweeps % check_every == 0 || sweeps == self.max_sweeps {
                residual = residual_norm(a, b, x, &mut residual_vec);
                if !residual.is_finite() {
                    break;
                }
            }
        }
        check_finite(x, self.name())?;

        Ok(SolveStats {
            iterations: sweeps,
            residual,
            converged: residual <= tol,
        })
    }

    fn name(&self) -> &'static str {
        "sor"
    }
}

fn residual_norm(a: &CsrMatrix, b: &[f64], x: &[f64], scratch: &mut [f64]) -> f64 {
    a.matvec_into(x, scratch);
    for (r, &bi) in scratch.iter_mut().zip(b.iter()) {
        *r = bi - *r;
    }
    vec_norm(scratch)
}

/// Build the configured solver.
pub fn solver_from_config(config: &LinearSolverConfig) -> Box<dyn LinearSolver> {
    match config.method {
        LinearMethod::Gmres => Box::new(GmresSolver::new(GmresConfig {
            restart: config.restart,
            max_iter: config.max_restarts,
            rtol: config.rtol,
            atol: config.atol,
            precond_sweeps: config.precond_sweeps,
            precond_omega: config.omega,
        })),
        LinearMethod::Sor => Box::new(SorSolver {
            omega: config.omega,
            max_sweeps: config.restart * config.max_restarts,
            rtol: config.rtol,
            atol: config.atol,
            ..Default::default()
        }),
    }
}
