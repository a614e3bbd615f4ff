// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — GMRES
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Restarted GMRES(m) Krylov subspace solver for the sparse CMFD loss
//! operator.
//!
//! GMRES (Generalised Minimal RESidual) builds an orthonormal Krylov
//! basis via Arnoldi iteration with modified Gram-Schmidt, then solves
//! the projected least-squares problem using Givens rotations on the
//! upper Hessenberg matrix.  When the basis reaches size `m` without
//! convergence the solver restarts from the current approximate
//! solution.
//!
//! A left-preconditioner is applied: instead of solving `A x = b`, we
//! solve `M⁻¹ A x = M⁻¹ b`, where `M⁻¹` is approximated by a few
//! SOR sweeps on `A`.
//!
//! Convergence is declared when the true residual satisfies
//! `‖b - A x‖₂ ≤ max(rtol·‖b‖₂, atol)`.  The caller's `x` is used as the
//! initial guess, which matters inside power iteration where successive
//! right-hand sides differ only slightly.

use crate::sor::sor_step;
use crate::sparse::CsrMatrix;

// ───────────────────────────── configuration ─────────────────────────

/// Configuration for the GMRES(m) solver.
#[derive(Debug, Clone)]
pub struct GmresConfig {
    /// Krylov subspace dimension before restart (default: 30).
    pub restart: usize,
    /// Maximum number of outer (restart) iterations (default: 100).
    pub max_iter: usize,
    /// Relative tolerance on the residual, scaled by ‖b‖ (default: 1e-10).
    pub rtol: f64,
    /// Absolute residual tolerance (default: 1e-10).
    pub atol: f64,
    /// Number of SOR sweeps used by the left preconditioner (default: 3).
    pub precond_sweeps: usize,
    /// SOR relaxation factor for the preconditioner (default: 1.5).
    pub precond_omega: f64,
}

impl Default for GmresConfig {
    fn default() -> Self {
        GmresConfig {
            restart: 30,
            max_iter: 100,
            rtol: 1e-10,
            atol: 1e-10,
            precond_sweeps: 3,
            precond_omega: 1.5,
        }
    }
}

/// Result of a GMRES solve.
#[derive(Debug, Clone)]
pub struct GmresResult {
    /// Total number of matrix-vector products (inner iterations summed
    /// over all restarts).
    pub iterations: usize,
    /// Final L2 residual norm.
    pub residual: f64,
    /// Whether convergence was achieved.
    pub converged: bool,
}

// ────────────────────────── SOR preconditioner ──────────────────────

/// Apply the left preconditioner: approximately solve `A z = r` by
/// performing a few SOR sweeps starting from zero.
fn precondition(a: &CsrMatrix, r_vec: &[f64], sweeps: usize, omega: f64, z: &mut [f64]) {
    if sweeps == 0 {
        z.copy_from_slice(r_vec);
        return;
    }
    z.fill(0.0);
    for _ in 0..sweeps {
        sor_step(a, r_vec, z, omega);
    }
}

// ───────────────────────── BLAS-like helpers ─────────────────────────

/// Euclidean (L2) norm of a slice.
#[inline]
pub(crate) fn vec_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Dot product.
#[inline]
fn vec_dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// `y = y + alpha * x` (axpy).
#[inline]
fn vec_axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    for (yi, &xi) in y.iter_mut().zip(x.iter()) {
        *yi += alpha * xi;
    }
}

/// `y = alpha * x` (scale-copy).
#[inline]
fn vec_scale(alpha: f64, x: &[f64], y: &mut [f64]) {
    for (yi, &xi) in y.iter_mut().zip(x.iter()) {
        *yi = alpha * xi;
    }
}

/// `out = a - b`.
#[inline]
fn vec_sub(a: &[f64], b: &[f64], out: &mut [f64]) {
    for ((oi, &ai), &bi) in out.iter_mut().zip(a.iter()).zip(b.iter()) {
        *oi = ai - bi;
    }
}

/// `out = b - A x`, returns ‖out‖₂.
fn true_residual(a: &CsrMatrix, b: &[f64], x: &[f64], av: &mut [f64], out: &mut [f64]) -> f64 {
    a.matvec_into(x, av);
    vec_sub(b, av, out);
    vec_norm(out)
}

// ───────────────────── Givens rotation helpers ──────────────────────

/// A single Givens rotation storing (c, s) such that
/// ```text
/// | c  s | | a |   | r |
/// |-s  c | | b | = | 0 |
/// ```
#[derive(Clone, Copy)]
struct GivensRotation {
    c: f64,
    s: f64,
}

impl GivensRotation {
    /// Compute the rotation that zeroes `b` in (a, b).
    fn compute(a: f64, b: f64) -> Self {
        if b.abs() < 1e-300 {
            GivensRotation { c: 1.0, s: 0.0 }
        } else if b.abs() > a.abs() {
            let tau = -a / b;
            let s = 1.0 / (1.0 + tau * tau).sqrt();
            let c = s * tau;
            GivensRotation { c, s }
        } else {
            let tau = -b / a;
            let c = 1.0 / (1.0 + tau * tau).sqrt();
            let s = c * tau;
            GivensRotation { c, s }
        }
    }

    /// Apply this rotation to (a, b) in place.
    #[inline]
    fn apply(&self, a: &mut f64, b: &mut f64) {
        let ta = *a;
        let tb = *b;
        *a = self.c * ta - self.s * tb;
        *b = self.s * ta + self.c * tb;
    }
}

// ─────────────────────────── main solver ─────────────────────────────

/// Solve `A x = b` using restarted GMRES(m) with a left SOR
/// preconditioner.
///
/// `x` is the initial guess on entry and the solution on exit.
///
/// # Algorithm
///
/// ```text
/// for each restart cycle:
///   r = b - A·x                   (residual)
///   if ‖r‖ ≤ tol: done
///   z = M⁻¹ r                    (precondition)
///   beta = ||z||₂
///   V[0] = z / beta
///   for j = 0 .. m-1:             (Arnoldi)
///     w = M⁻¹ A V[j]
///     for i = 0 .. j:             (modified Gram-Schmidt)
///       H[i,j] = <w, V[i]>
///       w -= H[i,j] V[i]
///     H[j+1,j] = ||w||₂
///     V[j+1]   = w / H[j+1,j]
///     apply previous Givens to H[:,j]
///     compute new Givens to zero H[j+1,j]
///     if preconditioned estimate small: break
///   solve upper triangular system for y
///   x += V · y
/// ```
pub fn gmres_solve(a: &CsrMatrix, b: &[f64], x: &mut [f64], config: &GmresConfig) -> GmresResult {
    let n = a.n_rows();

    if n == 0 {
        return GmresResult {
            iterations: 0,
            residual: 0.0,
            converged: true,
        };
    }

    let m = config.restart.clamp(1, n); // Krylov dimension cannot exceed n

    let mut av = vec![0.0; n]; // result of A*v
    let mut r_flat = vec![0.0; n];
    let mut z = vec![0.0; n];
    let mut total_iters: usize = 0;

    let abs_tol = (config.rtol * vec_norm(b)).max(config.atol);

    // ───── outer restart loop ─────
    for _restart in 0..config.max_iter {
        let res_norm = true_residual(a, b, x, &mut av, &mut r_flat);
        if res_norm <= abs_tol {
            return GmresResult {
                iterations: total_iters,
                residual: res_norm,
                converged: true,
            };
        }

        // Precondition: z = M⁻¹ r
        precondition(a, &r_flat, config.precond_sweeps, config.precond_omega, &mut z);

        let beta = vec_norm(&z);
        if beta < 1e-300 {
            return GmresResult {
                iterations: total_iters,
                residual: res_norm,
                converged: false,
            };
        }

        // The inner loop works on the preconditioned residual; scale the
        // target so both norms break at a comparable point.
        let inner_tol = abs_tol * beta / res_norm;

        // Krylov basis V[0..m+1], each of length n
        let mut v_basis: Vec<Vec<f64>> = Vec::with_capacity(m + 1);
        {
            let mut v0 = vec![0.0; n];
            vec_scale(1.0 / beta, &z, &mut v0);
            v_basis.push(v0);
        }

        // Upper Hessenberg matrix H[(m+1) x m] stored column-major
        // H[i][j] => h_store[j * (m+1) + i]
        let h_rows = m + 1;
        let mut h_store = vec![0.0; h_rows * m];

        // Givens rotations accumulated so far
        let mut givens: Vec<GivensRotation> = Vec::with_capacity(m);

        // Right-hand side of the Hessenberg least-squares: g = beta * e_1
        let mut g = vec![0.0; m + 1];
        g[0] = beta;

        let mut inner_iters: usize = 0;

        // ───── Arnoldi iteration ─────
        for j in 0..m {
            inner_iters = j + 1;
            total_iters += 1;

            // w = M⁻¹ (A V[j])
            a.matvec_into(&v_basis[j], &mut av);
            let mut w = vec![0.0; n];
            precondition(a, &av, config.precond_sweeps, config.precond_omega, &mut w);

            // Modified Gram-Schmidt orthogonalisation
            for (i, v_i) in v_basis.iter().enumerate().take(j + 1) {
                let h_ij = vec_dot(&w, v_i);
                h_store[j * h_rows + i] = h_ij;
                vec_axpy(-h_ij, v_i, &mut w);
            }

            let h_jp1_j = vec_norm(&w);
            h_store[j * h_rows + (j + 1)] = h_jp1_j;

            if h_jp1_j > 1e-300 {
                let mut vj1 = vec![0.0; n];
                vec_scale(1.0 / h_jp1_j, &w, &mut vj1);
                v_basis.push(vj1);
            } else {
                // Happy breakdown: residual is zero in the Krylov subspace
                v_basis.push(vec![0.0; n]);
            }

            // Apply all previous Givens rotations to column j of H
            for (i, rot) in givens.iter().enumerate() {
                let a_ptr = j * h_rows + i;
                let b_ptr = j * h_rows + i + 1;
                let mut ha = h_store[a_ptr];
                let mut hb = h_store[b_ptr];
                rot.apply(&mut ha, &mut hb);
                h_store[a_ptr] = ha;
                h_store[b_ptr] = hb;
            }

            // Compute new Givens rotation to zero H[j+1, j]
            let rot =
                GivensRotation::compute(h_store[j * h_rows + j], h_store[j * h_rows + (j + 1)]);
            {
                let a_ptr = j * h_rows + j;
                let b_ptr = j * h_rows + (j + 1);
                let mut ha = h_store[a_ptr];
                let mut hb = h_store[b_ptr];
                rot.apply(&mut ha, &mut hb);
                h_store[a_ptr] = ha;
                h_store[b_ptr] = hb;
            }

            // Apply rotation to the rhs vector g
            {
                let mut ga = g[j];
                let mut gb = g[j + 1];
                rot.apply(&mut ga, &mut gb);
                g[j] = ga;
                g[j + 1] = gb;
            }

            givens.push(rot);

            if g[j + 1].abs() < inner_tol || h_jp1_j < 1e-300 {
                break;
            }
        }

        // ───── solve the upper triangular system H y = g ─────
        let k = inner_iters;
        let mut y = vec![0.0; k];

        for i in (0..k).rev() {
            let mut sum = g[i];
            for (jj, &y_jj) in y.iter().enumerate().skip(i + 1) {
                sum -= h_store[jj * h_rows + i] * y_jj;
            }
            let diag = h_store[i * h_rows + i];
            y[i] = if diag.abs() > 1e-300 { sum / diag } else { 0.0 };
        }

        // ───── update solution: x = x + V * y ─────
        for (i, &y_i) in y.iter().enumerate() {
            vec_axpy(y_i, &v_basis[i], x);
        }
    }

    // Exhausted restarts — compute true residual
    let final_residual = true_residual(a, b, x, &mut av, &mut r_flat);

    GmresResult {
        iterations: total_iters,
        residual: final_residual,
        converged: final_residual <= abs_tol,
    }
}

// ═══════════════════════════════ tests ═══════════════════════════════
