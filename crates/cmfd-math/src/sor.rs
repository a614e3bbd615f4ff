// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — SOR
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Successive Over-Relaxation (SOR) on a CSR operator.
//!
//! Lexicographic (row-order) Gauss-Seidel sweep with relaxation `omega`:
//!   x_i ← (1 - ω) x_i + ω (b_i - Σ_{j≠i} a_ij x_j) / a_ii
//!
//! Used both as a stand-alone solver for the diagonally dominant CMFD
//! loss operator and as the GMRES left preconditioner.

use crate::sparse::CsrMatrix;

/// Perform one forward SOR sweep over all rows.
///
/// `omega`: relaxation factor (1.0 = Gauss-Seidel, 1.2-1.8 = over-relaxation).
/// Rows with a zero diagonal are left untouched.
pub fn sor_step(a: &CsrMatrix, b: &[f64], x: &mut [f64], omega: f64) {
    for i in 0..a.n_rows() {
        update_row(a, b, x, i, omega);
    }
}

/// Run N SOR iterations.
pub fn sor_solve(a: &CsrMatrix, b: &[f64], x: &mut [f64], omega: f64, iterations: usize) {
    for _ in 0..iterations {
        sor_step(a, b, x, omega);
    }
}

/// Compute the L-infinity residual `max_i |(A x - b)_i|`.
pub fn sor_residual(a: &CsrMatrix, b: &[f64], x: &[f64]) -> f64 {
    let mut max_res: f64 = 0.0;
    for (i, &bi) in b.iter().enumerate().take(a.n_rows()) {
        let lhs: f64 = a.row(i).map(|(c, v)| v * x[c]).sum();
        max_res = max_res.max((lhs - bi).abs());
    }
    max_res
}

/// Update a single unknown using the SOR formula.
#[inline]
fn update_row(a: &CsrMatrix, b: &[f64], x: &mut [f64], i: usize, omega: f64) {
    let mut diag = 0.0;
    let mut off = 0.0;
    for (c, v) in a.row(i) {
        if c == i {
            diag = v;
        } else {
            off += v * x[c];
        }
    }
    if diag == 0.0 {
        return;
    }

    // Gauss-Seidel prediction
    let x_star = (b[i] - off) / diag;

    // SOR update
    x[i] = (1.0 - omega) * x[i] + omega * x_star;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::SparseBuilder;

    /// 1D Laplacian with an absorption shift, size n.
    fn shifted_laplacian(n: usize, shift: f64) -> CsrMatrix {
        let mut b = SparseBuilder::with_row_capacity(n, 3);
        for i in 0..n {
            b.add(i, i, 2.0 + shift).unwrap();
            if i > 0 {
                b.add(i, i - 1, -1.0).unwrap();
            }
            if i + 1 < n {
                b.add(i, i + 1, -1.0).unwrap();
            }
        }
        b.build()
    }

    #[test]
    fn test_sor_converges_on_shifted_laplacian() {
        let a = shifted_laplacian(50, 0.1);
        let rhs = vec![1.0; 50];
        let mut x = vec![0.0; 50];

        sor_solve(&a, &rhs, &mut x, 1.5, 500);

        let res = sor_residual(&a, &rhs, &x);
        assert!(res < 1e-8, "Residual should be small: {res}");
        assert!(!x.iter().any(|v| v.is_nan()), "No NaN allowed");
    }

    #[test]
    fn test_sor_zero_source_stays_zero() {
        let a = shifted_laplacian(16, 0.5);
        let rhs = vec![0.0; 16];
        let mut x = vec![0.0; 16];

        sor_solve(&a, &rhs, &mut x, 1.8, 100);

        let max_val = x.iter().cloned().fold(0.0_f64, |m, v| m.max(v.abs()));
        assert!(max_val < 1e-15, "Should stay zero with zero source");
    }

    #[test]
    fn test_sor_residual_decreases() {
        let a = shifted_laplacian(40, 0.01);
        let rhs = vec![1.0; 40];
        let mut x = vec![0.0; 40];

        let res_before = sor_residual(&a, &rhs, &x);
        sor_solve(&a, &rhs, &mut x, 1.2, 20);
        let res_after = sor_residual(&a, &rhs, &x);

        assert!(
            res_after < res_before,
            "Residual should decrease: {res_before} -> {res_after}"
        );
    }

    #[test]
    fn test_sor_diagonal_system_exact_in_one_sweep() {
        let mut b = SparseBuilder::new(3, 3);
        b.add(0, 0, 2.0).unwrap();
        b.add(1, 1, 4.0).unwrap();
        b.add(2, 2, 0.5).unwrap();
        let a = b.build();
        let mut x = vec![0.0; 3];
        sor_step(&a, &[2.0, 2.0, 2.0], &mut x, 1.0);
        assert_eq!(x, vec![1.0, 0.5, 4.0]);
    }
}
