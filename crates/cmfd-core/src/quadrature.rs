// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Polar Quadrature
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Polar quadrature and the optical-thickness correction of the coarse
//! diffusion coefficient.
//!
//! For a cell of thickness `h` and diffusion coefficient `d`:
//!   α(μ) = (1 + e^{-h/(3dμ)}) / (1 - e^{-h/(3dμ)}) - 2μ/h
//!   ρ    = Σ_p μ_p w_p α(μ_p)
//!   F    = 1 + h ρ / (2d)
//! With `d = 1/(3Σt)` the factor tends to 1 for thin cells and grows
//! linearly with `h` for thick ones.

use cmfd_types::constants::{TY_SIN_THETA, TY_WEIGHTS};

/// Discrete polar angles (as sin θ) with weights summing to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct PolarQuadrature {
    pub sin_theta: Vec<f64>,
    pub weights: Vec<f64>,
}

impl PolarQuadrature {
    /// Three-angle Tabuchi–Yamamoto set.
    pub fn tabuchi_yamamoto() -> Self {
        PolarQuadrature {
            sin_theta: TY_SIN_THETA.to_vec(),
            weights: TY_WEIGHTS.to_vec(),
        }
    }

    pub fn num_polar(&self) -> usize {
        self.sin_theta.len()
    }

    /// Polar direction cosines `μ = cos(asin(sin θ))`.
    pub fn mu(&self) -> impl Iterator<Item = f64> + '_ {
        self.sin_theta.iter().map(|s| s.asin().cos())
    }

    /// Diffusion-coefficient correction factor `F` for a cell of
    /// thickness `h` (perpendicular to the face) and coefficient `d`.
    pub fn optical_thickness_factor(&self, d: f64, h: f64) -> f64 {
        let rho: f64 = self
            .mu()
            .zip(self.weights.iter())
            .map(|(mu, w)| {
                let expon = (-h / (3.0 * d * mu)).exp();
                let alpha = (1.0 + expon) / (1.0 - expon) - 2.0 * mu / h;
                mu * w * alpha
            })
            .sum();
        1.0 + h * rho / (2.0 * d)
    }
}

impl Default for PolarQuadrature {
    fn default() -> Self {
        Self::tabuchi_yamamoto()
    }
}
