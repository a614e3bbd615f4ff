// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — CMFD Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Number of tallied surfaces per coarse cell (4 faces + 4 corners).
pub const NUM_SURFACES: usize = 8;

/// Number of cell faces carrying coupling coefficients.
pub const NUM_FACES: usize = 4;

/// Hard cap on outer power iterations.
pub const MAX_POWER_ITERATIONS: usize = 1000;

/// Relative and absolute tolerance of the inner linear solve.
pub const LINEAR_SOLVE_TOL: f64 = 1e-10;

/// Shift added to both sources before the pointwise ratio is taken.
pub const SOURCE_RATIO_SHIFT: f64 = 1e-15;

/// Fine-region diffusion coefficients at or below this are replaced by 1/(3 Σt).
pub const DIF_COEF_FLOOR: f64 = 1e-8;

/// Fine-region chi values at or below this count as zero.
pub const CHI_FLOOR: f64 = 1e-10;

/// Fine-region nu-fission values at or below this count as zero.
pub const NU_SIGMA_F_FLOOR: f64 = 1e-8;

/// Sign test tolerance in the diagonal-dominance safeguard.
pub const DOMINANCE_SIGN_TOL: f64 = 1e-8;

/// Point-location tolerance for `find_cell`.
pub const POINT_TOL: f64 = 1e-8;

/// Surface-location tolerance for `surface_at`.
pub const SURFACE_TOL: f64 = 1e-6;

/// Tabuchi-Yamamoto 3-angle polar quadrature: sin(theta).
pub const TY_SIN_THETA: [f64; 3] = [0.166648, 0.537707, 0.932954];

/// Tabuchi-Yamamoto 3-angle polar quadrature: weights.
pub const TY_WEIGHTS: [f64; 3] = [0.046233, 0.283619, 0.670148];
