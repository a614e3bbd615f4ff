// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Surface Coupling Coefficients
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Face coupling coefficients of the coarse diffusion operator.
//!
//! For every cell, face and group two coefficients are produced:
//! `d_hat`, the finite-difference diffusive coupling, and `d_tilde`, the
//! nonlinear correction that makes the two-point flux difference
//! reproduce the tallied transport net current:
//!
//! ```text
//! J = -sense·d_hat·(φ_next - φ)·L - d_tilde·(φ_next + φ)·L
//! ```
//!
//! When `|d_tilde| > |d_hat|` both are replaced by current-derived values
//! that keep the loss operator diagonally dominant. The stored `d_tilde`
//! is then under-relaxed against the previous cycle's value.

use cmfd_types::config::AccelerationConfig;
use cmfd_types::constants::{DOMINANCE_SIGN_TOL, NUM_FACES};
use cmfd_types::error::{CmfdError, CmfdResult};
use cmfd_types::state::{BoundaryType, FluxState, SolveType, Surface};
use ndarray::{Array2, Array3, ArrayView2};
use rayon::prelude::*;

use crate::mesh::CoarseMesh;
use crate::quadrature::PolarQuadrature;

/// `[cell, face, group]` coupling coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct CouplingCoefficients {
    pub d_hat: Array3<f64>,
    pub d_tilde: Array3<f64>,
}

impl CouplingCoefficients {
    pub fn zeros(cells: usize, groups: usize) -> Self {
        CouplingCoefficients {
            d_hat: Array3::zeros((cells, NUM_FACES, groups)),
            d_tilde: Array3::zeros((cells, NUM_FACES, groups)),
        }
    }
}

/// Inputs of the coupling stage besides the mesh itself.
#[derive(Debug, Clone)]
pub struct CouplingParams {
    pub solve_type: SolveType,
    pub relax_factor: f64,
    pub optically_thick: bool,
    pub quadrature: PolarQuadrature,
}

impl CouplingParams {
    pub fn from_config(config: &AccelerationConfig) -> Self {
        CouplingParams {
            solve_type: config.solve_type,
            relax_factor: config.relax_factor,
            optically_thick: config.optically_thick,
            quadrature: PolarQuadrature::tabuchi_yamamoto(),
        }
    }

    /// Diffusion-coefficient correction for a cell of thickness `h`;
    /// only active for optically thick transport-driven solves.
    pub fn diffusion_correction(&self, d: f64, h: f64) -> f64 {
        if self.optically_thick && self.solve_type == SolveType::Moc {
            self.quadrature.optical_thickness_factor(d, h)
        } else {
            1.0
        }
    }

    fn transport_corrected(&self) -> bool {
        self.solve_type == SolveType::Moc
    }
}

impl Default for CouplingParams {
    fn default() -> Self {
        Self::from_config(&AccelerationConfig::default())
    }
}

/// Replace `(d_hat, d_tilde)` by current-derived values when the
/// correction outweighs the diffusive coupling. `current` is the net
/// current across the face, `length` the face length.
pub fn dominance_safeguard(
    sense: f64,
    d_hat: f64,
    d_tilde: f64,
    current: f64,
    flux: f64,
    flux_next: f64,
    length: f64,
) -> (f64, f64) {
    if d_tilde.abs() <= d_hat.abs() {
        return (d_hat, d_tilde);
    }
    let tilde_positive = 1.0 - d_tilde.abs() / d_tilde < DOMINANCE_SIGN_TOL;
    if sense < 0.0 {
        if tilde_positive {
            let v = -current / (2.0 * flux * length);
            (v, v)
        } else {
            (
                current / (2.0 * flux_next * length),
                -current / (2.0 * flux_next * length),
            )
        }
    } else if tilde_positive {
        let v = -current / (2.0 * flux_next * length);
        (v, v)
    } else {
        (
            current / (2.0 * flux * length),
            -current / (2.0 * flux * length),
        )
    }
}

/// Compute coupling coefficients for every cell from the homogenized
/// `Previous` flux, the tallied face currents and the `d_tilde` stored in
/// `mesh` from the previous cycle.
pub fn compute_coupling(mesh: &CoarseMesh, params: &CouplingParams) -> CmfdResult<CouplingCoefficients> {
    if !(params.relax_factor > 0.0 && params.relax_factor <= 1.0) {
        return Err(CmfdError::ConfigError(format!(
            "relax_factor must be in (0, 1], got {}",
            params.relax_factor
        )));
    }
    log::info!("computing cmfd surface coefficients");

    let flux = mesh.flux(FluxState::Previous)?;
    let cells = mesh.num_cells();
    let groups = mesh.num_groups();

    let blocks: Vec<(Array2<f64>, Array2<f64>)> = (0..cells)
        .into_par_iter()
        .map(|cell| cell_coefficients(mesh, params, &flux, cell))
        .collect();

    let mut out = CouplingCoefficients::zeros(cells, groups);
    for (cell, (d_hat, d_tilde)) in blocks.into_iter().enumerate() {
        out.d_hat.index_axis_mut(ndarray::Axis(0), cell).assign(&d_hat);
        out.d_tilde.index_axis_mut(ndarray::Axis(0), cell).assign(&d_tilde);
    }
    Ok(out)
}

/// `[face, group]` blocks of `d_hat` and relaxed `d_tilde` for one cell.
fn cell_coefficients(
    mesh: &CoarseMesh,
    params: &CouplingParams,
    flux: &ArrayView2<f64>,
    cell: usize,
) -> (Array2<f64>, Array2<f64>) {
    let groups = mesh.num_groups();
    let xs = mesh.xs(cell);
    let currents = mesh.currents();
    let previous = &mesh.coupling().d_tilde;
    let relax = params.relax_factor;

    let mut d_hat_block = Array2::zeros((NUM_FACES, groups));
    let mut d_tilde_block = Array2::zeros((NUM_FACES, groups));

    for surface in Surface::ALL {
        let s = surface.index();
        let sense = surface.sense();
        let length = mesh.face_length(cell, surface);
        let length_perpen = mesh.perpendicular_length(cell, surface);

        for e in 0..groups {
            let d = xs.dif_coef[e];
            let phi = flux[[cell, e]];
            let f = params.diffusion_correction(d, length_perpen);

            let (d_hat, d_tilde, current) = match mesh.neighbor(cell, surface) {
                None => {
                    let current = sense * currents[[cell, s, e]];
                    let (d_hat, d_tilde) = match mesh.boundary(surface) {
                        BoundaryType::Reflective => (0.0, 0.0),
                        BoundaryType::Vacuum => {
                            let d_hat = 2.0 * d * f / length_perpen
                                / (1.0 + 4.0 * d * f / length_perpen);
                            let d_tilde = if params.transport_corrected() {
                                (sense * d_hat * phi - current / length) / phi
                            } else {
                                0.0
                            };
                            (d_hat, d_tilde)
                        }
                        BoundaryType::ZeroFlux => (2.0 * d * f / length_perpen, 0.0),
                    };
                    (d_hat, d_tilde, current)
                }
                Some(next) => {
                    let next_surface = surface.opposite();
                    let next_length_perpen = mesh.perpendicular_length(next, next_surface);
                    let d_next = mesh.xs(next).dif_coef[e];
                    let phi_next = flux[[next, e]];
                    let f_next = params.diffusion_correction(d_next, next_length_perpen);

                    let d_hat = 2.0 * d * f * d_next * f_next
                        / (length_perpen * d * f + next_length_perpen * d_next * f_next);

                    let current = sense * currents[[cell, s, e]]
                        - sense * currents[[next, next_surface.index(), e]];

                    let d_tilde = if params.transport_corrected() {
                        -(sense * d_hat * (phi_next - phi) + current / length) / (phi_next + phi)
                    } else {
                        0.0
                    };

                    let (d_hat, d_tilde) =
                        dominance_safeguard(sense, d_hat, d_tilde, current, phi, phi_next, length);
                    (d_hat, d_tilde, current)
                }
            };

            let d_tilde = previous[[cell, s, e]] * (1.0 - relax) + relax * d_tilde;

            d_hat_block[[s, e]] = d_hat;
            d_tilde_block[[s, e]] = d_tilde;

            log::debug!(
                "cell: {cell}, group: {e}, side: {s}, flux: {phi:.6e}, current: {current:.6e}, d: {d:.6e}, dhat: {d_hat:.6e}, dtilde: {d_tilde:.6e}"
            );
        }
    }

    (d_hat_block, d_tilde_block)
}
