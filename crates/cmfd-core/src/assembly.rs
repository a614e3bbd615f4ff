// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Coarse System Assembly
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Loss (`A`) and production (`M`) operators of the coarse eigenproblem
//! `A φ = (1/k) M φ`.
//!
//! Unknowns are ordered `cell * groups + group`. A row of `A` holds
//! absorption and out-scatter on the diagonal, in-scatter from the other
//! groups of the same cell, and one migration term per face.

use cmfd_math::sparse::{CsrMatrix, SparseBuilder};
use cmfd_types::constants::NUM_FACES;
use cmfd_types::error::CmfdResult;
use cmfd_types::state::{FluxMode, Surface};
use ndarray::ArrayView2;

use crate::mesh::CoarseMesh;

/// Build the loss operator from the cross sections, volumes and coupling
/// coefficients stored in `mesh`.
pub fn assemble_loss(mesh: &CoarseMesh, mode: FluxMode) -> CmfdResult<CsrMatrix> {
    let groups = mesh.num_groups();
    let n = mesh.num_cells() * groups;
    let mut builder = SparseBuilder::with_row_capacity(n, groups + NUM_FACES);
    let coupling = mesh.coupling();

    for cell in 0..mesh.num_cells() {
        let xs = mesh.xs(cell);
        let volume = mesh.volume(cell);

        for e in 0..groups {
            let row = cell * groups + e;

            builder.add(row, row, xs.sigma_a[e] * volume)?;

            for g in (0..groups).filter(|&g| g != e) {
                builder.add(row, row, xs.scatter[[e, g]] * volume)?;
                let in_scatter = match mode {
                    FluxMode::Forward => xs.scatter[[g, e]],
                    FluxMode::Adjoint => xs.scatter[[e, g]],
                };
                builder.add(row, cell * groups + g, -in_scatter * volume)?;
            }

            for surface in Surface::ALL {
                let s = surface.index();
                let sense = surface.sense();
                let length = mesh.face_length(cell, surface);
                let d_hat = coupling.d_hat[[cell, s, e]];
                let d_tilde = coupling.d_tilde[[cell, s, e]];

                builder.add(row, row, (d_hat - sense * d_tilde) * length)?;
                if let Some(next) = mesh.neighbor(cell, surface) {
                    builder.add(
                        row,
                        next * groups + e,
                        -(d_hat + sense * d_tilde) * length,
                    )?;
                }
            }
        }
    }

    let a = builder.build();
    log::debug!("assembled loss operator: {n} unknowns, {} non-zeros", a.nnz());
    Ok(a)
}

/// Build the fission production operator. Only the within-cell group
/// blocks are populated.
pub fn assemble_production(mesh: &CoarseMesh, mode: FluxMode) -> CmfdResult<CsrMatrix> {
    let groups = mesh.num_groups();
    let n = mesh.num_cells() * groups;
    let mut builder = SparseBuilder::with_row_capacity(n, groups);

    for cell in 0..mesh.num_cells() {
        let xs = mesh.xs(cell);
        let volume = mesh.volume(cell);
        for e in 0..groups {
            let row = cell * groups + e;
            for g in 0..groups {
                let value = match mode {
                    FluxMode::Forward => xs.chi[e] * xs.nu_sigma_f[g],
                    FluxMode::Adjoint => xs.chi[g] * xs.nu_sigma_f[e],
                } * volume;
                if value != 0.0 {
                    builder.add(row, cell * groups + g, value)?;
                }
            }
        }
    }

    let m = builder.build();
    log::debug!("assembled production operator: {n} unknowns, {} non-zeros", m.nnz());
    Ok(m)
}

/// Flatten a `[cell, group]` flux into the operator ordering.
pub fn flatten_flux(flux: ArrayView2<f64>) -> Vec<f64> {
    flux.iter().copied().collect()
}
