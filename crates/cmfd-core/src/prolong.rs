// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Flux Prolongation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Scale fine-region fluxes by the coarse update ratio
//! `φ_cell,new / φ_cell,old` of the owning cell.

use cmfd_types::error::{CmfdError, CmfdResult};
use cmfd_types::state::FluxState;
use ndarray::Array2;

use crate::fine::FineRegions;
use crate::mesh::CoarseMesh;

/// `[cell, group]` ratio of the `Current` to the `Previous` coarse flux.
pub fn update_ratios(mesh: &CoarseMesh) -> CmfdResult<Array2<f64>> {
    let new = mesh.flux(FluxState::Current)?;
    let old = mesh.flux(FluxState::Previous)?;
    let mut ratios = Array2::zeros(new.raw_dim());
    for ((cell, e), r) in ratios.indexed_iter_mut() {
        let before = old[[cell, e]];
        if !(before.is_finite() && before > 0.0) {
            return Err(CmfdError::PhysicsViolation(format!(
                "cell {cell} group {e}: previous coarse flux {before} must be positive"
            )));
        }
        *r = new[[cell, e]] / before;
    }
    Ok(ratios)
}

/// Apply the coarse update to every fine region owned by a cell.
pub fn prolong(mesh: &CoarseMesh, fine: &mut FineRegions) -> CmfdResult<()> {
    if fine.num_groups() != mesh.num_groups() {
        return Err(CmfdError::GroupMismatch {
            expected: mesh.num_groups(),
            got: fine.num_groups(),
        });
    }
    log::info!("updating fine-region flux from the coarse solution");
    let ratios = update_ratios(mesh)?;

    for (cell, regions) in mesh.all_cell_regions().iter().enumerate() {
        for &r in regions {
            if r >= fine.num_regions() {
                return Err(CmfdError::ConfigError(format!(
                    "cell {cell} references fine region {r}, only {} exist",
                    fine.num_regions()
                )));
            }
            let mut row = fine.fluxes.row_mut(r);
            row *= &ratios.row(cell);
            log::debug!("region {r} (cell {cell}) scaled by {}", ratios.row(cell));
        }
    }
    Ok(())
}
