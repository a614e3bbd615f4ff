// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Homogenization
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Flux-volume weighted condensation of fine-region data onto coarse
//! cells.
//!
//! Per cell and group every tally is `Σ_r x_r φ_r V_r` over the owned
//! regions, divided by the reaction weight `Σ_r φ_r V_r`. The cell flux
//! is the reaction weight over the summed region volume.

use cmfd_types::constants::{CHI_FLOOR, DIF_COEF_FLOOR, NU_SIGMA_F_FLOOR};
use cmfd_types::error::{CmfdError, CmfdResult};
use ndarray::{Array1, Array2};
use rayon::prelude::*;

use crate::fine::FineRegions;
use crate::material::CellCrossSections;
use crate::mesh::CoarseMesh;

/// Output of one homogenization pass, one entry per coarse cell.
#[derive(Debug, Clone)]
pub struct Homogenized {
    pub xs: Vec<CellCrossSections>,
    /// `[cell, group]` condensed flux.
    pub flux: Array2<f64>,
    /// Sum of owned fine-region volumes.
    pub volumes: Vec<f64>,
}

struct CellTally {
    xs: CellCrossSections,
    flux: Array1<f64>,
    volume: f64,
}

/// Condense `fine` onto the cells of `mesh`.
pub fn homogenize(mesh: &CoarseMesh, fine: &FineRegions) -> CmfdResult<Homogenized> {
    let groups = mesh.num_groups();
    if fine.num_groups() != groups {
        return Err(CmfdError::GroupMismatch {
            expected: groups,
            got: fine.num_groups(),
        });
    }
    log::info!("computing cmfd cross sections for {} cells", mesh.num_cells());

    let tallies: Vec<CellTally> = mesh
        .all_cell_regions()
        .par_iter()
        .enumerate()
        .map(|(cell, regions)| condense_cell(cell, regions, fine, groups))
        .collect::<CmfdResult<Vec<_>>>()?;

    let cells = tallies.len();
    let mut flux = Array2::zeros((cells, groups));
    let mut xs = Vec::with_capacity(cells);
    let mut volumes = Vec::with_capacity(cells);
    for (cell, tally) in tallies.into_iter().enumerate() {
        flux.row_mut(cell).assign(&tally.flux);
        xs.push(tally.xs);
        volumes.push(tally.volume);
    }

    Ok(Homogenized { xs, flux, volumes })
}

fn condense_cell(
    cell: usize,
    regions: &[usize],
    fine: &FineRegions,
    groups: usize,
) -> CmfdResult<CellTally> {
    if regions.is_empty() {
        return Err(CmfdError::PhysicsViolation(format!(
            "cell {cell} owns no fine regions"
        )));
    }
    if let Some(&r) = regions.iter().find(|&&r| r >= fine.num_regions()) {
        return Err(CmfdError::ConfigError(format!(
            "cell {cell} references fine region {r}, only {} exist",
            fine.num_regions()
        )));
    }

    let mut xs = CellCrossSections::zeros(groups);
    let mut flux = Array1::zeros(groups);
    let volume: f64 = regions.iter().map(|&r| fine.volumes[r]).sum();

    for e in 0..groups {
        let mut abs_tally = 0.0;
        let mut tot_tally = 0.0;
        let mut fis_tally = 0.0;
        let mut nu_fis_tally = 0.0;
        let mut dif_tally = 0.0;
        let mut rxn_tally = 0.0;
        let mut scat_tally = vec![0.0; groups];
        let mut chi: f64 = 0.0;

        for &r in regions {
            let material = fine.material(r);
            let weight = fine.fluxes[[r, e]] * fine.volumes[r];

            let d = material.dif_coef(e);
            dif_tally += if d > DIF_COEF_FLOOR {
                d * weight
            } else {
                weight / (3.0 * material.sigma_t[e])
            };

            let region_chi = material.chi(e);
            if region_chi > CHI_FLOOR {
                chi = chi.max(region_chi);
            }
            let nu_fis = material.nu_sigma_f(e);
            if nu_fis > NU_SIGMA_F_FLOOR {
                nu_fis_tally += nu_fis * weight;
            }

            abs_tally += material.sigma_a[e] * weight;
            tot_tally += material.sigma_t[e] * weight;
            fis_tally += material.sigma_f(e) * weight;
            rxn_tally += weight;
            for (g, s) in scat_tally.iter_mut().enumerate() {
                *s += material.scatter[e][g] * weight;
            }
        }

        if !(rxn_tally.is_finite() && rxn_tally > 0.0) {
            return Err(CmfdError::PhysicsViolation(format!(
                "cell {cell} group {e}: reaction weight {rxn_tally} must be positive"
            )));
        }

        xs.sigma_a[e] = abs_tally / rxn_tally;
        xs.sigma_t[e] = tot_tally / rxn_tally;
        xs.sigma_f[e] = fis_tally / rxn_tally;
        xs.nu_sigma_f[e] = nu_fis_tally / rxn_tally;
        xs.dif_coef[e] = dif_tally / rxn_tally;
        xs.chi[e] = chi;
        for (g, s) in scat_tally.iter().enumerate() {
            xs.scatter[[e, g]] = s / rxn_tally;
        }
        flux[e] = rxn_tally / volume;

        log::debug!(
            "cell: {cell}, group: {e}, vol: {volume:.6e}, siga: {:.6e}, sigt: {:.6e}, nu_sigf: {:.6e}, dif_coef: {:.6e}, flux: {:.6e}",
            xs.sigma_a[e],
            xs.sigma_t[e],
            xs.nu_sigma_f[e],
            xs.dif_coef[e],
            flux[e]
        );
    }

    Ok(CellTally { xs, flux, volume })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::XsMaterial;
    use cmfd_types::state::BoundaryType;

    fn fuel() -> XsMaterial {
        XsMaterial {
            name: "fuel".into(),
            sigma_t: vec![0.6, 1.4],
            sigma_a: vec![0.012, 0.11],
            sigma_f: vec![0.004, 0.06],
            nu_sigma_f: vec![0.01, 0.15],
            chi: vec![1.0, 0.0],
            dif_coef: vec![1.5, 0.0],
            scatter: vec![vec![0.56, 0.028], vec![0.001, 1.29]],
        }
    }

    fn water() -> XsMaterial {
        XsMaterial::absorber(
            "water",
            vec![0.7, 2.1],
            vec![0.0008, 0.03],
            vec![vec![0.65, 0.049], vec![0.0, 2.07]],
        )
    }

    fn two_region_cell(flux_fuel: f64, flux_water: f64) -> (CoarseMesh, FineRegions) {
        let mut mesh = CoarseMesh::uniform(1, 1, 1.0, 1.0, 2, [BoundaryType::Reflective; 4]).unwrap();
        mesh.assign_region(0, 0).unwrap();
        mesh.assign_region(0, 1).unwrap();
        mesh.update_region_bounds();
        let mut fluxes = Array2::zeros((2, 2));
        fluxes.row_mut(0).fill(flux_fuel);
        fluxes.row_mut(1).fill(flux_water);
        let fine = FineRegions::new(vec![0.4, 0.6], vec![0, 1], vec![fuel(), water()], fluxes).unwrap();
        (mesh, fine)
    }

    #[test]
    fn test_single_region_reproduces_material() {
        let mut mesh = CoarseMesh::uniform(1, 1, 2.0, 2.0, 2, [BoundaryType::Reflective; 4]).unwrap();
        let fine = FineRegions::one_per_cell(&mut mesh, vec![0], vec![fuel()]).unwrap();
        let h = homogenize(&mesh, &fine).unwrap();
        let xs = &h.xs[0];
        let m = fuel();
        for e in 0..2 {
            assert!((xs.sigma_a[e] - m.sigma_a[e]).abs() < 1e-14);
            assert!((xs.sigma_t[e] - m.sigma_t[e]).abs() < 1e-14);
            assert!((xs.nu_sigma_f[e] - m.nu_sigma_f[e]).abs() < 1e-14);
            assert!((xs.sigma_f[e] - m.sigma_f[e]).abs() < 1e-14);
            for g in 0..2 {
                assert!((xs.scatter[[e, g]] - m.scatter[e][g]).abs() < 1e-14);
            }
        }
        // explicit D in group 0, 1/(3 Σt) fallback in group 1
        assert!((xs.dif_coef[0] - 1.5).abs() < 1e-14);
        assert!((xs.dif_coef[1] - 1.0 / (3.0 * 1.4)).abs() < 1e-14);
        assert_eq!(xs.chi[0], 1.0);
        assert!((h.volumes[0] - 4.0).abs() < 1e-12);
        assert!((h.flux[[0, 0]] - 1.0).abs() < 1e-14);
    }

    #[test]
    fn test_flux_volume_weighting() {
        let (mesh, fine) = two_region_cell(2.0, 1.0);
        let h = homogenize(&mesh, &fine).unwrap();
        // weights: fuel 0.8, water 0.6
        let expected = (0.012 * 0.8 + 0.0008 * 0.6) / 1.4;
        assert!((h.xs[0].sigma_a[0] - expected).abs() < 1e-14);
        let expected_nf = 0.15 * 0.8 / 1.4;
        assert!((h.xs[0].nu_sigma_f[1] - expected_nf).abs() < 1e-14);
        // flux = reaction weight / volume
        assert!((h.flux[[0, 1]] - 1.4).abs() < 1e-14);
        assert!((h.volumes[0] - 1.0).abs() < 1e-14);
    }

    #[test]
    fn test_chi_is_max_over_regions() {
        let (mesh, fine) = two_region_cell(1.0, 1.0);
        let h = homogenize(&mesh, &fine).unwrap();
        assert_eq!(h.xs[0].chi[0], 1.0);
        assert_eq!(h.xs[0].chi[1], 0.0);
    }

    #[test]
    fn test_negligible_fission_zeroed() {
        let mut m = fuel();
        m.nu_sigma_f = vec![5e-9, 0.15];
        m.chi = vec![1.0, 5e-11];
        let mut mesh = CoarseMesh::uniform(1, 1, 1.0, 1.0, 2, [BoundaryType::Reflective; 4]).unwrap();
        let fine = FineRegions::one_per_cell(&mut mesh, vec![0], vec![m]).unwrap();
        let h = homogenize(&mesh, &fine).unwrap();
        assert_eq!(h.xs[0].nu_sigma_f[0], 0.0);
        assert_eq!(h.xs[0].chi[1], 0.0);
    }

    #[test]
    fn test_zero_flux_cell_rejected() {
        let (mesh, fine) = two_region_cell(0.0, 0.0);
        assert!(matches!(
            homogenize(&mesh, &fine),
            Err(CmfdError::PhysicsViolation(_))
        ));
    }

    #[test]
    fn test_empty_cell_rejected() {
        let mesh = CoarseMesh::uniform(2, 1, 2.0, 1.0, 2, [BoundaryType::Reflective; 4]).unwrap();
        let fine = FineRegions::new(vec![1.0], vec![0], vec![fuel()], Array2::ones((1, 2))).unwrap();
        assert!(matches!(
            homogenize(&mesh, &fine),
            Err(CmfdError::PhysicsViolation(_))
        ));
    }

    #[test]
    fn test_group_mismatch_rejected() {
        let mesh = CoarseMesh::uniform(1, 1, 1.0, 1.0, 3, [BoundaryType::Reflective; 4]).unwrap();
        let fine = FineRegions::new(vec![1.0], vec![0], vec![fuel()], Array2::ones((1, 2))).unwrap();
        assert!(matches!(
            homogenize(&mesh, &fine),
            Err(CmfdError::GroupMismatch { expected: 3, got: 2 })
        ));
    }
}
