// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Fine Regions
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Fine-region view shared with the transport sweep: volumes, material
//! assignment and the `regions × groups` scalar flux that prolongation
//! rescales in place.

use cmfd_types::error::{CmfdError, CmfdResult};
use ndarray::Array2;

use crate::material::XsMaterial;
use crate::mesh::CoarseMesh;

#[derive(Debug, Clone)]
pub struct FineRegions {
    pub volumes: Vec<f64>,
    /// Index into `materials` for every region.
    pub material_ids: Vec<usize>,
    pub materials: Vec<XsMaterial>,
    /// `[region, group]` scalar flux.
    pub fluxes: Array2<f64>,
}

impl FineRegions {
    pub fn new(
        volumes: Vec<f64>,
        material_ids: Vec<usize>,
        materials: Vec<XsMaterial>,
        fluxes: Array2<f64>,
    ) -> CmfdResult<Self> {
        let regions = volumes.len();
        if material_ids.len() != regions || fluxes.nrows() != regions {
            return Err(CmfdError::ConfigError(format!(
                "fine region arrays disagree: {} volumes, {} material ids, {} flux rows",
                regions,
                material_ids.len(),
                fluxes.nrows()
            )));
        }
        let groups = fluxes.ncols();
        for m in &materials {
            m.validate(groups)?;
        }
        if let Some((r, &id)) = material_ids
            .iter()
            .enumerate()
            .find(|(_, &id)| id >= materials.len())
        {
            return Err(CmfdError::ConfigError(format!(
                "region {r} references material {id}, only {} defined",
                materials.len()
            )));
        }
        if let Some((r, v)) = volumes
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v <= 0.0)
        {
            return Err(CmfdError::ConfigError(format!(
                "region {r} volume must be positive, got {v}"
            )));
        }
        Ok(FineRegions {
            volumes,
            material_ids,
            materials,
            fluxes,
        })
    }

    /// One fine region per coarse cell, flux 1, volume equal to the cell
    /// area. Registers the regions with `mesh`. This is the layout of a
    /// stand-alone diffusion problem.
    pub fn one_per_cell(
        mesh: &mut CoarseMesh,
        material_ids: Vec<usize>,
        materials: Vec<XsMaterial>,
    ) -> CmfdResult<Self> {
        let cells = mesh.num_cells();
        if material_ids.len() != cells {
            return Err(CmfdError::ConfigError(format!(
                "expected one material id per cell ({cells}), got {}",
                material_ids.len()
            )));
        }
        let volumes: Vec<f64> = (0..cells).map(|c| mesh.cell_area(c)).collect();
        let fluxes = Array2::from_elem((cells, mesh.num_groups()), 1.0);
        let regions = FineRegions::new(volumes, material_ids, materials, fluxes)?;
        for cell in 0..cells {
            mesh.assign_region(cell, cell)?;
        }
        mesh.update_region_bounds();
        Ok(regions)
    }

    pub fn num_regions(&self) -> usize {
        self.volumes.len()
    }

    pub fn num_groups(&self) -> usize {
        self.fluxes.ncols()
    }

    pub fn material(&self, region: usize) -> &XsMaterial {
        &self.materials[self.material_ids[region]]
    }
}
