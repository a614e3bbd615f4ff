// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Coarse Mesh
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Rectangular coarse mesh overlaid on the fine transport geometry.
//!
//! Cells are indexed `y * cells_x + x` with row 0 at the top of the
//! domain: `bounds_x` runs from `-length_x/2` upwards, `bounds_y` from
//! `+length_y/2` downwards. Each cell carries 8 tallied surface currents
//! per group (faces 0..4 then corners 4..8, see [`Surface`] and
//! [`Corner`]), its homogenized cross sections and the coupling
//! coefficients of its 4 faces.

use std::collections::HashMap;

use cmfd_types::config::CmfdConfig;
use cmfd_types::constants::{NUM_FACES, NUM_SURFACES, POINT_TOL, SURFACE_TOL};
use cmfd_types::error::{CmfdError, CmfdResult};
use cmfd_types::state::{BoundaryType, Corner, FluxState, Surface};
use ndarray::{Array2, Array3, ArrayView2};

use crate::coupling::CouplingCoefficients;
use crate::material::CellCrossSections;

#[derive(Debug, Clone)]
pub struct CoarseMesh {
    cells_x: usize,
    cells_y: usize,
    num_groups: usize,
    widths: Vec<f64>,
    heights: Vec<f64>,
    bounds_x: Vec<f64>,
    bounds_y: Vec<f64>,
    volumes: Vec<f64>,
    boundaries: [BoundaryType; NUM_FACES],
    cell_regions: Vec<Vec<usize>>,
    /// (min, max) fine-region id per cell; ranges may overlap.
    region_bounds: Vec<Option<(usize, usize)>>,
    /// `[cell, surface, group]` partial currents.
    currents: Array3<f64>,
    xs: Vec<CellCrossSections>,
    coupling: CouplingCoefficients,
    fluxes: HashMap<FluxState, Array2<f64>>,
}

impl CoarseMesh {
    /// Build a mesh from per-column widths and per-row heights (row 0 on
    /// top). `boundaries` is indexed like [`Surface`].
    pub fn new(
        widths: Vec<f64>,
        heights: Vec<f64>,
        num_groups: usize,
        boundaries: [BoundaryType; NUM_FACES],
    ) -> CmfdResult<Self> {
        if widths.is_empty() || heights.is_empty() {
            return Err(CmfdError::ConfigError(format!(
                "mesh needs at least one cell per axis, got {}x{}",
                widths.len(),
                heights.len()
            )));
        }
        if num_groups == 0 {
            return Err(CmfdError::ConfigError(
                "num_groups must be >= 1".to_string(),
            ));
        }
        if let Some(bad) = widths
            .iter()
            .chain(heights.iter())
            .find(|v| !v.is_finite() || **v <= 0.0)
        {
            return Err(CmfdError::ConfigError(format!(
                "cell dimensions must be positive and finite, got {bad}"
            )));
        }

        let cells_x = widths.len();
        let cells_y = heights.len();
        let cells = cells_x * cells_y;
        let length_x: f64 = widths.iter().sum();
        let length_y: f64 = heights.iter().sum();

        let mut bounds_x = Vec::with_capacity(cells_x + 1);
        bounds_x.push(-length_x / 2.0);
        for w in &widths {
            let last = bounds_x[bounds_x.len() - 1];
            bounds_x.push(last + w);
        }
        let mut bounds_y = Vec::with_capacity(cells_y + 1);
        bounds_y.push(length_y / 2.0);
        for h in &heights {
            let last = bounds_y[bounds_y.len() - 1];
            bounds_y.push(last - h);
        }

        let mut volumes = vec![0.0; cells];
        for y in 0..cells_y {
            for x in 0..cells_x {
                volumes[y * cells_x + x] = widths[x] * heights[y];
            }
        }

        let mut fluxes = HashMap::new();
        for state in [FluxState::Current, FluxState::Previous, FluxState::Adjoint] {
            fluxes.insert(state, Array2::from_elem((cells, num_groups), 1.0));
        }

        Ok(CoarseMesh {
            cells_x,
            cells_y,
            num_groups,
            widths,
            heights,
            bounds_x,
            bounds_y,
            volumes,
            boundaries,
            cell_regions: vec![Vec::new(); cells],
            region_bounds: vec![None; cells],
            currents: Array3::zeros((cells, NUM_SURFACES, num_groups)),
            xs: vec![CellCrossSections::zeros(num_groups); cells],
            coupling: CouplingCoefficients::zeros(cells, num_groups),
            fluxes,
        })
    }

    /// Uniform split of `length_x × length_y` into `cells_x × cells_y`.
    pub fn uniform(
        cells_x: usize,
        cells_y: usize,
        length_x: f64,
        length_y: f64,
        num_groups: usize,
        boundaries: [BoundaryType; NUM_FACES],
    ) -> CmfdResult<Self> {
        if cells_x == 0 || cells_y == 0 {
            return Err(CmfdError::ConfigError(format!(
                "mesh needs at least one cell per axis, got {cells_x}x{cells_y}"
            )));
        }
        Self::new(
            vec![length_x / cells_x as f64; cells_x],
            vec![length_y / cells_y as f64; cells_y],
            num_groups,
            boundaries,
        )
    }

    pub fn from_config(config: &CmfdConfig) -> CmfdResult<Self> {
        config.validate()?;
        Self::new(
            config.mesh.widths(),
            config.mesh.heights(),
            config.num_groups,
            config.boundaries.as_array(),
        )
    }

    // ── geometry ────────────────────────────────────────────────────

    pub fn cells_x(&self) -> usize {
        self.cells_x
    }

    pub fn cells_y(&self) -> usize {
        self.cells_y
    }

    pub fn num_cells(&self) -> usize {
        self.cells_x * self.cells_y
    }

    pub fn num_groups(&self) -> usize {
        self.num_groups
    }

    pub fn widths(&self) -> &[f64] {
        &self.widths
    }

    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    pub fn bounds_x(&self) -> &[f64] {
        &self.bounds_x
    }

    pub fn bounds_y(&self) -> &[f64] {
        &self.bounds_y
    }

    pub fn width(&self, cell: usize) -> f64 {
        self.widths[cell % self.cells_x]
    }

    pub fn height(&self, cell: usize) -> f64 {
        self.heights[cell / self.cells_x]
    }

    /// Geometric area `width × height`.
    pub fn cell_area(&self, cell: usize) -> f64 {
        self.width(cell) * self.height(cell)
    }

    /// Cell volume; replaced by the fine-region volume sum once
    /// homogenized.
    pub fn volume(&self, cell: usize) -> f64 {
        self.volumes[cell]
    }

    pub fn volumes(&self) -> &[f64] {
        &self.volumes
    }

    pub fn boundary(&self, side: Surface) -> BoundaryType {
        self.boundaries[side.index()]
    }

    /// Length of `surface` of `cell`.
    pub fn face_length(&self, cell: usize, surface: Surface) -> f64 {
        if surface.is_vertical() {
            self.height(cell)
        } else {
            self.width(cell)
        }
    }

    /// Cell extent normal to `surface`.
    pub fn perpendicular_length(&self, cell: usize, surface: Surface) -> f64 {
        if surface.is_vertical() {
            self.width(cell)
        } else {
            self.height(cell)
        }
    }

    pub fn check_cell(&self, cell: usize) -> CmfdResult<()> {
        if cell >= self.num_cells() {
            return Err(CmfdError::CellOutOfBounds {
                cell,
                cells: self.num_cells(),
            });
        }
        Ok(())
    }

    /// Cell across `surface`, `None` on the domain edge.
    pub fn neighbor(&self, cell: usize, surface: Surface) -> Option<usize> {
        let x = cell % self.cells_x;
        let y = cell / self.cells_x;
        match surface {
            Surface::Left if x != 0 => Some(cell - 1),
            Surface::Bottom if y + 1 != self.cells_y => Some(cell + self.cells_x),
            Surface::Right if x + 1 != self.cells_x => Some(cell + 1),
            Surface::Top if y != 0 => Some(cell - self.cells_x),
            _ => None,
        }
    }

    /// Cell containing the point (x, y), boundaries included.
    pub fn find_cell(&self, x: f64, y: f64) -> Option<usize> {
        let row = (0..self.cells_y).find(|&j| {
            y - self.bounds_y[j + 1] >= -POINT_TOL && y - self.bounds_y[j] <= POINT_TOL
        })?;
        let col = (0..self.cells_x).find(|&i| {
            x - self.bounds_x[i] >= -POINT_TOL && x - self.bounds_x[i + 1] <= POINT_TOL
        })?;
        Some(row * self.cells_x + col)
    }

    /// Which of the 8 tallied surfaces of `cell` the point (x, y) lies on.
    /// Corners win over faces; returns `None` for interior points.
    pub fn surface_at(&self, cell: usize, x: f64, y: f64) -> Option<usize> {
        if cell >= self.num_cells() {
            return None;
        }
        let col = cell % self.cells_x;
        let row = cell / self.cells_x;
        let (left, right) = (self.bounds_x[col], self.bounds_x[col + 1]);
        let (top, bottom) = (self.bounds_y[row], self.bounds_y[row + 1]);

        let on_left = (x - left).abs() < SURFACE_TOL;
        let on_right = (x - right).abs() < SURFACE_TOL;
        let on_top = (y - top).abs() < SURFACE_TOL;
        let on_bottom = (y - bottom).abs() < SURFACE_TOL;

        let surface = match (on_left, on_right, on_top, on_bottom) {
            (true, _, true, _) => Corner::LeftTop.index(),
            (true, _, _, true) => Corner::LeftBottom.index(),
            (_, true, true, _) => Corner::RightTop.index(),
            (_, true, _, true) => Corner::RightBottom.index(),
            (true, ..) => Surface::Left.index(),
            (_, true, ..) => Surface::Right.index(),
            (_, _, true, _) => Surface::Top.index(),
            (.., true) => Surface::Bottom.index(),
            _ => return None,
        };
        Some(surface)
    }

    // ── fine-region ownership ───────────────────────────────────────

    pub fn assign_region(&mut self, cell: usize, region: usize) -> CmfdResult<()> {
        self.check_cell(cell)?;
        self.cell_regions[cell].push(region);
        Ok(())
    }

    pub fn cell_regions(&self, cell: usize) -> &[usize] {
        &self.cell_regions[cell]
    }

    pub fn all_cell_regions(&self) -> &[Vec<usize>] {
        &self.cell_regions
    }

    /// Cache the (min, max) fine-region id of every cell.
    pub fn update_region_bounds(&mut self) {
        self.region_bounds = self
            .cell_regions
            .iter()
            .map(|regions| {
                let min = regions.iter().min()?;
                let max = regions.iter().max()?;
                Some((*min, *max))
            })
            .collect();
    }

    /// Cell owning `region`. The cached bounds prune the search, the
    /// membership check resolves overlapping ranges.
    pub fn find_region_cell(&self, region: usize) -> Option<usize> {
        self.region_bounds
            .iter()
            .zip(self.cell_regions.iter())
            .position(|(bounds, regions)| match bounds {
                Some((lo, hi)) => region >= *lo && region <= *hi && regions.contains(&region),
                None => false,
            })
    }

    // ── surface currents ────────────────────────────────────────────

    pub fn currents(&self) -> &Array3<f64> {
        &self.currents
    }

    /// Replace all tallied currents; `currents` must be `[cells, 8, groups]`.
    pub fn set_currents(&mut self, currents: Array3<f64>) -> CmfdResult<()> {
        let expected = (self.num_cells(), NUM_SURFACES, self.num_groups);
        if currents.dim() != expected {
            return Err(CmfdError::ConfigError(format!(
                "current array shape {:?} does not match {:?}",
                currents.dim(),
                expected
            )));
        }
        self.currents = currents;
        Ok(())
    }

    /// Accumulate a partial current on one surface of one cell.
    pub fn tally_current(
        &mut self,
        cell: usize,
        surface: usize,
        group: usize,
        value: f64,
    ) -> CmfdResult<()> {
        self.check_cell(cell)?;
        if group >= self.num_groups {
            return Err(CmfdError::GroupMismatch {
                expected: self.num_groups,
                got: group + 1,
            });
        }
        if surface >= NUM_SURFACES {
            return Err(CmfdError::ConfigError(format!(
                "surface index {surface} outside 0..{NUM_SURFACES}"
            )));
        }
        self.currents[[cell, surface, group]] += value;
        Ok(())
    }

    pub fn reset_currents(&mut self) {
        self.currents.fill(0.0);
    }

    /// Hand every corner current to the two faces meeting at it. Interior
    /// corners feed one face of the cell itself and one face of the
    /// neighbour below (bottom corners) or beside it (top corners); on the
    /// domain edge both faces belong to the cell.
    pub fn split_corners(&mut self) {
        log::info!("splitting corner currents");
        let cx = self.cells_x;
        let cy = self.cells_y;
        for y in 0..cy {
            for x in 0..cx {
                let cell = y * cx + x;
                for e in 0..self.num_groups {
                    // left-bottom → own bottom + left face of the cell below
                    let lb = self.currents[[cell, Corner::LeftBottom.index(), e]];
                    self.currents[[cell, Surface::Bottom.index(), e]] += lb;
                    let target = if x > 0 && y < cy - 1 { cell + cx } else { cell };
                    self.currents[[target, Surface::Left.index(), e]] += lb;

                    // right-bottom → own bottom + right face of the cell below
                    let rb = self.currents[[cell, Corner::RightBottom.index(), e]];
                    self.currents[[cell, Surface::Bottom.index(), e]] += rb;
                    let target = if x < cx - 1 && y < cy - 1 { cell + cx } else { cell };
                    self.currents[[target, Surface::Right.index(), e]] += rb;

                    // right-top → own right + top face of the cell to the right
                    let rt = self.currents[[cell, Corner::RightTop.index(), e]];
                    self.currents[[cell, Surface::Right.index(), e]] += rt;
                    let target = if x < cx - 1 && y > 0 { cell + 1 } else { cell };
                    self.currents[[target, Surface::Top.index(), e]] += rt;

                    // left-top → own left + top face of the cell to the left
                    let lt = self.currents[[cell, Corner::LeftTop.index(), e]];
                    self.currents[[cell, Surface::Left.index(), e]] += lt;
                    let target = if x > 0 && y > 0 { cell - 1 } else { cell };
                    self.currents[[target, Surface::Top.index(), e]] += lt;

                    log::debug!(
                        "cell {cell} group {e}: corners LB={lb:.6e} RB={rb:.6e} RT={rt:.6e} LT={lt:.6e}"
                    );
                }
            }
        }
    }

    // ── homogenized data ────────────────────────────────────────────

    pub fn xs(&self, cell: usize) -> &CellCrossSections {
        &self.xs[cell]
    }

    pub fn cross_sections(&self) -> &[CellCrossSections] {
        &self.xs
    }

    /// Replace cell cross sections and volumes (one entry per cell).
    pub fn set_cross_sections(
        &mut self,
        xs: Vec<CellCrossSections>,
        volumes: Vec<f64>,
    ) -> CmfdResult<()> {
        if xs.len() != self.num_cells() || volumes.len() != self.num_cells() {
            return Err(CmfdError::ConfigError(format!(
                "expected {} cells of cross sections and volumes, got {} and {}",
                self.num_cells(),
                xs.len(),
                volumes.len()
            )));
        }
        if let Some(bad) = xs.iter().find(|x| x.num_groups() != self.num_groups) {
            return Err(CmfdError::GroupMismatch {
                expected: self.num_groups,
                got: bad.num_groups(),
            });
        }
        self.xs = xs;
        self.volumes = volumes;
        Ok(())
    }

    pub fn coupling(&self) -> &CouplingCoefficients {
        &self.coupling
    }

    pub fn set_coupling(&mut self, coupling: CouplingCoefficients) -> CmfdResult<()> {
        let expected = (self.num_cells(), NUM_FACES, self.num_groups);
        if coupling.d_hat.dim() != expected || coupling.d_tilde.dim() != expected {
            return Err(CmfdError::ConfigError(format!(
                "coupling coefficient shape {:?} does not match {:?}",
                coupling.d_hat.dim(),
                expected
            )));
        }
        self.coupling = coupling;
        Ok(())
    }

    // ── flux snapshots ──────────────────────────────────────────────

    pub fn flux(&self, state: FluxState) -> CmfdResult<ArrayView2<'_, f64>> {
        self.fluxes
            .get(&state)
            .map(|f| f.view())
            .ok_or_else(|| CmfdError::ConfigError(format!("flux snapshot {state:?} not allocated")))
    }

    pub fn flux_mut(&mut self, state: FluxState) -> CmfdResult<&mut Array2<f64>> {
        self.fluxes
            .get_mut(&state)
            .ok_or_else(|| CmfdError::ConfigError(format!("flux snapshot {state:?} not allocated")))
    }

    /// Allocate `state` filled with 1.0 if it does not exist yet.
    pub fn create_flux(&mut self, state: FluxState) {
        let shape = (self.num_cells(), self.num_groups);
        self.fluxes
            .entry(state)
            .or_insert_with(|| Array2::from_elem(shape, 1.0));
    }

    /// Overwrite `to` with the values of `from`, allocating `to` if needed.
    pub fn copy_flux(&mut self, from: FluxState, to: FluxState) -> CmfdResult<()> {
        let source = self.flux(from)?.to_owned();
        match self.fluxes.get_mut(&to) {
            Some(dest) => dest.assign(&source),
            None => {
                self.fluxes.insert(to, source);
            }
        }
        Ok(())
    }

    /// Overwrite snapshot `state` with a flat `cell * groups + group`
    /// vector.
    pub fn set_flux_from_slice(&mut self, state: FluxState, values: &[f64]) -> CmfdResult<()> {
        let groups = self.num_groups;
        let cells = self.num_cells();
        if values.len() != cells * groups {
            return Err(CmfdError::ConfigError(format!(
                "flux vector has {} entries, mesh needs {}",
                values.len(),
                cells * groups
            )));
        }
        let flux = self.flux_mut(state)?;
        for (i, v) in values.iter().enumerate() {
            flux[[i / groups, i % groups]] = *v;
        }
        Ok(())
    }

    // ── diagnostics ─────────────────────────────────────────────────

    /// Net leakage out of the domain in `group` implied by the stored
    /// coupling coefficients and snapshot `state`, optionally weighted by
    /// the adjoint snapshot. Positive means net loss.
    ///
    /// Every face contributes the migration term of the loss operator
    /// row: `(d_hat - sense·d_tilde)·L·φ_cell - (d_hat + sense·d_tilde)·L·φ_next`.
    /// Interior faces cancel pairwise in the unweighted sum, so only
    /// boundary faces remain.
    pub fn leakage(&self, state: FluxState, group: usize, adjoint_weighted: bool) -> CmfdResult<f64> {
        if group >= self.num_groups {
            return Err(CmfdError::GroupMismatch {
                expected: self.num_groups,
                got: group + 1,
            });
        }
        let flux = self.flux(state)?;
        let adjoint = if adjoint_weighted {
            Some(self.flux(FluxState::Adjoint)?)
        } else {
            None
        };

        let mut leakage = 0.0;
        for cell in 0..self.num_cells() {
            let weight = adjoint.as_ref().map_or(1.0, |a| a[[cell, group]]);
            let mut migration = 0.0;
            for surface in Surface::ALL {
                let s = surface.index();
                let sense = surface.sense();
                let length = self.face_length(cell, surface);
                let d_hat = self.coupling.d_hat[[cell, s, group]];
                let d_tilde = self.coupling.d_tilde[[cell, s, group]];
                migration += (d_hat - sense * d_tilde) * length * flux[[cell, group]];
                if let Some(next) = self.neighbor(cell, surface) {
                    migration -= (d_hat + sense * d_tilde) * length * flux[[next, group]];
                }
            }
            leakage += weight * migration;
        }
        Ok(leakage)
    }

    /// Log every cell flux of snapshot `state` at debug level.
    pub fn dump_flux(&self, state: FluxState) -> CmfdResult<()> {
        let flux = self.flux(state)?;
        for cell in 0..self.num_cells() {
            for e in 0..self.num_groups {
                log::debug!("cell: {cell}, group: {e}, flux: {:.6e}", flux[[cell, e]]);
            }
        }
        Ok(())
    }

    /// Log homogenized cross sections of every cell at debug level, next
    /// to the homogenized flux held in the `Previous` snapshot.
    pub fn dump_xs(&self) -> CmfdResult<()> {
        for line in self.xs_report()? {
            log::debug!("{line}");
        }
        Ok(())
    }

    fn xs_report(&self) -> CmfdResult<Vec<String>> {
        let flux = self.flux(FluxState::Previous)?;
        let mut lines = Vec::new();
        for (cell, xs) in self.xs.iter().enumerate() {
            lines.push(format!(
                "cell {cell} ({}, {}), volume {:.6e}",
                cell % self.cells_x,
                cell / self.cells_x,
                self.volumes[cell]
            ));
            for e in 0..self.num_groups {
                lines.push(format!(
                    "  group {e}: sigma_a={:.6e} sigma_t={:.6e} sigma_f={:.6e} nu_sigma_f={:.6e} chi={:.6e} D={:.6e} flux={:.6e}",
                    xs.sigma_a[e],
                    xs.sigma_t[e],
                    xs.sigma_f[e],
                    xs.nu_sigma_f[e],
                    xs.chi[e],
                    xs.dif_coef[e],
                    flux[[cell, e]]
                ));
                for g in 0..self.num_groups {
                    lines.push(format!("  sigma_s {e}->{g}: {:.6e}", xs.scatter[[e, g]]));
                }
            }
        }
        Ok(lines)
    }
}
