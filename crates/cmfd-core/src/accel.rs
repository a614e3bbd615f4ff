// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — CMFD Accelerator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! One acceleration cycle between two transport sweeps.
//!
//! corner split → homogenize → coupling → assemble → eigen solve →
//! store snapshots → prolong.

use std::time::Instant;

use cmfd_math::solver::{solver_from_config, LinearSolver};
use cmfd_math::sparse::CsrMatrix;
use cmfd_types::config::CmfdConfig;
use cmfd_types::error::{CmfdError, CmfdResult};
use cmfd_types::state::{EigenResult, FluxMode, FluxState, SolveType};

use crate::assembly::{assemble_loss, assemble_production, flatten_flux};
use crate::coupling::{compute_coupling, CouplingParams};
use crate::eigen::PowerIteration;
use crate::fine::FineRegions;
use crate::homogenize::homogenize;
use crate::mesh::CoarseMesh;
use crate::prolong::prolong;

pub struct CmfdAccelerator {
    config: CmfdConfig,
    mesh: CoarseMesh,
    coupling: CouplingParams,
    power: PowerIteration,
    solver: Box<dyn LinearSolver>,
    loss: Option<CsrMatrix>,
    production: Option<CsrMatrix>,
    k_eff: f64,
    last_result: Option<EigenResult>,
}

impl CmfdAccelerator {
    pub fn from_config(config: CmfdConfig) -> CmfdResult<Self> {
        let mesh = CoarseMesh::from_config(&config)?;
        Ok(CmfdAccelerator {
            coupling: CouplingParams::from_config(&config.acceleration),
            power: PowerIteration::from_config(&config.solver),
            solver: solver_from_config(&config.linear),
            config,
            mesh,
            loss: None,
            production: None,
            k_eff: 1.0,
            last_result: None,
        })
    }

    pub fn from_file(path: &str) -> CmfdResult<Self> {
        Self::from_config(CmfdConfig::from_file(path)?)
    }

    /// Replace the configured linear solver.
    pub fn with_solver(mut self, solver: Box<dyn LinearSolver>) -> Self {
        self.solver = solver;
        self
    }

    pub fn config(&self) -> &CmfdConfig {
        &self.config
    }

    pub fn mesh(&self) -> &CoarseMesh {
        &self.mesh
    }

    /// Mutable mesh access for the transport sweep (region assignment,
    /// current tallies).
    pub fn mesh_mut(&mut self) -> &mut CoarseMesh {
        &mut self.mesh
    }

    pub fn k_eff(&self) -> f64 {
        self.k_eff
    }

    pub fn last_result(&self) -> Option<&EigenResult> {
        self.last_result.as_ref()
    }

    pub fn loss_operator(&self) -> Option<&CsrMatrix> {
        self.loss.as_ref()
    }

    pub fn production_operator(&self) -> Option<&CsrMatrix> {
        self.production.as_ref()
    }

    /// Fine regions for a stand-alone diffusion problem: one region per
    /// coarse cell, registered with this accelerator's mesh.
    pub fn single_region_cells(
        &mut self,
        material_ids: Vec<usize>,
        materials: Vec<crate::material::XsMaterial>,
    ) -> CmfdResult<FineRegions> {
        FineRegions::one_per_cell(&mut self.mesh, material_ids, materials)
    }

    /// Run one acceleration cycle and rescale `fine.fluxes` in place.
    ///
    /// Surface currents are consumed by the coupling stage and cleared
    /// before returning, so the next sweep tallies from zero.
    pub fn accelerate(&mut self, fine: &mut FineRegions) -> CmfdResult<EigenResult> {
        let start = Instant::now();
        let settings = &self.config.acceleration;
        let mode = settings.flux_mode;

        if settings.solve_type == SolveType::Moc {
            self.mesh.split_corners();
        }

        let homogenized = homogenize(&self.mesh, fine)?;
        self.mesh
            .set_cross_sections(homogenized.xs, homogenized.volumes)?;
        self.mesh
            .flux_mut(FluxState::Previous)?
            .assign(&homogenized.flux);
        self.mesh.dump_xs()?;

        let coupling = compute_coupling(&self.mesh, &self.coupling)?;
        self.mesh.set_coupling(coupling)?;
        self.mesh.reset_currents();

        let loss = assemble_loss(&self.mesh, mode)?;
        let production = match self.production.take() {
            Some(m) if !settings.assemble_production => m,
            _ => assemble_production(&self.mesh, mode)?,
        };
        if production.n_rows() != loss.n_rows() {
            return Err(CmfdError::LinAlg(format!(
                "stored production operator has {} rows, loss operator {}",
                production.n_rows(),
                loss.n_rows()
            )));
        }

        let phi_old = flatten_flux(self.mesh.flux(FluxState::Previous)?);
        log::info!(
            "solving coarse eigenproblem with {} ({} unknowns)",
            self.solver.name(),
            phi_old.len()
        );
        let solution = self
            .power
            .solve(&loss, &production, &phi_old, self.solver.as_ref())?;

        self.mesh
            .set_flux_from_slice(FluxState::Current, &solution.phi_new)?;
        self.mesh
            .set_flux_from_slice(FluxState::Previous, &solution.phi_old)?;
        if mode == FluxMode::Adjoint {
            self.mesh.copy_flux(FluxState::Current, FluxState::Adjoint)?;
        }
        self.mesh.dump_flux(FluxState::Current)?;

        prolong(&self.mesh, fine)?;

        self.loss = Some(loss);
        self.production = Some(production);
        self.k_eff = solution.result.k_eff;
        self.last_result = Some(solution.result.clone());

        let elapsed = start.elapsed().as_secs_f64() * 1e3;
        match self.config.acceleration.solve_type {
            SolveType::Diffusion => log::info!(
                "diffusion solve: k_eff = {:.6}, {} iterations, eigen {:.3} ms, total {elapsed:.3} ms",
                solution.result.k_eff,
                solution.result.iterations,
                solution.result.solve_time_ms
            ),
            SolveType::Moc => log::info!(
                "cmfd cycle: k_eff = {:.6}, {} iterations, {elapsed:.3} ms",
                solution.result.k_eff,
                solution.result.iterations
            ),
        }

        Ok(solution.result)
    }
}

impl std::fmt::Debug for CmfdAccelerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CmfdAccelerator")
            .field("name", &self.config.name)
            .field("cells", &self.mesh.num_cells())
            .field("groups", &self.mesh.num_groups())
            .field("solver", &self.solver.name())
            .field("k_eff", &self.k_eff)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::XsMaterial;
    use cmfd_math::solver::SorSolver;
    use cmfd_types::config::{
        AccelerationConfig, BoundaryConfig, EigenSolverConfig, LinearSolverConfig, MeshConfig,
    };
    use cmfd_types::state::{BoundaryType, EigenStatus};

    fn config(cells: usize, solve_type: SolveType, boundary: BoundaryType) -> CmfdConfig {
        CmfdConfig {
            name: "test".into(),
            mesh: MeshConfig {
                cells_x: cells,
                cells_y: cells,
                length_x: cells as f64,
                length_y: cells as f64,
                cell_widths: None,
                cell_heights: None,
            },
            num_groups: 1,
            boundaries: BoundaryConfig::uniform(boundary),
            acceleration: AccelerationConfig {
                solve_type,
                ..Default::default()
            },
            solver: EigenSolverConfig {
                max_iterations: 200,
                convergence_criteria: 1e-9,
            },
            linear: LinearSolverConfig::default(),
        }
    }

    fn fuel(nu_sigma_f: f64, sigma_a: f64) -> XsMaterial {
        XsMaterial {
            name: "fuel".into(),
            sigma_t: vec![1.0],
            sigma_a: vec![sigma_a],
            sigma_f: vec![nu_sigma_f / 2.4],
            nu_sigma_f: vec![nu_sigma_f],
            chi: vec![1.0],
            dif_coef: vec![],
            scatter: vec![vec![1.0 - sigma_a]],
        }
    }

    #[test]
    fn test_infinite_medium_diffusion() {
        let mut acc =
            CmfdAccelerator::from_config(config(3, SolveType::Diffusion, BoundaryType::Reflective))
                .unwrap();
        let mut fine = acc.single_region_cells(vec![0; 9], vec![fuel(0.3, 0.2)]).unwrap();
        let result = acc.accelerate(&mut fine).unwrap();
        assert_eq!(result.status, EigenStatus::Converged);
        assert!((result.k_eff - 1.5).abs() < 1e-8);
        assert!((acc.k_eff() - 1.5).abs() < 1e-8);
        // flat flux, normalised so Σ M φ = 9
        let flux = acc.mesh().flux(FluxState::Current).unwrap();
        for v in flux.iter() {
            assert!((v - 1.0 / 0.3).abs() < 1e-6);
        }
        assert!(acc.loss_operator().is_some());
        assert!(acc.production_operator().is_some());
    }

    #[test]
    fn test_vacuum_leakage_lowers_k() {
        let mut acc =
            CmfdAccelerator::from_config(config(3, SolveType::Diffusion, BoundaryType::Vacuum))
                .unwrap()
                .with_solver(Box::new(SorSolver {
                    omega: 1.2,
                    ..Default::default()
                }));
        let mut fine = acc.single_region_cells(vec![0; 9], vec![fuel(0.3, 0.2)]).unwrap();
        let result = acc.accelerate(&mut fine).unwrap();
        assert!(result.k_eff < 1.5 && result.k_eff > 0.0);
        let flux = acc.mesh().flux(FluxState::Current).unwrap();
        // centre peaks
        assert!(flux[[4, 0]] > flux[[0, 0]]);
        assert!(acc.mesh().leakage(FluxState::Current, 0, false).unwrap() > 0.0);
    }

    #[test]
    fn test_prolongation_follows_coarse_shape() {
        let mut acc =
            CmfdAccelerator::from_config(config(3, SolveType::Diffusion, BoundaryType::Vacuum))
                .unwrap();
        let mut fine = acc.single_region_cells(vec![0; 9], vec![fuel(0.3, 0.2)]).unwrap();
        acc.accelerate(&mut fine).unwrap();
        // flat start: fine flux ends proportional to the coarse shape
        let flux = acc.mesh().flux(FluxState::Current).unwrap();
        for cell in 1..9 {
            let fine_shape = fine.fluxes[[cell, 0]] / fine.fluxes[[0, 0]];
            let coarse_shape = flux[[cell, 0]] / flux[[0, 0]];
            assert!((fine_shape - coarse_shape).abs() < 1e-10);
        }
        assert!(fine.fluxes[[4, 0]] > fine.fluxes[[0, 0]]);
    }

    #[test]
    fn test_production_reused_when_not_reassembled() {
        let mut cfg = config(1, SolveType::Diffusion, BoundaryType::Reflective);
        cfg.acceleration.assemble_production = false;
        let mut acc = CmfdAccelerator::from_config(cfg).unwrap();
        let mut fine = acc.single_region_cells(vec![0], vec![fuel(0.3, 0.2)]).unwrap();
        let first = acc.accelerate(&mut fine).unwrap();
        assert!((first.k_eff - 1.5).abs() < 1e-10);

        // new material data is ignored by the stored production operator
        fine.materials[0].nu_sigma_f[0] = 0.6;
        let second = acc.accelerate(&mut fine).unwrap();
        assert!((second.k_eff - 1.5).abs() < 1e-10);
    }

    #[test]
    fn test_adjoint_mode_fills_adjoint_snapshot() {
        let mut cfg = config(2, SolveType::Diffusion, BoundaryType::Vacuum);
        cfg.acceleration.flux_mode = FluxMode::Adjoint;
        let mut acc = CmfdAccelerator::from_config(cfg).unwrap();
        let mut fine = acc.single_region_cells(vec![0; 4], vec![fuel(0.3, 0.2)]).unwrap();
        acc.accelerate(&mut fine).unwrap();
        let current = acc.mesh().flux(FluxState::Current).unwrap().to_owned();
        let adjoint = acc.mesh().flux(FluxState::Adjoint).unwrap().to_owned();
        assert_eq!(current, adjoint);
    }

    #[test]
    fn test_moc_cycle_with_zero_currents() {
        let mut acc =
            CmfdAccelerator::from_config(config(2, SolveType::Moc, BoundaryType::Reflective))
                .unwrap();
        let mut fine = acc.single_region_cells(vec![0; 4], vec![fuel(0.25, 0.2)]).unwrap();
        let result = acc.accelerate(&mut fine).unwrap();
        assert!((result.k_eff - 1.25).abs() < 1e-8);
        assert!(format!("{acc:?}").contains("CmfdAccelerator"));
    }

    #[test]
    fn test_moc_cycle_consumes_currents() {
        let mut cfg = config(2, SolveType::Moc, BoundaryType::Reflective);
        cfg.acceleration.relax_factor = 1.0;
        let mut acc = CmfdAccelerator::from_config(cfg).unwrap();
        let mut fine = acc.single_region_cells(vec![0; 4], vec![fuel(0.25, 0.2)]).unwrap();
        // left-top corner of cell 3 feeds its left face and the top of cell 2
        acc.mesh_mut().tally_current(3, 7, 0, 0.2).unwrap();
        acc.accelerate(&mut fine).unwrap();
        assert!(acc.mesh().currents().iter().all(|&c| c == 0.0));
        assert!(acc.mesh().coupling().d_tilde.iter().any(|&t| t != 0.0));

        // a repeat cycle without a new sweep matches a cycle that never
        // saw the corner tally
        let mut cfg = config(2, SolveType::Moc, BoundaryType::Reflective);
        cfg.acceleration.relax_factor = 1.0;
        let mut untallied = CmfdAccelerator::from_config(cfg).unwrap();
        let mut fine_copy = untallied
            .single_region_cells(vec![0; 4], vec![fuel(0.25, 0.2)])
            .unwrap();
        fine_copy.fluxes.assign(&fine.fluxes);

        acc.accelerate(&mut fine).unwrap();
        untallied.accelerate(&mut fine_copy).unwrap();
        let repeat = &acc.mesh().coupling().d_tilde;
        let reference = &untallied.mesh().coupling().d_tilde;
        for (a, b) in repeat.iter().zip(reference.iter()) {
            assert!((a - b).abs() < 1e-14);
        }
    }
}
