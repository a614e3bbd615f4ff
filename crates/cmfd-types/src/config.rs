// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — CMFD Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};

use crate::constants::{LINEAR_SOLVE_TOL, MAX_POWER_ITERATIONS};
use crate::error::{CmfdError, CmfdResult};
use crate::state::{BoundaryType, FluxMode, SolveType};

/// Top-level CMFD accelerator configuration.
/// Maps 1:1 to the JSON files under `configs/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmfdConfig {
    pub name: String,
    pub mesh: MeshConfig,
    pub num_groups: usize,
    #[serde(default)]
    pub boundaries: BoundaryConfig,
    #[serde(default)]
    pub acceleration: AccelerationConfig,
    #[serde(default)]
    pub solver: EigenSolverConfig,
    #[serde(default)]
    pub linear: LinearSolverConfig,
}

/// Coarse mesh extent. Explicit widths/heights override the uniform split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    pub cells_x: usize,
    pub cells_y: usize,
    pub length_x: f64,
    pub length_y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_widths: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_heights: Option<Vec<f64>>,
}

impl MeshConfig {
    /// Per-column widths, left to right.
    pub fn widths(&self) -> Vec<f64> {
        match &self.cell_widths {
            Some(w) => w.clone(),
            None => vec![self.length_x / self.cells_x.max(1) as f64; self.cells_x],
        }
    }

    /// Per-row heights, top to bottom.
    pub fn heights(&self) -> Vec<f64> {
        match &self.cell_heights {
            Some(h) => h.clone(),
            None => vec![self.length_y / self.cells_y.max(1) as f64; self.cells_y],
        }
    }
}

/// Boundary condition per domain side.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BoundaryConfig {
    #[serde(default)]
    pub left: BoundaryType,
    #[serde(default)]
    pub bottom: BoundaryType,
    #[serde(default)]
    pub right: BoundaryType,
    #[serde(default)]
    pub top: BoundaryType,
}

impl BoundaryConfig {
    /// Ordered as surfaces are indexed: left, bottom, right, top.
    pub fn as_array(&self) -> [BoundaryType; 4] {
        [self.left, self.bottom, self.right, self.top]
    }

    pub fn uniform(boundary: BoundaryType) -> Self {
        BoundaryConfig {
            left: boundary,
            bottom: boundary,
            right: boundary,
            top: boundary,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccelerationConfig {
    #[serde(default)]
    pub solve_type: SolveType,
    #[serde(default)]
    pub flux_mode: FluxMode,
    /// Under-relaxation weight on the freshly computed d_tilde (default: 0.6)
    #[serde(default = "default_relax_factor")]
    pub relax_factor: f64,
    /// Apply the optically-thick diffusion correction (default: false)
    #[serde(default)]
    pub optically_thick: bool,
    /// Rebuild the production operator every cycle (default: true)
    #[serde(default = "default_true")]
    pub assemble_production: bool,
}

fn default_relax_factor() -> f64 {
    0.6
}
fn default_true() -> bool {
    true
}

impl Default for AccelerationConfig {
    fn default() -> Self {
        AccelerationConfig {
            solve_type: SolveType::default(),
            flux_mode: FluxMode::default(),
            relax_factor: default_relax_factor(),
            optically_thick: false,
            assemble_production: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EigenSolverConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Threshold on the pointwise source error.
    #[serde(default = "default_convergence_criteria")]
    pub convergence_criteria: f64,
}

fn default_max_iterations() -> usize {
    MAX_POWER_ITERATIONS
}
fn default_convergence_criteria() -> f64 {
    1e-5
}

impl Default for EigenSolverConfig {
    fn default() -> Self {
        EigenSolverConfig {
            max_iterations: default_max_iterations(),
            convergence_criteria: default_convergence_criteria(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearMethod {
    #[default]
    Gmres,
    Sor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSolverConfig {
    #[serde(default)]
    pub method: LinearMethod,
    #[serde(default = "default_linear_tol")]
    pub rtol: f64,
    #[serde(default = "default_linear_tol")]
    pub atol: f64,
    /// Krylov dimension before restart (GMRES only)
    #[serde(default = "default_restart")]
    pub restart: usize,
    /// GMRES restart cycles; SOR runs up to restart * max_restarts sweeps
    #[serde(default = "default_max_restarts")]
    pub max_restarts: usize,
    #[serde(default = "default_precond_sweeps")]
    pub precond_sweeps: usize,
    #[serde(default = "default_omega")]
    pub omega: f64,
}

fn default_linear_tol() -> f64 {
    LINEAR_SOLVE_TOL
}
fn default_restart() -> usize {
    30
}
fn default_max_restarts() -> usize {
    100
}
fn default_precond_sweeps() -> usize {
    3
}
fn default_omega() -> f64 {
    1.5
}

impl Default for LinearSolverConfig {
    fn default() -> Self {
        LinearSolverConfig {
            method: LinearMethod::default(),
            rtol: default_linear_tol(),
            atol: default_linear_tol(),
            restart: default_restart(),
            max_restarts: default_max_restarts(),
            precond_sweeps: default_precond_sweeps(),
            omega: default_omega(),
        }
    }
}

impl CmfdConfig {
    /// Load from a JSON file and validate.
    pub fn from_file(path: &str) -> CmfdResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no acceleration cycle can run with.
    pub fn validate(&self) -> CmfdResult<()> {
        if self.num_groups == 0 {
            return Err(CmfdError::ConfigError(
                "num_groups must be at least 1".to_string(),
            ));
        }
        if self.mesh.cells_x == 0 || self.mesh.cells_y == 0 {
            return Err(CmfdError::ConfigError(format!(
                "mesh needs at least one cell per axis, got {}x{}",
                self.mesh.cells_x, self.mesh.cells_y
            )));
        }
        let widths = self.mesh.widths();
        let heights = self.mesh.heights();
        if widths.len() != self.mesh.cells_x || heights.len() != self.mesh.cells_y {
            return Err(CmfdError::ConfigError(format!(
                "cell_widths/cell_heights lengths ({}, {}) do not match cells ({}, {})",
                widths.len(),
                heights.len(),
                self.mesh.cells_x,
                self.mesh.cells_y
            )));
        }
        if widths
            .iter()
            .chain(heights.iter())
            .any(|&l| !l.is_finite() || l <= 0.0)
        {
            return Err(CmfdError::ConfigError(
                "cell dimensions must be finite and positive".to_string(),
            ));
        }
        let relax = self.acceleration.relax_factor;
        if !(relax > 0.0 && relax <= 1.0) {
            return Err(CmfdError::ConfigError(format!(
                "relax_factor must lie in (0, 1], got {relax}"
            )));
        }
        if self.solver.max_iterations == 0 {
            return Err(CmfdError::ConfigError(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.solver.convergence_criteria > 0.0) {
            return Err(CmfdError::ConfigError(
                "convergence_criteria must be positive".to_string(),
            ));
        }
        if self.linear.restart == 0 || self.linear.max_restarts == 0 {
            return Err(CmfdError::ConfigError(
                "linear solver restart and max_restarts must be positive".to_string(),
            ));
        }
        if !(self.linear.omega > 0.0 && self.linear.omega < 2.0) {
            return Err(CmfdError::ConfigError(format!(
                "SOR omega must lie in (0, 2), got {}",
                self.linear.omega
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// CARGO_MANIFEST_DIR points to crates/cmfd-types/ at compile time,
    /// so the workspace root is two levels up.
    fn project_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
    }

    fn config_path(relative: &str) -> String {
        project_root().join(relative).to_string_lossy().to_string()
    }

    fn minimal() -> CmfdConfig {
        serde_json::from_str(
            r#"{
                "name": "minimal",
                "mesh": { "cells_x": 2, "cells_y": 3, "length_x": 4.0, "length_y": 6.0 },
                "num_groups": 2
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_load_pin_cell_config() {
        let cfg = CmfdConfig::from_file(&config_path("configs/pin_cell.json")).unwrap();
        assert_eq!(cfg.name, "UO2-Pin-Cell");
        assert_eq!(cfg.num_groups, 7);
        assert_eq!(cfg.mesh.cells_x, 1);
        assert_eq!(cfg.boundaries.left, BoundaryType::Reflective);
        assert_eq!(cfg.acceleration.solve_type, SolveType::Moc);
    }

    #[test]
    fn test_load_lattice_config() {
        let cfg = CmfdConfig::from_file(&config_path("configs/c5g7_lattice.json")).unwrap();
        assert_eq!(cfg.mesh.cells_x, 17);
        assert_eq!(cfg.mesh.cells_y, 17);
        assert_eq!(cfg.boundaries.right, BoundaryType::Vacuum);
        assert!(cfg.acceleration.optically_thick);
        assert_eq!(cfg.linear.method, LinearMethod::Gmres);
    }

    #[test]
    fn test_load_diffusion_slab_config() {
        let cfg = CmfdConfig::from_file(&config_path("configs/diffusion_slab.json")).unwrap();
        assert_eq!(cfg.acceleration.solve_type, SolveType::Diffusion);
        assert_eq!(cfg.linear.method, LinearMethod::Sor);
        assert_eq!(cfg.boundaries.right, BoundaryType::ZeroFlux);
        // Unlisted sides fall back to reflective.
        assert_eq!(cfg.boundaries.top, BoundaryType::Reflective);
        let total: f64 = cfg.mesh.widths().iter().sum();
        assert!((total - cfg.mesh.length_x).abs() < 1e-12);
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let cfg = minimal();
        cfg.validate().unwrap();
        assert!((cfg.acceleration.relax_factor - 0.6).abs() < 1e-15);
        assert!(cfg.acceleration.assemble_production);
        assert_eq!(cfg.solver.max_iterations, MAX_POWER_ITERATIONS);
        assert!((cfg.linear.rtol - 1e-10).abs() < 1e-20);
        assert_eq!(cfg.boundaries.as_array(), [BoundaryType::Reflective; 4]);
        assert_eq!(cfg.mesh.widths(), vec![2.0, 2.0]);
        assert_eq!(cfg.mesh.heights(), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_rejects_bad_relaxation() {
        let mut cfg = minimal();
        cfg.acceleration.relax_factor = 0.0;
        assert!(matches!(cfg.validate(), Err(CmfdError::ConfigError(_))));
        cfg.acceleration.relax_factor = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_non_positive_cells() {
        let mut cfg = minimal();
        cfg.mesh.cell_widths = Some(vec![1.0, -1.0]);
        assert!(cfg.validate().is_err());
        cfg.mesh.cell_widths = Some(vec![1.0]);
        assert!(cfg.validate().is_err());
        cfg.mesh.cell_widths = None;
        cfg.num_groups = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_roundtrip_serialization() {
        let cfg = CmfdConfig::from_file(&config_path("configs/c5g7_lattice.json")).unwrap();
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let cfg2: CmfdConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.name, cfg2.name);
        assert_eq!(cfg.mesh.cells_x, cfg2.mesh.cells_x);
        assert_eq!(cfg.boundaries.as_array(), cfg2.boundaries.as_array());
    }
}
