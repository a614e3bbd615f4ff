// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Cross Sections
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Multigroup cross-section records.
//!
//! [`XsMaterial`] is a fine-region material as handed over by the
//! transport collaborator (read-only here). [`CellCrossSections`] is the
//! homogenized copy owned by one coarse cell. Scattering is stored
//! `scatter[from][to]` in both.

use std::path::Path;

use cmfd_types::error::{CmfdError, CmfdResult};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Fine-region material data, one value per energy group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XsMaterial {
    pub name: String,
    pub sigma_t: Vec<f64>,
    pub sigma_a: Vec<f64>,
    #[serde(default)]
    pub sigma_f: Vec<f64>,
    #[serde(default)]
    pub nu_sigma_f: Vec<f64>,
    #[serde(default)]
    pub chi: Vec<f64>,
    /// Explicit diffusion coefficient. Empty or non-positive entries fall
    /// back to `1 / (3 sigma_t)` during homogenization.
    #[serde(default)]
    pub dif_coef: Vec<f64>,
    /// `scatter[from][to]`.
    pub scatter: Vec<Vec<f64>>,
}

impl XsMaterial {
    /// Non-fissile material with no explicit diffusion coefficient.
    pub fn absorber(name: &str, sigma_t: Vec<f64>, sigma_a: Vec<f64>, scatter: Vec<Vec<f64>>) -> Self {
        let groups = sigma_t.len();
        XsMaterial {
            name: name.to_string(),
            sigma_t,
            sigma_a,
            sigma_f: vec![0.0; groups],
            nu_sigma_f: vec![0.0; groups],
            chi: vec![0.0; groups],
            dif_coef: Vec::new(),
            scatter,
        }
    }

    pub fn num_groups(&self) -> usize {
        self.sigma_t.len()
    }

    /// Optional per-group fields read as zero when absent.
    fn optional(values: &[f64], group: usize) -> f64 {
        values.get(group).copied().unwrap_or(0.0)
    }

    pub fn sigma_f(&self, group: usize) -> f64 {
        Self::optional(&self.sigma_f, group)
    }

    pub fn nu_sigma_f(&self, group: usize) -> f64 {
        Self::optional(&self.nu_sigma_f, group)
    }

    pub fn chi(&self, group: usize) -> f64 {
        Self::optional(&self.chi, group)
    }

    pub fn dif_coef(&self, group: usize) -> f64 {
        Self::optional(&self.dif_coef, group)
    }

    /// Check group counts and physical ranges against `num_groups`.
    pub fn validate(&self, num_groups: usize) -> CmfdResult<()> {
        let check_len = |field: &[f64], optional: bool| -> CmfdResult<()> {
            if (optional && field.is_empty()) || field.len() == num_groups {
                Ok(())
            } else {
                Err(CmfdError::GroupMismatch {
                    expected: num_groups,
                    got: field.len(),
                })
            }
        };
        check_len(&self.sigma_t, false)?;
        check_len(&self.sigma_a, false)?;
        check_len(&self.sigma_f, true)?;
        check_len(&self.nu_sigma_f, true)?;
        check_len(&self.chi, true)?;
        check_len(&self.dif_coef, true)?;
        if self.scatter.len() != num_groups {
            return Err(CmfdError::GroupMismatch {
                expected: num_groups,
                got: self.scatter.len(),
            });
        }
        for row in &self.scatter {
            check_len(row, false)?;
        }

        for (g, &t) in self.sigma_t.iter().enumerate() {
            if !t.is_finite() || t <= 0.0 {
                return Err(CmfdError::PhysicsViolation(format!(
                    "material '{}': sigma_t[{g}] must be positive, got {t}",
                    self.name
                )));
            }
        }
        let all_values = self
            .sigma_a
            .iter()
            .chain(&self.sigma_f)
            .chain(&self.nu_sigma_f)
            .chain(&self.chi)
            .chain(self.scatter.iter().flatten());
        for &v in all_values {
            if !v.is_finite() || v < 0.0 {
                return Err(CmfdError::PhysicsViolation(format!(
                    "material '{}': cross sections must be finite and non-negative, got {v}",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Load a JSON array of materials and validate each against
    /// `num_groups`.
    pub fn load_library(path: impl AsRef<Path>, num_groups: usize) -> CmfdResult<Vec<XsMaterial>> {
        let contents = std::fs::read_to_string(path)?;
        let materials: Vec<XsMaterial> = serde_json::from_str(&contents)?;
        for m in &materials {
            m.validate(num_groups)?;
        }
        Ok(materials)
    }
}

/// Homogenized cross sections of one coarse cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellCrossSections {
    pub sigma_a: Array1<f64>,
    pub sigma_t: Array1<f64>,
    pub sigma_f: Array1<f64>,
    pub nu_sigma_f: Array1<f64>,
    pub chi: Array1<f64>,
    pub dif_coef: Array1<f64>,
    /// `[from, to]`.
    pub scatter: Array2<f64>,
}

impl CellCrossSections {
    /// All-zero cross sections for `num_groups` groups.
    pub fn zeros(num_groups: usize) -> Self {
        CellCrossSections {
            sigma_a: Array1::zeros(num_groups),
            sigma_t: Array1::zeros(num_groups),
            sigma_f: Array1::zeros(num_groups),
            nu_sigma_f: Array1::zeros(num_groups),
            chi: Array1::zeros(num_groups),
            dif_coef: Array1::zeros(num_groups),
            scatter: Array2::zeros((num_groups, num_groups)),
        }
    }

    pub fn num_groups(&self) -> usize {
        self.sigma_t.len()
    }

    /// Total out-scatter from `group` to every other group.
    pub fn out_scatter(&self, group: usize) -> f64 {
        self.scatter
            .row(group)
            .iter()
            .enumerate()
            .filter(|(to, _)| *to != group)
            .map(|(_, s)| s)
            .sum()
    }
}
