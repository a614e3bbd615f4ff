// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — CMFD State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};

/// Cell face, numbered as stored in the current and coefficient arrays.
/// y grows downwards (row 0 is the top of the domain).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Left = 0,
    Bottom = 1,
    Right = 2,
    Top = 3,
}

impl Surface {
    pub const ALL: [Surface; 4] = [Surface::Left, Surface::Bottom, Surface::Right, Surface::Top];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Surface::Left),
            1 => Some(Surface::Bottom),
            2 => Some(Surface::Right),
            3 => Some(Surface::Top),
            _ => None,
        }
    }

    /// Face of the neighbouring cell that coincides with this one.
    pub fn opposite(self) -> Self {
        match self {
            Surface::Left => Surface::Right,
            Surface::Bottom => Surface::Top,
            Surface::Right => Surface::Left,
            Surface::Top => Surface::Bottom,
        }
    }

    /// Sign of the outward normal along the face's axis as seen by the
    /// finite-difference stencil: -1 for left/top, +1 for bottom/right.
    pub fn sense(self) -> f64 {
        match self {
            Surface::Left | Surface::Top => -1.0,
            Surface::Bottom | Surface::Right => 1.0,
        }
    }

    /// True for faces normal to x (their length is the cell height).
    pub fn is_vertical(self) -> bool {
        matches!(self, Surface::Left | Surface::Right)
    }
}

/// Cell corner, stored after the four faces (indices 4..8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    LeftBottom = 4,
    RightBottom = 5,
    RightTop = 6,
    LeftTop = 7,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::LeftBottom,
        Corner::RightBottom,
        Corner::RightTop,
        Corner::LeftTop,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Outer boundary condition, one per domain side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryType {
    #[default]
    Reflective,
    Vacuum,
    ZeroFlux,
}

/// Named coarse-mesh flux snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FluxState {
    Current,
    Previous,
    Adjoint,
    /// Solver-internal working copy.
    Scratch(u8),
}

/// Where the coarse problem gets its data from.
///
/// `Moc`: homogenized from a transport sweep, with transport-informed
/// currents feeding the nonlinear correction.
/// `Diffusion`: stand-alone diffusion solve, no correction term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SolveType {
    #[default]
    Moc,
    Diffusion,
}

/// Forward or adjoint operator assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FluxMode {
    #[default]
    Forward,
    Adjoint,
}

/// Terminal state of the power iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EigenStatus {
    Converged,
    /// Iteration cap hit; the last iterate is still returned.
    MaxItersReached,
}

/// Summary of one eigenvalue solve.
#[derive(Debug, Clone)]
pub struct EigenResult {
    pub k_eff: f64,
    pub status: EigenStatus,
    pub iterations: usize,
    /// Final pointwise source error.
    pub residual: f64,
    pub solve_time_ms: f64,
}

impl EigenResult {
    pub fn converged(&self) -> bool {
        self.status == EigenStatus::Converged
    }
}
