// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Property-Based Tests (proptest) for cmfd-types
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for cmfd-types using proptest.
//!
//! Covers: uniform mesh splitting, configuration validation,
//! serialization roundtrip.

use cmfd_types::config::{BoundaryConfig, CmfdConfig, MeshConfig};
use cmfd_types::state::{BoundaryType, Surface};
use proptest::prelude::*;

fn config_with(cells_x: usize, cells_y: usize, lx: f64, ly: f64, groups: usize) -> CmfdConfig {
    CmfdConfig {
        name: "prop".to_string(),
        mesh: MeshConfig {
            cells_x,
            cells_y,
            length_x: lx,
            length_y: ly,
            cell_widths: None,
            cell_heights: None,
        },
        num_groups: groups,
        boundaries: BoundaryConfig::default(),
        acceleration: Default::default(),
        solver: Default::default(),
        linear: Default::default(),
    }
}

fn boundary_strategy() -> impl Strategy<Value = BoundaryType> {
    prop_oneof![
        Just(BoundaryType::Reflective),
        Just(BoundaryType::Vacuum),
        Just(BoundaryType::ZeroFlux),
    ]
}

// ── Mesh Splitting ───────────────────────────────────────────────────

proptest! {
    /// Uniform widths/heights have the requested count and sum to the extent.
    #[test]
    fn uniform_split_partitions_extent(
        cells_x in 1usize..64,
        cells_y in 1usize..64,
        lx in 0.1f64..500.0,
        ly in 0.1f64..500.0,
    ) {
        let cfg = config_with(cells_x, cells_y, lx, ly, 1);
        let w = cfg.mesh.widths();
        let h = cfg.mesh.heights();
        prop_assert_eq!(w.len(), cells_x);
        prop_assert_eq!(h.len(), cells_y);
        prop_assert!((w.iter().sum::<f64>() - lx).abs() < 1e-9 * lx.max(1.0));
        prop_assert!((h.iter().sum::<f64>() - ly).abs() < 1e-9 * ly.max(1.0));
        prop_assert!(w.iter().chain(h.iter()).all(|&l| l > 0.0));
    }

    /// Any positive mesh with at least one group validates.
    #[test]
    fn positive_mesh_validates(
        cells_x in 1usize..32,
        cells_y in 1usize..32,
        groups in 1usize..16,
    ) {
        let cfg = config_with(cells_x, cells_y, 10.0, 10.0, groups);
        prop_assert!(cfg.validate().is_ok());
    }

    /// A single non-positive explicit width is always rejected.
    #[test]
    fn non_positive_width_rejected(
        cells_x in 2usize..16,
        bad in 0usize..16,
        value in -10.0f64..=0.0,
    ) {
        let mut cfg = config_with(cells_x, 1, 10.0, 10.0, 1);
        let mut widths = vec![1.0; cells_x];
        widths[bad % cells_x] = value;
        cfg.mesh.cell_widths = Some(widths);
        prop_assert!(cfg.validate().is_err());
    }

    /// Relaxation outside (0, 1] is rejected.
    #[test]
    fn relax_factor_range(relax in -2.0f64..3.0) {
        let mut cfg = config_with(2, 2, 1.0, 1.0, 1);
        cfg.acceleration.relax_factor = relax;
        let ok = relax > 0.0 && relax <= 1.0;
        prop_assert_eq!(cfg.validate().is_ok(), ok);
    }
}

// ── Serialization ────────────────────────────────────────────────────

proptest! {
    /// Boundary configuration survives a JSON roundtrip in surface order.
    #[test]
    fn boundary_roundtrip(
        left in boundary_strategy(),
        bottom in boundary_strategy(),
        right in boundary_strategy(),
        top in boundary_strategy(),
    ) {
        let b = BoundaryConfig { left, bottom, right, top };
        let json = serde_json::to_string(&b).unwrap();
        let back: BoundaryConfig = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back.as_array(), b.as_array());
        prop_assert_eq!(b.as_array()[Surface::Right.index()], right);
        prop_assert_eq!(b.as_array()[Surface::Top.index()], top);
    }
}
