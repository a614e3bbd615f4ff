// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — CMFD Core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
pub mod accel;
pub mod assembly;
pub mod coupling;
pub mod eigen;
pub mod fine;
pub mod homogenize;
pub mod material;
pub mod mesh;
pub mod prolong;
pub mod quadrature;
