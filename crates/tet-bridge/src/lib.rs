//! Interface to the external tetrahedral mesher.
//!
//! Builds the piecewise linear complex (envelope, far-field, optional
//! nearfield, hole markers), writes it in the mesher's `.smesh` format,
//! invokes the mesher as a subprocess, reads its output back, and derives
//! the edge-length metric field for an optional refinement pass.

pub mod error;
pub mod farfield;
pub mod ingest;
pub mod invoke;
pub mod metric;
pub mod nearfield;
pub mod options;
pub mod plc;

pub use error::TetError;
pub use ingest::{read_tetgen, TetMesh};
pub use invoke::TetgenRunner;
pub use metric::TetRefiner;

/// Boundary markers live below this value for wall tags; the reserved
/// range above it identifies core-generated boundaries.
pub const ENVELOPE_TAG_BASE: i32 = 1_000_000;

/// Marker of the far-field boundary.
pub const MAX_TAG: i32 = 2_000_000;

/// Marker of the optional nearfield refinement boundary.
pub const NEARFIELD_TAG: i32 = MAX_TAG - 1;

/// True for markers produced from envelope facets.
pub fn is_envelope_marker(marker: i32) -> bool {
    (ENVELOPE_TAG_BASE..NEARFIELD_TAG).contains(&marker)
}
