//! Hybrid mesh assembly.
//!
//! Takes the tet mesh returned by the external mesher, matches its
//! envelope boundary back to the wall, grows the prismatic columns, and
//! produces the final hybrid mesh with its quality diagnostics.

pub mod columns;
pub mod error;
pub mod merge;
pub mod mesh;
pub mod prism;
pub mod quality;
pub mod reconcile;

pub use error::ReconcileError;
pub use mesh::{ElementKind, HybridMesh, MeshFlags, Section};
pub use prism::{PrismAssembler, PrismParams};
pub use reconcile::{match_envelope, WallMatch};
