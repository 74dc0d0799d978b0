//! Triangle-mesh container and wall-surface graph.
//!
//! `TriMesh` is the plain indexed triangle surface used for the wall, the
//! envelope, and the far-/nearfield boundaries. `WallGraph` derives the
//! node adjacency, outward normals, and the local geometric scalars the
//! shell generator feeds on.

pub mod error;
pub mod graph;
pub mod mesh;
pub mod primitives;
pub mod search;

pub use error::MeshError;
pub use graph::{SymmetrySpec, WallGraph};
pub use mesh::TriMesh;
pub use search::{PointGrid, TriangleBins};
