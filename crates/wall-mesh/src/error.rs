/// Errors raised while building or validating surface meshes.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MeshError {
    #[error("mesh has no triangles")]
    EmptyMesh,

    #[error("triangle {index} references vertex {vertex} out of range ({vertex_count} vertices)")]
    IndexOutOfRange {
        index: usize,
        vertex: u32,
        vertex_count: usize,
    },

    #[error("wall mesh is not watertight: {open_edges} open edges, {overshared_edges} edges shared by more than two triangles")]
    NotClosed {
        open_edges: usize,
        overshared_edges: usize,
    },

    #[error("node {node} lies {distance:e} from the symmetry plane, inside the ambiguous band")]
    SymmetryViolated { node: u32, distance: f64 },

    #[error("open boundary edge ({a}, {b}) does not lie on the symmetry plane")]
    OpenEdgeOffPlane { a: u32, b: u32 },
}
