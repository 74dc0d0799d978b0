/// Errors while reconciling the tet mesh with the wall. These are fatal:
/// they mean the external mesher moved or lost boundary entities.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReconcileError {
    #[error("envelope node {node} has no counterpart in the tet mesh (nearest at distance {nearest:e})")]
    BoundaryDrift { node: u32, nearest: f64 },

    #[error("tet boundary face {face} carries an envelope marker but matches no wall triangle")]
    FaceUnmatched { face: usize },

    #[error("tet mesh exposes {found} envelope faces, wall has {expected} triangles")]
    FaceCountMismatch { found: usize, expected: usize },
}
