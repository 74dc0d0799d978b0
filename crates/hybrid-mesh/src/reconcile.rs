use std::collections::HashMap;

use tracing::{debug, warn};

use tet_bridge::{is_envelope_marker, TetMesh};
use wall_mesh::{PointGrid, TriMesh};

use crate::error::ReconcileError;

/// Mapping between the wall/envelope pair and the tet mesh boundary.
#[derive(Debug, Clone)]
pub struct WallMatch {
    /// Wall node index -> tet mesh node holding its envelope copy.
    pub envelope_node: Vec<u32>,
    /// Wall triangle index -> tet boundary face index.
    pub envelope_face: Vec<u32>,
    /// Envelope nodes matched by proximity rather than exactly.
    pub drift_matches: usize,
}

/// Match every envelope node and triangle to its counterpart on the tet
/// mesh boundary.
///
/// The mesher must not move boundary nodes; exact coordinate matches are
/// expected. Nodes that only match within a relaxed tolerance are counted
/// as drift; nodes without any match raise `BoundaryDrift`.
pub fn match_envelope(
    tet: &TetMesh,
    wall: &TriMesh,
    envelope: &TriMesh,
) -> Result<WallMatch, ReconcileError> {
    let diag = envelope.bounding_box().diagonal().max(1.0);
    let exact_tol = 1e-9 * diag;
    let drift_tol = 1e-6 * diag;

    let grid = PointGrid::build(&tet.nodes, drift_tol.max(1e-300));

    let mut envelope_node = vec![0u32; envelope.nvertices()];
    let mut drift_matches = 0usize;
    for i in 0..envelope.nvertices() {
        let p = envelope.vertex(i as u32);
        match grid.nearest_within(&p, drift_tol) {
            Some((j, d)) if d <= exact_tol => envelope_node[i] = j,
            Some((j, d)) => {
                envelope_node[i] = j;
                drift_matches += 1;
                debug!(node = i, distance = d, "envelope node matched by proximity");
            }
            None => {
                let nearest = grid
                    .nearest_within(&p, 1e3 * drift_tol)
                    .map(|(_, d)| d)
                    .unwrap_or(f64::INFINITY);
                return Err(ReconcileError::BoundaryDrift {
                    node: i as u32,
                    nearest,
                });
            }
        }
    }

    // reverse map: tet node -> wall node, for face matching
    let mut tet_to_wall: HashMap<u32, u32> = HashMap::with_capacity(envelope_node.len());
    for (wall_node, &tet_node) in envelope_node.iter().enumerate() {
        tet_to_wall.insert(tet_node, wall_node as u32);
    }

    // wall triangles by sorted node triple
    let mut wall_tris: HashMap<[u32; 3], u32> = HashMap::with_capacity(wall.ntriangles());
    for i in 0..wall.ntriangles() {
        let mut t = wall.triangle(i);
        t.sort_unstable();
        wall_tris.insert(t, i as u32);
    }

    let mut envelope_face = vec![u32::MAX; wall.ntriangles()];
    let mut found = 0usize;
    for (fi, (tri, marker)) in tet.boundary_faces.iter().enumerate() {
        if !is_envelope_marker(*marker) {
            continue;
        }
        let mut key = [0u32; 3];
        for (slot, v) in key.iter_mut().zip(tri) {
            *slot = match tet_to_wall.get(v) {
                Some(&w) => w,
                None => return Err(ReconcileError::FaceUnmatched { face: fi }),
            };
        }
        key.sort_unstable();
        match wall_tris.get(&key) {
            Some(&wi) => {
                envelope_face[wi as usize] = fi as u32;
                found += 1;
            }
            None => return Err(ReconcileError::FaceUnmatched { face: fi }),
        }
    }

    if found != wall.ntriangles() {
        return Err(ReconcileError::FaceCountMismatch {
            found,
            expected: wall.ntriangles(),
        });
    }
    if drift_matches > 0 {
        warn!(drift_matches, "boundary nodes moved by the mesher within tolerance");
    }

    Ok(WallMatch {
        envelope_node,
        envelope_face,
        drift_matches,
    })
}
