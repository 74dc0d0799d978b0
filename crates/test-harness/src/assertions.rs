//! Invariant checks with diagnostic failures.

use hybrid_mesh::HybridMesh;
use shell_gen::Shell;
use wall_mesh::TriMesh;

use crate::helpers::HarnessError;

fn fail(detail: String) -> HarnessError {
    HarnessError::AssertionFailed { detail }
}

/// The envelope must reuse the wall connectivity verbatim: same triangle
/// count, same node triples, in the same order.
pub fn assert_envelope_connectivity(wall: &TriMesh, envelope: &TriMesh) -> Result<(), HarnessError> {
    if wall.ntriangles() != envelope.ntriangles() {
        return Err(fail(format!(
            "triangle count differs: wall {} vs envelope {}",
            wall.ntriangles(),
            envelope.ntriangles()
        )));
    }
    if wall.nvertices() != envelope.nvertices() {
        return Err(fail(format!(
            "vertex count differs: wall {} vs envelope {}",
            wall.nvertices(),
            envelope.nvertices()
        )));
    }
    for i in 0..wall.ntriangles() {
        if wall.triangle(i) != envelope.triangle(i) {
            return Err(fail(format!(
                "triangle {} differs: wall {:?} vs envelope {:?}",
                i,
                wall.triangle(i),
                envelope.triangle(i)
            )));
        }
    }
    Ok(())
}

/// If the wall is closed, the envelope must be closed with the same
/// topology.
pub fn assert_manifold_preserved(wall: &TriMesh, envelope: &TriMesh) -> Result<(), HarnessError> {
    let wall_counts = wall.edge_use_counts();
    let env_counts = envelope.edge_use_counts();
    if wall_counts != env_counts {
        return Err(fail(
            "envelope edge sharing differs from the wall".to_string(),
        ));
    }
    Ok(())
}

/// Every extrusion quad must keep positive orientation: the top edge must
/// not flip against the bottom edge and the quad must stay convex.
pub fn assert_non_inversion(wall: &TriMesh, envelope: &TriMesh) -> Result<(), HarnessError> {
    for (a, b) in wall.edges() {
        let ok = shell_gen::critical::edge_quad_ok(
            wall.vertex(a),
            wall.vertex(b),
            envelope.vertex(a),
            envelope.vertex(b),
        );
        if !ok {
            return Err(fail(format!("edge ({}, {}) quad is inverted", a, b)));
        }
    }
    Ok(())
}

/// Layer copies must advance strictly along the extrusion direction.
pub fn assert_monotone_columns(wall: &TriMesh, shell: &Shell) -> Result<(), HarnessError> {
    for i in 0..wall.nvertices() {
        for k in 0..shell.num_layers {
            let lo = shell.layer_offset(i, k);
            let hi = shell.layer_offset(i, k + 1);
            if hi <= lo {
                return Err(fail(format!(
                    "column {} stalls between layers {} and {}: {} -> {}",
                    i,
                    k,
                    k + 1,
                    lo,
                    hi
                )));
            }
        }
    }
    Ok(())
}

/// Symmetry round trip: nodes on the plane stay on it and their
/// directions have no normal component.
pub fn assert_symmetry_preserved(
    wall: &TriMesh,
    shell: &Shell,
    envelope: &TriMesh,
    y0: f64,
    tol: f64,
) -> Result<(), HarnessError> {
    for i in 0..wall.nvertices() {
        if (wall.vertex(i as u32).y - y0).abs() < tol {
            let d = shell.directions[i];
            if d.y.abs() > 1e-12 {
                return Err(fail(format!(
                    "direction of symmetry node {} leaves the plane: d.y = {:e}",
                    i, d.y
                )));
            }
            let q = envelope.vertex(i as u32);
            if (q.y - y0).abs() > tol {
                return Err(fail(format!(
                    "envelope copy of symmetry node {} leaves the plane: y = {:e}",
                    i, q.y
                )));
            }
        }
    }
    Ok(())
}

/// The prism sections of the hybrid mesh must reference the wall-layer
/// nodes for the bottom face of layer 0.
pub fn assert_prism_wall_footprint(
    mesh: &HybridMesh,
    layers: usize,
    wall_triangle_count: usize,
) -> Result<(), HarnessError> {
    let prisms = mesh
        .section("prisms")
        .ok_or_else(|| fail("no prisms section".to_string()))?;
    if prisms.nelements() != wall_triangle_count * layers {
        return Err(fail(format!(
            "expected {} prisms, got {}",
            wall_triangle_count * layers,
            prisms.nelements()
        )));
    }
    Ok(())
}
