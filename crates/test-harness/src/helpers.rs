//! Scenario geometry and configuration builders.

use prism_types::{Point3d, Vec3};
use tet_bridge::{TetMesh, ENVELOPE_TAG_BASE};
use wall_mesh::primitives::{hemisphere_y, icosphere};
use wall_mesh::TriMesh;

/// Unified error type for the test harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("assertion failed: {detail}")]
    AssertionFailed { detail: String },

    #[error("scenario setup failed: {detail}")]
    SetupFailed { detail: String },
}

/// The closed surface of the axis-aligned unit cube, 12 triangles with
/// outward orientation.
pub fn unit_cube() -> TriMesh {
    let mut m = TriMesh::new();
    for z in [0.0, 1.0] {
        for y in [0.0, 1.0] {
            for x in [0.0, 1.0] {
                m.add_vertex(Point3d::new(x, y, z));
            }
        }
    }
    let quads = [
        [0u32, 2, 3, 1], // z = 0
        [4, 5, 7, 6],    // z = 1
        [0, 1, 5, 4],    // y = 0
        [2, 6, 7, 3],    // y = 1
        [0, 4, 6, 2],    // x = 0
        [1, 3, 7, 5],    // x = 1
    ];
    for q in quads {
        m.add_triangle(q[0], q[1], q[2]);
        m.add_triangle(q[0], q[2], q[3]);
    }
    m
}

/// Icosphere wall for smooth-surface scenarios.
pub fn sphere_wall(radius: f64, level: u32) -> TriMesh {
    icosphere(Point3d::ORIGIN, radius, level)
}

/// Half-sphere with its open rim exactly on y = 0, for symmetric-mode
/// scenarios.
pub fn half_sphere_wall(radius: f64, level: u32) -> TriMesh {
    let (mesh, _) = hemisphere_y(Point3d::ORIGIN, radius, level);
    mesh
}

/// A sphere with one region dented inward: the concave-cavity scenario.
/// Vertices inside the cap around +x are pulled toward the center.
pub fn dented_sphere_wall(radius: f64, level: u32, dent_depth: f64) -> TriMesh {
    let mut mesh = icosphere(Point3d::ORIGIN, radius, level);
    for p in mesh.vertices_mut() {
        let dir = p.to_vec3().normalized_or(Vec3::X);
        // cap of ~25 degrees half-angle around +x
        let cap = (dir.x - 0.9) / 0.1;
        if cap > 0.0 {
            let pull = dent_depth * cap.min(1.0);
            *p = Point3d::from_vec3(p.to_vec3() * (1.0 - pull / radius));
        }
    }
    mesh
}

/// Fabricate a tet mesh whose inner boundary is exactly the given
/// envelope, built from concentric scaled copies of it.
///
/// This stands in for the external mesher in reconciliation and metric
/// tests: every envelope triangle appears as a tagged boundary face, and
/// each shell of tets connects one copy to the next by the structured
/// three-tet prism decomposition.
pub fn layered_tet_mesh(envelope: &TriMesh, scales: &[f64]) -> TetMesh {
    let n = envelope.nvertices() as u32;
    let c = envelope.bounding_box().center();

    let mut nodes = envelope.vertices().to_vec();
    for &s in scales {
        for i in 0..n {
            let p = envelope.vertex(i);
            nodes.push(c + (p - c) * s);
        }
    }

    let mut tets = Vec::new();
    for layer in 0..scales.len() as u32 {
        let base0 = layer * n;
        let base1 = (layer + 1) * n;
        for t in envelope.triangles() {
            let [a, b, cc] = *t;
            let (a0, b0, c0) = (base0 + a, base0 + b, base0 + cc);
            let (a1, b1, c1) = (base1 + a, base1 + b, base1 + cc);
            tets.push([a0, b0, c0, a1]);
            tets.push([b0, c0, a1, b1]);
            tets.push([c0, a1, b1, c1]);
        }
    }

    let boundary_faces = (0..envelope.ntriangles())
        .map(|i| {
            (
                envelope.triangle(i),
                ENVELOPE_TAG_BASE + envelope.tag(i),
            )
        })
        .collect();

    TetMesh {
        nodes,
        tets,
        boundary_faces,
    }
}

/// Single-shell variant of [`layered_tet_mesh`].
pub fn synthetic_tet_mesh(envelope: &TriMesh, outer_scale: f64) -> TetMesh {
    layered_tet_mesh(envelope, &[outer_scale])
}

/// Configuration text for the unit-cube scenario.
pub fn cube_config() -> String {
    "\
FirstLayerHeight = 0.02
LayerGrowthRatio = 1.3
NumPrismLayers = 4
FarfieldRadius = 10
FarfieldSubdivision = 2
"
    .to_string()
}

/// A scratch directory under the system temp dir, unique per test.
pub fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("prismgen-test-{}-{}", std::process::id(), name));
    std::fs::create_dir_all(&dir).expect("creating scratch dir");
    dir
}
