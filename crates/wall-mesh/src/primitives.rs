//! Triangulated sphere and hemisphere primitives for the far- and
//! nearfield boundaries.

use std::collections::HashMap;

use prism_types::{Point3d, Vec3};

use crate::mesh::TriMesh;

/// Icosphere: subdivided icosahedron projected onto the sphere.
///
/// Subdivision `level` quadruples the triangle count per step, starting
/// from 20 (so level 3 gives 1280 triangles).
pub fn icosphere(center: Point3d, radius: f64, level: u32) -> TriMesh {
    let t = (1.0 + 5.0f64.sqrt()) / 2.0;

    let base_vertices = [
        (-1.0, t, 0.0),
        (1.0, t, 0.0),
        (-1.0, -t, 0.0),
        (1.0, -t, 0.0),
        (0.0, -1.0, t),
        (0.0, 1.0, t),
        (0.0, -1.0, -t),
        (0.0, 1.0, -t),
        (t, 0.0, -1.0),
        (t, 0.0, 1.0),
        (-t, 0.0, -1.0),
        (-t, 0.0, 1.0),
    ];

    #[rustfmt::skip]
    let base_faces: [[u32; 3]; 20] = [
        [0, 11, 5], [0, 5, 1], [0, 1, 7], [0, 7, 10], [0, 10, 11],
        [1, 5, 9], [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
        [3, 9, 4], [3, 4, 2], [3, 2, 6], [3, 6, 8], [3, 8, 9],
        [4, 9, 5], [2, 4, 11], [6, 2, 10], [8, 6, 7], [9, 8, 1],
    ];

    let mut mesh = TriMesh::new();
    for &(x, y, z) in &base_vertices {
        let dir = Vec3::new(x, y, z).normalized_or(Vec3::Z);
        mesh.add_vertex(center + dir * radius);
    }
    let mut faces: Vec<[u32; 3]> = base_faces.to_vec();

    for _ in 0..level {
        let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
        let mut refined = Vec::with_capacity(faces.len() * 4);
        for f in &faces {
            let mut mid = [0u32; 3];
            for k in 0..3 {
                let a = f[k];
                let b = f[(k + 1) % 3];
                let key = (a.min(b), a.max(b));
                mid[k] = *midpoints.entry(key).or_insert_with(|| {
                    let pm = mesh.vertex(a).midpoint(&mesh.vertex(b));
                    let dir = (pm - center).normalized_or(Vec3::Z);
                    mesh.add_vertex(center + dir * radius)
                });
            }
            refined.push([f[0], mid[0], mid[2]]);
            refined.push([f[1], mid[1], mid[0]]);
            refined.push([f[2], mid[2], mid[1]]);
            refined.push([mid[0], mid[1], mid[2]]);
        }
        faces = refined;
    }

    for f in &faces {
        mesh.add_triangle(f[0], f[1], f[2]);
    }
    mesh
}

/// Triangle count of an icosphere at the given subdivision level.
pub fn icosphere_triangle_count(level: u32) -> usize {
    20usize << (2 * level)
}

/// Hemisphere `y >= center.y` built from latitude rings so the rim is an
/// exact circle on the plane `y = center.y`.
///
/// Returns the mesh (outward normals) and the rim vertex indices ordered
/// by increasing polar angle in the x-z plane.
pub fn hemisphere_y(center: Point3d, radius: f64, level: u32) -> (TriMesh, Vec<u32>) {
    let nseg = (6usize << level).max(6);
    let nring = (nseg / 4).max(2);

    let mut mesh = TriMesh::new();
    let pole = mesh.add_vertex(center + Vec3::Y * radius);

    let mut rings: Vec<Vec<u32>> = Vec::with_capacity(nring);
    for k in 1..=nring {
        let phi = (k as f64) * std::f64::consts::FRAC_PI_2 / (nring as f64);
        let y = center.y + radius * phi.cos();
        let rho = radius * phi.sin();
        let mut ring = Vec::with_capacity(nseg);
        for j in 0..nseg {
            let theta = 2.0 * std::f64::consts::PI * (j as f64) / (nseg as f64);
            // the rim (k == nring) lands exactly on the plane
            let y = if k == nring { center.y } else { y };
            ring.push(mesh.add_vertex(Point3d::new(
                center.x + rho * theta.cos(),
                y,
                center.z + rho * theta.sin(),
            )));
        }
        rings.push(ring);
    }

    // pole fan
    for j in 0..nseg {
        let a = rings[0][j];
        let b = rings[0][(j + 1) % nseg];
        mesh.add_triangle(pole, b, a);
    }
    // latitude strips
    for k in 0..nring - 1 {
        for j in 0..nseg {
            let u0 = rings[k][j];
            let u1 = rings[k][(j + 1) % nseg];
            let l0 = rings[k + 1][j];
            let l1 = rings[k + 1][(j + 1) % nseg];
            mesh.add_triangle(u0, l1, l0);
            mesh.add_triangle(u0, u1, l1);
        }
    }

    let rim = rings.pop().unwrap_or_default();
    (mesh, rim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn icosphere_is_closed_and_on_radius() {
        let m = icosphere(Point3d::new(1.0, 2.0, 3.0), 5.0, 2);
        assert_eq!(m.ntriangles(), icosphere_triangle_count(2));
        for counts in m.edge_use_counts().values() {
            assert_eq!(*counts, 2);
        }
        for v in m.vertices() {
            assert_relative_eq!(
                v.distance_to(&Point3d::new(1.0, 2.0, 3.0)),
                5.0,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn icosphere_normals_point_outward() {
        let c = Point3d::ORIGIN;
        let m = icosphere(c, 1.0, 1);
        for i in 0..m.ntriangles() {
            let outward = m.face_center(i) - c;
            assert!(m.face_normal(i).dot(&outward) > 0.0, "face {} inverted", i);
        }
    }

    #[test]
    fn hemisphere_rim_lies_on_plane_and_is_ordered() {
        let c = Point3d::new(0.0, 1.5, 0.0);
        let (m, rim) = hemisphere_y(c, 2.0, 2);
        assert!(!rim.is_empty());
        let mut prev = -1.0;
        for &i in &rim {
            let p = m.vertex(i);
            assert_relative_eq!(p.y, 1.5, epsilon = 1e-14);
            let theta = (p.z - c.z).atan2(p.x - c.x);
            let theta = if theta < 0.0 {
                theta + 2.0 * std::f64::consts::PI
            } else {
                theta
            };
            assert!(theta >= prev);
            prev = theta;
        }
        // open exactly along the rim
        let open: usize = m
            .edge_use_counts()
            .values()
            .filter(|&&c| c == 1)
            .count();
        assert_eq!(open, rim.len());
    }

    #[test]
    fn hemisphere_normals_point_outward() {
        let c = Point3d::ORIGIN;
        let (m, _) = hemisphere_y(c, 1.0, 1);
        for i in 0..m.ntriangles() {
            let outward = m.face_center(i) - c;
            assert!(
                m.face_normal(i).dot(&outward) > -1e-9,
                "face {} inverted",
                i
            );
        }
    }
}
