use tracing::debug;

use prism_types::Point3d;
use wall_mesh::primitives::{hemisphere_y, icosphere};
use wall_mesh::TriMesh;

use crate::MAX_TAG;

/// Spherical far-field boundary with normals reversed to face the mesh
/// interior.
pub fn build_farfield(center: Point3d, radius: f64, subdivision: u32) -> TriMesh {
    let mut farf = icosphere(center, radius, subdivision);
    farf.set_tag_all(MAX_TAG);
    farf.reverse();
    farf
}

/// Far-field for the symmetric half-domain: a hemisphere above the
/// symmetry plane, capped by the annulus between its rim and the
/// envelope's rim on the plane.
///
/// `envelope_rim` is the closed loop of envelope boundary points on the
/// symmetry plane, in walk order.
pub fn build_symmetric_farfield(
    center: Point3d,
    radius: f64,
    subdivision: u32,
    y0: f64,
    envelope_rim: &[Point3d],
) -> TriMesh {
    let center = Point3d::new(center.x, y0, center.z);
    let (mut farf, rim) = hemisphere_y(center, radius, subdivision);
    farf.set_tag_all(MAX_TAG);
    farf.reverse();

    if envelope_rim.len() >= 3 {
        let outer: Vec<Point3d> = rim.iter().map(|&i| farf.vertex(i)).collect();
        let cap = bridge_annulus(&outer, envelope_rim, y0);
        debug!(
            outer = outer.len(),
            inner = envelope_rim.len(),
            triangles = cap.ntriangles(),
            "triangulated symmetry-plane annulus"
        );
        farf.append(&cap);
    }
    farf
}

/// Triangulate the annulus between two closed loops lying on the plane
/// `y = y0` by merging them in polar-angle order around the inner loop's
/// centroid.
pub fn bridge_annulus(outer: &[Point3d], inner: &[Point3d], y0: f64) -> TriMesh {
    let centroid = loop_centroid(inner);

    let mut outer_sorted = by_angle(outer, &centroid);
    let mut inner_sorted = by_angle(inner, &centroid);

    let mut mesh = TriMesh::new();
    let outer_idx: Vec<u32> = outer_sorted
        .iter()
        .map(|&(_, p)| mesh.add_vertex(Point3d::new(p.x, y0, p.z)))
        .collect();
    let inner_idx: Vec<u32> = inner_sorted
        .iter()
        .map(|&(_, p)| mesh.add_vertex(Point3d::new(p.x, y0, p.z)))
        .collect();

    // close the loops for the sweep
    outer_sorted.push((outer_sorted[0].0 + std::f64::consts::TAU, outer_sorted[0].1));
    inner_sorted.push((inner_sorted[0].0 + std::f64::consts::TAU, inner_sorted[0].1));

    let (mut i, mut j) = (0usize, 0usize);
    let no = outer_idx.len();
    let ni = inner_idx.len();
    while i < no || j < ni {
        let advance_outer = if i >= no {
            false
        } else if j >= ni {
            true
        } else {
            outer_sorted[i + 1].0 <= inner_sorted[j + 1].0
        };
        if advance_outer {
            mesh.add_tagged_triangle(
                outer_idx[i % no],
                outer_idx[(i + 1) % no],
                inner_idx[j % ni],
                MAX_TAG,
            );
            i += 1;
        } else {
            mesh.add_tagged_triangle(
                outer_idx[i % no],
                inner_idx[(j + 1) % ni],
                inner_idx[j % ni],
                MAX_TAG,
            );
            j += 1;
        }
    }
    mesh
}

fn loop_centroid(points: &[Point3d]) -> Point3d {
    let n = points.len().max(1) as f64;
    let mut c = Point3d::ORIGIN;
    for p in points {
        c.x += p.x / n;
        c.y += p.y / n;
        c.z += p.z / n;
    }
    c
}

fn by_angle(points: &[Point3d], center: &Point3d) -> Vec<(f64, Point3d)> {
    let mut out: Vec<(f64, Point3d)> = points
        .iter()
        .map(|p| {
            let theta = (p.z - center.z).atan2(p.x - center.x);
            let theta = if theta < 0.0 {
                theta + std::f64::consts::TAU
            } else {
                theta
            };
            (theta, *p)
        })
        .collect();
    out.sort_by(|a, b| a.0.total_cmp(&b.0));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_farfield_faces_inward() {
        let c = Point3d::ORIGIN;
        let farf = build_farfield(c, 10.0, 2);
        for i in 0..farf.ntriangles() {
            let outward = farf.face_center(i) - c;
            assert!(farf.face_normal(i).dot(&outward) < 0.0);
            assert_eq!(farf.tag(i), MAX_TAG);
        }
    }

    #[test]
    fn annulus_between_concentric_squares_is_watertight() {
        let outer: Vec<Point3d> = [(-2.0, -2.0), (2.0, -2.0), (2.0, 2.0), (-2.0, 2.0)]
            .iter()
            .map(|&(x, z)| Point3d::new(x, 0.0, z))
            .collect();
        let inner: Vec<Point3d> = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
            .iter()
            .map(|&(x, z)| Point3d::new(x, 0.0, z))
            .collect();
        let cap = bridge_annulus(&outer, &inner, 0.0);
        assert_eq!(cap.ntriangles(), 8);
        // every edge interior to the annulus is shared by two triangles;
        // the two rims stay open
        let open: usize = cap
            .edge_use_counts()
            .values()
            .filter(|&&c| c == 1)
            .count();
        assert_eq!(open, 8);
        // all triangles on the plane
        for v in cap.vertices() {
            assert_eq!(v.y, 0.0);
        }
    }

    #[test]
    fn symmetric_farfield_closes_against_the_rim() {
        // envelope rim: small square loop around the origin
        let rim: Vec<Point3d> = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
            .iter()
            .map(|&(x, z)| Point3d::new(x, 0.0, z))
            .collect();
        let farf = build_symmetric_farfield(Point3d::ORIGIN, 10.0, 1, 0.0, &rim);
        // the only open edges left are along the envelope rim (4 edges);
        // the hemisphere rim is consumed by the annulus, up to the seam
        // duplicates removed by cleanup
        let mut farf = farf;
        farf.cleanup(1e-9);
        let open: Vec<_> = farf
            .edge_use_counts()
            .into_iter()
            .filter(|&(_, c)| c == 1)
            .collect();
        assert_eq!(open.len(), rim.len());
        for ((a, b), _) in open {
            assert_eq!(farf.vertex(a).y, 0.0);
            assert_eq!(farf.vertex(b).y, 0.0);
        }
    }
}
