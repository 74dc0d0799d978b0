use rayon::prelude::*;

use prism_types::{Point3d, Vec3};

use crate::error::MeshError;
use crate::mesh::TriMesh;

/// Half-mesh mode: the wall is open along the plane y = y0.
#[derive(Debug, Clone, Copy)]
pub struct SymmetrySpec {
    pub y0: f64,
}

/// Node adjacency and per-node geometry of the wall surface.
///
/// Adjacency is stored in CSR form (offset + index arrays) and recomputed
/// wholesale by `build`; the graph never outlives modifications of the
/// mesh it was built from.
#[derive(Debug, Clone)]
pub struct WallGraph {
    nnodes: usize,
    nbr_off: Vec<u32>,
    nbr_idx: Vec<u32>,
    tri_off: Vec<u32>,
    tri_idx: Vec<u32>,
    normals: Vec<Vec3>,
    mean_edge: Vec<f64>,
    curvature: Vec<f64>,
    concavity: Vec<f64>,
    symmetry_node: Vec<bool>,
    symmetry: Option<SymmetrySpec>,
}

impl WallGraph {
    /// Build adjacency, outward normals, and local geometric scalars.
    ///
    /// Fails when the mesh is not watertight (non-symmetric mode), when an
    /// open edge leaves the symmetry plane (symmetric mode), or when a node
    /// sits inside the ambiguous near-plane band.
    pub fn build(mesh: &TriMesh, symmetry: Option<SymmetrySpec>) -> Result<Self, MeshError> {
        mesh.validate_indices()?;
        let nnodes = mesh.nvertices();
        let bbox = mesh.bounding_box();
        let plane_tol = 1e-6 * bbox.diagonal().max(1.0);

        check_closed(mesh, symmetry, plane_tol)?;

        // node -> triangle incidence
        let mut tri_off = vec![0u32; nnodes + 1];
        for t in mesh.triangles() {
            for &v in t {
                tri_off[v as usize + 1] += 1;
            }
        }
        for i in 0..nnodes {
            tri_off[i + 1] += tri_off[i];
        }
        let mut tri_idx = vec![0u32; tri_off[nnodes] as usize];
        let mut cursor = tri_off.clone();
        for (ti, t) in mesh.triangles().iter().enumerate() {
            for &v in t {
                tri_idx[cursor[v as usize] as usize] = ti as u32;
                cursor[v as usize] += 1;
            }
        }

        // node -> node neighbors
        let edges = mesh.edges();
        let mut nbr_off = vec![0u32; nnodes + 1];
        for &(a, b) in &edges {
            nbr_off[a as usize + 1] += 1;
            nbr_off[b as usize + 1] += 1;
        }
        for i in 0..nnodes {
            nbr_off[i + 1] += nbr_off[i];
        }
        let mut nbr_idx = vec![0u32; nbr_off[nnodes] as usize];
        let mut cursor = nbr_off.clone();
        for &(a, b) in &edges {
            nbr_idx[cursor[a as usize] as usize] = b;
            cursor[a as usize] += 1;
            nbr_idx[cursor[b as usize] as usize] = a;
            cursor[b as usize] += 1;
        }

        // area-weighted outward normals
        let mut normals: Vec<Vec3> = (0..nnodes)
            .into_par_iter()
            .with_min_len(1024)
            .map(|i| {
                let mut sum = Vec3::ZERO;
                for &ti in csr(&tri_off, &tri_idx, i) {
                    sum += mesh.face_cross(ti as usize);
                }
                sum.normalized_or(Vec3::Z)
            })
            .collect();

        // symmetry-plane node marking
        let mut symmetry_node = vec![false; nnodes];
        if let Some(spec) = symmetry {
            for i in 0..nnodes {
                let dy = (mesh.vertex(i as u32).y - spec.y0).abs();
                if dy < plane_tol {
                    symmetry_node[i] = true;
                    let mut n = normals[i];
                    n.y = 0.0;
                    normals[i] = n.normalized_or(Vec3::X);
                } else if dy < 100.0 * plane_tol {
                    return Err(MeshError::SymmetryViolated {
                        node: i as u32,
                        distance: dy,
                    });
                }
            }
        }

        let mean_edge: Vec<f64> = (0..nnodes)
            .into_par_iter()
            .with_min_len(1024)
            .map(|i| {
                let nbrs = csr(&nbr_off, &nbr_idx, i);
                if nbrs.is_empty() {
                    return 0.0;
                }
                let p = mesh.vertex(i as u32);
                let sum: f64 = nbrs
                    .iter()
                    .map(|&j| p.distance_to(&mesh.vertex(j)))
                    .sum();
                sum / nbrs.len() as f64
            })
            .collect();

        // curvature proxy: largest angular deviation from neighbor normals
        let curvature: Vec<f64> = (0..nnodes)
            .into_par_iter()
            .with_min_len(1024)
            .map(|i| {
                csr(&nbr_off, &nbr_idx, i)
                    .iter()
                    .map(|&j| normals[i].angle_to(&normals[j as usize]))
                    .fold(0.0f64, f64::max)
            })
            .collect();

        // concavity indicator: positive where neighbors sit outward of the
        // tangent plane
        let concavity: Vec<f64> = (0..nnodes)
            .into_par_iter()
            .with_min_len(1024)
            .map(|i| {
                let nbrs = csr(&nbr_off, &nbr_idx, i);
                if nbrs.is_empty() {
                    return 0.0;
                }
                let p = mesh.vertex(i as u32);
                let sum: f64 = nbrs
                    .iter()
                    .map(|&j| {
                        let d = mesh.vertex(j) - p;
                        let len = d.length();
                        if len < 1e-15 {
                            0.0
                        } else {
                            d.dot(&normals[i]) / len
                        }
                    })
                    .sum();
                sum / nbrs.len() as f64
            })
            .collect();

        Ok(Self {
            nnodes,
            nbr_off,
            nbr_idx,
            tri_off,
            tri_idx,
            normals,
            mean_edge,
            curvature,
            concavity,
            symmetry_node,
            symmetry,
        })
    }

    pub fn nnodes(&self) -> usize {
        self.nnodes
    }

    pub fn neighbors(&self, i: usize) -> &[u32] {
        csr(&self.nbr_off, &self.nbr_idx, i)
    }

    pub fn node_triangles(&self, i: usize) -> &[u32] {
        csr(&self.tri_off, &self.tri_idx, i)
    }

    pub fn normal(&self, i: usize) -> Vec3 {
        self.normals[i]
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn mean_edge_length(&self, i: usize) -> f64 {
        self.mean_edge[i]
    }

    pub fn curvature(&self, i: usize) -> f64 {
        self.curvature[i]
    }

    pub fn concavity(&self, i: usize) -> f64 {
        self.concavity[i]
    }

    pub fn is_symmetry_node(&self, i: usize) -> bool {
        self.symmetry_node[i]
    }

    pub fn symmetry(&self) -> Option<SymmetrySpec> {
        self.symmetry
    }
}

fn csr<'a>(off: &[u32], idx: &'a [u32], i: usize) -> &'a [u32] {
    &idx[off[i] as usize..off[i + 1] as usize]
}

fn check_closed(
    mesh: &TriMesh,
    symmetry: Option<SymmetrySpec>,
    plane_tol: f64,
) -> Result<(), MeshError> {
    let counts = mesh.edge_use_counts();
    let overshared = counts.values().filter(|&&c| c > 2).count();
    let open: Vec<(u32, u32)> = counts
        .iter()
        .filter(|(_, &c)| c == 1)
        .map(|(&e, _)| e)
        .collect();

    match symmetry {
        None => {
            if overshared > 0 || !open.is_empty() {
                Err(MeshError::NotClosed {
                    open_edges: open.len(),
                    overshared_edges: overshared,
                })
            } else {
                Ok(())
            }
        }
        Some(spec) => {
            if overshared > 0 {
                return Err(MeshError::NotClosed {
                    open_edges: open.len(),
                    overshared_edges: overshared,
                });
            }
            for &(a, b) in &open {
                let da = (mesh.vertex(a).y - spec.y0).abs();
                let db = (mesh.vertex(b).y - spec.y0).abs();
                if da >= plane_tol || db >= plane_tol {
                    return Err(MeshError::OpenEdgeOffPlane { a, b });
                }
            }
            Ok(())
        }
    }
}

/// True when every mesh vertex lies strictly inside the ellipsoid with
/// the given center and semi-axes. Used by the nearfield construction to
/// reject refinement regions that would cut the envelope.
pub fn ellipsoid_encloses(mesh: &TriMesh, center: Point3d, semi_axes: Vec3) -> bool {
    if semi_axes.x <= 0.0 || semi_axes.y <= 0.0 || semi_axes.z <= 0.0 {
        return false;
    }
    mesh.vertices().iter().all(|p| {
        let d = *p - center;
        let q = (d.x / semi_axes.x).powi(2)
            + (d.y / semi_axes.y).powi(2)
            + (d.z / semi_axes.z).powi(2);
        q < 1.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{hemisphere_y, icosphere};
    use approx::assert_relative_eq;

    fn unit_cube() -> TriMesh {
        let mut m = TriMesh::new();
        for z in [0.0, 1.0] {
            for y in [0.0, 1.0] {
                for x in [0.0, 1.0] {
                    m.add_vertex(Point3d::new(x, y, z));
                }
            }
        }
        // 12 triangles, outward orientation
        let quads = [
            [0u32, 2, 3, 1], // z = 0, normal -z
            [4, 5, 7, 6],    // z = 1, normal +z
            [0, 1, 5, 4],    // y = 0, normal -y
            [2, 6, 7, 3],    // y = 1, normal +y
            [0, 4, 6, 2],    // x = 0, normal -x
            [1, 3, 7, 5],    // x = 1, normal +x
        ];
        for q in quads {
            m.add_triangle(q[0], q[1], q[2]);
            m.add_triangle(q[0], q[2], q[3]);
        }
        m
    }

    #[test]
    fn cube_is_closed_and_normals_point_outward() {
        let m = unit_cube();
        let g = WallGraph::build(&m, None).unwrap();
        let c = Point3d::new(0.5, 0.5, 0.5);
        for i in 0..g.nnodes() {
            let outward = m.vertex(i as u32) - c;
            assert!(g.normal(i).dot(&outward) > 0.0, "node {} points inward", i);
            assert_relative_eq!(g.normal(i).length(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn cube_adjacency_counts() {
        let m = unit_cube();
        let g = WallGraph::build(&m, None).unwrap();
        for i in 0..8 {
            // each cube corner touches 4 or 5 others depending on the
            // face-diagonal split
            let deg = g.neighbors(i).len();
            assert!((4..=6).contains(&deg), "degree {} at node {}", deg, i);
            assert!(!g.node_triangles(i).is_empty());
        }
    }

    #[test]
    fn open_mesh_is_rejected_without_symmetry() {
        let mut m = TriMesh::new();
        let a = m.add_vertex(Point3d::new(0.0, 0.0, 0.0));
        let b = m.add_vertex(Point3d::new(1.0, 0.0, 0.0));
        let c = m.add_vertex(Point3d::new(0.0, 1.0, 0.0));
        m.add_triangle(a, b, c);
        assert!(matches!(
            WallGraph::build(&m, None),
            Err(MeshError::NotClosed { .. })
        ));
    }

    #[test]
    fn sphere_concavity_is_negative() {
        let m = icosphere(Point3d::ORIGIN, 1.0, 2);
        let g = WallGraph::build(&m, None).unwrap();
        for i in 0..g.nnodes() {
            assert!(g.concavity(i) < 0.0, "node {} not convex", i);
        }
    }

    #[test]
    fn hemisphere_with_symmetry_marks_rim_nodes() {
        let (mut m, rim) = hemisphere_y(Point3d::ORIGIN, 1.0, 2);
        // hemisphere is open along the rim; with the symmetry plane at
        // y = 0 this is accepted
        let g = WallGraph::build(&m, Some(SymmetrySpec { y0: 0.0 })).unwrap();
        for &i in &rim {
            assert!(g.is_symmetry_node(i as usize));
            assert_relative_eq!(g.normal(i as usize).y, 0.0, epsilon = 1e-14);
        }
        // the same mesh without symmetry is rejected
        assert!(WallGraph::build(&m, None).is_err());
        // and shifting a rim node barely off the plane is ambiguous
        let shift = m.vertex(rim[0]);
        m.vertices_mut()[rim[0] as usize] = Point3d::new(shift.x, 1e-5, shift.z);
        assert!(matches!(
            WallGraph::build(&m, Some(SymmetrySpec { y0: 0.0 })),
            Err(MeshError::SymmetryViolated { .. }) | Err(MeshError::OpenEdgeOffPlane { .. })
        ));
    }

    #[test]
    fn ellipsoid_enclosure() {
        let m = icosphere(Point3d::ORIGIN, 1.0, 1);
        assert!(ellipsoid_encloses(
            &m,
            Point3d::ORIGIN,
            Vec3::new(2.0, 2.0, 2.0)
        ));
        assert!(!ellipsoid_encloses(
            &m,
            Point3d::ORIGIN,
            Vec3::new(2.0, 0.5, 2.0)
        ));
    }
}
