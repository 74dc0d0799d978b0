use std::collections::{HashMap, HashSet};

use prism_types::{Aabb, Point3d};

use crate::mesh::TriMesh;

/// Uniform hash grid over points for fixed-radius neighbor queries.
///
/// Cells are cubes of the construction cell size; queries scan the cell
/// neighborhood covering the query sphere, so they stay correct for radii
/// larger than the cell size (at linearly growing cost).
#[derive(Debug)]
pub struct PointGrid {
    cell: f64,
    cells: HashMap<(i64, i64, i64), Vec<u32>>,
    points: Vec<Point3d>,
}

impl PointGrid {
    pub fn build(points: &[Point3d], cell: f64) -> Self {
        let cell = if cell > 0.0 { cell } else { 1.0 };
        let mut cells: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
        for (i, p) in points.iter().enumerate() {
            cells
                .entry(Self::key(p, cell))
                .or_default()
                .push(i as u32);
        }
        Self {
            cell,
            cells,
            points: points.to_vec(),
        }
    }

    fn key(p: &Point3d, cell: f64) -> (i64, i64, i64) {
        (
            (p.x / cell).floor() as i64,
            (p.y / cell).floor() as i64,
            (p.z / cell).floor() as i64,
        )
    }

    /// Indices of all points within `radius` of `p`.
    pub fn query_sphere(&self, p: &Point3d, radius: f64) -> Vec<u32> {
        let mut found = Vec::new();
        let r2 = radius * radius;
        let reach = (radius / self.cell).ceil() as i64;
        let (cx, cy, cz) = Self::key(p, self.cell);
        for dx in -reach..=reach {
            for dy in -reach..=reach {
                for dz in -reach..=reach {
                    if let Some(bucket) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) {
                        for &i in bucket {
                            if self.points[i as usize].distance_squared_to(p) <= r2 {
                                found.push(i);
                            }
                        }
                    }
                }
            }
        }
        found.sort_unstable();
        found
    }

    /// The nearest point within `radius`, if any.
    pub fn nearest_within(&self, p: &Point3d, radius: f64) -> Option<(u32, f64)> {
        self.query_sphere(p, radius)
            .into_iter()
            .map(|i| (i, self.points[i as usize].distance_to(p)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Static uniform binning of triangle bounding boxes.
///
/// Built once per optimizer outer iteration; `near_pairs` returns the
/// candidate triangle pairs whose inflated boxes overlap, which keeps the
/// surviving pair count linear in the triangle count for well-shaped
/// surfaces.
#[derive(Debug)]
pub struct TriangleBins {
    cell: f64,
    bins: HashMap<(i64, i64, i64), Vec<u32>>,
    boxes: Vec<Aabb>,
}

impl TriangleBins {
    pub fn build(mesh: &TriMesh, cell_hint: f64) -> Self {
        let (mean_edge, _) = mesh.edge_stats();
        let cell = if cell_hint > 0.0 {
            cell_hint
        } else {
            (2.0 * mean_edge).max(1e-12)
        };
        let mut bins: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
        let mut boxes = Vec::with_capacity(mesh.ntriangles());
        for i in 0..mesh.ntriangles() {
            let [a, b, c] = mesh.triangle(i);
            let bb = Aabb::from_points([
                &mesh.vertex(a),
                &mesh.vertex(b),
                &mesh.vertex(c),
            ]);
            for key in Self::keys_for(&bb, cell) {
                bins.entry(key).or_default().push(i as u32);
            }
            boxes.push(bb);
        }
        Self { cell, bins, boxes }
    }

    fn keys_for(bb: &Aabb, cell: f64) -> Vec<(i64, i64, i64)> {
        let lo = (
            (bb.lo.x / cell).floor() as i64,
            (bb.lo.y / cell).floor() as i64,
            (bb.lo.z / cell).floor() as i64,
        );
        let hi = (
            (bb.hi.x / cell).floor() as i64,
            (bb.hi.y / cell).floor() as i64,
            (bb.hi.z / cell).floor() as i64,
        );
        let mut keys = Vec::new();
        for x in lo.0..=hi.0 {
            for y in lo.1..=hi.1 {
                for z in lo.2..=hi.2 {
                    keys.push((x, y, z));
                }
            }
        }
        keys
    }

    /// Candidate pairs `(i, j)` with `i < j` whose boxes, inflated by
    /// `margin`, overlap. Pairs of triangles sharing a vertex are skipped.
    pub fn near_pairs(&self, mesh: &TriMesh, margin: f64) -> Vec<(u32, u32)> {
        let mut seen: HashSet<(u32, u32)> = HashSet::new();
        let mut pairs = Vec::new();
        for bucket in self.bins.values() {
            for (k, &i) in bucket.iter().enumerate() {
                for &j in &bucket[k + 1..] {
                    let (i, j) = (i.min(j), i.max(j));
                    if i == j || !seen.insert((i, j)) {
                        continue;
                    }
                    let bi = self.boxes[i as usize].inflated(margin);
                    if !bi.overlaps(&self.boxes[j as usize]) {
                        continue;
                    }
                    let ti = mesh.triangle(i as usize);
                    let tj = mesh.triangle(j as usize);
                    if ti.iter().any(|v| tj.contains(v)) {
                        continue;
                    }
                    pairs.push((i, j));
                }
            }
        }
        pairs.sort_unstable();
        pairs
    }

    pub fn cell_size(&self) -> f64 {
        self.cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_types::Point3d;

    #[test]
    fn grid_finds_neighbors_across_cell_borders() {
        let pts = vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(0.09, 0.0, 0.0),
            Point3d::new(5.0, 0.0, 0.0),
        ];
        let grid = PointGrid::build(&pts, 0.05);
        let near = grid.query_sphere(&pts[0], 0.1);
        assert_eq!(near, vec![0, 1]);
        let (nearest, d) = grid.nearest_within(&pts[1], 0.2).unwrap();
        assert_eq!(nearest, 1);
        assert!(d < 1e-12);
    }

    #[test]
    fn bins_skip_pairs_sharing_a_vertex() {
        let mut m = TriMesh::new();
        let a = m.add_vertex(Point3d::new(0.0, 0.0, 0.0));
        let b = m.add_vertex(Point3d::new(1.0, 0.0, 0.0));
        let c = m.add_vertex(Point3d::new(0.0, 1.0, 0.0));
        let d = m.add_vertex(Point3d::new(1.0, 1.0, 0.0));
        m.add_triangle(a, b, c);
        m.add_triangle(b, d, c);
        let bins = TriangleBins::build(&m, 0.0);
        assert!(bins.near_pairs(&m, 0.1).is_empty());
    }

    #[test]
    fn bins_report_disjoint_close_triangles() {
        let mut m = TriMesh::new();
        let a = m.add_vertex(Point3d::new(0.0, 0.0, 0.0));
        let b = m.add_vertex(Point3d::new(1.0, 0.0, 0.0));
        let c = m.add_vertex(Point3d::new(0.0, 1.0, 0.0));
        let a2 = m.add_vertex(Point3d::new(0.0, 0.0, 0.01));
        let b2 = m.add_vertex(Point3d::new(1.0, 0.0, 0.01));
        let c2 = m.add_vertex(Point3d::new(0.0, 1.0, 0.01));
        m.add_triangle(a, b, c);
        m.add_triangle(a2, b2, c2);
        let bins = TriangleBins::build(&m, 0.0);
        assert_eq!(bins.near_pairs(&m, 0.1), vec![(0, 1)]);
    }
}
