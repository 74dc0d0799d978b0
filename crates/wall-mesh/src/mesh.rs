use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use prism_types::{Aabb, Point3d, Vec3};

use crate::error::MeshError;
use crate::search::PointGrid;

/// An indexed triangle surface with a per-triangle integer tag.
///
/// Triangles store indices into the vertex array; all adjacency is derived
/// on demand, so vertex insertion never invalidates the mesh itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriMesh {
    vertices: Vec<Point3d>,
    triangles: Vec<[u32; 3]>,
    tags: Vec<i32>,
}

impl TriMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(vertices: Vec<Point3d>, triangles: Vec<[u32; 3]>, tags: Vec<i32>) -> Self {
        debug_assert_eq!(triangles.len(), tags.len());
        Self {
            vertices,
            triangles,
            tags,
        }
    }

    pub fn nvertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn ntriangles(&self) -> usize {
        self.triangles.len()
    }

    pub fn vertex(&self, i: u32) -> Point3d {
        self.vertices[i as usize]
    }

    pub fn vertices(&self) -> &[Point3d] {
        &self.vertices
    }

    pub fn vertices_mut(&mut self) -> &mut [Point3d] {
        &mut self.vertices
    }

    pub fn triangle(&self, i: usize) -> [u32; 3] {
        self.triangles[i]
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn tag(&self, i: usize) -> i32 {
        self.tags[i]
    }

    pub fn tags(&self) -> &[i32] {
        &self.tags
    }

    pub fn add_vertex(&mut self, p: Point3d) -> u32 {
        let idx = self.vertices.len() as u32;
        self.vertices.push(p);
        idx
    }

    pub fn add_triangle(&mut self, a: u32, b: u32, c: u32) -> usize {
        self.add_tagged_triangle(a, b, c, 0)
    }

    pub fn add_tagged_triangle(&mut self, a: u32, b: u32, c: u32, tag: i32) -> usize {
        let idx = self.triangles.len();
        self.triangles.push([a, b, c]);
        self.tags.push(tag);
        idx
    }

    /// Overwrite every triangle tag with `tag`.
    pub fn set_tag_all(&mut self, tag: i32) {
        for t in self.tags.iter_mut() {
            *t = tag;
        }
    }

    pub fn max_tag(&self) -> i32 {
        self.tags.iter().copied().max().unwrap_or(0)
    }

    /// Verify that every triangle references existing vertices.
    pub fn validate_indices(&self) -> Result<(), MeshError> {
        if self.triangles.is_empty() {
            return Err(MeshError::EmptyMesh);
        }
        let n = self.vertices.len();
        for (i, t) in self.triangles.iter().enumerate() {
            for &v in t {
                if v as usize >= n {
                    return Err(MeshError::IndexOutOfRange {
                        index: i,
                        vertex: v,
                        vertex_count: n,
                    });
                }
            }
        }
        Ok(())
    }

    /// Unnormalized face normal; its length is twice the triangle area.
    pub fn face_cross(&self, i: usize) -> Vec3 {
        let [a, b, c] = self.triangles[i];
        let pa = self.vertices[a as usize];
        let pb = self.vertices[b as usize];
        let pc = self.vertices[c as usize];
        (pb - pa).cross(&(pc - pa))
    }

    pub fn face_normal(&self, i: usize) -> Vec3 {
        self.face_cross(i).normalized_or(Vec3::Z)
    }

    pub fn face_area(&self, i: usize) -> f64 {
        0.5 * self.face_cross(i).length()
    }

    pub fn face_center(&self, i: usize) -> Point3d {
        let [a, b, c] = self.triangles[i];
        let pa = self.vertices[a as usize];
        let pb = self.vertices[b as usize];
        let pc = self.vertices[c as usize];
        Point3d::new(
            (pa.x + pb.x + pc.x) / 3.0,
            (pa.y + pb.y + pc.y) / 3.0,
            (pa.z + pb.z + pc.z) / 3.0,
        )
    }

    /// Flip the orientation of every triangle.
    pub fn reverse(&mut self) {
        for t in self.triangles.iter_mut() {
            t.swap(1, 2);
        }
    }

    /// Append another mesh, offsetting its indices past our vertices.
    pub fn append(&mut self, other: &TriMesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        for (t, &tag) in other.triangles.iter().zip(&other.tags) {
            self.triangles.push([t[0] + offset, t[1] + offset, t[2] + offset]);
            self.tags.push(tag);
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_points(&self.vertices)
    }

    /// All undirected edges, each listed once with `a < b`.
    pub fn edges(&self) -> Vec<(u32, u32)> {
        let mut edges: Vec<(u32, u32)> = Vec::with_capacity(self.triangles.len() * 3);
        for t in &self.triangles {
            for k in 0..3 {
                let a = t[k];
                let b = t[(k + 1) % 3];
                edges.push((a.min(b), a.max(b)));
            }
        }
        edges.sort_unstable();
        edges.dedup();
        edges
    }

    /// Count of incident triangles per undirected edge.
    pub fn edge_use_counts(&self) -> HashMap<(u32, u32), u32> {
        let mut counts = HashMap::with_capacity(self.triangles.len() * 3 / 2);
        for t in &self.triangles {
            for k in 0..3 {
                let a = t[k];
                let b = t[(k + 1) % 3];
                *counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Mean and maximum edge length over the whole mesh.
    pub fn edge_stats(&self) -> (f64, f64) {
        let edges = self.edges();
        if edges.is_empty() {
            return (0.0, 0.0);
        }
        let mut sum = 0.0;
        let mut max = 0.0f64;
        for &(a, b) in &edges {
            let l = self.vertices[a as usize].distance_to(&self.vertices[b as usize]);
            sum += l;
            max = max.max(l);
        }
        (sum / edges.len() as f64, max)
    }

    /// Closed loops of boundary vertices (edges used by exactly one triangle),
    /// each loop ordered by walking edge connectivity.
    pub fn boundary_loops(&self) -> Vec<Vec<u32>> {
        let counts = self.edge_use_counts();
        let mut next: HashMap<u32, Vec<u32>> = HashMap::new();
        for (&(a, b), &c) in &counts {
            if c == 1 {
                next.entry(a).or_default().push(b);
                next.entry(b).or_default().push(a);
            }
        }

        let mut visited: HashMap<(u32, u32), bool> = HashMap::new();
        let mut loops = Vec::new();
        let mut starts: Vec<u32> = next.keys().copied().collect();
        starts.sort_unstable();

        for &start in &starts {
            let neighbors = &next[&start];
            for &first in neighbors {
                let key = (start.min(first), start.max(first));
                if *visited.get(&key).unwrap_or(&false) {
                    continue;
                }
                let mut ring = vec![start];
                let mut prev = start;
                let mut cur = first;
                visited.insert(key, true);
                loop {
                    if cur == start {
                        break;
                    }
                    ring.push(cur);
                    let nbrs = &next[&cur];
                    let mut advanced = false;
                    for &n in nbrs {
                        let k = (cur.min(n), cur.max(n));
                        if n != prev && !*visited.get(&k).unwrap_or(&false) {
                            visited.insert(k, true);
                            prev = cur;
                            cur = n;
                            advanced = true;
                            break;
                        }
                    }
                    if !advanced {
                        break;
                    }
                }
                if ring.len() >= 3 {
                    loops.push(ring);
                }
            }
        }
        loops
    }

    /// Merge vertices closer than `tol` and drop triangles that became
    /// degenerate. Returns the number of removed vertices.
    pub fn cleanup(&mut self, tol: f64) -> usize {
        if self.vertices.is_empty() {
            return 0;
        }
        let grid = PointGrid::build(&self.vertices, tol.max(1e-300));
        let mut remap: Vec<u32> = (0..self.vertices.len() as u32).collect();
        for i in 0..self.vertices.len() {
            if remap[i] != i as u32 {
                continue;
            }
            for j in grid.query_sphere(&self.vertices[i], tol) {
                if j as usize > i && remap[j as usize] == j {
                    remap[j as usize] = i as u32;
                }
            }
        }

        // Compact the vertex array.
        let mut new_index = vec![u32::MAX; self.vertices.len()];
        let mut kept = Vec::with_capacity(self.vertices.len());
        for i in 0..self.vertices.len() {
            if remap[i] == i as u32 {
                new_index[i] = kept.len() as u32;
                kept.push(self.vertices[i]);
            }
        }
        for i in 0..self.vertices.len() {
            if remap[i] != i as u32 {
                new_index[i] = new_index[remap[i] as usize];
            }
        }
        let removed = self.vertices.len() - kept.len();
        self.vertices = kept;

        let mut tris = Vec::with_capacity(self.triangles.len());
        let mut tags = Vec::with_capacity(self.tags.len());
        for (t, &tag) in self.triangles.iter().zip(&self.tags) {
            let a = new_index[t[0] as usize];
            let b = new_index[t[1] as usize];
            let c = new_index[t[2] as usize];
            if a != b && b != c && a != c {
                tris.push([a, b, c]);
                tags.push(tag);
            }
        }
        self.triangles = tris;
        self.tags = tags;
        removed
    }
}
