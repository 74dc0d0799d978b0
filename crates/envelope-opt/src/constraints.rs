use rayon::prelude::*;

use prism_types::{Point3d, Vec3};
use wall_mesh::{TriMesh, TriangleBins};

/// One inequality constraint `g(x) <= 0` on the envelope offsets.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Non-inversion of the extrusion quad over a wall edge: the signed
    /// quad area (against its initial orientation) must not collapse.
    /// `g = eps - A(x) / A0`.
    EdgeQuad {
        a: u32,
        b: u32,
        ref_normal: Vec3,
        inv_area0: f64,
    },
    /// Envelope self-intersection guard for a near triangle pair: the
    /// signed tet volume of one triangle against a vertex of the other
    /// must stay a fraction of its initial value.
    /// `g = eps - vol(x) / vol0`.
    PairVolume {
        tri: [u32; 3],
        vertex: u32,
        inv_vol0: f64,
    },
}

/// The full constraint set plus the fixed wall data needed to evaluate it.
pub struct EnvelopeConstraints {
    wall_points: Vec<Point3d>,
    constraints: Vec<Constraint>,
    pub eps_inv: f64,
    pub eps_vol: f64,
}

impl EnvelopeConstraints {
    /// Assemble edge non-inversion constraints for every wall edge and
    /// pair-volume constraints for every near, opposing envelope triangle
    /// pair found by the bin search at the current offsets `x0`.
    pub fn build(wall: &TriMesh, x0: &[f64], search_margin: f64, eps_inv: f64, eps_vol: f64) -> Self {
        let wall_points = wall.vertices().to_vec();
        let envelope = envelope_mesh(wall, x0);

        let mut constraints = Vec::new();

        for &(a, b) in &wall.edges() {
            let pa = wall_points[a as usize];
            let pb = wall_points[b as usize];
            let qa = envelope.vertex(a);
            let qb = envelope.vertex(b);
            let w = (qb - pa).cross(&(qa - pb));
            let area0 = 0.5 * w.length();
            if area0 < 1e-30 {
                continue;
            }
            constraints.push(Constraint::EdgeQuad {
                a,
                b,
                ref_normal: w / w.length(),
                inv_area0: 1.0 / area0,
            });
        }

        let bins = TriangleBins::build(&envelope, 0.0);
        for (s, t) in bins.near_pairs(&envelope, search_margin) {
            let ns = envelope.face_normal(s as usize);
            let nt = envelope.face_normal(t as usize);
            // only opposing pairs can collide; nearby same-side triangles
            // always evaluate near zero volume and would spuriously bind
            if ns.dot(&nt) >= 0.0 {
                continue;
            }
            for (tri_idx, other) in [(s, t), (t, s)] {
                let tri = envelope.triangle(tri_idx as usize);
                for &v in &envelope.triangle(other as usize) {
                    let vol0 = tet_volume(
                        envelope.vertex(tri[0]),
                        envelope.vertex(tri[1]),
                        envelope.vertex(tri[2]),
                        envelope.vertex(v),
                    );
                    if vol0 <= 1e-30 {
                        continue;
                    }
                    constraints.push(Constraint::PairVolume {
                        tri,
                        vertex: v,
                        inv_vol0: 1.0 / vol0,
                    });
                }
            }
        }

        Self {
            wall_points,
            constraints,
            eps_inv,
            eps_vol,
        }
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.constraints
            .iter()
            .filter(|c| matches!(c, Constraint::EdgeQuad { .. }))
            .count()
    }

    fn envelope_vertex(&self, x: &[f64], i: u32) -> Point3d {
        let p = self.wall_points[i as usize];
        let o = 3 * i as usize;
        Point3d::new(p.x + x[o], p.y + x[o + 1], p.z + x[o + 2])
    }

    pub fn evaluate(&self, x: &[f64], out: &mut [f64]) {
        debug_assert_eq!(out.len(), self.constraints.len());
        out.par_iter_mut()
            .with_min_len(1024)
            .enumerate()
            .for_each(|(k, o)| *o = self.evaluate_one(x, k));
    }

    fn evaluate_one(&self, x: &[f64], k: usize) -> f64 {
        match &self.constraints[k] {
            Constraint::EdgeQuad {
                a,
                b,
                ref_normal,
                inv_area0,
            } => {
                let pa = self.wall_points[*a as usize];
                let pb = self.wall_points[*b as usize];
                let qa = self.envelope_vertex(x, *a);
                let qb = self.envelope_vertex(x, *b);
                let area = 0.5 * (qb - pa).cross(&(qa - pb)).dot(ref_normal);
                self.eps_inv - area * inv_area0
            }
            Constraint::PairVolume {
                tri,
                vertex,
                inv_vol0,
            } => {
                let a = self.envelope_vertex(x, tri[0]);
                let b = self.envelope_vertex(x, tri[1]);
                let c = self.envelope_vertex(x, tri[2]);
                let v = self.envelope_vertex(x, *vertex);
                self.eps_vol - tet_volume(a, b, c, v) * inv_vol0
            }
        }
    }

    /// Accumulate `sum_k weights[k] * grad g_k` into `grad`.
    pub fn weighted_gradient(&self, x: &[f64], weights: &[f64], grad: &mut [f64]) {
        let n = grad.len();
        let acc = (0..self.constraints.len())
            .into_par_iter()
            .with_min_len(1024)
            .fold(
                || vec![0.0f64; n],
                |mut local, k| {
                    if weights[k] != 0.0 {
                        self.accumulate_one(x, k, weights[k], &mut local);
                    }
                    local
                },
            )
            .reduce(
                || vec![0.0f64; n],
                |mut a, b| {
                    for (ai, bi) in a.iter_mut().zip(&b) {
                        *ai += bi;
                    }
                    a
                },
            );
        for (gi, ai) in grad.iter_mut().zip(&acc) {
            *gi += ai;
        }
    }

    fn accumulate_one(&self, x: &[f64], k: usize, weight: f64, grad: &mut [f64]) {
        match &self.constraints[k] {
            Constraint::EdgeQuad {
                a,
                b,
                ref_normal,
                inv_area0,
            } => {
                let pa = self.wall_points[*a as usize];
                let pb = self.wall_points[*b as usize];
                let qa = self.envelope_vertex(x, *a);
                let qb = self.envelope_vertex(x, *b);
                // A = 0.5 * (d1 x d2) . w0 with d1 = qb - pa, d2 = qa - pb;
                // dA/dqa = 0.5 (w0 x d1), dA/dqb = 0.5 (d2 x w0)
                let d1 = qb - pa;
                let d2 = qa - pb;
                let scale = -weight * inv_area0 * 0.5;
                add_vec(grad, *a, ref_normal.cross(&d1) * scale);
                add_vec(grad, *b, d2.cross(ref_normal) * scale);
            }
            Constraint::PairVolume {
                tri,
                vertex,
                inv_vol0,
            } => {
                let a = self.envelope_vertex(x, tri[0]);
                let b = self.envelope_vertex(x, tri[1]);
                let c = self.envelope_vertex(x, tri[2]);
                let v = self.envelope_vertex(x, *vertex);
                let m = (b - a).cross(&(c - a));
                let va = v - a;
                let scale = -weight * inv_vol0 / 6.0;
                // d vol/dv = m/6; vertex gradients rotate m by the
                // opposite edge
                add_vec(grad, *vertex, m * scale);
                add_vec(
                    grad,
                    tri[0],
                    ((b.to_vec3() - c.to_vec3()).cross(&va) - m) * scale,
                );
                add_vec(grad, tri[1], (c - a).cross(&va) * scale);
                add_vec(grad, tri[2], (a - b).cross(&va) * scale);
            }
        }
    }
}

fn envelope_mesh(wall: &TriMesh, x: &[f64]) -> TriMesh {
    let vertices: Vec<Point3d> = wall
        .vertices()
        .iter()
        .enumerate()
        .map(|(i, p)| Point3d::new(p.x + x[3 * i], p.y + x[3 * i + 1], p.z + x[3 * i + 2]))
        .collect();
    TriMesh::from_parts(vertices, wall.triangles().to_vec(), wall.tags().to_vec())
}

/// Signed volume of the tetrahedron (a, b, c, v), positive when `v` lies
/// on the normal side of the oriented triangle.
pub fn tet_volume(a: Point3d, b: Point3d, c: Point3d, v: Point3d) -> f64 {
    (b - a).cross(&(c - a)).dot(&(v - a)) / 6.0
}

fn add_vec(grad: &mut [f64], node: u32, v: Vec3) {
    let o = 3 * node as usize;
    grad[o] += v.x;
    grad[o + 1] += v.y;
    grad[o + 2] += v.z;
}
