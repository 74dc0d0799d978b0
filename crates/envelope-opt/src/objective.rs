use rayon::prelude::*;

use prism_types::{Point3d, Vec3};
use wall_mesh::TriMesh;

/// Envelope quality functional, summed over envelope triangles.
///
/// Per triangle `Q = w_normal * (1 - m̂ · n_wall) + w_skew * S`, where `m̂`
/// is the unit envelope-triangle normal, `n_wall` the (fixed) wall-triangle
/// unit normal, and `S` the variance of the three edge stretch factors
/// around their mean. Both terms and their gradients are assembled triangle
/// by triangle into per-node slots.
pub struct EnvelopeObjective {
    wall_points: Vec<Point3d>,
    triangles: Vec<[u32; 3]>,
    wall_normals: Vec<Vec3>,
    /// Inverse wall edge lengths per triangle, edges (a,b), (b,c), (c,a).
    inv_edge_len: Vec<[f64; 3]>,
    pub w_normal: f64,
    pub w_skew: f64,
}

impl EnvelopeObjective {
    pub fn new(wall: &TriMesh, w_normal: f64, w_skew: f64) -> Self {
        let triangles = wall.triangles().to_vec();
        let wall_normals = (0..wall.ntriangles())
            .map(|i| wall.face_normal(i))
            .collect();
        let inv_edge_len = triangles
            .iter()
            .map(|t| {
                let p: [Point3d; 3] = [
                    wall.vertex(t[0]),
                    wall.vertex(t[1]),
                    wall.vertex(t[2]),
                ];
                [
                    1.0 / p[0].distance_to(&p[1]).max(1e-300),
                    1.0 / p[1].distance_to(&p[2]).max(1e-300),
                    1.0 / p[2].distance_to(&p[0]).max(1e-300),
                ]
            })
            .collect();
        Self {
            wall_points: wall.vertices().to_vec(),
            triangles,
            wall_normals,
            inv_edge_len,
            w_normal,
            w_skew,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.wall_points.len()
    }

    fn envelope_vertex(&self, x: &[f64], i: u32) -> Point3d {
        let p = self.wall_points[i as usize];
        let o = 3 * i as usize;
        Point3d::new(p.x + x[o], p.y + x[o + 1], p.z + x[o + 2])
    }

    pub fn value(&self, x: &[f64]) -> f64 {
        (0..self.triangles.len())
            .into_par_iter()
            .with_min_len(1024)
            .map(|ti| self.triangle_value(x, ti))
            .sum()
    }

    fn triangle_value(&self, x: &[f64], ti: usize) -> f64 {
        let [ia, ib, ic] = self.triangles[ti];
        let a = self.envelope_vertex(x, ia);
        let b = self.envelope_vertex(x, ib);
        let c = self.envelope_vertex(x, ic);

        let m = (b - a).cross(&(c - a));
        let mlen = m.length().max(1e-300);
        let t_normal = 1.0 - m.dot(&self.wall_normals[ti]) / mlen;

        let inv = self.inv_edge_len[ti];
        let s = [
            (b - a).length() * inv[0],
            (c - b).length() * inv[1],
            (a - c).length() * inv[2],
        ];
        let mean = (s[0] + s[1] + s[2]) / 3.0;
        let t_skew = s.iter().map(|&si| (si - mean) * (si - mean)).sum::<f64>();

        self.w_normal * t_normal + self.w_skew * t_skew
    }

    /// Overwrite `grad` with the analytic gradient of `value`.
    pub fn gradient(&self, x: &[f64], grad: &mut [f64]) {
        let n = grad.len();
        let acc = (0..self.triangles.len())
            .into_par_iter()
            .with_min_len(1024)
            .fold(
                || vec![0.0f64; n],
                |mut local, ti| {
                    self.accumulate_triangle_gradient(x, ti, &mut local);
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
        grad.copy_from_slice(&acc);
    }

    fn accumulate_triangle_gradient(&self, x: &[f64], ti: usize, grad: &mut [f64]) {
        let [ia, ib, ic] = self.triangles[ti];
        let a = self.envelope_vertex(x, ia);
        let b = self.envelope_vertex(x, ib);
        let c = self.envelope_vertex(x, ic);
        let nw = self.wall_normals[ti];

        // normal term: d/dv of -(m . n)/|m| with m = (b-a) x (c-a).
        // A perturbation da changes m by da x (b-c); analogous rotations
        // for b and c.
        let m = (b - a).cross(&(c - a));
        let mlen = m.length().max(1e-300);
        let mhat = m / mlen;
        let mdotn = m.dot(&nw);

        let edge_bc = b.to_vec3() - c.to_vec3();
        let edge_ca = c.to_vec3() - a.to_vec3();
        let edge_ab = a.to_vec3() - b.to_vec3();

        let dn_da = normal_term_grad(&edge_bc, &nw, &mhat, mlen, mdotn);
        let dn_db = normal_term_grad(&edge_ca, &nw, &mhat, mlen, mdotn);
        let dn_dc = normal_term_grad(&edge_ab, &nw, &mhat, mlen, mdotn);

        // skew term: S = sum (s_e - mean)^2; since the deviations sum to
        // zero, dS/ds_e = 2 (s_e - mean).
        let inv = self.inv_edge_len[ti];
        let e0 = b - a;
        let e1 = c - b;
        let e2 = a - c;
        let l0 = e0.length().max(1e-300);
        let l1 = e1.length().max(1e-300);
        let l2 = e2.length().max(1e-300);
        let s = [l0 * inv[0], l1 * inv[1], l2 * inv[2]];
        let mean = (s[0] + s[1] + s[2]) / 3.0;
        let ds = [
            2.0 * (s[0] - mean) * inv[0],
            2.0 * (s[1] - mean) * inv[1],
            2.0 * (s[2] - mean) * inv[2],
        ];
        let u0 = e0 / l0;
        let u1 = e1 / l1;
        let u2 = e2 / l2;

        let skew_da = u0 * (-ds[0]) + u2 * ds[2];
        let skew_db = u0 * ds[0] + u1 * (-ds[1]);
        let skew_dc = u1 * ds[1] + u2 * (-ds[2]);

        add_vec(grad, ia, dn_da * self.w_normal + skew_da * self.w_skew);
        add_vec(grad, ib, dn_db * self.w_normal + skew_db * self.w_skew);
        add_vec(grad, ic, dn_dc * self.w_normal + skew_dc * self.w_skew);
    }
}

/// Gradient of `1 - (m . n)/|m|` with respect to a vertex whose
/// perturbation rotates `m` by `dv x edge`.
fn normal_term_grad(edge: &Vec3, n: &Vec3, mhat: &Vec3, mlen: f64, mdotn: f64) -> Vec3 {
    // d(m.n) = dv . (edge x n); d|m| = dv . (edge x mhat)
    let d_mdotn = edge.cross(n);
    let d_mlen = edge.cross(mhat);
    -(d_mdotn * mlen - d_mlen * mdotn) / (mlen * mlen)
}

fn add_vec(grad: &mut [f64], node: u32, v: Vec3) {
    let o = 3 * node as usize;
    grad[o] += v.x;
    grad[o + 1] += v.y;
    grad[o + 2] += v.z;
}
