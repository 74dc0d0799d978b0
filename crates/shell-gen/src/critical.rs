use prism_types::{Point3d, Vec3};
use wall_mesh::TriMesh;

/// Non-inversion test for one extrusion quad.
///
/// The quad is `(pa, pb, qb, qa)`: the wall edge and the two extruded
/// endpoints. It passes when the top edge has not flipped against the
/// bottom edge and all four corners are convex with respect to the quad's
/// diagonal normal. A crossing of the two extruded segments shows up as a
/// bowtie and fails the corner test.
pub fn edge_quad_ok(pa: Point3d, pb: Point3d, qa: Point3d, qb: Point3d) -> bool {
    let bottom = pb - pa;
    let top = qb - qa;
    if top.dot(&bottom) <= 0.0 {
        return false;
    }

    // diagonal normal of the (near-planar) quad
    let w = (qb - pa).cross(&(qa - pb));
    if w.length_squared() < 1e-30 {
        return false;
    }

    let corners = [pa, pb, qb, qa];
    for k in 0..4 {
        let prev = corners[(k + 3) % 4];
        let cur = corners[k];
        let next = corners[(k + 1) % 4];
        let turn = (cur - prev).cross(&(next - cur));
        if turn.dot(&w) <= 0.0 {
            return false;
        }
    }
    true
}

/// Result of the critical-point sweep.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    /// Sweeps actually performed.
    pub sweeps: usize,
    /// Edges still violating non-inversion after the last sweep.
    pub violations: usize,
    /// Nodes incident to a violating edge.
    pub infeasible: Vec<u32>,
}

/// Visit every wall edge and multiplicatively reduce the stack heights of
/// both endpoints until the extrusion quad becomes convex, down to a floor
/// fraction of the pre-sweep height.
///
/// Heights (total and first-layer, which scale together) are modified in
/// place.
pub fn critical_sweep(
    mesh: &TriMesh,
    dirs: &[Vec3],
    total: &mut [f64],
    first: &mut [f64],
    max_sweeps: usize,
) -> SweepOutcome {
    const REDUCTION: f64 = 0.8;
    const FLOOR: f64 = 0.05;

    let edges = mesh.edges();
    let floor: Vec<f64> = total.iter().map(|h| FLOOR * h).collect();

    let mut sweeps = 0;
    let mut violations = 0;
    for _ in 0..max_sweeps {
        sweeps += 1;
        violations = 0;
        for &(a, b) in &edges {
            let (ia, ib) = (a as usize, b as usize);
            let mut guard = 0;
            while !quad_ok(mesh, dirs, total, a, b) && guard < 64 {
                let can_a = total[ia] * REDUCTION >= floor[ia];
                let can_b = total[ib] * REDUCTION >= floor[ib];
                if !can_a && !can_b {
                    break;
                }
                if can_a {
                    total[ia] *= REDUCTION;
                    first[ia] *= REDUCTION;
                }
                if can_b {
                    total[ib] *= REDUCTION;
                    first[ib] *= REDUCTION;
                }
                guard += 1;
            }
            if !quad_ok(mesh, dirs, total, a, b) {
                violations += 1;
            }
        }
        if violations == 0 {
            break;
        }
    }

    let mut infeasible = Vec::new();
    if violations > 0 {
        for &(a, b) in &edges {
            if !quad_ok(mesh, dirs, total, a, b) {
                infeasible.push(a);
                infeasible.push(b);
            }
        }
        infeasible.sort_unstable();
        infeasible.dedup();
    }

    SweepOutcome {
        sweeps,
        violations,
        infeasible,
    }
}

fn quad_ok(mesh: &TriMesh, dirs: &[Vec3], total: &[f64], a: u32, b: u32) -> bool {
    let pa = mesh.vertex(a);
    let pb = mesh.vertex(b);
    let qa = pa + dirs[a as usize] * total[a as usize];
    let qb = pb + dirs[b as usize] * total[b as usize];
    edge_quad_ok(pa, pb, qa, qb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parallel_extrusion_is_convex() {
        let pa = Point3d::new(0.0, 0.0, 0.0);
        let pb = Point3d::new(1.0, 0.0, 0.0);
        let qa = Point3d::new(0.0, 0.0, 1.0);
        let qb = Point3d::new(1.0, 0.0, 1.0);
        assert!(edge_quad_ok(pa, pb, qa, qb));
    }

    #[test]
    fn crossing_rays_are_rejected() {
        // rays tilted toward each other far enough to cross below the top
        let pa = Point3d::new(0.0, 0.0, 0.0);
        let pb = Point3d::new(1.0, 0.0, 0.0);
        let qa = Point3d::new(1.2, 0.0, 1.0);
        let qb = Point3d::new(-0.2, 0.0, 1.0);
        assert!(!edge_quad_ok(pa, pb, qa, qb));
    }

    #[test]
    fn flipped_top_edge_is_rejected() {
        let pa = Point3d::new(0.0, 0.0, 0.0);
        let pb = Point3d::new(1.0, 0.0, 0.0);
        // top edge runs backwards
        let qa = Point3d::new(0.9, 0.0, 1.0);
        let qb = Point3d::new(0.1, 0.0, 1.0);
        assert!(!edge_quad_ok(pa, pb, qa, qb));
    }

    #[test]
    fn shorter_heights_restore_convexity() {
        // strongly converging directions: full height crosses, short does not
        let pa = Point3d::new(0.0, 0.0, 0.0);
        let pb = Point3d::new(1.0, 0.0, 0.0);
        let da = Vec3::new(0.8, 0.0, 0.6);
        let db = Vec3::new(-0.8, 0.0, 0.6);
        let h_long = 2.0;
        let h_short = 0.2;
        assert!(!edge_quad_ok(pa, pb, pa + da * h_long, pb + db * h_long));
        assert!(edge_quad_ok(pa, pb, pa + da * h_short, pb + db * h_short));
    }
}
