use prism_types::Vec3;
use shell_gen::Shell;

use crate::backend::Bounds;

/// Per-node box bounds on the envelope offsets.
///
/// In the local frame `{d, t1, t2}` of each node the feasible box is
/// `[h_min, h_max]` along the extrusion direction and `[-s, s]` in the two
/// tangential directions. The solver works on Cartesian components, so the
/// oriented box is projected onto the axes: tight where the frame aligns
/// with the axes, looser otherwise.
pub fn offset_bounds(shell: &Shell, h_min_frac: f64, h_max_frac: f64, tangent_frac: f64) -> Bounds {
    let n = shell.directions.len();
    let mut lower = vec![0.0; 3 * n];
    let mut upper = vec![0.0; 3 * n];

    for i in 0..n {
        let d = shell.directions[i];
        let h = shell.total_height[i];
        let t1 = d.any_orthonormal();
        let t2 = d.cross(&t1);

        let alpha = [h_min_frac * h, h_max_frac * h];
        let beta = tangent_frac * h;

        let mut lo = Vec3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut hi = Vec3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &a in &alpha {
            for &b in &[-beta, beta] {
                for &c in &[-beta, beta] {
                    let corner = d * a + t1 * b + t2 * c;
                    lo = lo.min_components(&corner);
                    hi = hi.max_components(&corner);
                }
            }
        }

        lower[3 * i] = lo.x;
        lower[3 * i + 1] = lo.y;
        lower[3 * i + 2] = lo.z;
        upper[3 * i] = hi.x;
        upper[3 * i + 1] = hi.y;
        upper[3 * i + 2] = hi.z;
    }

    Bounds { lower, upper }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_types::Point3d;
    use shell_gen::{ShellBuilder, ShellParams};
    use wall_mesh::{primitives::icosphere, WallGraph};

    #[test]
    fn initial_guess_lies_inside_the_box() {
        let m = icosphere(Point3d::ORIGIN, 1.0, 1);
        let g = WallGraph::build(&m, None).unwrap();
        let shell = ShellBuilder::new(&m, &g, ShellParams::default()).build();
        let bounds = offset_bounds(&shell, 0.2, 1.5, 0.5);
        for i in 0..shell.directions.len() {
            let x0 = shell.directions[i] * shell.total_height[i];
            for (k, c) in x0.to_array().iter().enumerate() {
                assert!(
                    bounds.lower[3 * i + k] <= *c && *c <= bounds.upper[3 * i + k],
                    "node {} axis {} out of box",
                    i,
                    k
                );
            }
        }
    }

    #[test]
    fn box_excludes_the_origin_along_the_direction() {
        let m = icosphere(Point3d::ORIGIN, 1.0, 1);
        let g = WallGraph::build(&m, None).unwrap();
        let shell = ShellBuilder::new(&m, &g, ShellParams::default()).build();
        let bounds = offset_bounds(&shell, 0.2, 1.5, 0.0);
        // with zero tangential slack, a zero offset violates the lower
        // height bound on at least one axis for every node
        for i in 0..shell.directions.len() {
            let inside = (0..3).all(|k| {
                bounds.lower[3 * i + k] <= 0.0 && 0.0 <= bounds.upper[3 * i + k]
            });
            assert!(!inside, "zero offset inside box of node {}", i);
        }
    }
}
