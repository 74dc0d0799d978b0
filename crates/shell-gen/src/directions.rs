use rayon::prelude::*;

use prism_types::Vec3;
use wall_mesh::WallGraph;

/// Initialize extrusion directions from the wall normals and smooth them
/// by neighbor averaging, keeping each direction inside the cone of
/// half-angle `max_angle` around its wall normal.
pub fn smooth_directions(graph: &WallGraph, iterations: usize, max_angle: f64) -> Vec<Vec3> {
    let n = graph.nnodes();
    let mut dirs: Vec<Vec3> = (0..n).map(|i| graph.normal(i)).collect();
    let cos_max = max_angle.cos();

    for _ in 0..iterations {
        let next: Vec<Vec3> = (0..n)
            .into_par_iter()
            .with_min_len(1024)
            .map(|i| {
                let nbrs = graph.neighbors(i);
                if nbrs.is_empty() {
                    return dirs[i];
                }
                let mut mean = Vec3::ZERO;
                for &j in nbrs {
                    mean += dirs[j as usize];
                }
                let mean = mean.normalized_or(dirs[i]);
                clamp_to_cone(mean, graph.normal(i), cos_max)
            })
            .collect();
        dirs = next;
    }

    project_symmetry(graph, &mut dirs);
    dirs
}

/// Rotate `d` back onto the cone boundary around `n` when it has drifted
/// past the maximum angle. Both inputs are unit vectors.
pub fn clamp_to_cone(d: Vec3, n: Vec3, cos_max: f64) -> Vec3 {
    let c = d.dot(&n);
    if c >= cos_max {
        return d;
    }
    let tangent = d.reject_from_unit(&n);
    match tangent.normalized() {
        Some(t) => n * cos_max + t * (1.0 - cos_max * cos_max).sqrt(),
        // antiparallel or degenerate: fall back to the normal itself
        None => n,
    }
}

/// Re-project directions of symmetry nodes into the symmetry plane.
pub fn project_symmetry(graph: &WallGraph, dirs: &mut [Vec3]) {
    if graph.symmetry().is_none() {
        return;
    }
    for (i, d) in dirs.iter_mut().enumerate() {
        if graph.is_symmetry_node(i) {
            let mut v = *d;
            v.y = 0.0;
            *d = v.normalized_or(graph.normal(i));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn clamp_keeps_vectors_inside_cone() {
        let n = Vec3::Z;
        let cos_max = 30.0f64.to_radians().cos();
        let inside = Vec3::new(0.1, 0.0, 1.0).normalized().unwrap();
        assert_eq!(clamp_to_cone(inside, n, cos_max), inside);

        let outside = Vec3::new(1.0, 0.0, 0.2).normalized().unwrap();
        let clamped = clamp_to_cone(outside, n, cos_max);
        assert_relative_eq!(clamped.dot(&n), cos_max, epsilon = 1e-12);
        assert_relative_eq!(clamped.length(), 1.0, epsilon = 1e-12);
        // stays in the plane spanned by n and the original direction
        assert_relative_eq!(clamped.y, 0.0, epsilon = 1e-12);
        assert!(clamped.x > 0.0);
    }

    #[test]
    fn antiparallel_direction_falls_back_to_normal() {
        let n = Vec3::Z;
        let clamped = clamp_to_cone(-n, n, 0.5);
        assert_eq!(clamped, n);
    }
}
