use tracing::{debug, info, warn};

use prism_types::{Point3d, Vec3};
use wall_mesh::{TriMesh, WallGraph};

use crate::critical::critical_sweep;
use crate::directions::{clamp_to_cone, project_symmetry, smooth_directions};
use crate::heights::{initial_first_heights, laplacian_pass, smooth_field};
use crate::params::ShellParams;

/// Per-node extrusion data: the result of shell generation.
#[derive(Debug, Clone)]
pub struct Shell {
    /// Unit extrusion direction per wall node.
    pub directions: Vec<Vec3>,
    /// First-layer thickness per wall node.
    pub first_height: Vec<f64>,
    /// Total stack height per wall node.
    pub total_height: Vec<f64>,
    /// Nodes where non-inversion could not be satisfied; the envelope
    /// optimizer is expected to repair these.
    pub infeasible: Vec<u32>,
    pub growth_ratio: f64,
    pub num_layers: usize,
}

impl Shell {
    /// The envelope surface: every wall node offset along its direction,
    /// with the wall's connectivity and tags reused unchanged.
    pub fn envelope(&self, wall: &TriMesh) -> TriMesh {
        let vertices: Vec<Point3d> = wall
            .vertices()
            .iter()
            .enumerate()
            .map(|(i, p)| *p + self.directions[i] * self.total_height[i])
            .collect();
        TriMesh::from_parts(vertices, wall.triangles().to_vec(), wall.tags().to_vec())
    }

    /// Offset of layer `k` at node `i` along the node's direction.
    pub fn layer_offset(&self, i: usize, k: usize) -> f64 {
        let r = self.growth_ratio;
        if (r - 1.0).abs() < 1e-12 {
            self.first_height[i] * k as f64
        } else {
            self.first_height[i] * (r.powi(k as i32) - 1.0) / (r - 1.0)
        }
    }
}

/// Builds the shell: direction smoothing, height init and smoothing, the
/// critical-point sweep, and the final combined Laplacian passes.
pub struct ShellBuilder<'a> {
    mesh: &'a TriMesh,
    graph: &'a WallGraph,
    params: ShellParams,
}

impl<'a> ShellBuilder<'a> {
    pub fn new(mesh: &'a TriMesh, graph: &'a WallGraph, params: ShellParams) -> Self {
        Self {
            mesh,
            graph,
            params,
        }
    }

    pub fn build(&self) -> Shell {
        let p = &self.params;
        let graph = self.graph;

        let mut dirs = smooth_directions(graph, p.normal_iterations, p.max_normal_angle);
        debug!(iterations = p.normal_iterations, "directions smoothed");

        let mut first = initial_first_heights(graph, p);
        smooth_field(graph, &mut first, p.height_iterations);
        let mut total: Vec<f64> = first.iter().map(|&h1| p.stack_height(h1)).collect();

        let outcome = critical_sweep(
            self.mesh,
            &dirs,
            &mut total,
            &mut first,
            p.max_crit_iterations,
        );
        info!(
            sweeps = outcome.sweeps,
            violations = outcome.violations,
            "critical-point sweep finished"
        );

        // final combined smoothing on directions and heights
        let cos_max = p.max_normal_angle.cos();
        for _ in 0..p.laplace_iterations {
            let next_dirs: Vec<Vec3> = (0..graph.nnodes())
                .map(|i| {
                    let nbrs = graph.neighbors(i);
                    if nbrs.is_empty() {
                        return dirs[i];
                    }
                    let mut mean = dirs[i];
                    for &j in nbrs {
                        mean += dirs[j as usize];
                    }
                    let mean = mean.normalized_or(dirs[i]);
                    clamp_to_cone(mean, graph.normal(i), cos_max)
                })
                .collect();
            dirs = next_dirs;
            total = laplacian_pass(graph, &total);
            first = laplacian_pass(graph, &first);
        }
        project_symmetry(graph, &mut dirs);

        // smoothing may have reintroduced local inversions; one last sweep
        let outcome = critical_sweep(self.mesh, &dirs, &mut total, &mut first, 4);
        if outcome.violations > 0 {
            warn!(
                violations = outcome.violations,
                nodes = outcome.infeasible.len(),
                "non-inversion unsatisfied on some rays; envelope optimizer will attempt repair"
            );
        }

        Shell {
            directions: dirs,
            first_height: first,
            total_height: total,
            infeasible: outcome.infeasible,
            growth_ratio: p.growth_ratio,
            num_layers: p.num_layers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use wall_mesh::primitives::icosphere;

    #[test]
    fn sphere_shell_extrudes_radially() {
        let m = icosphere(Point3d::ORIGIN, 1.0, 2);
        let g = WallGraph::build(&m, None).unwrap();
        let params = ShellParams {
            first_layer_height: 0.01,
            num_layers: 4,
            growth_ratio: 1.3,
            ..Default::default()
        };
        let shell = ShellBuilder::new(&m, &g, params).build();
        assert!(shell.infeasible.is_empty());
        for (i, d) in shell.directions.iter().enumerate() {
            // on a sphere the smoothed direction stays near-radial
            let radial = m.vertex(i as u32).to_vec3().normalized().unwrap();
            assert!(d.dot(&radial) > 0.95, "node {} drifted", i);
            assert!(shell.total_height[i] > 0.0);
        }
    }

    #[test]
    fn envelope_shares_wall_connectivity() {
        let m = icosphere(Point3d::ORIGIN, 1.0, 1);
        let g = WallGraph::build(&m, None).unwrap();
        let shell = ShellBuilder::new(&m, &g, ShellParams::default()).build();
        let env = shell.envelope(&m);
        assert_eq!(env.ntriangles(), m.ntriangles());
        assert_eq!(env.triangles(), m.triangles());
        assert_eq!(env.nvertices(), m.nvertices());
        // every envelope node lies outside the wall node
        for i in 0..m.nvertices() {
            assert!(
                env.vertex(i as u32).to_vec3().length() > m.vertex(i as u32).to_vec3().length()
            );
        }
    }

    #[test]
    fn layer_offsets_are_monotone() {
        let m = icosphere(Point3d::ORIGIN, 1.0, 1);
        let g = WallGraph::build(&m, None).unwrap();
        let shell = ShellBuilder::new(&m, &g, ShellParams::default()).build();
        for i in 0..m.nvertices() {
            for k in 0..shell.num_layers {
                assert!(shell.layer_offset(i, k + 1) > shell.layer_offset(i, k));
            }
        }
        let l = shell.num_layers;
        for i in 0..m.nvertices() {
            // the last layer reaches close to the (sweep-adjusted) total
            let top = shell.layer_offset(i, l);
            assert_relative_eq!(top, shell.total_height[i], max_relative = 1e-9);
        }
    }
}
