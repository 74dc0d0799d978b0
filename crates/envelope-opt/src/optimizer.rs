use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use prism_types::Point3d;
use wall_mesh::TriMesh;

use shell_gen::Shell;

use crate::auglag::AugLagSolver;
use crate::backend::{Bounds, NlpBackend, NlpProblem};
use crate::bounds::offset_bounds;
use crate::constraints::EnvelopeConstraints;
use crate::objective::EnvelopeObjective;

/// Envelope optimization parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptParams {
    /// Outer passes, each rebuilding the triangle-pair constraint list.
    pub pair_rebuilds: usize,
    /// Solver iteration cap per pass.
    pub iterations: usize,
    pub tolerance: f64,
    pub w_normal: f64,
    pub w_skew: f64,
    /// Feasibility margins of the two constraint classes.
    pub eps_inv: f64,
    pub eps_vol: f64,
    /// Height bounds relative to the shell height.
    pub h_min_frac: f64,
    pub h_max_frac: f64,
    pub tangent_frac: f64,
    /// Pair search margin as a multiple of the mean stack height.
    pub search_margin_factor: f64,
}

impl Default for OptParams {
    fn default() -> Self {
        Self {
            pair_rebuilds: 3,
            iterations: 20,
            tolerance: 1e-6,
            w_normal: 1.0,
            w_skew: 0.5,
            eps_inv: 0.05,
            eps_vol: 0.05,
            h_min_frac: 0.2,
            h_max_frac: 1.5,
            tangent_frac: 0.5,
            search_margin_factor: 1.0,
        }
    }
}

/// Diagnostic outcome of the optimization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptStatus {
    /// False when the solver stalled and the last feasible iterate was
    /// kept; downstream phases continue either way.
    pub converged: bool,
    pub objective: f64,
    pub max_violation: f64,
    pub constraint_count: usize,
}

struct EnvelopeNlp<'a> {
    objective: &'a EnvelopeObjective,
    constraints: &'a EnvelopeConstraints,
}

impl NlpProblem for EnvelopeNlp<'_> {
    fn num_vars(&self) -> usize {
        3 * self.objective.num_nodes()
    }
    fn num_constraints(&self) -> usize {
        self.constraints.len()
    }
    fn objective(&self, x: &[f64]) -> f64 {
        self.objective.value(x)
    }
    fn objective_gradient(&self, x: &[f64], grad: &mut [f64]) {
        self.objective.gradient(x, grad);
    }
    fn constraints(&self, x: &[f64], out: &mut [f64]) {
        self.constraints.evaluate(x, out);
    }
    fn weighted_constraint_gradient(&self, x: &[f64], weights: &[f64], grad: &mut [f64]) {
        self.constraints.weighted_gradient(x, weights, grad);
    }
}

/// Refines the envelope produced by shell generation.
pub struct EnvelopeOptimizer<'a> {
    wall: &'a TriMesh,
    shell: &'a Shell,
    params: OptParams,
}

impl<'a> EnvelopeOptimizer<'a> {
    pub fn new(wall: &'a TriMesh, shell: &'a Shell, params: OptParams) -> Self {
        Self {
            wall,
            shell,
            params,
        }
    }

    /// Run the optimization and return the envelope node positions plus a
    /// status record. A solver failure is recorded, not raised: the last
    /// feasible iterate is still a usable envelope on benign geometries.
    pub fn run(&self) -> (Vec<Point3d>, OptStatus) {
        let p = &self.params;
        let n = self.wall.nvertices();

        let mut x: Vec<f64> = Vec::with_capacity(3 * n);
        for i in 0..n {
            let offset = self.shell.directions[i] * self.shell.total_height[i];
            x.extend_from_slice(&offset.to_array());
        }

        let mean_height =
            self.shell.total_height.iter().sum::<f64>() / self.shell.total_height.len() as f64;
        let margin = p.search_margin_factor * mean_height;

        let objective = EnvelopeObjective::new(self.wall, p.w_normal, p.w_skew);
        let bounds: Bounds = offset_bounds(self.shell, p.h_min_frac, p.h_max_frac, p.tangent_frac);

        let solver = AugLagSolver {
            outer_iterations: p.iterations,
            tolerance: p.tolerance,
            ..Default::default()
        };

        let mut status = OptStatus {
            converged: true,
            objective: 0.0,
            max_violation: 0.0,
            constraint_count: 0,
        };

        for pass in 0..p.pair_rebuilds {
            let constraints =
                EnvelopeConstraints::build(self.wall, &x, margin, p.eps_inv, p.eps_vol);
            let nlp = EnvelopeNlp {
                objective: &objective,
                constraints: &constraints,
            };
            let solution = solver.minimize(&nlp, &x, &bounds);
            info!(
                pass,
                constraints = constraints.len(),
                objective = solution.objective,
                violation = solution.max_violation,
                converged = solution.converged,
                "envelope optimization pass"
            );
            x = solution.x;
            status = OptStatus {
                converged: solution.converged,
                objective: solution.objective,
                max_violation: solution.max_violation,
                constraint_count: constraints.len(),
            };
            if solution.converged && pass + 1 < p.pair_rebuilds {
                // rebuild the pair list once more only if the envelope
                // moved enough to change the near set; a converged pass
                // with no pair constraints cannot
                if constraints.len() == constraints.edge_count() {
                    break;
                }
            }
        }

        if !status.converged {
            warn!(
                violation = status.max_violation,
                "envelope optimizer did not converge; keeping last feasible iterate"
            );
        }

        let positions = (0..n)
            .map(|i| {
                let p0 = self.wall.vertex(i as u32);
                Point3d::new(p0.x + x[3 * i], p0.y + x[3 * i + 1], p0.z + x[3 * i + 2])
            })
            .collect();
        (positions, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shell_gen::{ShellBuilder, ShellParams};
    use wall_mesh::{primitives::icosphere, WallGraph};

    #[test]
    fn sphere_envelope_stays_feasible_and_outside() {
        let m = icosphere(Point3d::ORIGIN, 1.0, 1);
        let g = WallGraph::build(&m, None).unwrap();
        let shell = ShellBuilder::new(
            &m,
            &g,
            ShellParams {
                first_layer_height: 0.02,
                num_layers: 4,
                growth_ratio: 1.3,
                ..Default::default()
            },
        )
        .build();

        let opt = EnvelopeOptimizer::new(&m, &shell, OptParams::default());
        let (positions, status) = opt.run();

        assert_eq!(positions.len(), m.nvertices());
        assert!(status.max_violation <= 1e-4, "violation {}", status.max_violation);
        for (i, q) in positions.iter().enumerate() {
            let r = q.to_vec3().length();
            assert!(r > 1.0, "node {} at radius {} not outside the wall", i, r);
        }
    }
}
