use tracing::debug;

use crate::backend::{Bounds, NlpBackend, NlpProblem, NlpSolution};

/// Augmented-Lagrangian solver over box bounds.
///
/// Inequality constraints `g_k <= 0` enter through the standard shifted
/// quadratic penalty: `L(x) = f(x) + 1/(2 rho) * sum_k (max(0, lambda_k +
/// rho g_k)^2 - lambda_k^2)`. Each outer iteration minimizes `L` with
/// projected gradient descent and Armijo backtracking, then updates the
/// multipliers; the penalty weight grows whenever the violation fails to
/// shrink sufficiently.
#[derive(Debug, Clone)]
pub struct AugLagSolver {
    pub outer_iterations: usize,
    pub inner_iterations: usize,
    pub tolerance: f64,
    pub rho_initial: f64,
    pub rho_growth: f64,
}

impl Default for AugLagSolver {
    fn default() -> Self {
        Self {
            outer_iterations: 20,
            inner_iterations: 80,
            tolerance: 1e-6,
            rho_initial: 10.0,
            rho_growth: 4.0,
        }
    }
}

impl AugLagSolver {
    fn lagrangian(
        &self,
        problem: &dyn NlpProblem,
        x: &[f64],
        g: &mut [f64],
        lambda: &[f64],
        rho: f64,
    ) -> f64 {
        let f = problem.objective(x);
        problem.constraints(x, g);
        let mut penalty = 0.0;
        for (&gk, &lk) in g.iter().zip(lambda) {
            let s = (lk + rho * gk).max(0.0);
            penalty += s * s - lk * lk;
        }
        f + penalty / (2.0 * rho)
    }

    fn lagrangian_gradient(
        &self,
        problem: &dyn NlpProblem,
        x: &[f64],
        g: &[f64],
        lambda: &[f64],
        rho: f64,
        grad: &mut [f64],
        weights: &mut [f64],
    ) {
        problem.objective_gradient(x, grad);
        for ((w, &gk), &lk) in weights.iter_mut().zip(g).zip(lambda) {
            *w = (lk + rho * gk).max(0.0);
        }
        problem.weighted_constraint_gradient(x, weights, grad);
    }
}

impl NlpBackend for AugLagSolver {
    fn minimize(&self, problem: &dyn NlpProblem, x0: &[f64], bounds: &Bounds) -> NlpSolution {
        let n = problem.num_vars();
        let m = problem.num_constraints();
        debug_assert_eq!(x0.len(), n);

        let mut x = x0.to_vec();
        bounds.project(&mut x);

        let mut lambda = vec![0.0; m];
        let mut rho = self.rho_initial;
        let mut g = vec![0.0; m];
        let mut grad = vec![0.0; n];
        let mut weights = vec![0.0; m];

        // best iterate bookkeeping: prefer feasible with lowest objective,
        // otherwise least-infeasible
        let mut best_x = x.clone();
        problem.constraints(&x, &mut g);
        let mut best_violation = max_violation(&g);
        let mut best_objective = problem.objective(&x);

        let mut converged = false;
        let mut outer_done = 0;

        for outer in 0..self.outer_iterations {
            outer_done = outer + 1;

            // inner minimization of the augmented Lagrangian
            let mut fx = self.lagrangian(problem, &x, &mut g, &lambda, rho);
            let mut step = 1.0;
            for _inner in 0..self.inner_iterations {
                self.lagrangian_gradient(problem, &x, &g, &lambda, rho, &mut grad, &mut weights);

                // projected gradient: zero out components pushing into an
                // active bound
                let mut pg_norm_sq = 0.0;
                for i in 0..n {
                    let at_lower = x[i] <= bounds.lower[i] && grad[i] > 0.0;
                    let at_upper = x[i] >= bounds.upper[i] && grad[i] < 0.0;
                    if !(at_lower || at_upper) {
                        pg_norm_sq += grad[i] * grad[i];
                    }
                }
                if pg_norm_sq.sqrt() < self.tolerance * (1.0 + fx.abs()) {
                    break;
                }

                // Armijo backtracking along the projected steepest descent
                let mut accepted = false;
                for _ in 0..30 {
                    let mut trial: Vec<f64> =
                        x.iter().zip(&grad).map(|(&xi, &gi)| xi - step * gi).collect();
                    bounds.project(&mut trial);
                    let ft = self.lagrangian(problem, &trial, &mut g, &lambda, rho);
                    let decrease: f64 = x
                        .iter()
                        .zip(&trial)
                        .zip(&grad)
                        .map(|((&xi, &ti), &gi)| gi * (xi - ti))
                        .sum();
                    if ft <= fx - 1e-4 * decrease {
                        x = trial;
                        fx = ft;
                        accepted = true;
                        step = (step * 2.0).min(1e3);
                        break;
                    }
                    step *= 0.5;
                }
                if !accepted {
                    break;
                }
            }

            // multiplier update and convergence test
            problem.constraints(&x, &mut g);
            let violation = max_violation(&g);
            let objective = problem.objective(&x);

            let improves = if violation <= self.tolerance {
                best_violation > self.tolerance || objective < best_objective
            } else {
                violation < best_violation
            };
            if improves {
                best_x.copy_from_slice(&x);
                best_violation = violation;
                best_objective = objective;
            }

            self.lagrangian_gradient(problem, &x, &g, &lambda, rho, &mut grad, &mut weights);
            let mut pg_norm_sq = 0.0;
            for i in 0..n {
                let at_lower = x[i] <= bounds.lower[i] && grad[i] > 0.0;
                let at_upper = x[i] >= bounds.upper[i] && grad[i] < 0.0;
                if !(at_lower || at_upper) {
                    pg_norm_sq += grad[i] * grad[i];
                }
            }
            debug!(
                outer,
                objective, violation, rho, "augmented-Lagrangian outer iteration"
            );

            if violation <= self.tolerance && pg_norm_sq.sqrt() <= self.tolerance * 10.0 {
                converged = true;
                break;
            }

            let prev_violation = best_violation.max(self.tolerance);
            for (lk, &gk) in lambda.iter_mut().zip(&g) {
                *lk = (*lk + rho * gk).max(0.0);
            }
            if violation > 0.25 * prev_violation {
                rho *= self.rho_growth;
            }
        }

        NlpSolution {
            objective: best_objective,
            max_violation: best_violation,
            x: best_x,
            outer_iterations: outer_done,
            converged,
        }
    }
}

fn max_violation(g: &[f64]) -> f64 {
    g.iter().cloned().fold(0.0f64, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// minimize (x - 2)^2 subject to x <= 1 (as g = x - 1 <= 0), x in [0, 5]
    struct Toy;

    impl NlpProblem for Toy {
        fn num_vars(&self) -> usize {
            1
        }
        fn num_constraints(&self) -> usize {
            1
        }
        fn objective(&self, x: &[f64]) -> f64 {
            (x[0] - 2.0).powi(2)
        }
        fn objective_gradient(&self, x: &[f64], grad: &mut [f64]) {
            grad[0] = 2.0 * (x[0] - 2.0);
        }
        fn constraints(&self, x: &[f64], out: &mut [f64]) {
            out[0] = x[0] - 1.0;
        }
        fn weighted_constraint_gradient(&self, _x: &[f64], weights: &[f64], grad: &mut [f64]) {
            grad[0] += weights[0];
        }
    }

    #[test]
    fn constrained_minimum_lands_on_constraint_boundary() {
        let solver = AugLagSolver::default();
        let bounds = Bounds {
            lower: vec![0.0],
            upper: vec![5.0],
        };
        let sol = solver.minimize(&Toy, &[0.2], &bounds);
        assert!(sol.converged, "did not converge: {:?}", sol);
        assert!((sol.x[0] - 1.0).abs() < 1e-3, "x = {}", sol.x[0]);
    }

    /// unconstrained quadratic bowl with an inactive constraint
    struct Bowl;

    impl NlpProblem for Bowl {
        fn num_vars(&self) -> usize {
            2
        }
        fn num_constraints(&self) -> usize {
            1
        }
        fn objective(&self, x: &[f64]) -> f64 {
            x[0] * x[0] + 4.0 * x[1] * x[1]
        }
        fn objective_gradient(&self, x: &[f64], grad: &mut [f64]) {
            grad[0] = 2.0 * x[0];
            grad[1] = 8.0 * x[1];
        }
        fn constraints(&self, x: &[f64], out: &mut [f64]) {
            out[0] = x[0] + x[1] - 100.0;
        }
        fn weighted_constraint_gradient(&self, _x: &[f64], weights: &[f64], grad: &mut [f64]) {
            grad[0] += weights[0];
            grad[1] += weights[0];
        }
    }

    #[test]
    fn inactive_constraint_does_not_bias_the_minimum() {
        let solver = AugLagSolver::default();
        let bounds = Bounds::unbounded(2);
        let sol = solver.minimize(&Bowl, &[3.0, -2.0], &bounds);
        assert!(sol.converged);
        assert!(sol.x[0].abs() < 1e-3 && sol.x[1].abs() < 1e-3, "{:?}", sol.x);
    }

    #[test]
    fn bounds_are_respected() {
        let solver = AugLagSolver::default();
        let bounds = Bounds {
            lower: vec![1.5, -10.0],
            upper: vec![10.0, 10.0],
        };
        let sol = solver.minimize(&Bowl, &[3.0, 2.0], &bounds);
        assert!(sol.x[0] >= 1.5 - 1e-12);
        assert!((sol.x[0] - 1.5).abs() < 1e-6);
    }
}
