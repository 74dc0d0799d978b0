use serde::{Deserialize, Serialize};

/// User-facing shell generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellParams {
    /// Absolute wall-normal thickness of the first prism layer.
    pub first_layer_height: f64,
    /// Geometric growth ratio between consecutive layers, > 1.
    pub growth_ratio: f64,
    /// Number of prism sub-layers in the stack.
    pub num_layers: usize,
    /// Laplacian passes over the first-layer height field.
    pub height_iterations: usize,
    /// Direction smoothing passes.
    pub normal_iterations: usize,
    /// Maximum critical-point sweeps over the edge set.
    pub max_crit_iterations: usize,
    /// Final combined smoothing passes on directions and heights.
    pub laplace_iterations: usize,
    /// Maximum angle (radians) between a direction and the wall normal.
    pub max_normal_angle: f64,
    /// Strength of the curvature-based first-layer reduction.
    pub curvature_scaling: f64,
    /// Strength of the concavity-based first-layer reduction.
    pub concavity_scaling: f64,
}

impl Default for ShellParams {
    fn default() -> Self {
        Self {
            first_layer_height: 1e-3,
            growth_ratio: 1.3,
            num_layers: 4,
            height_iterations: 5,
            normal_iterations: 50,
            max_crit_iterations: 99,
            laplace_iterations: 5,
            max_normal_angle: 30.0f64.to_radians(),
            curvature_scaling: 1.0,
            concavity_scaling: 2.0,
        }
    }
}

impl ShellParams {
    /// Total stack height for a first-layer thickness `h1`:
    /// `h1 * (r^L - 1) / (r - 1)`.
    pub fn stack_height(&self, h1: f64) -> f64 {
        let r = self.growth_ratio;
        let l = self.num_layers as i32;
        if (r - 1.0).abs() < 1e-12 {
            h1 * l as f64
        } else {
            h1 * (r.powi(l) - 1.0) / (r - 1.0)
        }
    }

    /// Offset of layer `k` (0..=L) from the wall, for first-layer `h1`.
    pub fn layer_offset(&self, h1: f64, k: usize) -> f64 {
        let r = self.growth_ratio;
        if (r - 1.0).abs() < 1e-12 {
            h1 * k as f64
        } else {
            h1 * (r.powi(k as i32) - 1.0) / (r - 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn stack_height_matches_layer_sum() {
        let p = ShellParams {
            first_layer_height: 0.02,
            growth_ratio: 1.3,
            num_layers: 4,
            ..Default::default()
        };
        let mut sum = 0.0;
        for k in 0..4 {
            sum += 0.02 * 1.3f64.powi(k);
        }
        assert_relative_eq!(p.stack_height(0.02), sum, epsilon = 1e-14);
        assert_relative_eq!(p.layer_offset(0.02, 4), sum, epsilon = 1e-14);
        assert_relative_eq!(p.layer_offset(0.02, 0), 0.0);
    }

    #[test]
    fn unit_ratio_degenerates_to_linear_stack() {
        let p = ShellParams {
            growth_ratio: 1.0,
            num_layers: 5,
            ..Default::default()
        };
        assert_relative_eq!(p.stack_height(0.1), 0.5, epsilon = 1e-12);
    }
}
