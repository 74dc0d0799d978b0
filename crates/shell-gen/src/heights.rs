use rayon::prelude::*;

use wall_mesh::WallGraph;

use crate::params::ShellParams;

/// Initial first-layer thickness per node: the user target reduced where
/// the wall is strongly curved or locally concave.
pub fn initial_first_heights(graph: &WallGraph, params: &ShellParams) -> Vec<f64> {
    (0..graph.nnodes())
        .into_par_iter()
        .with_min_len(1024)
        .map(|i| {
            let kappa = graph.curvature(i);
            let gamma = graph.concavity(i).max(0.0);
            let scale = (1.0 + params.curvature_scaling * kappa)
                * (1.0 + params.concavity_scaling * gamma);
            params.first_layer_height / scale
        })
        .collect()
}

/// One Laplacian pass: half the node value, half the neighbor mean.
pub fn laplacian_pass(graph: &WallGraph, field: &[f64]) -> Vec<f64> {
    (0..graph.nnodes())
        .into_par_iter()
        .with_min_len(1024)
        .map(|i| {
            let nbrs = graph.neighbors(i);
            if nbrs.is_empty() {
                return field[i];
            }
            let sum: f64 = nbrs.iter().map(|&j| field[j as usize]).sum();
            0.5 * field[i] + 0.5 * sum / nbrs.len() as f64
        })
        .collect()
}

/// Smooth a scalar field in place for the given number of passes.
pub fn smooth_field(graph: &WallGraph, field: &mut Vec<f64>, passes: usize) {
    for _ in 0..passes {
        *field = laplacian_pass(graph, field);
    }
}
