use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::TetError;
use crate::ingest::TetMesh;

/// Derives the per-node target edge length field for the metric-driven
/// refinement pass.
///
/// The field starts as the mean incident edge length on the pass-1 tet
/// mesh and is smoothed so it grows outward by at most the configured
/// factor per neighbor hop, which is what turns the abrupt
/// envelope-to-farfield size jump into a geometric progression.
#[derive(Debug, Clone)]
pub struct TetRefiner {
    /// Allowed edge-length growth per neighbor hop, > 1.
    pub growth_factor: f64,
    /// Smoothing sweeps over the node adjacency.
    pub smoothing_iterations: usize,
}

impl Default for TetRefiner {
    fn default() -> Self {
        Self {
            growth_factor: 1.3,
            smoothing_iterations: 8,
        }
    }
}

impl TetRefiner {
    pub fn new(growth_factor: f64, smoothing_iterations: usize) -> Self {
        if growth_factor > 1.0 && growth_factor < 1.21 {
            warn!(growth_factor, "tet growth factor very small");
        } else if growth_factor > 1.6 {
            warn!(growth_factor, "tet growth factor very large");
        }
        Self {
            growth_factor,
            smoothing_iterations,
        }
    }

    /// Compute the smoothed target edge length per node.
    pub fn edge_lengths(&self, mesh: &TetMesh) -> Vec<f64> {
        let nv = mesh.nnodes();
        let edges = mesh.edges();

        // CSR neighbor map
        let mut off = vec![0u32; nv + 1];
        for &(a, b) in &edges {
            off[a as usize + 1] += 1;
            off[b as usize + 1] += 1;
        }
        for i in 0..nv {
            off[i + 1] += off[i];
        }
        let mut idx = vec![0u32; off[nv] as usize];
        let mut cursor = off.clone();
        for &(a, b) in &edges {
            idx[cursor[a as usize] as usize] = b;
            cursor[a as usize] += 1;
            idx[cursor[b as usize] as usize] = a;
            cursor[b as usize] += 1;
        }

        // initial field: mean incident edge length
        let mut a: Vec<f64> = (0..nv)
            .into_par_iter()
            .with_min_len(1024)
            .map(|i| {
                let nbrs = &idx[off[i] as usize..off[i + 1] as usize];
                if nbrs.is_empty() {
                    return 0.0;
                }
                let p = mesh.nodes[i];
                let sum: f64 = nbrs.iter().map(|&j| p.distance_to(&mesh.nodes[j as usize])).sum();
                sum / nbrs.len() as f64
            })
            .collect();

        // growth-limited smoothing
        let xpf = self.growth_factor;
        for _ in 0..self.smoothing_iterations {
            let b: Vec<f64> = (0..nv)
                .into_par_iter()
                .with_min_len(1024)
                .map(|i| {
                    let nbrs = &idx[off[i] as usize..off[i + 1] as usize];
                    if nbrs.is_empty() {
                        return a[i];
                    }
                    let ai = a[i];
                    let sum: f64 = nbrs.iter().map(|&j| ai.min(xpf * a[j as usize])).sum();
                    0.5 * ai + 0.5 * sum / nbrs.len() as f64
                })
                .collect();
            a = b;
        }
        a
    }

    /// Write the sizing field in the mesher's `.mtr` format: a header with
    /// the node count and one value per line.
    pub fn write_metric_file(&self, path: &Path, values: &[f64]) -> Result<(), TetError> {
        let file = File::create(path)?;
        let mut w = BufWriter::new(file);
        writeln!(w, "{} 1", values.len())?;
        for v in values {
            writeln!(w, "{:.12e}", v)?;
        }
        w.flush()?;
        info!(path = %path.display(), nodes = values.len(), "wrote metric file");
        Ok(())
    }
}
