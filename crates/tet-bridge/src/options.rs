/// Assembly of the option string handed to the external mesher.
#[derive(Debug, Clone)]
pub struct TetgenOptions {
    /// User options, or the pass-dependent default.
    pub base: String,
    /// Per-tet volume cap derived from `MaxGlobalEdgeLength`; 0 disables.
    pub max_global_edge_length: f64,
    /// Steiner point cap; 0 disables.
    pub max_steiner_points: u64,
}

impl TetgenOptions {
    /// Default base options: quality meshing from a PLC, with the
    /// area-constraint switch only when a nearfield region is present.
    pub fn default_base(with_nearfield: bool) -> &'static str {
        if with_nearfield {
            "-pq1.2a"
        } else {
            "-pq1.2"
        }
    }

    /// Option string for the first (boundary) pass.
    pub fn first_pass(&self) -> String {
        let mut opts = self.base.clone();
        if self.max_global_edge_length > 0.0 && !opts.contains('a') {
            // tetgen takes a volume bound; a regular tet of edge L has
            // volume L^3 / (6 sqrt 2) ~ 0.118 L^3
            let max_vol = 0.1 * self.max_global_edge_length.powi(3);
            opts.push_str(&format!("a{:.6}", max_vol));
        }
        if self.max_steiner_points > 0 {
            opts.push_str(&format!("S{}", self.max_steiner_points));
        }
        opts
    }

    /// Option string for the metric-driven refinement pass: re-mesh the
    /// previous output, respecting the `.mtr` sizing and keeping the
    /// boundary intact.
    pub fn refine_pass(&self) -> String {
        let mut opts = String::from("-rqmY");
        if self.base.contains('V') {
            opts.push('V');
        }
        if self.max_steiner_points > 0 {
            opts.push_str(&format!("S{}", self.max_steiner_points));
        }
        opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_constraint_appended_once() {
        let o = TetgenOptions {
            base: "-pq1.2".into(),
            max_global_edge_length: 2.0,
            max_steiner_points: 0,
        };
        let s = o.first_pass();
        assert!(s.starts_with("-pq1.2a0.8"), "{}", s);

        // user already chose an area switch: leave it alone
        let o = TetgenOptions {
            base: "-pq1.2a0.5".into(),
            max_global_edge_length: 2.0,
            max_steiner_points: 0,
        };
        assert_eq!(o.first_pass(), "-pq1.2a0.5");
    }

    #[test]
    fn steiner_cap_and_verbosity_carry_into_refinement() {
        let o = TetgenOptions {
            base: "-pq1.2V".into(),
            max_global_edge_length: 0.0,
            max_steiner_points: 500,
        };
        assert_eq!(o.first_pass(), "-pq1.2VS500");
        assert_eq!(o.refine_pass(), "-rqmYVS500");
    }
}
