//! Envelope optimization.
//!
//! Refines the per-node envelope offsets produced by shell generation by
//! solving a bound-constrained nonlinear program: the objective penalizes
//! normal deviation and skew of the envelope triangles, the inequality
//! constraints forbid extrusion-quad inversion and envelope
//! self-intersection. All gradients are analytic; finite differences stall
//! the solver at the boundary of the feasible region.

pub mod auglag;
pub mod backend;
pub mod bounds;
pub mod constraints;
pub mod objective;
pub mod optimizer;

pub use auglag::AugLagSolver;
pub use backend::{Bounds, NlpBackend, NlpProblem, NlpSolution};
pub use optimizer::{EnvelopeOptimizer, OptParams, OptStatus};
