//! Shell generation: extrusion directions and prism stack heights.
//!
//! Produces, per wall node, a unit extrusion direction and a total stack
//! height such that the offset envelope stays outside the wall, varies
//! smoothly, and satisfies the per-edge non-inversion criterion wherever
//! the geometry allows it. Nodes where the criterion cannot be satisfied
//! are recorded for the envelope optimizer to repair.

pub mod critical;
pub mod directions;
pub mod heights;
pub mod params;
pub mod shell;

pub use params::ShellParams;
pub use shell::{Shell, ShellBuilder};
