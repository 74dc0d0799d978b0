//! Test harness for the hybrid mesh generator.
//!
//! Provides the scenario geometry builders (cube, spheres, concave
//! cavity), synthetic tet meshes for exercising reconciliation without
//! the external mesher, and assertion helpers for the pipeline
//! invariants.
//!
//! # Key Components
//!
//! - [`helpers`] — wall meshes and configurations seeding the scenarios
//! - [`assertions`] — invariant checks with diagnostic failures

pub mod assertions;
pub mod helpers;

pub use helpers::HarnessError;
