//! Structural analysis of formula trees.
pub mod topology;

pub use topology::{NodePath, StructuralError};
