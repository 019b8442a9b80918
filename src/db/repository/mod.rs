//! Repository layer: entity-scoped database operations.

mod artifact;
mod document;

pub use artifact::*;
pub use document::*;
