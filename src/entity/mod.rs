//! Pipeline entities: the per-stage artifacts handed between stages
//! and the configuration records each stage consumes.

pub mod artifacts;
pub mod config;

pub use artifacts::*;
pub use config::*;
