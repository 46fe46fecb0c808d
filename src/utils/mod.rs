//! Shared utilities: terminal styling and dataset I/O.

pub mod io;
pub mod styling;

pub use io::*;
pub use styling::*;
