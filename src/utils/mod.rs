//! Utility functions for mediagrab

pub mod filename;
pub mod size;
pub mod url;

pub use filename::*;
pub use size::*;
pub use self::url::*;
