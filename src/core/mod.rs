//! Core functionality for mediagrab

pub mod batch;
pub mod config;
pub mod page;
pub mod progress;

pub use batch::*;
pub use config::*;
pub use page::*;
pub use progress::*;
