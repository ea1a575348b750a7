//! Caption conversion and subtitle muxing for downloaded media

pub mod captions;
pub mod mux;

pub use captions::*;
pub use mux::*;
