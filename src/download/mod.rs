//! Variant selection and streamed downloading

pub mod fetcher;
pub mod select;

pub use fetcher::*;
pub use select::*;
