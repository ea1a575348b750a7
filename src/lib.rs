//! # mediagrab - batch media grabber
//!
//! Reads a file of URLs, sorts them by source site and fetches each one,
//! filing the results under a per-author folder.
//!
//! ## Sources
//!
//! - An authenticated site scraped directly: cached session cookies, form
//!   login, page scraping and a streamed download of the largest variant
//!   under a size ceiling
//! - Two sites fetched through `yt-dlp`, with subtitle tracks converted to
//!   SubRip and embedded with `ffmpeg`
//!
//! A small form server accepts pasted URL lists and can stream a log file.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mediagrab::core::{default_grabbers, BatchRunner, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig::new("urls.txt", "/etc/mediagrab").with_size_ceiling("10 GB")?;
//!     let grabbers = default_grabbers(&config, None)?;
//!
//!     let summary = BatchRunner::new(config, grabbers).run().await?;
//!     println!("Grabbed {} files", summary.grabbed.len());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod core;
pub mod download;
pub mod error;
pub mod media;
pub mod platform;
pub mod server;
pub mod utils;

// Re-export main types
pub use crate::core::{BatchRunner, BatchSummary, OutputPaths, PageInfo, Progress, RunConfig, ServeConfig, Variant};
pub use error::GrabError;
pub use platform::{GrabbedFile, Grabber};

/// Result type alias for mediagrab operations
pub type Result<T> = std::result::Result<T, GrabError>;
