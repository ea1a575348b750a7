//! Source sites: HTTP client, authenticated scraping and external-tool sources

pub mod auth;
pub mod client;
pub mod external;
pub mod scrape;
pub mod session;
pub mod vrp;

pub use auth::*;
pub use client::*;
pub use external::*;
pub use scrape::*;
pub use session::*;
pub use vrp::*;

use crate::error::GrabError;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A finished file waiting in the scratch directory to be relocated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrabbedFile {
    /// Final file name inside the subfolder
    pub filename: String,
    /// Author-named subfolder under the output root
    pub subfolder: String,
    /// Current location in the scratch directory
    pub file: PathBuf,
}

/// One acquisition pathway: takes the URLs classified for it and leaves
/// finished files in `scratch_dir`.
#[async_trait::async_trait]
pub trait Grabber: Send + Sync {
    /// Short tag for log lines
    fn name(&self) -> &str;

    /// Grab every URL in order. Per-URL problems are logged and skipped;
    /// transport failures propagate.
    async fn grab(&self, urls: &[String], scratch_dir: &Path) -> Result<Vec<GrabbedFile>, GrabError>;
}

/// Keep a URL's result, or log why it was skipped. Fatal errors propagate.
pub(crate) fn record_outcome(
    url: &str,
    outcome: Result<GrabbedFile, GrabError>,
    grabbed: &mut Vec<GrabbedFile>,
) -> Result<(), GrabError> {
    match outcome {
        Ok(file) => grabbed.push(file),
        Err(e) if e.is_fatal() => return Err(e),
        Err(GrabError::NoVariant) => warn!("Unable to grab video from: {}", url),
        Err(e) => warn!("Unable to grab video from: {} ({})", url, e),
    }
    Ok(())
}
