//! Streamed downloader with per-chunk progress

use crate::core::progress::Progress;
use crate::error::GrabError;
use crate::platform::client::SiteClient;
use futures_util::StreamExt;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Bytes written (and reported) per step
pub const CHUNK_SIZE: usize = 1024;

/// Progress callback invoked after every chunk
pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// Downloads one link to disk. No resume and no retries; a failed transfer
/// never leaves a file behind.
pub struct StreamingFetcher {
    client: SiteClient,
    progress_callback: Option<ProgressCallback>,
}

impl StreamingFetcher {
    pub fn new(client: SiteClient) -> Self {
        Self {
            client,
            progress_callback: None,
        }
    }

    /// Set progress callback
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Stream `link` into `destination`, returning the number of bytes written.
    ///
    /// Data goes to `<destination>.part` first and is renamed into place only
    /// once the body has been read completely.
    pub async fn download(&self, link: &str, destination: &Path) -> Result<u64, GrabError> {
        info!("Starting download from URL: {}", link);
        let part = part_path(destination);
        let mut file = File::create(&part).await?;

        match self.stream_into(link, &mut file).await {
            Ok(written) => {
                file.flush().await?;
                file.sync_all().await?;
                drop(file);
                tokio::fs::rename(&part, destination).await?;
                info!("File downloaded successfully to {}", destination.display());
                Ok(written)
            }
            Err(e) => {
                warn!("Download failed: {}, removing partial file", e);
                drop(file);
                let _ = tokio::fs::remove_file(&part).await;
                Err(e)
            }
        }
    }

    async fn stream_into(&self, link: &str, file: &mut File) -> Result<u64, GrabError> {
        let response = self.client.get_stream(link).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GrabError::DownloadFailed(status.as_u16()));
        }

        let mut progress = Progress::new(response.content_length().unwrap_or(0));
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for piece in chunk.chunks(CHUNK_SIZE) {
                file.write_all(piece).await?;
                progress.advance(piece.len() as u64);

                if let Some(callback) = &self.progress_callback {
                    callback(progress.clone());
                }
            }
        }

        debug!(
            "Streamed {} of {} declared bytes",
            progress.downloaded_size, progress.total_size
        );
        Ok(progress.downloaded_size)
    }
}

/// `<destination>.part`
fn part_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}
