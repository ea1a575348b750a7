//! Batch driver: classify the input file, run each source, file the results

use crate::core::config::{OutputPaths, RunConfig};
use crate::download::fetcher::ProgressCallback;
use crate::error::GrabError;
use crate::platform::{GrabbedFile, Grabber, PornHubGrabber, VrpGrabber, YouTubeGrabber};
use crate::utils::url::{classify, Source};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Input lines sorted by source, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlBatch {
    pub pornhub: Vec<String>,
    pub vrp: Vec<String>,
    pub youtube: Vec<String>,
    pub invalid: Vec<String>,
}

impl UrlBatch {
    /// Classify each trimmed line; blank lines are ignored
    pub fn from_lines(text: &str) -> Self {
        let mut batch = Self::default();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let bucket = match classify(line) {
                Source::PornHub => &mut batch.pornhub,
                Source::Vrp => &mut batch.vrp,
                Source::YouTube => &mut batch.youtube,
                Source::Invalid => &mut batch.invalid,
            };
            bucket.push(line.to_string());
        }
        batch
    }

    pub fn urls_for(&self, source: Source) -> &[String] {
        match source {
            Source::PornHub => &self.pornhub,
            Source::Vrp => &self.vrp,
            Source::YouTube => &self.youtube,
            Source::Invalid => &self.invalid,
        }
    }
}

/// What a run produced
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// Files at their final location
    pub grabbed: Vec<GrabbedFile>,
    /// Lines that were not a URL of a known source
    pub invalid: Vec<String>,
}

/// The three sources in processing order
pub fn default_grabbers(
    config: &RunConfig,
    progress: Option<ProgressCallback>,
) -> Result<Vec<(Source, Box<dyn Grabber>)>, GrabError> {
    let mut vrp = VrpGrabber::new(config.clone())?;
    if let Some(progress) = progress {
        vrp = vrp.with_progress(move |p| progress(p));
    }

    Ok(vec![
        (Source::PornHub, Box::new(PornHubGrabber::new(config)) as Box<dyn Grabber>),
        (Source::Vrp, Box::new(vrp) as Box<dyn Grabber>),
        (Source::YouTube, Box::new(YouTubeGrabber::new(config)) as Box<dyn Grabber>),
    ])
}

/// Runs every source over its share of the input, one after another
pub struct BatchRunner {
    config: RunConfig,
    grabbers: Vec<(Source, Box<dyn Grabber>)>,
}

impl BatchRunner {
    pub fn new(config: RunConfig, grabbers: Vec<(Source, Box<dyn Grabber>)>) -> Self {
        Self { config, grabbers }
    }

    pub async fn run(&self) -> Result<BatchSummary, GrabError> {
        let input = &self.config.input_file;
        let text = match tokio::fs::read_to_string(input).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("File '{}' not found.", input.display());
                return Ok(BatchSummary::default());
            }
            Err(e) => return Err(e.into()),
        };

        let paths_file = self.config.output_paths_path();
        let output_paths = match OutputPaths::load(&paths_file) {
            Ok(paths) => paths,
            Err(GrabError::MissingConfig(path)) => {
                warn!("{} not found.", path);
                return Ok(BatchSummary::default());
            }
            Err(e) if !e.is_fatal() => {
                error!("{} is unreadable: {}", paths_file.display(), e);
                return Ok(BatchSummary::default());
            }
            Err(e) => return Err(e),
        };

        let batch = UrlBatch::from_lines(&text);
        for line in &batch.invalid {
            warn!("Invalid URL: {}", line);
        }
        info!(
            "{} PH, {} VRP, {} YT, {} invalid",
            batch.pornhub.len(),
            batch.vrp.len(),
            batch.youtube.len(),
            batch.invalid.len()
        );

        let scratch = tempfile::tempdir()?;
        let mut summary = BatchSummary {
            invalid: batch.invalid.clone(),
            ..BatchSummary::default()
        };

        for (source, grabber) in &self.grabbers {
            let urls = batch.urls_for(*source);
            if urls.is_empty() {
                continue;
            }

            info!("[{}] Processing {} URL(s)", grabber.name(), urls.len());
            let files = match grabber.grab(urls, scratch.path()).await {
                Ok(files) => files,
                Err(e) if !e.is_fatal() => {
                    error!("[{}] Skipping {} URL(s): {}", grabber.name(), urls.len(), e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            let root = output_paths.root_for(*source);
            summary
                .grabbed
                .extend(relocate(files, root, &paths_file).await?);
        }

        Ok(summary)
    }
}

/// Move each file to `<output_root>/<subfolder>/<filename>`.
/// An empty root leaves the files in scratch.
pub async fn relocate(
    files: Vec<GrabbedFile>,
    output_root: &str,
    paths_file: &Path,
) -> Result<Vec<GrabbedFile>, GrabError> {
    if files.is_empty() {
        return Ok(files);
    }
    if output_root.is_empty() {
        warn!("Path is empty.  Please configure \"{}\"", paths_file.display());
        return Ok(Vec::new());
    }

    let root = PathBuf::from(output_root);
    let mut moved = Vec::with_capacity(files.len());

    for grabbed in files {
        let dir = root.join(&grabbed.subfolder);
        if !dir.exists() {
            info!("Creating: {}", dir.display());
        }
        tokio::fs::create_dir_all(&dir).await?;

        let destination = dir.join(&grabbed.filename);
        info!("Moving to: {}", destination.display());
        move_file(&grabbed.file, &destination).await?;

        moved.push(GrabbedFile {
            file: destination,
            ..grabbed
        });
    }

    Ok(moved)
}

/// Rename, falling back to copy and delete across filesystems
async fn move_file(from: &Path, to: &Path) -> Result<(), GrabError> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await?;
    Ok(())
}
