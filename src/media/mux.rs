//! Embedding subtitle tracks into a video with ffmpeg

use crate::error::GrabError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// One subtitle file to embed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleTrack {
    pub path: PathBuf,
    /// Language code written to the stream metadata
    pub language: String,
    /// Human readable track title
    pub title: String,
}

/// Copies the video and audio streams and adds each subtitle as a
/// `mov_text` stream
#[derive(Debug, Clone)]
pub struct MuxJob {
    ffmpeg: PathBuf,
    video: PathBuf,
    subtitles: Vec<SubtitleTrack>,
    output: PathBuf,
}

impl MuxJob {
    pub fn new(ffmpeg: impl Into<PathBuf>, video: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            video: video.into(),
            subtitles: Vec::new(),
            output: output.into(),
        }
    }

    pub fn with_subtitle(mut self, track: SubtitleTrack) -> Self {
        self.subtitles.push(track);
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// ffmpeg arguments, program name excluded
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-i".into(), self.video.clone().into()];

        for track in &self.subtitles {
            args.push("-i".into());
            args.push(track.path.clone().into());
        }

        args.push("-map".into());
        args.push("0".into());
        // Input 0 is the video; subtitles follow from 1.
        for index in 1..=self.subtitles.len() {
            args.push("-map".into());
            args.push(index.to_string().into());
        }

        for arg in ["-c:v", "copy", "-c:a", "copy", "-c:s", "mov_text"] {
            args.push(arg.into());
        }

        for (index, track) in self.subtitles.iter().enumerate() {
            args.push(format!("-metadata:s:s:{}", index).into());
            args.push(format!("language={}", track.language).into());
            args.push(format!("-metadata:s:s:{}", index).into());
            args.push(format!("title={}", track.title).into());
        }

        args.push(self.output.clone().into());
        args
    }

    /// Run ffmpeg; a non-zero exit is `GrabError::ExternalTool`
    pub async fn run(&self) -> Result<(), GrabError> {
        let tool = self.ffmpeg.display().to_string();
        info!(
            "Muxing {} subtitle track(s) into {}",
            self.subtitles.len(),
            self.output.display()
        );
        debug!("{} {:?}", tool, self.args());

        let output = Command::new(&self.ffmpeg)
            .arg("-y")
            .args(self.args())
            .output()
            .await
            .map_err(|e| GrabError::ExternalTool {
                tool: tool.clone(),
                status: e.to_string(),
            })?;

        if !output.status.success() {
            warn!("{}", String::from_utf8_lossy(&output.stderr).trim());
            return Err(GrabError::ExternalTool {
                tool,
                status: output.status.to_string(),
            });
        }
        Ok(())
    }
}
