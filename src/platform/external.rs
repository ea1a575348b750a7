//! Sources fetched through the yt-dlp command line tool

use crate::core::config::RunConfig;
use crate::error::GrabError;
use crate::media::captions::xml_to_srt;
use crate::media::mux::{MuxJob, SubtitleTrack};
use crate::platform::{record_outcome, GrabbedFile, Grabber};
use crate::utils::filename::detox;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Fields of `yt-dlp --dump-single-json` we use
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaMetadata {
    pub title: String,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    /// Uploaded tracks by language key
    #[serde(default)]
    pub subtitles: BTreeMap<String, Vec<SubtitleFormat>>,
    /// Speech recognition tracks and their machine translations
    #[serde(default)]
    pub automatic_captions: BTreeMap<String, Vec<SubtitleFormat>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubtitleFormat {
    #[serde(default)]
    pub name: Option<String>,
}

/// A caption track as yt-dlp keys it, with its display name
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    pub code: String,
    pub name: String,
}

impl MediaMetadata {
    pub fn author(&self) -> &str {
        self.uploader
            .as_deref()
            .or(self.channel.as_deref())
            .unwrap_or_default()
    }

    /// Every uploaded track, plus the auto-generated track in the spoken
    /// language (`<lang>-orig`) unless an uploaded one covers that language.
    /// Machine translations are left out.
    pub fn caption_tracks(&self) -> Vec<CaptionTrack> {
        let track = |code: &str, formats: &[SubtitleFormat]| CaptionTrack {
            code: code.to_string(),
            name: formats
                .iter()
                .find_map(|f| f.name.clone())
                .unwrap_or_else(|| code.to_string()),
        };

        let mut tracks: Vec<CaptionTrack> = self
            .subtitles
            .iter()
            .filter(|(code, _)| code.as_str() != "live_chat")
            .map(|(code, formats)| track(code, formats))
            .collect();

        for (code, formats) in &self.automatic_captions {
            let Some(language) = code.strip_suffix("-orig") else {
                continue;
            };
            if !self.subtitles.contains_key(language) {
                tracks.push(track(code, formats));
            }
        }
        tracks
    }
}

/// Handle on the yt-dlp executable
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn tool(&self) -> String {
        self.program.display().to_string()
    }

    /// Run with `args` and return stdout
    async fn run(&self, args: Vec<OsString>) -> Result<String, GrabError> {
        debug!("{} {:?}", self.tool(), args);
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| GrabError::ExternalTool {
                tool: self.tool(),
                status: e.to_string(),
            })?;

        if !output.status.success() {
            warn!("{}", String::from_utf8_lossy(&output.stderr).trim());
            return Err(GrabError::ExternalTool {
                tool: self.tool(),
                status: output.status.to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub async fn metadata(&self, url: &str) -> Result<MediaMetadata, GrabError> {
        let stdout = self
            .run(vec![
                "--dump-single-json".into(),
                "--no-playlist".into(),
                "--no-warnings".into(),
                url.into(),
            ])
            .await?;
        Ok(serde_json::from_str(&stdout)?)
    }

    /// Download `url` with the given format selector to `output_template`
    /// (a yt-dlp `-o` template) and return the final file path.
    pub async fn download(
        &self,
        url: &str,
        format: &str,
        output_template: &Path,
        extra: &[&str],
    ) -> Result<PathBuf, GrabError> {
        let mut args: Vec<OsString> = vec![
            "-f".into(),
            format.into(),
            "--no-playlist".into(),
            "--no-progress".into(),
            "--no-simulate".into(),
            "--print".into(),
            "after_move:filepath".into(),
            "-o".into(),
            output_template.as_os_str().to_owned(),
        ];
        args.extend(extra.iter().map(OsString::from));
        args.push(url.into());

        let stdout = self.run(args).await?;
        stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(PathBuf::from)
            .ok_or_else(|| GrabError::ExternalTool {
                tool: self.tool(),
                status: "no output file reported".to_string(),
            })
    }
}

/// Best available quality, remuxed to mp4
pub struct PornHubGrabber {
    ytdlp: YtDlp,
}

impl PornHubGrabber {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            ytdlp: YtDlp::new(&config.ytdlp),
        }
    }

    async fn grab_one(&self, url: &str, scratch_dir: &Path) -> Result<GrabbedFile, GrabError> {
        let meta = self.ytdlp.metadata(url).await?;
        let title = detox(&meta.title);

        info!("[PH]Grabbing: {}", meta.title);
        let template = scratch_dir.join(format!("{}.%(ext)s", title));
        let file = self
            .ytdlp
            .download(url, "best", &template, &["--remux-video", "mp4"])
            .await?;

        Ok(GrabbedFile {
            filename: format!("{}.mp4", title),
            subfolder: format!("{}-{}", detox(meta.author()), title),
            file,
        })
    }
}

#[async_trait::async_trait]
impl Grabber for PornHubGrabber {
    fn name(&self) -> &str {
        "PH"
    }

    async fn grab(&self, urls: &[String], scratch_dir: &Path) -> Result<Vec<GrabbedFile>, GrabError> {
        let mut grabbed = Vec::new();
        for url in urls {
            let outcome = self.grab_one(url, scratch_dir).await;
            record_outcome(url, outcome, &mut grabbed)?;
        }
        Ok(grabbed)
    }
}

/// Highest progressive mp4 plus every subtitle track, embedded with ffmpeg
pub struct YouTubeGrabber {
    ytdlp: YtDlp,
    ffmpeg: PathBuf,
}

impl YouTubeGrabber {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            ytdlp: YtDlp::new(&config.ytdlp),
            ffmpeg: config.ffmpeg.clone(),
        }
    }

    async fn grab_one(&self, url: &str, scratch_dir: &Path) -> Result<GrabbedFile, GrabError> {
        let meta = self.ytdlp.metadata(url).await?;
        let title = detox(&meta.title);
        let subfolder = format!("{}-{}", detox(meta.author()), title);

        info!("[YT]Grabbing: {}", meta.title);
        let captions = meta.caption_tracks();
        let sub_langs = captions
            .iter()
            .map(|track| track.code.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let extra: Vec<&str> = if captions.is_empty() {
            Vec::new()
        } else {
            vec![
                "--write-subs",
                "--write-auto-subs",
                "--sub-langs",
                sub_langs.as_str(),
                "--sub-format",
                "srv3",
            ]
        };

        let template = scratch_dir.join(format!("{}.%(ext)s", title));
        let video = self
            .ytdlp
            .download(url, "best[ext=mp4]/best", &template, &extra)
            .await?;

        let ext = video
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .or(meta.ext.clone())
            .unwrap_or_else(|| "mp4".to_string());
        let final_name = format!("{}.{}", title, ext);

        let tracks = {
            let (dir, stem, name) = (scratch_dir.to_path_buf(), title.clone(), final_name.clone());
            tokio::task::spawn_blocking(move || convert_subtitles(&dir, &stem, &name, &captions))
                .await
                .map_err(|e| GrabError::IoError(std::io::Error::new(std::io::ErrorKind::Other, e)))??
        };
        if tracks.is_empty() {
            return Ok(GrabbedFile {
                filename: final_name,
                subfolder,
                file: video,
            });
        }

        let muxed_name = format!("{}_with_subtitles.{}", title, ext);
        let job = tracks.into_iter().fold(
            MuxJob::new(&self.ffmpeg, &video, scratch_dir.join(&muxed_name)),
            MuxJob::with_subtitle,
        );

        match job.run().await {
            Ok(()) => Ok(GrabbedFile {
                filename: muxed_name,
                subfolder,
                file: job.output().to_path_buf(),
            }),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Keeping {} without subtitles: {}", final_name, e);
                Ok(GrabbedFile {
                    filename: final_name,
                    subfolder,
                    file: video,
                })
            }
        }
    }
}

#[async_trait::async_trait]
impl Grabber for YouTubeGrabber {
    fn name(&self) -> &str {
        "YT"
    }

    async fn grab(&self, urls: &[String], scratch_dir: &Path) -> Result<Vec<GrabbedFile>, GrabError> {
        let mut grabbed = Vec::new();
        for url in urls {
            let outcome = self.grab_one(url, scratch_dir).await;
            record_outcome(url, outcome, &mut grabbed)?;
        }
        Ok(grabbed)
    }
}

/// Language of a track key: auto-generated tracks carry an `a.` prefix or,
/// as yt-dlp keys them, an `-orig` suffix
pub fn language_code(code: &str) -> &str {
    let code = code.strip_prefix("a.").unwrap_or(code);
    code.strip_suffix("-orig").unwrap_or(code)
}

/// `(language, path)` of every `<stem>.<language>.srv3` file in `dir`, by language
pub fn find_subtitle_files(dir: &Path, stem: &str) -> Vec<(String, PathBuf)> {
    let prefix = format!("{}.", stem);
    let mut found: Vec<(String, PathBuf)> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?;
            let language = name.strip_prefix(&prefix)?.strip_suffix(".srv3")?;
            if language.is_empty() {
                return None;
            }
            Some((language.to_string(), entry.path().to_path_buf()))
        })
        .collect();
    found.sort();
    found
}

/// Convert each srv3 track next to the video into SubRip. Blocking.
fn convert_subtitles(
    scratch_dir: &Path,
    stem: &str,
    final_name: &str,
    captions: &[CaptionTrack],
) -> Result<Vec<SubtitleTrack>, GrabError> {
    let mut tracks = Vec::new();

    for (code, path) in find_subtitle_files(scratch_dir, stem) {
        let name = captions
            .iter()
            .find(|track| track.code == code)
            .map(|track| track.name.clone())
            .unwrap_or_else(|| code.clone());
        info!("Downloading subtitle track: {}", name);
        let xml = std::fs::read_to_string(&path)?;
        let srt = match xml_to_srt(&xml) {
            Ok(srt) => srt,
            Err(e) => {
                warn!("Skipping subtitle track {}: {}", code, e);
                continue;
            }
        };

        let srt_path = scratch_dir.join(format!("{}_subtitle_{}.srt", final_name, code));
        std::fs::write(&srt_path, srt)?;
        info!("Subtitle track '{}' converted to {}", name, srt_path.display());

        tracks.push(SubtitleTrack {
            path: srt_path,
            language: language_code(&code).to_string(),
            title: name,
        });
    }

    Ok(tracks)
}
