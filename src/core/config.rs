//! Run configuration and the JSON files kept in the config directory

use crate::error::GrabError;
use crate::utils::{convert_to_bytes, Source};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CREDENTIALS_FILE: &str = "vrp_credentials";
pub const COOKIE_CACHE_FILE: &str = "vrp_cookie_cache";
pub const OUTPUT_PATHS_FILE: &str = "output_paths";

pub const DEFAULT_BASE_URL: &str = "https://vrporn.com";
pub const DEFAULT_SIZE_CEILING: &str = "10 GB";

/// Configuration for one `download` run, built once at startup
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// File with one URL per line
    pub input_file: PathBuf,
    /// Directory holding credentials, cookie cache and output paths
    pub config_dir: PathBuf,
    /// Size ceiling as given ("10 GB")
    pub size_ceiling: String,
    /// Size ceiling in bytes
    pub size_ceiling_bytes: u64,
    /// Connect timeout, and whole-request timeout for page requests
    pub timeout: Duration,
    /// Base URL of the authenticated site
    pub base_url: String,
    /// yt-dlp executable
    pub ytdlp: PathBuf,
    /// ffmpeg executable
    pub ffmpeg: PathBuf,
    /// Show a progress bar while streaming
    pub show_progress: bool,
}

impl RunConfig {
    pub fn new(input_file: impl Into<PathBuf>, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_file: input_file.into(),
            config_dir: config_dir.into(),
            size_ceiling: DEFAULT_SIZE_CEILING.to_string(),
            size_ceiling_bytes: 10_000_000_000,
            timeout: Duration::from_secs(30),
            base_url: DEFAULT_BASE_URL.to_string(),
            ytdlp: PathBuf::from("yt-dlp"),
            ffmpeg: PathBuf::from("ffmpeg"),
            show_progress: true,
        }
    }

    /// Set the size ceiling, validating the unit string
    pub fn with_size_ceiling(mut self, ceiling: &str) -> Result<Self, GrabError> {
        self.size_ceiling_bytes = convert_to_bytes(ceiling)?;
        self.size_ceiling = ceiling.trim().to_string();
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_tools(mut self, ytdlp: impl Into<PathBuf>, ffmpeg: impl Into<PathBuf>) -> Self {
        self.ytdlp = ytdlp.into();
        self.ffmpeg = ffmpeg.into();
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.config_dir.join(CREDENTIALS_FILE)
    }

    pub fn cookie_cache_path(&self) -> PathBuf {
        self.config_dir.join(COOKIE_CACHE_FILE)
    }

    pub fn output_paths_path(&self) -> PathBuf {
        self.config_dir.join(OUTPUT_PATHS_FILE)
    }
}

/// Configuration for the `serve` subcommand
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Directory containing `index.html`
    pub public_dir: PathBuf,
    /// Directory submitted snippets are written to
    pub output_dir: PathBuf,
    /// Log file tailed by `/logs`
    pub log_file: Option<PathBuf>,
}

/// Per-source output roots (`output_paths` file)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct OutputPaths(HashMap<String, String>);

impl OutputPaths {
    /// Load the output paths file; an absent file is a configuration error
    pub fn load(path: &Path) -> Result<Self, GrabError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GrabError::MissingConfig(path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&contents)?)
    }

    /// Output root for a source, empty when unconfigured
    pub fn root_for(&self, source: Source) -> &str {
        source
            .config_key()
            .and_then(|key| self.0.get(key))
            .map(String::as_str)
            .unwrap_or("")
    }
}

impl FromIterator<(String, String)> for OutputPaths {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_run_config_paths() {
        let config = RunConfig::new("urls.txt", "/etc/mediagrab");
        assert_eq!(config.credentials_path(), PathBuf::from("/etc/mediagrab/vrp_credentials"));
        assert_eq!(config.cookie_cache_path(), PathBuf::from("/etc/mediagrab/vrp_cookie_cache"));
        assert_eq!(config.output_paths_path(), PathBuf::from("/etc/mediagrab/output_paths"));
    }

    #[test]
    fn test_run_config_size_ceiling() {
        let config = assert_ok!(RunConfig::new("urls.txt", "cfg").with_size_ceiling("4.7 GB"));
        assert_eq!(config.size_ceiling_bytes, 4_700_000_000);
        assert_eq!(config.size_ceiling, "4.7 GB");

        assert_err!(RunConfig::new("urls.txt", "cfg").with_size_ceiling("lots"));
    }

    #[test]
    fn test_run_config_base_url_trailing_slash() {
        let config = RunConfig::new("urls.txt", "cfg").with_base_url("http://127.0.0.1:1234/");
        assert_eq!(config.base_url, "http://127.0.0.1:1234");
    }

    #[test]
    fn test_output_paths_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(OUTPUT_PATHS_FILE);
        std::fs::write(&path, r#"{"vrporn": "/media/vr", "youtube": "/media/yt"}"#).unwrap();

        let paths = assert_ok!(OutputPaths::load(&path));
        assert_eq!(paths.root_for(Source::Vrp), "/media/vr");
        assert_eq!(paths.root_for(Source::YouTube), "/media/yt");
        assert_eq!(paths.root_for(Source::PornHub), "");
        assert_eq!(paths.root_for(Source::Invalid), "");
    }

    #[test]
    fn test_output_paths_missing_file() {
        let dir = tempdir().unwrap();
        let result = OutputPaths::load(&dir.path().join("nope"));
        assert!(matches!(result, Err(GrabError::MissingConfig(_))));
    }
}
