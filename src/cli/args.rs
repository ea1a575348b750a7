//! Command line argument parsing

use crate::core::config::{RunConfig, ServeConfig, DEFAULT_BASE_URL, DEFAULT_SIZE_CEILING};
use crate::error::GrabError;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

/// Batch media grabber - fetch a list of URLs and file them per author
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download every URL listed in a file
    Download(DownloadArgs),
    /// Serve the URL submission form
    Serve(ServeArgs),
}

#[derive(ClapArgs, Debug)]
pub struct DownloadArgs {
    /// Input file containing 1 URL per line
    #[arg(short = 'i', long = "filename", value_name = "FILE")]
    pub filename: PathBuf,

    /// Directory containing vrp_credentials, vrp_cookie_cache and output_paths
    #[arg(short, long, value_name = "DIR")]
    pub config_dir: PathBuf,

    /// Largest variant size to download (e.g., '10 GB', '500 MB')
    #[arg(long, value_name = "SIZE", default_value = DEFAULT_SIZE_CEILING)]
    pub max_size: String,

    /// HTTP timeout (e.g., 30s, 1m)
    #[arg(long, value_name = "DURATION", default_value = "30s")]
    pub timeout: humantime::Duration,

    /// Base URL of the authenticated site
    #[arg(long, value_name = "URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// yt-dlp executable
    #[arg(long, value_name = "PATH", default_value = "yt-dlp")]
    pub ytdlp: PathBuf,

    /// ffmpeg executable
    #[arg(long, value_name = "PATH", default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,

    /// Disable progress output
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(ClapArgs, Debug)]
pub struct ServeArgs {
    /// Desired port
    #[arg(short, long, default_value_t = 8008)]
    pub port: u16,

    /// Address to bind
    #[arg(long, value_name = "ADDR", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Directory that contains our index.html
    #[arg(short = 'i', long, value_name = "DIR")]
    pub public_dir: PathBuf,

    /// Output directory for files we save
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Log file streamed by /logs
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl DownloadArgs {
    /// Get HTTP timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        self.timeout.into()
    }

    /// Validate and convert into the run configuration
    pub fn into_run_config(self) -> Result<RunConfig, GrabError> {
        let timeout = self.timeout_duration();
        Ok(RunConfig::new(self.filename, self.config_dir)
            .with_size_ceiling(&self.max_size)?
            .with_timeout(timeout)
            .with_base_url(self.base_url)
            .with_tools(self.ytdlp, self.ffmpeg)
            .with_progress(!self.no_progress))
    }
}

impl ServeArgs {
    pub fn into_serve_config(self) -> ServeConfig {
        ServeConfig {
            host: self.host,
            port: self.port,
            public_dir: self.public_dir,
            output_dir: self.output_dir,
            log_file: self.log_file,
        }
    }
}

impl Args {
    /// Get output verbosity level
    pub fn verbosity_level(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbosityLevel {
    /// Quiet (only errors)
    Quiet,
    /// Normal
    Normal,
    /// Verbose (debug info)
    Verbose,
}

impl Default for DownloadArgs {
    fn default() -> Self {
        Self {
            filename: PathBuf::new(),
            config_dir: PathBuf::new(),
            max_size: DEFAULT_SIZE_CEILING.to_string(),
            timeout: humantime::Duration::from(Duration::from_secs(30)),
            base_url: DEFAULT_BASE_URL.to_string(),
            ytdlp: PathBuf::from("yt-dlp"),
            ffmpeg: PathBuf::from("ffmpeg"),
            no_progress: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("mediagrab").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_download_defaults() {
        let args = parse(&["download", "-i", "urls.txt", "-c", "/etc/mediagrab"]);
        let Command::Download(download) = args.command else {
            panic!("expected download");
        };
        assert_eq!(download.filename, PathBuf::from("urls.txt"));
        assert_eq!(download.config_dir, PathBuf::from("/etc/mediagrab"));
        assert_eq!(download.max_size, "10 GB");
        assert_eq!(download.timeout_duration(), Duration::from_secs(30));
        assert_eq!(download.base_url, "https://vrporn.com");
        assert!(!download.no_progress);
    }

    #[test]
    fn test_download_required_args() {
        assert!(Args::try_parse_from(["mediagrab", "download", "-i", "urls.txt"]).is_err());
        assert!(Args::try_parse_from(["mediagrab", "download", "-c", "cfg"]).is_err());
        assert!(Args::try_parse_from(["mediagrab"]).is_err());
    }

    #[test]
    fn test_into_run_config() {
        let args = parse(&[
            "download", "-i", "urls.txt", "-c", "cfg", "--max-size", "4 GB", "--timeout", "1m",
            "--base-url", "http://127.0.0.1:9000/", "--no-progress",
        ]);
        let Command::Download(download) = args.command else {
            panic!("expected download");
        };

        let config = download.into_run_config().unwrap();
        assert_eq!(config.size_ceiling_bytes, 4_000_000_000);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.base_url, "http://127.0.0.1:9000");
        assert!(!config.show_progress);
    }

    #[test]
    fn test_into_run_config_rejects_bad_size() {
        let download = DownloadArgs {
            max_size: "huge".to_string(),
            ..Default::default()
        };
        assert!(matches!(download.into_run_config(), Err(GrabError::InvalidSize(_))));
    }

    #[test]
    fn test_serve_args() {
        let args = parse(&["serve", "-i", "public", "-o", "out"]);
        let Command::Serve(serve) = args.command else {
            panic!("expected serve");
        };
        let config = serve.into_serve_config();
        assert_eq!(config.port, 8008);
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.public_dir, PathBuf::from("public"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert!(config.log_file.is_none());

        let args = parse(&["serve", "-p", "9090", "-i", "p", "-o", "o", "--log-file", "grab.log"]);
        let Command::Serve(serve) = args.command else {
            panic!("expected serve");
        };
        assert_eq!(serve.port, 9090);
        assert_eq!(serve.log_file, Some(PathBuf::from("grab.log")));
    }

    #[test]
    fn test_args_verbosity_level() {
        assert_eq!(parse(&["serve", "-i", "p", "-o", "o"]).verbosity_level(), VerbosityLevel::Normal);
        assert_eq!(parse(&["-q", "serve", "-i", "p", "-o", "o"]).verbosity_level(), VerbosityLevel::Quiet);
        assert_eq!(
            parse(&["download", "-i", "u", "-c", "c", "-v"]).verbosity_level(),
            VerbosityLevel::Verbose
        );
    }
}
