//! Output formatting and progress display

use crate::cli::args::VerbosityLevel;
use crate::core::progress::{format_bytes, format_duration, Progress};
use crate::platform::GrabbedFile;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}";

/// Output formatter for mediagrab
pub struct OutputFormatter {
    verbosity: VerbosityLevel,
    progress_bar: Mutex<Option<ProgressBar>>,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            progress_bar: Mutex::new(None),
        }
    }

    fn bar(&self) -> std::sync::MutexGuard<'_, Option<ProgressBar>> {
        self.progress_bar
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create a progress bar for one download, replacing any previous one
    pub fn create_progress_bar(&self, total_size: u64, label: &str) -> Option<ProgressBar> {
        if self.verbosity == VerbosityLevel::Quiet {
            return None;
        }

        let progress_bar = if total_size > 0 {
            let bar = ProgressBar::new(total_size);
            if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar
        } else {
            ProgressBar::new_spinner()
        };
        progress_bar.set_message(label.to_string());

        *self.bar() = Some(progress_bar.clone());
        Some(progress_bar)
    }

    /// Update progress bar, starting one on the first report of a download
    pub fn update_progress(&self, progress: &Progress) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }

        let starting = self.bar().is_none();
        if starting {
            self.create_progress_bar(progress.total_size, "Downloading...");
        }

        let mut guard = self.bar();
        let Some(progress_bar) = guard.as_ref() else {
            return;
        };

        progress_bar.set_position(progress.downloaded_size);
        if progress.total_size > 0 {
            progress_bar.set_length(progress.total_size);
        }
        if let Some(speed) = progress.speed {
            let mut message = format!("{}/s", format_bytes(speed as u64));
            if let Some(eta) = progress.eta() {
                message.push_str(&format!(", {} left", format_duration(eta)));
            }
            progress_bar.set_message(message);
        }

        if progress.is_complete() {
            progress_bar.finish_with_message("done");
            *guard = None;
        }
    }

    /// Finish progress bar
    pub fn finish_progress(&self, message: &str) {
        if let Some(progress_bar) = self.bar().take() {
            progress_bar.finish_with_message(message.to_string());
        }
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            println!("ℹ️  {}", message);
        }
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            println!("✅ {}", message);
        }
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("⚠️  {}", message);
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        eprintln!("❌ {}", message);
    }

    /// Print debug message
    pub fn debug(&self, message: &str) {
        if self.verbosity == VerbosityLevel::Verbose {
            println!("🐛 {}", message);
        }
    }

    /// Print where every grabbed file ended up
    pub fn print_batch_summary(&self, grabbed: &[GrabbedFile], invalid: usize, elapsed: Duration) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }

        println!();
        if grabbed.is_empty() {
            self.warning(&format!("Nothing grabbed ({})", format_duration(elapsed)));
        } else {
            self.success(&format!(
                "Grabbed {} file(s) in {}",
                grabbed.len(),
                format_duration(elapsed)
            ));
        }
        for file in grabbed {
            println!("💾 {}", file.file.display());
        }
        if invalid > 0 {
            self.warning(&format!("{} line(s) skipped as invalid", invalid));
        }
    }

    /// Print the address the form server listens on
    pub fn print_server_start(&self, address: &str) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }

        println!("🚀 Starting form server");
        println!("🔗 http://{}", address);
        println!();
    }
}

/// Create a progress callback for the fetcher
pub fn create_progress_callback(
    formatter: Arc<OutputFormatter>,
) -> impl Fn(Progress) + Send + Sync + 'static {
    move |progress: Progress| {
        formatter.update_progress(&progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn progress(downloaded: u64, total: u64) -> Progress {
        let mut progress = Progress::new(total);
        progress.advance(downloaded);
        progress
    }

    #[test]
    fn test_output_formatter_creation() {
        let formatter = OutputFormatter::new(VerbosityLevel::Normal);
        assert_eq!(formatter.verbosity, VerbosityLevel::Normal);
        assert!(formatter.bar().is_none());
    }

    #[test]
    fn test_verbosity_levels() {
        let formatter = OutputFormatter::new(VerbosityLevel::Quiet);
        // These should not print anything in quiet mode
        formatter.info("test");
        formatter.success("test");
        formatter.warning("test");
        formatter.debug("test");

        // Error should always print
        formatter.error("test");
    }

    #[test]
    fn test_create_progress_bar_quiet_mode() {
        let formatter = OutputFormatter::new(VerbosityLevel::Quiet);
        assert!(formatter.create_progress_bar(1000, "clip").is_none());
        formatter.update_progress(&progress(10, 1000));
        assert!(formatter.bar().is_none());
    }

    #[test]
    fn test_create_progress_bar_normal_mode() {
        let formatter = OutputFormatter::new(VerbosityLevel::Normal);
        assert!(formatter.create_progress_bar(1000, "clip").is_some());
        assert!(formatter.bar().is_some());
        formatter.finish_progress("done");
        assert!(formatter.bar().is_none());
    }

    #[test]
    fn test_update_progress_starts_and_clears_bar() {
        let formatter = OutputFormatter::new(VerbosityLevel::Normal);
        formatter.update_progress(&progress(512, 2048));
        assert_eq!(formatter.bar().as_ref().map(|b| b.position()), Some(512));

        formatter.update_progress(&progress(2048, 2048));
        assert!(formatter.bar().is_none());
    }

    #[test]
    fn test_update_progress_shows_speed_and_eta() {
        let formatter = OutputFormatter::new(VerbosityLevel::Normal);
        let progress = Progress {
            downloaded_size: 1000,
            speed: Some(1000.0),
            ..Progress::new(10_000)
        };
        formatter.update_progress(&progress);
        let message = formatter.bar().as_ref().map(|b| b.message()).unwrap();
        assert_eq!(message, "1000 B/s, 9s left");
    }

    #[test]
    fn test_callback_forwards_to_formatter() {
        let formatter = Arc::new(OutputFormatter::new(VerbosityLevel::Verbose));
        let callback = create_progress_callback(formatter.clone());
        callback(progress(100, 1000));
        assert_eq!(formatter.bar().as_ref().map(|b| b.position()), Some(100));
    }

    #[test]
    fn test_print_batch_summary() {
        let formatter = OutputFormatter::new(VerbosityLevel::Normal);
        let grabbed = vec![GrabbedFile {
            filename: "clip.mp4".to_string(),
            subfolder: "author-clip".to_string(),
            file: PathBuf::from("/media/author-clip/clip.mp4"),
        }];
        // Should not panic
        formatter.print_batch_summary(&grabbed, 2, Duration::from_secs(95));
        OutputFormatter::new(VerbosityLevel::Quiet).print_batch_summary(&grabbed, 0, Duration::ZERO);
    }
}
