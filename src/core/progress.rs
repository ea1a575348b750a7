//! Progress tracking for streamed downloads

use std::time::{Duration, Instant};

/// Cumulative transfer state reported after every chunk
#[derive(Debug, Clone)]
pub struct Progress {
    /// Declared content length in bytes, 0 when the server sent none
    pub total_size: u64,
    /// Bytes written so far
    pub downloaded_size: u64,
    /// Current average speed in bytes per second
    pub speed: Option<f64>,
    /// Time when the transfer started
    pub start_time: Instant,
}

impl Progress {
    pub fn new(total_size: u64) -> Self {
        Self {
            total_size,
            downloaded_size: 0,
            speed: None,
            start_time: Instant::now(),
        }
    }

    /// Account for one more chunk of `len` bytes
    pub fn advance(&mut self, len: u64) {
        self.downloaded_size += len;
        let elapsed = self.start_time.elapsed();
        if elapsed.as_millis() > 0 {
            self.speed = Some(self.downloaded_size as f64 / elapsed.as_secs_f64());
        }
    }

    /// Estimated time remaining
    pub fn eta(&self) -> Option<Duration> {
        let speed = self.speed.filter(|s| *s > 0.0)?;
        if self.total_size <= self.downloaded_size {
            return None;
        }
        let remaining = (self.total_size - self.downloaded_size) as f64;
        Some(Duration::from_secs((remaining / speed) as u64))
    }

    pub fn is_complete(&self) -> bool {
        self.total_size > 0 && self.downloaded_size >= self.total_size
    }
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f64 = bytes as f64;
    let exp = (bytes_f64.ln() / THRESHOLD.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);

    let value = bytes_f64 / THRESHOLD.powi(exp as i32);

    if exp == 0 {
        format!("{} {}", bytes, UNITS[exp])
    } else {
        format!("{:.1} {}", value, UNITS[exp])
    }
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    if total_seconds < 60 {
        format!("{}s", total_seconds)
    } else if total_seconds < 3600 {
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        if seconds == 0 {
            format!("{}m", minutes)
        } else {
            format!("{}m {}s", minutes, seconds)
        }
    } else {
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        if minutes == 0 {
            format!("{}h", hours)
        } else {
            format!("{}h {}m", hours, minutes)
        }
    }
}
