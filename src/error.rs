//! Error types for mediagrab

use thiserror::Error;

/// Main error type for mediagrab operations
#[derive(Debug, Error)]
pub enum GrabError {
    #[error("Invalid size: {0}")]
    InvalidSize(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Login failed at {stage} (status {status})")]
    LoginFailed { stage: &'static str, status: u16 },

    #[error("No variant fits under the size ceiling")]
    NoVariant,

    #[error("Download failed with status {0}")]
    DownloadFailed(u16),

    #[error("{tool} exited with {status}")]
    ExternalTool { tool: String, status: String },

    #[error("Scrape error: {0}")]
    Scrape(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),
}

impl GrabError {
    /// Transport failures abort the batch; everything else is a per-URL or
    /// per-pathway outcome.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GrabError::Http(_) | GrabError::IoError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let io = GrabError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(io.is_fatal());
        assert!(!GrabError::DownloadFailed(500).is_fatal());
        assert!(!GrabError::NoVariant.is_fatal());
        assert!(!GrabError::InvalidSize("x".into()).is_fatal());
        assert!(!GrabError::LoginFailed { stage: "submit", status: 403 }.is_fatal());
    }

    #[test]
    fn test_login_failed_display() {
        let err = GrabError::LoginFailed { stage: "login page", status: 503 };
        assert_eq!(err.to_string(), "Login failed at login page (status 503)");
    }
}
