//! URL validation and source classification

use url::Url;

/// Site a URL belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    PornHub,
    Vrp,
    YouTube,
    Invalid,
}

impl Source {
    /// Key used for this source in the `output_paths` config file
    pub fn config_key(&self) -> Option<&'static str> {
        match self {
            Source::PornHub => Some("pornhub"),
            Source::Vrp => Some("vrporn"),
            Source::YouTube => Some("youtube"),
            Source::Invalid => None,
        }
    }
}

/// Check that a string is an absolute http(s) URL with a host
pub fn is_valid_url(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
                && parsed.host_str().map_or(false, |host| !host.is_empty())
        }
        Err(_) => false,
    }
}

/// Classify a line of the input file
pub fn classify(line: &str) -> Source {
    if !is_valid_url(line) {
        return Source::Invalid;
    }
    if line.contains("pornhub") {
        Source::PornHub
    } else if line.contains("vrporn") {
        Source::Vrp
    } else if line.contains("youtu") {
        // youtube.com and youtu.be
        Source::YouTube
    } else {
        Source::Invalid
    }
}
