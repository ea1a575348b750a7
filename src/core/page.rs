//! Scraped page structures

use crate::error::GrabError;
use crate::utils::convert_to_bytes;
use serde::Serialize;

/// Metadata and downloadable variants scraped from one content page
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageInfo {
    /// Content title
    pub name: String,
    /// Studio / author name
    pub author: String,
    /// Downloadable variants in page order, premium-locked rows excluded
    pub variants: Vec<Variant>,
}

impl PageInfo {
    /// True when the scrape produced nothing usable
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.author.is_empty() && self.variants.is_empty()
    }
}

/// One quality/size option for a piece of content
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variant {
    /// Quality label (e.g. "1080p" or a provider tag)
    pub quality: String,
    /// Size as shown on the page ("1.2 GB")
    pub size_text: String,
    /// Direct download link
    pub download_link: String,
}

impl Variant {
    pub fn new(
        quality: impl Into<String>,
        size_text: impl Into<String>,
        download_link: impl Into<String>,
    ) -> Self {
        Self {
            quality: quality.into(),
            size_text: size_text.into(),
            download_link: download_link.into(),
        }
    }

    /// Size in bytes derived from `size_text`
    pub fn size_bytes(&self) -> Result<u64, GrabError> {
        convert_to_bytes(&self.size_text)
    }
}
