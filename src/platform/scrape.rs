//! Content page scraping: title, studio and downloadable variants

use crate::core::page::{PageInfo, Variant};
use crate::error::GrabError;
use crate::platform::client::SiteClient;
use crate::platform::session::SessionCookies;
use reqwest::StatusCode;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

const TITLE: &str = "h1.content-title";
const STUDIO: &str = "a#studio-logo";
const DOWNLOAD_POPUP: &str = "div.download-links-popup";
const ROW_CONTAINER: &str = "div.list_row";
const PAID_ROW: &str = "div.download-btn.vr-download.paid-download";
const FREE_ROW: &str = "div.download-btn.vr-download.free-download";
const PREMIUM_MARKER: &str = "span.text_login";
const LONG_QUALITY: &str = "span.text_long";
const SIZE: &str = "span.right";
const LONG_QUALITY_PREFIX: &str = "Max Quality ";

/// Compile a CSS selector
pub(crate) fn selector(css: &str) -> Result<Selector, GrabError> {
    Selector::parse(css).map_err(|e| GrabError::Scrape(format!("bad selector {:?}: {}", css, e)))
}

/// Concatenated, trimmed text of an element
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Scrapes content pages with an authenticated session
pub struct PageScraper {
    client: SiteClient,
}

impl PageScraper {
    pub fn new(client: SiteClient) -> Self {
        Self { client }
    }

    /// Fetch and parse a content page. A non-200 answer yields an empty
    /// `PageInfo`; missing markup leaves the matching fields empty.
    pub async fn scrape(&self, url: &str, cookies: &SessionCookies) -> Result<PageInfo, GrabError> {
        let response = self.client.get_page(url, Some(cookies)).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("Failed to retrieve the webpage. Status code: {}", status.as_u16());
            return Ok(PageInfo::default());
        }

        let body = response.text().await?;
        let mut page = parse_page(&body)?;

        let base = Url::parse(url)?;
        for variant in &mut page.variants {
            if let Ok(resolved) = base.join(&variant.download_link) {
                variant.download_link = resolved.to_string();
            }
        }

        debug!("Scraped {} variants from {}", page.variants.len(), url);
        Ok(page)
    }
}

/// Parse a content page's markup
pub fn parse_page(html: &str) -> Result<PageInfo, GrabError> {
    let document = Html::parse_document(html);
    let mut page = PageInfo::default();

    match document.select(&selector(TITLE)?).next() {
        Some(title) => page.name = element_text(title),
        None => warn!("Title element '{}' not found", TITLE),
    }

    match document.select(&selector(STUDIO)?).next() {
        Some(studio) => page.author = element_text(studio),
        None => warn!("Studio element '{}' not found", STUDIO),
    }

    if document.select(&selector(DOWNLOAD_POPUP)?).next().is_none() {
        warn!("Div element with class 'download-links-popup' not found.");
        return Ok(page);
    }

    let Some(container) = document.select(&selector(ROW_CONTAINER)?).next() else {
        warn!("Download row container '{}' not found", ROW_CONTAINER);
        return Ok(page);
    };

    // Paid accounts see the higher tiers under one class; free accounts only the other.
    let mut rows: Vec<ElementRef<'_>> = container.select(&selector(PAID_ROW)?).collect();
    if rows.is_empty() {
        debug!("No paid download rows, falling back to free rows");
        rows = container.select(&selector(FREE_ROW)?).collect();
    }

    let premium = selector(PREMIUM_MARKER)?;
    let long_quality = selector(LONG_QUALITY)?;
    let size = selector(SIZE)?;

    for row in rows {
        if row.select(&premium).next().is_some() {
            info!("Found premium only link");
            continue;
        }

        let Some(link) = row.value().attr("data") else {
            warn!("Download row without a link, skipping");
            continue;
        };

        let quality = match row.select(&long_quality).next() {
            Some(label) => element_text(label).replace(LONG_QUALITY_PREFIX, ""),
            None => row.value().attr("id").unwrap_or_default().to_string(),
        };

        let size_text = match row.select(&size).next() {
            Some(size) => element_text(size),
            None => {
                warn!("Download row '{}' has no size", quality);
                String::new()
            }
        };

        page.variants.push(Variant::new(quality, size_text, link));
    }

    Ok(page)
}
