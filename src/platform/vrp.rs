//! Authenticated source: session, scrape, select, fetch

use crate::core::config::RunConfig;
use crate::core::page::{PageInfo, Variant};
use crate::core::progress::Progress;
use crate::download::fetcher::{ProgressCallback, StreamingFetcher};
use crate::download::select::select_largest_under;
use crate::error::GrabError;
use crate::platform::auth::{ensure_session, Authenticator};
use crate::platform::client::{HttpClientConfig, SiteClient};
use crate::platform::scrape::PageScraper;
use crate::platform::session::{Credentials, SessionCookies};
use crate::platform::{record_outcome, GrabbedFile, Grabber};
use crate::utils::filename::{detox, variant_filename};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Grabs the largest variant under the size ceiling from each content page
pub struct VrpGrabber {
    config: RunConfig,
    client: SiteClient,
    progress_callback: Option<ProgressCallback>,
}

impl VrpGrabber {
    pub fn new(config: RunConfig) -> Result<Self, GrabError> {
        let client = SiteClient::with_config(HttpClientConfig {
            timeout: config.timeout,
        })?;
        Ok(Self {
            config,
            client,
            progress_callback: None,
        })
    }

    /// Set progress callback
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    fn fetcher(&self) -> StreamingFetcher {
        let mut fetcher = StreamingFetcher::new(self.client.clone());
        if let Some(callback) = &self.progress_callback {
            let callback = callback.clone();
            fetcher = fetcher.with_progress_callback(move |progress| callback(progress));
        }
        fetcher
    }

    async fn session(&self) -> Result<Option<SessionCookies>, GrabError> {
        let credentials = match Credentials::load(&self.config.credentials_path()) {
            Ok(credentials) => credentials,
            Err(GrabError::MissingConfig(path)) => {
                warn!("[VRP]{} not found.", path);
                return Ok(None);
            }
            Err(e) if !e.is_fatal() => {
                warn!(
                    "[VRP]{} is unreadable: {}",
                    self.config.credentials_path().display(),
                    e
                );
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let auth = Authenticator::new(self.client.clone(), &self.config.base_url);
        ensure_session(&auth, &credentials, &self.config.cookie_cache_path()).await
    }

    async fn grab_one(
        &self,
        scraper: &PageScraper,
        url: &str,
        cookies: &SessionCookies,
        scratch_dir: &Path,
    ) -> Result<GrabbedFile, GrabError> {
        let page = scraper.scrape(url, cookies).await?;
        let target = select_largest_under(&page.variants, self.config.size_ceiling_bytes)
            .ok_or(GrabError::NoVariant)?;

        info!("[VRP]Grabbing: {}({})", page.name, target.quality);
        let grabbed = planned_file(&page, target, scratch_dir);
        self.fetcher().download(&target.download_link, &grabbed.file).await?;
        Ok(grabbed)
    }
}

/// Scratch location and final naming for a chosen variant
fn planned_file(page: &PageInfo, variant: &Variant, scratch_dir: &Path) -> GrabbedFile {
    let title = detox(&page.name);
    let quality = detox(&variant.quality);
    let filename = variant_filename(&page.name, &variant.quality, "mp4");

    GrabbedFile {
        subfolder: format!("{}-{}-{}", detox(&page.author), title, quality),
        file: scratch_dir.join(&filename),
        filename,
    }
}

#[async_trait::async_trait]
impl Grabber for VrpGrabber {
    fn name(&self) -> &str {
        "VRP"
    }

    async fn grab(&self, urls: &[String], scratch_dir: &Path) -> Result<Vec<GrabbedFile>, GrabError> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }

        let session = match self.session().await {
            Ok(session) => session,
            Err(e) if !e.is_fatal() => {
                error!("[VRP]Authentication error: {}", e);
                None
            }
            Err(e) => return Err(e),
        };
        let Some(cookies) = session else {
            error!("[VRP]Could not authenticate, skipping {} URL(s)", urls.len());
            return Ok(Vec::new());
        };

        let scraper = PageScraper::new(self.client.clone());
        let mut grabbed = Vec::new();

        for url in urls {
            let outcome = self.grab_one(&scraper, url, &cookies, scratch_dir).await;
            record_outcome(url, outcome, &mut grabbed)?;
        }

        Ok(grabbed)
    }
}
