//! HTTP client shared by the authenticated source

use crate::error::GrabError;
use crate::platform::session::SessionCookies;
use reqwest::header::COOKIE;
use reqwest::{Client, ClientBuilder, RequestBuilder};
use std::time::Duration;
use tracing::debug;

/// Desktop browser user agent; the site serves its regular markup to it
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Connect timeout for every request, whole-request timeout for pages
    pub timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

/// Thin wrapper over `reqwest::Client` that knows how to attach session cookies
#[derive(Debug, Clone)]
pub struct SiteClient {
    client: Client,
    config: HttpClientConfig,
}

impl SiteClient {
    pub fn new() -> Result<Self, GrabError> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self, GrabError> {
        // No client-wide timeout: it would also cap the body of streamed downloads.
        let client = ClientBuilder::new()
            .connect_timeout(config.timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(Self { client, config })
    }

    /// GET a page, optionally with session cookies attached
    pub fn get_page(&self, url: &str, cookies: Option<&SessionCookies>) -> RequestBuilder {
        debug!("GET {}", url);
        let mut request = self
            .client
            .get(url)
            .timeout(self.config.timeout);
        if let Some(cookies) = cookies.filter(|c| !c.is_empty()) {
            request = request.header(COOKIE, cookies.header_value());
        }
        request
    }

    /// POST an urlencoded form
    pub fn post_form(&self, url: &str, form: &[(&str, &str)]) -> RequestBuilder {
        debug!("POST {}", url);
        self.client
            .post(url)
            .timeout(self.config.timeout)
            .form(form)
    }

    /// GET a media link for streaming; only the connect timeout applies
    pub fn get_stream(&self, url: &str) -> RequestBuilder {
        debug!("GET (stream) {}", url);
        self.client.get(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_config_default() {
        let config = HttpClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_get_page_attaches_cookies() {
        let client = SiteClient::new().unwrap();
        let cookies: SessionCookies = [("sid".to_string(), "abc".to_string())].into_iter().collect();
        let request = client
            .get_page("http://localhost/account", Some(&cookies))
            .build()
            .unwrap();
        assert_eq!(request.headers().get(COOKIE).unwrap(), "sid=abc");

        let request = client.get_page("http://localhost/login", None).build().unwrap();
        assert!(request.headers().get(COOKIE).is_none());
        assert_eq!(request.timeout(), Some(&Duration::from_secs(30)));
    }

    #[test]
    fn test_get_stream_has_no_request_timeout() {
        let client = SiteClient::new().unwrap();
        let request = client.get_stream("http://localhost/video.mp4").build().unwrap();
        assert!(request.timeout().is_none());
    }
}
