//! Login and session verification for the authenticated source

use crate::error::GrabError;
use crate::platform::client::SiteClient;
use crate::platform::scrape::{element_text, selector};
use crate::platform::session::{load_cookies, save_cookies, Credentials, SessionCookies};
use reqwest::StatusCode;
use scraper::Html;
use std::path::Path;
use tracing::{debug, info, warn};
use url::Url;

const LOGIN_PATH: &str = "/login";
const ACCOUNT_PATH: &str = "/account";
const LOGIN_FORM: &str = "div.um-form form#login-form";
const ACCOUNT_MARKER: &str = "span.account-name";

/// Result of a login attempt. A rejected login is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Cookies set by the login response
    LoggedIn(SessionCookies),
    /// Non-200 (or missing form) at `stage`
    Failed { stage: &'static str, status: u16 },
}

impl LoginOutcome {
    /// Turn a failed login into `GrabError::LoginFailed`
    pub fn into_result(self) -> Result<SessionCookies, GrabError> {
        match self {
            LoginOutcome::LoggedIn(cookies) => Ok(cookies),
            LoginOutcome::Failed { stage, status } => Err(GrabError::LoginFailed { stage, status }),
        }
    }
}

/// Two-state authenticator: probes the account page and performs form login.
/// It never persists anything; callers hand it cookies and store what it returns.
pub struct Authenticator {
    client: SiteClient,
    base_url: String,
}

impl Authenticator {
    pub fn new(client: SiteClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// True iff the account page answers 200 and carries the account marker
    pub async fn check_authenticated(&self, cookies: &SessionCookies) -> Result<bool, GrabError> {
        let url = format!("{}{}", self.base_url, ACCOUNT_PATH);
        let response = self.client.get_page(&url, Some(cookies)).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            info!("Not authenticated (account page status {})", status.as_u16());
            return Ok(false);
        }

        let body = response.text().await?;
        match account_name(&body)? {
            Some(name) => {
                info!("Authenticated as: {}", name);
                Ok(true)
            }
            None => {
                info!("Not authenticated");
                Ok(false)
            }
        }
    }

    /// Fetch the login form, submit the credentials and return the cookies
    /// the site set. No retries.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, GrabError> {
        let login_url = format!("{}{}", self.base_url, LOGIN_PATH);
        let response = self.client.get_page(&login_url, None).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("Failed to fetch login page. Status code: {}", status.as_u16());
            return Ok(LoginOutcome::Failed {
                stage: "login page",
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let Some(action) = login_form_action(&body)? else {
            warn!("Login form not found on {}", login_url);
            return Ok(LoginOutcome::Failed {
                stage: "login form",
                status: status.as_u16(),
            });
        };

        let action_url = Url::parse(&self.base_url)?.join(&action)?;
        debug!("Submitting login form to {}", action_url);

        let form = [
            ("username", credentials.username.as_str()),
            ("user_password", credentials.password.as_str()),
        ];
        let response = self.client.post_form(action_url.as_str(), &form).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("Login failed. Status code: {}", status.as_u16());
            return Ok(LoginOutcome::Failed {
                stage: "submit",
                status: status.as_u16(),
            });
        }

        let cookies: SessionCookies = response
            .cookies()
            .map(|cookie| (cookie.name().to_string(), cookie.value().to_string()))
            .collect();

        info!("Login successful!");
        debug!("Received cookies: {:?}", cookies.names());
        Ok(LoginOutcome::LoggedIn(cookies))
    }
}

/// Bring up an authenticated session: reuse the cached cookies when they still
/// work, otherwise log in, verify and cache the new cookies. `None` means the
/// site would not authenticate us.
pub async fn ensure_session(
    auth: &Authenticator,
    credentials: &Credentials,
    cookie_path: &Path,
) -> Result<Option<SessionCookies>, GrabError> {
    let cached = load_cookies(cookie_path);
    if !cached.is_empty() && auth.check_authenticated(&cached).await? {
        return Ok(Some(cached));
    }

    let fresh = match auth.login(credentials).await?.into_result() {
        Ok(cookies) => cookies,
        Err(e) => {
            warn!("{}", e);
            return Ok(None);
        }
    };

    if !auth.check_authenticated(&fresh).await? {
        warn!(
            "{}",
            GrabError::LoginFailed {
                stage: "verify",
                status: 200
            }
        );
        return Ok(None);
    }

    save_cookies(&fresh, cookie_path)?;
    Ok(Some(fresh))
}

/// Account name shown in the marker span, if present
fn account_name(html: &str) -> Result<Option<String>, GrabError> {
    let document = Html::parse_document(html);
    let marker = selector(ACCOUNT_MARKER)?;
    let name = document.select(&marker).next().map(element_text);
    Ok(name)
}

/// `action` attribute of the login form, if present
fn login_form_action(html: &str) -> Result<Option<String>, GrabError> {
    let document = Html::parse_document(html);
    let form = selector(LOGIN_FORM)?;
    let action = document
        .select(&form)
        .next()
        .and_then(|form| form.value().attr("action"))
        .map(str::to_string);
    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const LOGIN_PAGE: &str = r#"
        <html><body>
          <div class="um-form">
            <form id="login-form" method="post" action="/login/">
              <input name="username"><input name="user_password" type="password">
            </form>
          </div>
        </body></html>"#;

    fn authenticator(server: &mockito::ServerGuard) -> Authenticator {
        Authenticator::new(SiteClient::new().unwrap(), server.url())
    }

    fn session() -> SessionCookies {
        [("sid".to_string(), "abc".to_string())].into_iter().collect()
    }

    #[tokio::test]
    async fn test_check_authenticated_with_marker() {
        let mut server = mockito::Server::new_async().await;
        let _account = server
            .mock("GET", "/account")
            .match_header("cookie", "sid=abc")
            .with_status(200)
            .with_body(r#"<html><span class="account-name">alice</span></html>"#)
            .create_async()
            .await;

        let auth = authenticator(&server);
        assert!(auth.check_authenticated(&session()).await.unwrap());
    }

    #[tokio::test]
    async fn test_check_authenticated_without_marker() {
        let mut server = mockito::Server::new_async().await;
        let _account = server
            .mock("GET", "/account")
            .with_status(200)
            .with_body("<html><a href=\"/login\">Log in</a></html>")
            .create_async()
            .await;

        let auth = authenticator(&server);
        assert!(!auth.check_authenticated(&session()).await.unwrap());
    }

    #[tokio::test]
    async fn test_check_authenticated_non_200_is_false() {
        for status in [201, 401, 403, 404, 500, 503] {
            let mut server = mockito::Server::new_async().await;
            let _account = server
                .mock("GET", "/account")
                .with_status(status)
                .with_body(r#"<span class="account-name">alice</span>"#)
                .create_async()
                .await;

            let auth = authenticator(&server);
            assert!(
                !auth.check_authenticated(&session()).await.unwrap(),
                "status {} counted as authenticated",
                status
            );
        }
    }

    #[tokio::test]
    async fn test_login_success_returns_response_cookies() {
        let mut server = mockito::Server::new_async().await;
        let _page = server
            .mock("GET", "/login")
            .with_status(200)
            .with_body(LOGIN_PAGE)
            .create_async()
            .await;
        let _submit = server
            .mock("POST", "/login/")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("username".into(), "alice".into()),
                Matcher::UrlEncoded("user_password".into(), "hunter2".into()),
            ]))
            .with_status(200)
            .with_header("set-cookie", "wordpress_logged_in=token123; Path=/; HttpOnly")
            .with_body("welcome")
            .create_async()
            .await;

        let auth = authenticator(&server);
        let outcome = auth.login(&Credentials::new("alice", "hunter2")).await.unwrap();
        let cookies = outcome.into_result().unwrap();
        assert_eq!(cookies.get("wordpress_logged_in"), Some("token123"));
    }

    #[tokio::test]
    async fn test_login_page_failure() {
        let mut server = mockito::Server::new_async().await;
        let _page = server.mock("GET", "/login").with_status(503).create_async().await;

        let auth = authenticator(&server);
        let outcome = auth.login(&Credentials::new("alice", "hunter2")).await.unwrap();
        assert_eq!(outcome, LoginOutcome::Failed { stage: "login page", status: 503 });
    }

    #[tokio::test]
    async fn test_login_submit_failure() {
        let mut server = mockito::Server::new_async().await;
        let _page = server
            .mock("GET", "/login")
            .with_status(200)
            .with_body(LOGIN_PAGE)
            .create_async()
            .await;
        let _submit = server.mock("POST", "/login/").with_status(401).create_async().await;

        let auth = authenticator(&server);
        let outcome = auth.login(&Credentials::new("alice", "wrong")).await.unwrap();
        assert!(matches!(
            outcome.into_result(),
            Err(GrabError::LoginFailed { stage: "submit", status: 401 })
        ));
    }

    #[tokio::test]
    async fn test_login_form_missing() {
        let mut server = mockito::Server::new_async().await;
        let _page = server
            .mock("GET", "/login")
            .with_status(200)
            .with_body("<html><p>maintenance</p></html>")
            .create_async()
            .await;

        let auth = authenticator(&server);
        let outcome = auth.login(&Credentials::new("alice", "hunter2")).await.unwrap();
        assert_eq!(outcome, LoginOutcome::Failed { stage: "login form", status: 200 });
    }

    async fn mock_login(server: &mut mockito::ServerGuard) -> (mockito::Mock, mockito::Mock) {
        let page = server
            .mock("GET", "/login")
            .with_status(200)
            .with_body(LOGIN_PAGE)
            .create_async()
            .await;
        let submit = server
            .mock("POST", "/login/")
            .with_status(200)
            .with_header("set-cookie", "wordpress_logged_in=token123; Path=/")
            .create_async()
            .await;
        (page, submit)
    }

    #[tokio::test]
    async fn test_ensure_session_logs_in_and_caches() {
        let mut server = mockito::Server::new_async().await;
        let _anonymous = server
            .mock("GET", "/account")
            .match_header("cookie", Matcher::Missing)
            .with_status(200)
            .with_body("<html>please log in</html>")
            .create_async()
            .await;
        let _member = server
            .mock("GET", "/account")
            .match_header("cookie", "wordpress_logged_in=token123")
            .with_status(200)
            .with_body(r#"<span class="account-name">alice</span>"#)
            .create_async()
            .await;
        let _login = mock_login(&mut server).await;

        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("vrp_cookie_cache");
        let auth = authenticator(&server);

        let cookies = ensure_session(&auth, &Credentials::new("alice", "hunter2"), &cache)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cookies.get("wordpress_logged_in"), Some("token123"));
        assert_eq!(load_cookies(&cache), cookies);
    }

    #[tokio::test]
    async fn test_ensure_session_reuses_valid_cache() {
        let mut server = mockito::Server::new_async().await;
        let _member = server
            .mock("GET", "/account")
            .match_header("cookie", "sid=abc")
            .with_status(200)
            .with_body(r#"<span class="account-name">alice</span>"#)
            .create_async()
            .await;
        let login_page = server
            .mock("GET", "/login")
            .expect(0)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("vrp_cookie_cache");
        save_cookies(&session(), &cache).unwrap();

        let auth = authenticator(&server);
        let cookies = ensure_session(&auth, &Credentials::new("alice", "hunter2"), &cache)
            .await
            .unwrap();
        assert_eq!(cookies, Some(session()));
        login_page.assert_async().await;
    }

    #[tokio::test]
    async fn test_ensure_session_unverified_login_is_not_cached() {
        let mut server = mockito::Server::new_async().await;
        let _account = server
            .mock("GET", "/account")
            .with_status(200)
            .with_body("<html>please log in</html>")
            .create_async()
            .await;
        let _login = mock_login(&mut server).await;

        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("vrp_cookie_cache");
        let auth = authenticator(&server);

        let cookies = ensure_session(&auth, &Credentials::new("alice", "hunter2"), &cache)
            .await
            .unwrap();
        assert!(cookies.is_none());
        assert!(!cache.exists());
    }

    #[tokio::test]
    async fn test_ensure_session_rejected_login() {
        let mut server = mockito::Server::new_async().await;
        let _page = server.mock("GET", "/login").with_status(500).create_async().await;

        let dir = tempfile::tempdir().unwrap();
        let auth = authenticator(&server);
        let cookies = ensure_session(
            &auth,
            &Credentials::new("alice", "hunter2"),
            &dir.path().join("vrp_cookie_cache"),
        )
        .await
        .unwrap();
        assert!(cookies.is_none());
    }

    #[test]
    fn test_login_form_action_parsing() {
        assert_eq!(login_form_action(LOGIN_PAGE).unwrap().as_deref(), Some("/login/"));
        // The form must sit inside the um-form container.
        let stray = r#"<form id="login-form" action="/elsewhere"></form>"#;
        assert_eq!(login_form_action(stray).unwrap(), None);
    }
}
