//! Session cookie persistence and login credentials

use crate::error::GrabError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// Cookie name to value mapping that represents an authenticated identity.
/// Opaque to everything except the `Cookie` header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCookies(BTreeMap<String, String>);

impl SessionCookies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Cookie names, for logging without leaking values
    pub fn names(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as a `Cookie` header value: `a=1; b=2`
    pub fn header_value(&self) -> String {
        self.0
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl FromIterator<(String, String)> for SessionCookies {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Load persisted cookies. Never fails: an absent or malformed file yields an
/// empty set.
pub fn load_cookies(path: &Path) -> SessionCookies {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("{} not found", path.display());
            return SessionCookies::new();
        }
        Err(e) => {
            warn!("Could not read {}: {}", path.display(), e);
            return SessionCookies::new();
        }
    };

    match serde_json::from_str::<SessionCookies>(&contents) {
        Ok(cookies) => {
            debug!("Loaded {} cookies from {}", cookies.len(), path.display());
            cookies
        }
        Err(e) => {
            warn!("{} has invalid JSON: {}", path.display(), e);
            SessionCookies::new()
        }
    }
}

/// Persist cookies, replacing the file wholesale. The new contents are written
/// to a temp file next to `path` and renamed over it, so a failed save leaves
/// the previous file untouched.
pub fn save_cookies(cookies: &SessionCookies, path: &Path) -> Result<(), GrabError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let json = serde_json::to_string(cookies)?;
    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(json.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| GrabError::IoError(e.error))?;

    debug!("Saved {} cookies to {}", cookies.len(), path.display());
    Ok(())
}

/// Login credentials, read once from the credentials file and never written
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read the credentials file; an absent file is a configuration error
    pub fn load(path: &Path) -> Result<Self, GrabError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GrabError::MissingConfig(path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&contents)?)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio_test::{assert_err, assert_ok};

    fn sample() -> SessionCookies {
        let mut cookies = SessionCookies::new();
        cookies.insert("wordpress_logged_in", "user|123|abc");
        cookies.insert("PHPSESSID", "deadbeef");
        cookies
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vrp_cookie_cache");

        let cookies = sample();
        assert_ok!(save_cookies(&cookies, &path));
        assert_eq!(load_cookies(&path), cookies);
    }

    #[test]
    fn test_save_overwrites_previous_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vrp_cookie_cache");

        save_cookies(&sample(), &path).unwrap();
        let mut replacement = SessionCookies::new();
        replacement.insert("only", "one");
        assert_ok!(save_cookies(&replacement, &path));

        assert_eq!(load_cookies(&path), replacement);
    }

    #[test]
    fn test_failed_save_leaves_previous_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vrp_cookie_cache");
        save_cookies(&sample(), &path).unwrap();

        // Parent directory does not exist, so the temp file cannot be created.
        let bad_path = dir.path().join("missing").join("vrp_cookie_cache");
        assert_err!(save_cookies(&SessionCookies::new(), &bad_path));
        assert_eq!(load_cookies(&path), sample());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let cookies = load_cookies(&dir.path().join("does-not-exist"));
        assert!(cookies.is_empty());
    }

    #[test]
    fn test_load_malformed_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vrp_cookie_cache");

        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_cookies(&path).is_empty());

        std::fs::write(&path, r#"{"nested": {"not": "flat"}}"#).unwrap();
        assert!(load_cookies(&path).is_empty());
    }

    #[test]
    fn test_header_value() {
        assert_eq!(
            sample().header_value(),
            "PHPSESSID=deadbeef; wordpress_logged_in=user|123|abc"
        );
        assert_eq!(SessionCookies::new().header_value(), "");
    }

    #[test]
    fn test_credentials_load_and_redaction() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vrp_credentials");
        std::fs::write(&path, r#"{"username": "alice", "password": "hunter2"}"#).unwrap();

        let creds = assert_ok!(Credentials::load(&path));
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password, "hunter2");
        assert!(!format!("{:?}", creds).contains("hunter2"));

        let missing = assert_err!(Credentials::load(&dir.path().join("nope")));
        assert!(matches!(missing, GrabError::MissingConfig(_)));

        std::fs::write(&path, r#"{"username": "alice"}"#).unwrap();
        let incomplete = assert_err!(Credentials::load(&path));
        assert!(matches!(incomplete, GrabError::JsonError(_)));
        assert!(!incomplete.is_fatal());
    }
}
