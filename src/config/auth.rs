//! Session credentials: CSRF token, legacy bearer token and the cookie jar.

use std::fmt;
use std::sync::{Arc, RwLock};

use reqwest::cookie::{CookieStore, Jar};
use reqwest::Url;

/// Name of the non-HTTP-only cookie carrying the CSRF token.
pub const CSRF_COOKIE_NAME: &str = "csrf-token";

/// Credentials attached to outgoing requests.
///
/// Cheap to clone; clones share state so a login on one handle is seen by
/// every manager using it.
#[derive(Clone, Default)]
pub struct SessionAuth {
    inner: Arc<RwLock<AuthInner>>,
    jar: Arc<Jar>,
}

#[derive(Default)]
struct AuthInner {
    csrf_token: Option<String>,
    bearer_token: Option<String>,
}

impl fmt::Debug for SessionAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read().unwrap_or_else(|p| p.into_inner());
        f.debug_struct("SessionAuth")
            .field("csrf_token", &inner.csrf_token.as_ref().map(|_| ".."))
            .field("bearer_token", &inner.bearer_token.as_ref().map(|_| ".."))
            .finish()
    }
}

impl SessionAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cookie jar used in credentialed mode.
    pub fn cookie_jar(&self) -> Arc<Jar> {
        self.jar.clone()
    }

    pub fn set_csrf_token(&self, token: impl Into<String>) {
        self.write().csrf_token = Some(token.into());
    }

    /// Set the legacy bearer token.
    pub fn set_bearer_token(&self, token: impl Into<String>) {
        self.write().bearer_token = Some(token.into());
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.read().bearer_token.clone()
    }

    /// CSRF token for a request to `url`: the in-memory value, else the
    /// `csrf-token` cookie the jar would send there.
    pub fn csrf_token(&self, url: &str) -> Option<String> {
        if let Some(token) = self.read().csrf_token.clone() {
            return Some(token);
        }
        let url = Url::parse(url).ok()?;
        let header = self.jar.cookies(&url)?;
        let header = header.to_str().ok()?;
        cookie_value(header, CSRF_COOKIE_NAME)
    }

    /// Forget the in-memory tokens.
    pub fn clear(&self) {
        let mut inner = self.write();
        inner.csrf_token = None;
        inner.bearer_token = None;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, AuthInner> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, AuthInner> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }
}

/// Extract a cookie value from a `Cookie` header string.
fn cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}
