//! Session acquisition.
//!
//! Everything the data source needs from authentication is a cookie header.
//! A [`SessionProvider`] produces it: from a real browser login, from an
//! environment variable, or from a recent cached login.

#[cfg(feature = "browser")]
mod browser;
mod session;

#[cfg(feature = "browser")]
pub use browser::BrowserLogin;
pub use session::{SessionCache, SessionData};

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::SecretString;

use crate::clock::{Clock, SystemClock};

/// Environment variable holding the login user.
pub const USER_ENV: &str = "BANK_USER";
/// Environment variable holding the login password.
pub const PASSWORD_ENV: &str = "BANK_PASSWORD";

/// Produces an authenticated session for the data source.
///
/// Failing here is fatal for a run: nothing is fetched and no snapshot is written.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn acquire(&self) -> Result<SessionData>;
}

/// User and password for the interactive login.
pub struct LoginCredentials {
    pub username: String,
    pub password: SecretString,
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl LoginCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Read `BANK_USER` / `BANK_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        let username = std::env::var(USER_ENV)
            .with_context(|| format!("{USER_ENV} is not set"))?;
        let password = std::env::var(PASSWORD_ENV)
            .with_context(|| format!("{PASSWORD_ENV} is not set"))?;
        if username.trim().is_empty() {
            anyhow::bail!("{USER_ENV} is empty");
        }
        Ok(Self::new(username, password))
    }
}

/// Session taken verbatim from an environment variable holding a cookie header.
#[derive(Debug, Clone)]
pub struct EnvCookieSession {
    var: String,
}

impl EnvCookieSession {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl SessionProvider for EnvCookieSession {
    async fn acquire(&self) -> Result<SessionData> {
        let header = std::env::var(&self.var)
            .with_context(|| format!("{} is not set", self.var))?;
        let session = SessionData::from_cookie_header(header.trim());
        if session.is_empty() {
            anyhow::bail!("{} holds an empty cookie header", self.var);
        }
        Ok(session)
    }
}

/// Reuses a cached session while it is younger than `max_age`, otherwise asks
/// the inner provider for a fresh one and caches it.
pub struct CachedSession<P> {
    inner: P,
    cache: SessionCache,
    key: String,
    max_age: Duration,
    clock: Arc<dyn Clock>,
}

impl<P: SessionProvider> CachedSession<P> {
    pub fn new(inner: P, cache: SessionCache, max_age: Duration) -> Self {
        Self {
            inner,
            cache,
            key: "default".to_string(),
            max_age,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl<P: SessionProvider> SessionProvider for CachedSession<P> {
    async fn acquire(&self) -> Result<SessionData> {
        let now = self.clock.now();
        match self.cache.get(&self.key) {
            Ok(Some(session)) if !session.is_empty() && session.is_fresh(now, self.max_age) => {
                tracing::debug!(key = %self.key, "reusing cached session");
                return Ok(session);
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "ignoring unreadable session cache"),
        }

        let mut session = self.inner.acquire().await?;
        if session.captured_at.is_none() {
            session.captured_at = Some(now.timestamp());
        }
        if let Err(err) = self.cache.set(&self.key, &session) {
            tracing::warn!(error = %err, "failed to cache session");
        }
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SessionProvider for CountingProvider {
        async fn acquire(&self) -> Result<SessionData> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(SessionData::new().with_cookie("session", n.to_string()))
        }
    }

    #[tokio::test]
    async fn cached_session_is_reused_while_fresh() -> Result<()> {
        let dir = TempDir::new()?;
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let provider = CachedSession::new(
            CountingProvider {
                calls: AtomicUsize::new(0),
            },
            SessionCache::with_path(dir.path())?,
            Duration::from_secs(600),
        )
        .with_clock(Arc::new(FixedClock::new(now)));

        let first = provider.acquire().await?;
        let second = provider.acquire().await?;

        assert_eq!(first.cookie_header(), "session=1");
        assert_eq!(second.cookie_header(), "session=1");
        assert_eq!(provider.inner.calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn stale_cached_session_triggers_login() -> Result<()> {
        let dir = TempDir::new()?;
        let cache = SessionCache::with_path(dir.path())?;
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        cache.set(
            "default",
            &SessionData::new()
                .with_cookie("session", "old")
                .captured(now - chrono::Duration::hours(1)),
        )?;

        let provider = CachedSession::new(
            CountingProvider {
                calls: AtomicUsize::new(0),
            },
            cache,
            Duration::from_secs(600),
        )
        .with_clock(Arc::new(FixedClock::new(now)));

        let session = provider.acquire().await?;
        assert_eq!(session.cookie_header(), "session=1");
        assert_eq!(session.captured_at, Some(now.timestamp()));
        Ok(())
    }

    #[test]
    fn login_credentials_debug_hides_password() {
        let creds = LoginCredentials::new("12345678-9", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("12345678-9"));
        assert!(!debug.contains("hunter2"));
    }
}
