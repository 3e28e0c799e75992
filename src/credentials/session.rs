//! Session cache for storing transient authentication state.
//!
//! Cookies captured by a login are kept locally so that runs shortly after
//! each other don't need to drive the browser again.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated provider session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    /// Session cookies (name -> value).
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,

    /// A pre-formatted cookie header, used when cookies came in as one string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_cookie_header: Option<String>,

    /// When the session was captured (Unix timestamp).
    #[serde(default)]
    pub captured_at: Option<i64>,
}

impl SessionData {
    /// Create a new empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Session built from an already formatted `Cookie` header value.
    pub fn from_cookie_header(header: impl Into<String>) -> Self {
        Self {
            raw_cookie_header: Some(header.into()),
            ..Self::default()
        }
    }

    /// Add a cookie.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn captured(mut self, at: DateTime<Utc>) -> Self {
        self.captured_at = Some(at.timestamp());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
            && self
                .raw_cookie_header
                .as_deref()
                .map_or(true, |header| header.trim().is_empty())
    }

    /// Format cookies as a Cookie header value.
    pub fn cookie_header(&self) -> String {
        if let Some(raw) = &self.raw_cookie_header {
            return raw.clone();
        }
        self.cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// True when the session was captured less than `max_age` before `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        match self.captured_at {
            Some(captured_at) => {
                let age = now.timestamp() - captured_at;
                age >= 0 && (age as u64) < max_age.as_secs()
            }
            None => false,
        }
    }
}

/// Cache for session data, stored locally.
pub struct SessionCache {
    cache_dir: PathBuf,
}

impl SessionCache {
    /// Create a new session cache.
    ///
    /// Uses `~/.cache/cardbook/sessions/` by default.
    pub fn new() -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .context("Could not find cache directory")?
            .join("cardbook")
            .join("sessions");
        Self::with_path(cache_dir)
    }

    /// Create a session cache at a custom location.
    pub fn with_path(cache_dir: impl AsRef<Path>) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create session cache dir: {cache_dir:?}"))?;
        Ok(Self { cache_dir })
    }

    fn session_file(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{key}.json"))
    }

    /// Load the cached session stored under `key`.
    pub fn get(&self, key: &str) -> Result<Option<SessionData>> {
        let path = self.session_file(key);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session file: {path:?}"))?;

        let session: SessionData = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {path:?}"))?;

        Ok(Some(session))
    }

    /// Save session data under `key`.
    pub fn set(&self, key: &str, session: &SessionData) -> Result<()> {
        let path = self.session_file(key);
        let content =
            serde_json::to_string_pretty(session).context("Failed to serialize session")?;

        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write session file: {path:?}"))?;

        Ok(())
    }

    /// Delete the cached session stored under `key`.
    pub fn delete(&self, key: &str) -> Result<()> {
        let path = self.session_file(key);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to delete session file: {path:?}"))?;
        }
        Ok(())
    }
}
