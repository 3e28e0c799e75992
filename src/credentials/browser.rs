//! Interactive login through a real Chrome/Chromium instance.
//!
//! The provider only hands out session cookies to a browser that went through
//! its login form, so we drive one over the DevTools protocol, submit the
//! form, and keep the resulting cookies.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chrono::Utc;
use futures::StreamExt;
use secrecy::ExposeSecret;

use super::{LoginCredentials, SessionData, SessionProvider};

const USER_FIELD: &str = "#iduserName";
const PASSWORD_FIELD: &str = "#password";
const SUBMIT_BUTTON: &str = "#idIngresar";

/// Logs in through the provider's web form and captures the session cookies.
pub struct BrowserLogin {
    login_url: String,
    credentials: LoginCredentials,
    headless: bool,
}

impl BrowserLogin {
    pub fn new(login_url: impl Into<String>, credentials: LoginCredentials) -> Self {
        Self {
            login_url: login_url.into(),
            credentials,
            headless: false,
        }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    async fn login(&self, browser: &Browser) -> Result<SessionData> {
        let page = browser
            .new_page(self.login_url.as_str())
            .await
            .context("Failed to open login page")?;

        page.find_element(USER_FIELD)
            .await
            .context("Login form has no user field")?
            .click()
            .await?
            .type_str(&self.credentials.username)
            .await?;

        page.find_element(PASSWORD_FIELD)
            .await
            .context("Login form has no password field")?
            .click()
            .await?
            .type_str(self.credentials.password.expose_secret())
            .await?;

        page.find_element(SUBMIT_BUTTON)
            .await
            .context("Login form has no submit button")?
            .click()
            .await?;

        page.wait_for_navigation()
            .await
            .context("Login did not navigate away from the form")?;

        let cookies = page.get_cookies().await.context("Failed to read cookies")?;
        let mut session = SessionData::new();
        for cookie in cookies {
            session.cookies.insert(cookie.name, cookie.value);
        }
        session.captured_at = Some(Utc::now().timestamp());

        if session.is_empty() {
            anyhow::bail!("Login finished without any session cookies");
        }

        tracing::info!(cookies = session.cookies.len(), "captured login session");
        Ok(session)
    }
}

#[async_trait]
impl SessionProvider for BrowserLogin {
    async fn acquire(&self) -> Result<SessionData> {
        let (mut browser, mut handler) = launch_browser(self.headless).await?;
        let handler_task = tokio::spawn(async move { while (handler.next().await).is_some() {} });

        let result = self.login(&browser).await;

        if let Err(err) = browser.close().await {
            tracing::debug!(error = %err, "browser did not close cleanly");
        }
        handler_task.abort();

        result
    }
}

async fn launch_browser(headless: bool) -> Result<(Browser, chromiumoxide::handler::Handler)> {
    let chrome_path = find_chrome()
        .context("Chrome/Chromium not found. Please install Chrome or Chromium to log in.")?;

    let mut builder = BrowserConfig::builder()
        .chrome_executable(chrome_path)
        .window_size(1280, 800)
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--no-first-run")
        .arg("--no-default-browser-check");
    if !headless {
        builder = builder.with_head();
    }

    let config = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to configure browser: {e}"))?;

    Browser::launch(config)
        .await
        .context("Failed to launch browser")
}

/// Find Chrome/Chromium executable.
fn find_chrome() -> Option<String> {
    for name in ["google-chrome", "chromium"] {
        if let Ok(output) = std::process::Command::new("which").arg(name).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Some(path);
                }
            }
        }
    }

    let candidates = [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];

    candidates
        .into_iter()
        .find(|candidate| Path::new(candidate).exists())
        .map(str::to_string)
}
