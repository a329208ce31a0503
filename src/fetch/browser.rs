//! Chromium-backed page fetcher
//!
//! One browser per worker, one fresh tab per fetch. The catalog payload is
//! read from the document response body through CDP rather than from the
//! rendered DOM.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use chromiumoxide::Page;
use chromiumoxide::auth::Credentials;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, EventResponseReceived, GetResponseBodyParams, ResourceType, TimeSinceEpoch,
};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::cdp::browser_protocol::storage::{ClearCookiesParams, SetCookiesParams};
use futures::FutureExt;
use futures::StreamExt;
use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::payload::decode_page;
use super::session::fresh_session_cookies;
use super::types::{FetchError, FetchedPage, FetcherFactory, PageFetcher};
use crate::browser_profile::{BrowserProfile, create_worker_profile};
use crate::browser_setup::{BrowserLaunchOptions, launch_browser};
use crate::utils::constants::{ALLOWED_STATUSES, PROXY_CHECK_TIMEOUT_SECS};
use crate::worker::WorkerId;

fn session_err(e: impl std::fmt::Display) -> FetchError {
    FetchError::Session(e.to_string())
}

fn navigation_err(e: impl std::fmt::Display) -> FetchError {
    FetchError::Navigation(e.to_string())
}

/// Creates one [`ChromiumFetcher`] per worker
#[derive(Debug, Clone, Default)]
pub struct ChromiumFetcherFactory {
    options: Arc<BrowserLaunchOptions>,
}

impl ChromiumFetcherFactory {
    pub fn new(options: BrowserLaunchOptions) -> Self {
        Self {
            options: Arc::new(options),
        }
    }
}

impl FetcherFactory for ChromiumFetcherFactory {
    fn create(&self, worker: WorkerId) -> BoxFuture<'_, Result<Box<dyn PageFetcher>, FetchError>> {
        async move {
            let fetcher = ChromiumFetcher::launch(worker, &self.options).await?;
            Ok(Box::new(fetcher) as Box<dyn PageFetcher>)
        }
        .boxed()
    }
}

/// A worker's private browser session
pub struct ChromiumFetcher {
    worker: WorkerId,
    browser: Browser,
    handler: JoinHandle<()>,
    /// Answered to proxy authentication challenges on every page
    proxy_auth: Option<Credentials>,
    // Dropped after the browser is closed
    _profile: BrowserProfile,
}

impl ChromiumFetcher {
    pub async fn launch(
        worker: WorkerId,
        options: &BrowserLaunchOptions,
    ) -> Result<Self, FetchError> {
        let profile = create_worker_profile(worker).map_err(session_err)?;
        let (browser, handler) = launch_browser(options, profile.path())
            .await
            .map_err(session_err)?;

        match browser.version().await {
            Ok(version) => info!(worker = %worker, product = %version.product, "Browser session ready"),
            Err(e) => {
                handler.abort();
                return Err(session_err(e));
            }
        }

        let mut fetcher = Self {
            worker,
            browser,
            handler,
            proxy_auth: options.proxy_auth.as_ref().map(|auth| Credentials {
                username: auth.username.clone(),
                password: auth.password.clone(),
            }),
            _profile: profile,
        };

        if let Some(check_url) = &options.proxy_check_url
            && let Err(e) = fetcher.check_proxy(check_url).await
        {
            warn!(worker = %worker, error = %e, "Proxy check failed");
            fetcher.close().await;
            return Err(e);
        }

        Ok(fetcher)
    }

    /// Blank tab that can pass through an authenticating proxy
    async fn open_page(&self) -> Result<Page, FetchError> {
        let page = self.browser.new_page("about:blank").await.map_err(session_err)?;
        if let Some(credentials) = &self.proxy_auth
            && let Err(e) = page.authenticate(credentials.clone()).await
        {
            let _ = page.close().await;
            return Err(session_err(e));
        }
        Ok(page)
    }

    async fn check_proxy(&self, url: &str) -> Result<(), FetchError> {
        let page = self.open_page().await?;
        let deadline = Duration::from_secs(PROXY_CHECK_TIMEOUT_SECS);

        let checked = tokio::time::timeout(deadline, async {
            page.goto(url).await.map_err(navigation_err)?;
            page.evaluate("document.body ? document.body.innerText : ''")
                .await
                .map_err(navigation_err)?
                .into_value::<String>()
                .map_err(|e| FetchError::Payload(e.to_string()))
        })
        .await;

        if let Err(e) = page.close().await {
            debug!(worker = %self.worker, "Failed to close page: {}", e);
        }

        match checked {
            Ok(Ok(body)) => {
                let summary: String = body.chars().take(200).collect();
                info!(worker = %self.worker, info = %summary.trim(), "Proxy connected");
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(FetchError::Timeout(deadline)),
        }
    }

    async fn navigate(page: &Page, url: &str, referer: &str) -> Result<FetchedPage, FetchError> {
        // Subscribe before navigating so the document response is buffered
        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(session_err)?;

        let params = NavigateParams::builder()
            .url(url)
            .referrer(referer)
            .build()
            .map_err(FetchError::Navigation)?;
        page.goto(params).await.map_err(navigation_err)?;

        let document = loop {
            match responses.next().await {
                Some(event) if event.r#type == ResourceType::Document => break event,
                Some(_) => continue,
                None => {
                    return Err(FetchError::Navigation(
                        "response stream closed before the document arrived".into(),
                    ));
                }
            }
        };

        let status = document.response.status;
        if !ALLOWED_STATUSES.contains(&status) {
            return Err(FetchError::UnexpectedStatus {
                status,
                url: url.to_string(),
            });
        }
        if !document.response.mime_type.contains("json") {
            return Err(FetchError::Payload(format!(
                "expected JSON document, got {}",
                document.response.mime_type
            )));
        }

        let body = page
            .execute(GetResponseBodyParams::new(document.request_id.clone()))
            .await
            .map_err(navigation_err)?;

        let bytes = if body.base64_encoded {
            base64::engine::general_purpose::STANDARD
                .decode(body.body.as_bytes())
                .map_err(|e| FetchError::Payload(e.to_string()))?
        } else {
            body.body.clone().into_bytes()
        };

        decode_page(&bytes)
    }
}

impl PageFetcher for ChromiumFetcher {
    fn fetch<'a>(
        &'a mut self,
        url: &'a str,
        referer: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<FetchedPage, FetchError>> {
        async move {
            let page = self.open_page().await?;

            let result = match tokio::time::timeout(timeout, Self::navigate(&page, url, referer)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(timeout)),
            };

            if let Err(e) = page.close().await {
                debug!(worker = %self.worker, "Failed to close page: {}", e);
            }

            result
        }
        .boxed()
    }

    fn reset_session(&mut self) -> BoxFuture<'_, Result<(), FetchError>> {
        async move {
            self.browser
                .execute(ClearCookiesParams::default())
                .await
                .map_err(session_err)?;

            let now = chrono::Utc::now().timestamp();
            let mut cookies = Vec::with_capacity(2);
            for cookie in fresh_session_cookies(now) {
                let mut builder = CookieParam::builder()
                    .name(cookie.name)
                    .value(cookie.value)
                    .domain(cookie.domain)
                    .path(cookie.path);
                if let Some(expires) = cookie.expires {
                    builder = builder.expires(TimeSinceEpoch::new(expires as f64));
                }
                cookies.push(builder.build().map_err(FetchError::Session)?);
            }

            self.browser
                .execute(SetCookiesParams::new(cookies))
                .await
                .map_err(session_err)?;

            debug!(worker = %self.worker, "Browser session reset");
            Ok(())
        }
        .boxed()
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        async move {
            if let Err(e) = self.browser.close().await {
                warn!(worker = %self.worker, "Failed to close browser: {}", e);
            }
            if let Err(e) = self.browser.wait().await {
                warn!(worker = %self.worker, "Failed to wait for browser exit: {}", e);
            }
            self.handler.abort();
            info!(worker = %self.worker, "Browser session closed");
        }
        .boxed()
    }
}

impl Drop for ChromiumFetcher {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
