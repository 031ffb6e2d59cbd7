//! Attaching to an already-running browser over CDP.
//!
//! The harvester never launches or configures the browser: the operator
//! starts it with `--remote-debugging-port` and logs in by hand. We discover
//! the websocket endpoint through `/json/version`, connect, and attach to
//! the tab showing a web page.

use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

const CONNECT_ATTEMPTS: u32 = 5;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(2000);

/// Fatal startup failures. Anything here ends the process.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no CDP endpoint at {url} after {attempts} attempts: {last}")]
    Unreachable {
        url: String,
        attempts: u32,
        last: String,
    },
    #[error("browser exposes no page to attach to")]
    NoPage,
    #[error("browser session setup failed: {0}")]
    Setup(String),
}

/// `webSocketDebuggerUrl` advertised by the browser at `cdp_url`. A websocket
/// URL is returned unchanged.
pub async fn discover_ws_url(cdp_url: &str) -> anyhow::Result<String> {
    if cdp_url.starts_with("ws://") || cdp_url.starts_with("wss://") {
        return Ok(cdp_url.to_string());
    }
    let json_url = format!("{}/json/version", cdp_url.trim_end_matches('/'));
    let response = reqwest::get(&json_url)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP request failed: {}", e))?;
    let json: serde_json::Value = response
        .json()
        .await
        .map_err(|e| anyhow::anyhow!("JSON parse failed: {}", e))?;
    json["webSocketDebuggerUrl"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("No webSocketDebuggerUrl in response"))
}

pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: tokio::task::JoinHandle<()>,
    closed: Arc<AtomicBool>,
}

impl BrowserSession {
    /// Connect to the browser at `cdp_url` and attach to its first open tab.
    pub async fn connect(cdp_url: &str) -> Result<Self, SessionError> {
        let mut last_error = String::from("not attempted");
        let mut connected = None;

        for attempt in 1..=CONNECT_ATTEMPTS {
            let result: anyhow::Result<_> = async {
                let ws_url = discover_ws_url(cdp_url).await?;
                info!("discovered CDP endpoint: {}", ws_url);
                Browser::connect(ws_url)
                    .await
                    .map_err(|e| anyhow::anyhow!("Browser connect failed: {}", e))
            }
            .await;

            match result {
                Ok(pair) => {
                    connected = Some(pair);
                    break;
                }
                Err(e) => last_error = e.to_string(),
            }

            if attempt < CONNECT_ATTEMPTS {
                info!("CDP connection attempt {} failed, retrying...", attempt);
                tokio::time::sleep(CONNECT_RETRY_DELAY).await;
            }
        }

        let (mut browser, handler) = connected.ok_or_else(|| SessionError::Unreachable {
            url: cdp_url.to_string(),
            attempts: CONNECT_ATTEMPTS,
            last: last_error,
        })?;

        let closed = Arc::new(AtomicBool::new(false));
        let handler_task = spawn_handler_task(handler, Arc::clone(&closed));

        // Tabs opened before we attached are only known after target discovery.
        browser
            .fetch_targets()
            .await
            .map_err(|e| SessionError::Setup(e.to_string()))?;
        tokio::time::sleep(Duration::from_millis(500)).await;

        let pages = browser
            .pages()
            .await
            .map_err(|e| SessionError::Setup(e.to_string()))?;
        let page = pick_content_page(pages).await.ok_or(SessionError::NoPage)?;

        info!("[+] attached to browser tab");
        Ok(Self {
            browser,
            page,
            handler_task,
            closed,
        })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Detach without closing the operator's browser.
    pub async fn close(self) {
        info!("detaching from browser session");
        drop(self.browser);
        self.handler_task.abort();
    }
}

/// First tab showing a web page; any tab when none does.
async fn pick_content_page(pages: Vec<Page>) -> Option<Page> {
    let mut fallback = None;
    for page in pages {
        let url = page.url().await.ok().flatten().unwrap_or_default();
        if url.starts_with("http://") || url.starts_with("https://") {
            info!("using tab {}", url);
            return Some(page);
        }
        fallback.get_or_insert(page);
    }
    fallback
}

fn spawn_handler_task(
    mut handler: chromiumoxide::Handler,
    closed: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                warn!("chromiumoxide handler event error: {}", e);
            }
        }
        closed.store(true, Ordering::SeqCst);
    })
}
