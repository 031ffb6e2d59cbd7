//! Network observer: passively reads JSON response bodies off the wire and
//! feeds them to the aggregator as `NETWORK` fragments.

use crate::capture::{CaptureAggregator, DebugDumper};
use crate::types::SourceLabel;
use anyhow::{anyhow, Result};
use base64::Engine;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventResponseReceived,
    GetResponseBodyParams, RequestId, ResourceType,
};
use chromiumoxide::Page;
use futures::StreamExt;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Responses whose `loadingFinished` never arrives are dropped oldest first
/// once this many are outstanding.
const MAX_PENDING: usize = 512;

/// Request id to URL for responses still loading, oldest first.
#[derive(Debug)]
pub struct PendingResponses {
    entries: IndexMap<String, String>,
    capacity: usize,
}

impl PendingResponses {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn insert(&mut self, request_id: String, url: String) {
        self.entries.shift_remove(&request_id);
        if self.entries.len() >= self.capacity {
            if let Some((_, stale)) = self.entries.shift_remove_index(0) {
                debug!("dropping stale pending response {}", stale);
            }
        }
        self.entries.insert(request_id, url);
    }

    pub fn remove(&mut self, request_id: &str) -> Option<String> {
        self.entries.shift_remove(request_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Responses never worth a body fetch.
pub fn is_ignored_resource(kind: &ResourceType) -> bool {
    matches!(
        kind,
        ResourceType::Image | ResourceType::Font | ResourceType::Stylesheet | ResourceType::Media
    )
}

/// Decode a response body into JSON, if it is JSON.
pub fn parse_body(body: &str, base64_encoded: bool) -> Option<Value> {
    if base64_encoded {
        let bytes = base64::engine::general_purpose::STANDARD.decode(body).ok()?;
        serde_json::from_slice(&bytes).ok()
    } else {
        serde_json::from_str(body).ok()
    }
}

async fn fetch_body(page: &Page, request_id: RequestId) -> Result<Option<Value>> {
    let response = page
        .execute(GetResponseBodyParams::new(request_id))
        .await
        .map_err(|e| anyhow!("getResponseBody failed: {}", e))?;
    Ok(parse_body(&response.result.body, response.result.base64_encoded))
}

/// Enable the Network domain and start observing. The task ends when the
/// page's event streams close.
pub async fn spawn_network_observer(
    page: Page,
    aggregator: Arc<CaptureAggregator>,
    dumper: Arc<DebugDumper>,
) -> Result<JoinHandle<()>> {
    page.execute(EnableParams::default())
        .await
        .map_err(|e| anyhow!("Network.enable failed: {}", e))?;
    let mut responses = page.event_listener::<EventResponseReceived>().await?;
    let mut finished = page.event_listener::<EventLoadingFinished>().await?;
    let mut failed = page.event_listener::<EventLoadingFailed>().await?;

    Ok(tokio::spawn(async move {
        // Bodies are only retrievable once loading finished.
        let mut pending = PendingResponses::with_capacity(MAX_PENDING);
        loop {
            tokio::select! {
                Some(event) = responses.next() => {
                    if !is_ignored_resource(&event.r#type) {
                        pending.insert(event.request_id.inner().clone(), event.response.url.clone());
                    }
                }
                Some(event) = finished.next() => {
                    if let Some(url) = pending.remove(event.request_id.inner()) {
                        match fetch_body(&page, event.request_id.clone()).await {
                            Ok(Some(data)) => {
                                dumper.maybe_dump(&url, &data);
                                aggregator.submit(&data, SourceLabel::Network);
                            }
                            Ok(None) => {}
                            Err(e) => debug!("body for {} unavailable: {}", url, e),
                        }
                    }
                }
                Some(event) = failed.next() => {
                    pending.remove(event.request_id.inner());
                }
                else => break,
            }
        }
        info!("network observer stopped");
        if !pending.is_empty() {
            warn!("{} response(s) still pending at shutdown", pending.len());
        }
    }))
}
