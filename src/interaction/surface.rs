use crate::types::{CardProbe, ViewportInfo};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Everything the engine needs from a live page. The production
/// implementation drives a `chromiumoxide::Page`
/// (see `scraping::page_surface`); tests script an in-memory page.
#[async_trait]
pub trait PageSurface: Send + Sync {
    /// Viewport size and sticky header/footer extents, measured now.
    async fn viewport(&self) -> Result<ViewportInfo>;

    /// Every element whose text matches `marker` (case-insensitive regex),
    /// with its bounding box and identifier hints. Elements that fail to
    /// measure are left out.
    async fn card_probes(&self, marker: &str) -> Result<Vec<CardProbe>>;

    /// Evaluate a read-only expression that yields a boolean.
    async fn probe(&self, script: &str) -> Result<bool>;

    /// Take (and clear) whatever the in-page capture hook buffered.
    async fn drain_capture_buffer(&self) -> Result<Vec<Value>>;

    /// Install the in-page capture hook (idempotent).
    async fn install_capture_hook(&self) -> Result<()>;

    /// Pointer move + press + release at viewport coordinates.
    async fn click(&self, x: f64, y: f64) -> Result<()>;

    /// Key down + key up for a named key such as `"Escape"`.
    async fn press_key(&self, key: &str) -> Result<()>;

    /// Mouse-wheel scroll of `delta_y` pixels with the pointer at (x, y).
    async fn wheel(&self, x: f64, y: f64, delta_y: f64) -> Result<()>;
}
