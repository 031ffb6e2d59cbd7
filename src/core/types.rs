use serde::{Deserialize, Serialize};
use std::fmt;

/// Which producer a capture fragment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceLabel {
    /// Response body observed on the wire.
    #[serde(rename = "NETWORK")]
    Network,
    /// Payload drained from the in-page `JSON.parse` capture buffer.
    #[serde(rename = "MEMORY_CACHE")]
    MemoryCache,
}

impl SourceLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceLabel::Network => "NETWORK",
            SourceLabel::MemoryCache => "MEMORY_CACHE",
        }
    }
}

impl fmt::Display for SourceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Viewport size plus the extents of sticky chrome that covers it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportInfo {
    pub width: f64,
    pub height: f64,
    /// Bottom edge of the lowest fixed/sticky header (0 when none).
    #[serde(default)]
    pub header_height: f64,
    /// Height covered by fixed/sticky footers at the bottom (0 when none).
    #[serde(default)]
    pub footer_height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// What part of the card the probe will click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProbeKind {
    /// The product image preceding the marker text.
    Img,
    /// The marker text itself (no visible image found).
    Txt,
}

/// Raw identifier hints collected around a card element, in page order of
/// preference. Interpretation happens in `interaction::candidates`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdHints {
    /// `data-*` attributes of the nearest card/product ancestor.
    #[serde(default)]
    pub dataset: Vec<(String, String)>,
    /// `href` of the nearest ancestor link.
    #[serde(default)]
    pub href: Option<String>,
    /// `src` of the nearest image around the card.
    #[serde(default)]
    pub image_src: Option<String>,
}

/// One clickable card as reported by the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardProbe {
    /// Position of the marker element in document order.
    pub index: usize,
    pub kind: ProbeKind,
    pub rect: Rect,
    /// Attached, rendered and not hidden by CSS.
    pub visible: bool,
    #[serde(default)]
    pub hints: IdHints,
}

/// A card selected for a visit during the current pass.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitCandidate {
    pub index: usize,
    pub kind: ProbeKind,
    pub product_id: Option<String>,
    pub center_x: f64,
    pub center_y: f64,
    pub height: f64,
    pub visibility: f64,
    pub row_bucket: i64,
}

impl VisitCandidate {
    /// Short label for logs (`ID:123` or `?`).
    pub fn label(&self) -> String {
        match self.product_id.as_deref() {
            Some(id) => format!("ID:{}", id),
            None => "?".to_string(),
        }
    }
}
