//! Geometry prober: read-only measurements of the rendered page.

use super::surface::PageSurface;
use crate::types::{CardProbe, Rect, ViewportInfo};
use anyhow::{anyhow, Result};
use tracing::debug;

/// Vertical band of the viewport not covered by sticky chrome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafeBand {
    pub top: f64,
    pub bottom: f64,
}

impl SafeBand {
    pub fn of(viewport: &ViewportInfo) -> Self {
        let top = viewport.header_height.max(0.0);
        let bottom = (viewport.height - viewport.footer_height.max(0.0)).max(top);
        Self { top, bottom }
    }

    pub fn contains(&self, y: f64) -> bool {
        y >= self.top && y <= self.bottom
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// Fraction of `rect`'s height that lies inside `[0, viewport_height]`.
pub fn visibility_ratio(rect: &Rect, viewport_height: f64) -> f64 {
    if rect.height <= 0.0 {
        return 0.0;
    }
    let visible_top = rect.y.max(0.0);
    let visible_bottom = rect.bottom().min(viewport_height);
    let visible = (visible_bottom - visible_top).max(0.0);
    (visible / rect.height).min(1.0)
}

/// Measure the viewport. Layout can change between passes, so this runs
/// fresh every time.
pub async fn measure_viewport(surface: &dyn PageSurface) -> Result<ViewportInfo> {
    let viewport = surface.viewport().await?;
    if !(viewport.height > 0.0 && viewport.width > 0.0) {
        return Err(anyhow!(
            "viewport reported a degenerate size ({}x{})",
            viewport.width,
            viewport.height
        ));
    }
    let band = SafeBand::of(&viewport);
    debug!(
        "viewport {}x{} safe band [{:.0}, {:.0}] ({:.0}px)",
        viewport.width,
        viewport.height,
        band.top,
        band.bottom,
        band.height()
    );
    Ok(viewport)
}

pub async fn probe_cards(surface: &dyn PageSurface, marker: &str) -> Result<Vec<CardProbe>> {
    let probes = surface.card_probes(marker).await?;
    debug!("{} card marker(s) matched", probes.len());
    Ok(probes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(y: f64, height: f64) -> Rect {
        Rect { x: 0.0, y, width: 100.0, height }
    }

    #[test]
    fn test_visibility_ratio() {
        assert!((visibility_ratio(&rect(100.0, 200.0), 900.0) - 1.0).abs() < 1e-9);
        assert!((visibility_ratio(&rect(-50.0, 200.0), 900.0) - 0.75).abs() < 1e-9);
        assert!((visibility_ratio(&rect(800.0, 200.0), 900.0) - 0.5).abs() < 1e-9);
        assert_eq!(visibility_ratio(&rect(1000.0, 200.0), 900.0), 0.0);
        assert_eq!(visibility_ratio(&rect(10.0, 0.0), 900.0), 0.0);
    }

    #[test]
    fn test_safe_band_excludes_sticky_chrome() {
        let vp = ViewportInfo {
            width: 1280.0,
            height: 900.0,
            header_height: 120.0,
            footer_height: 60.0,
        };
        let band = SafeBand::of(&vp);
        assert_eq!(band, SafeBand { top: 120.0, bottom: 840.0 });
        assert!(band.contains(120.0));
        assert!(!band.contains(850.0));
        assert!((band.height() - 720.0).abs() < 1e-9);
    }

    #[test]
    fn test_safe_band_never_inverts() {
        let vp = ViewportInfo {
            width: 1280.0,
            height: 300.0,
            header_height: 250.0,
            footer_height: 200.0,
        };
        let band = SafeBand::of(&vp);
        assert_eq!(band.top, band.bottom);
    }
}
