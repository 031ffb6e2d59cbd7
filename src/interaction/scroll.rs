//! Scroll planner.

use super::surface::PageSurface;
use crate::core::config::GridSettings;
use crate::types::{ViewportInfo, VisitCandidate};
use anyhow::Result;

/// How far to scroll after a pass.
///
/// With visited cards: the span between the topmost and bottommost card
/// centres, plus one average card height, plus the margin, which pushes the
/// last processed row above the safe band. Without: a fixed fraction of the
/// viewport.
pub fn plan_advance(visited: &[VisitCandidate], viewport_height: f64, grid: &GridSettings) -> f64 {
    if visited.is_empty() {
        return viewport_height * grid.fallback_scroll_fraction;
    }
    let min_y = visited.iter().map(|c| c.center_y).fold(f64::INFINITY, f64::min);
    let max_y = visited
        .iter()
        .map(|c| c.center_y)
        .fold(f64::NEG_INFINITY, f64::max);
    let avg_h = visited.iter().map(|c| c.height).sum::<f64>() / visited.len() as f64;
    (max_y - min_y) + avg_h + grid.scroll_margin_px
}

/// Wheel-scroll by `distance` with the pointer at the viewport centre.
pub async fn apply_scroll(
    surface: &dyn PageSurface,
    viewport: &ViewportInfo,
    distance: f64,
) -> Result<()> {
    surface
        .wheel(viewport.width / 2.0, viewport.height / 2.0, distance)
        .await
}
