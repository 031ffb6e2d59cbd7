//! Detail-surface detection heuristics.
//!
//! Each heuristic looks for a different structural signature of the same
//! product detail modal rendered inside Flutter's `flt-glass-pane` shadow
//! root. They are independent and OR'd; order only decides which name gets
//! reported when several would fire.

use super::surface::PageSurface;
use tracing::debug;

/// One named, read-only page check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailHeuristic {
    pub name: &'static str,
    pub script: &'static str,
}

/// Dimmed modal barrier (`draw-rect` with 0.54 alpha background).
pub const BACKDROP: DetailHeuristic = DetailHeuristic {
    name: "BACKDROP",
    script: r#"(() => {
    const glass = document.querySelector('flt-glass-pane');
    if (!glass || !glass.shadowRoot) return false;
    for (const rect of glass.shadowRoot.querySelectorAll('draw-rect')) {
        const bg = rect.style.backgroundColor;
        if (bg && bg.includes('0.54')) return true;
    }
    return false;
})()"#,
};

/// Large white physical-shape clip with a drop shadow.
pub const PANEL: DetailHeuristic = DetailHeuristic {
    name: "CONTAINER",
    script: r#"(() => {
    const glass = document.querySelector('flt-glass-pane');
    if (!glass || !glass.shadowRoot) return false;
    for (const clip of glass.shadowRoot.querySelectorAll('flt-clip[clip-type="physical-shape"]')) {
        const s = clip.style;
        if (s.backgroundColor === 'rgb(255, 255, 255)' && s.boxShadow && s.boxShadow.includes('rgba')) {
            if (parseFloat(s.width) > 400 && parseFloat(s.height) > 500) return true;
        }
    }
    return false;
})()"#,
};

/// Pricing labels only the detail view renders.
pub const LABEL_TEXT: DetailHeuristic = DetailHeuristic {
    name: "CONTENT",
    script: r#"(() => {
    const glass = document.querySelector('flt-glass-pane');
    if (!glass || !glass.shadowRoot) return false;
    for (const p of glass.shadowRoot.querySelectorAll('p')) {
        const text = p.textContent || '';
        if (text.includes('Mejor precio:') || text.includes('Cantidad desde')) return true;
    }
    return false;
})()"#,
};

pub const DEFAULT_HEURISTICS: &[DetailHeuristic] = &[BACKDROP, PANEL, LABEL_TEXT];

/// Run the heuristics in order and return the first that fires. A heuristic
/// whose evaluation fails counts as not firing this tick.
pub async fn detect_detail(
    surface: &dyn PageSurface,
    heuristics: &[DetailHeuristic],
) -> Option<&'static str> {
    for h in heuristics {
        match surface.probe(h.script).await {
            Ok(true) => return Some(h.name),
            Ok(false) => {}
            Err(e) => debug!("detail heuristic {} failed: {}", h.name, e),
        }
    }
    None
}
