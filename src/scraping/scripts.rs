//! In-page scripts evaluated through CDP.
//!
//! All of them are read-only except the capture hook, which wraps
//! `JSON.parse` once per document and buffers product-shaped payloads in
//! `window.__DATOS_CAPTURADOS__` until the engine drains them.

/// Wraps `JSON.parse`. Buffered payloads: catalog listings (`productos`
/// arrays), bare product arrays, and pricing detail objects (unwrapped from a
/// `data` envelope when present). Safe to evaluate repeatedly.
pub const CAPTURE_HOOK: &str = r#"(() => {
    if (window.__JSON_SPY_ACTIVE__) return true;
    window.__JSON_SPY_ACTIVE__ = true;
    window.__DATOS_CAPTURADOS__ = window.__DATOS_CAPTURADOS__ || [];
    const originalParse = JSON.parse;
    JSON.parse = function (text, reviver) {
        const data = originalParse.call(this, text, reviver);
        try {
            const isListing = data && Array.isArray(data.productos);
            const isProductArray = Array.isArray(data) && data.length > 0 && data[0] && data[0].id_producto;
            let payload = data;
            let hasPrices = false;
            if (data && data.producto_precios_especificos) {
                hasPrices = true;
            } else if (data && data.data && data.data.producto_precios_especificos) {
                hasPrices = true;
                payload = data.data;
            }
            if (isListing || isProductArray || hasPrices) {
                window.__DATOS_CAPTURADOS__.push(payload);
            }
        } catch (e) {}
        return data;
    };
    return true;
})()"#;

/// Returns the buffered payloads and empties the buffer.
pub const DRAIN_BUFFER: &str = r#"(() => {
    const items = window.__DATOS_CAPTURADOS__ || [];
    window.__DATOS_CAPTURADOS__ = [];
    return items;
})()"#;

/// Viewport size plus fixed/sticky header and footer extents.
pub const VIEWPORT: &str = r#"(() => {
    const height = window.innerHeight;
    const width = window.innerWidth;
    const pinned = (el) => {
        const position = window.getComputedStyle(el).position;
        return position === 'fixed' || position === 'sticky';
    };

    let headerHeight = 0;
    const headerSelectors = ['header', '[role="banner"]', '.header', '.navbar', '.nav-bar', '.top-bar', '.site-header'];
    for (const selector of headerSelectors) {
        for (const el of document.querySelectorAll(selector)) {
            const rect = el.getBoundingClientRect();
            if (pinned(el) && rect.top <= 10) headerHeight = Math.max(headerHeight, rect.bottom);
        }
    }

    let footerHeight = 0;
    const footerSelectors = ['footer', '[role="contentinfo"]', '.footer', '.site-footer', '.bottom-bar'];
    for (const selector of footerSelectors) {
        for (const el of document.querySelectorAll(selector)) {
            const rect = el.getBoundingClientRect();
            if (pinned(el) && rect.bottom >= height - 10) footerHeight = Math.max(footerHeight, height - rect.top);
        }
    }

    return { width, height, headerHeight, footerHeight };
})()"#;

const CARD_PROBES_TEMPLATE: &str = r#"(() => {
    const marker = new RegExp(__MARKER__, 'i');
    const roots = [document];
    const glass = document.querySelector('flt-glass-pane');
    if (glass && glass.shadowRoot) roots.push(glass.shadowRoot);

    const isVisible = (el) => {
        if (!el || !el.isConnected) return false;
        const style = window.getComputedStyle(el);
        if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') return false;
        const r = el.getBoundingClientRect();
        return r.width > 0 && r.height > 0;
    };
    const rectOf = (el) => {
        const r = el.getBoundingClientRect();
        return { x: r.x, y: r.y, width: r.width, height: r.height };
    };
    const precedingImage = (el) => {
        let found = null;
        for (const img of el.getRootNode().querySelectorAll('img')) {
            if (img.compareDocumentPosition(el) & Node.DOCUMENT_POSITION_FOLLOWING) found = img;
            else break;
        }
        return found;
    };
    const hintsFor = (el, img) => {
        const dataset = [];
        const card = el.closest('[class*="card"], [class*="producto"]');
        if (card) {
            for (const [k, v] of Object.entries(card.dataset || {})) dataset.push([k, String(v)]);
        }
        const link = el.closest('a');
        let imageSrc = img ? img.getAttribute('src') : null;
        if (!imageSrc && card) {
            const inner = card.querySelector('img');
            if (inner) imageSrc = inner.getAttribute('src');
        }
        return { dataset, href: link ? link.getAttribute('href') : null, imageSrc };
    };

    const out = [];
    let index = 0;
    for (const root of roots) {
        for (const el of root.querySelectorAll('*')) {
            const text = el.textContent || '';
            if (!marker.test(text)) continue;
            // Deepest match only.
            if (Array.from(el.children).some((c) => marker.test(c.textContent || ''))) continue;
            try {
                const img = precedingImage(el);
                const useImg = img && isVisible(img);
                const target = useImg ? img : el;
                out.push({
                    index,
                    kind: useImg ? 'IMG' : 'TXT',
                    rect: rectOf(target),
                    visible: isVisible(target),
                    hints: hintsFor(el, img),
                });
            } catch (e) {}
            index += 1;
        }
    }
    return out;
})()"#;

/// Probe script for every element whose text matches `marker`
/// (case-insensitive regular expression source).
pub fn card_probe_script(marker: &str) -> String {
    let literal = serde_json::to_string(marker).unwrap_or_else(|_| "\"\"".to_string());
    CARD_PROBES_TEMPLATE.replace("__MARKER__", &literal)
}
