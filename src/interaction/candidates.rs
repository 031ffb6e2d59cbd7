//! Candidate selector: turns raw card probes into an ordered visit list.

use super::geometry::{visibility_ratio, SafeBand};
use crate::core::config::GridSettings;
use crate::types::{CardProbe, IdHints, ViewportInfo, VisitCandidate};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::debug;

static HREF_ID: OnceLock<Regex> = OnceLock::new();
static IMAGE_ID: OnceLock<Regex> = OnceLock::new();

fn href_id_pattern() -> &'static Regex {
    HREF_ID.get_or_init(|| Regex::new(r"/productos?/(\d+)|[?&]id=(\d+)").expect("valid href pattern"))
}

fn image_id_pattern() -> &'static Regex {
    IMAGE_ID.get_or_init(|| Regex::new(r"/(\d{3,})").expect("valid image pattern"))
}

/// Best-effort product id for a card: ancestor `data-*` attributes, then the
/// enclosing link, then the nearby image. First match wins.
pub fn infer_card_id(hints: &IdHints) -> Option<String> {
    let from_dataset = hints.dataset.iter().find_map(|(key, value)| {
        let key = key.to_ascii_lowercase();
        let value = value.trim();
        let keyed = key.contains("producto") || key.contains("id");
        let numeric = !value.is_empty() && value.chars().all(|c| c.is_ascii_digit());
        (keyed && numeric).then(|| value.to_string())
    });
    if from_dataset.is_some() {
        return from_dataset;
    }

    let from_href = hints.href.as_deref().and_then(|href| {
        let caps = href_id_pattern().captures(href)?;
        caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string())
    });
    if from_href.is_some() {
        return from_href;
    }

    hints.image_src.as_deref().and_then(|src| {
        image_id_pattern()
            .captures(src)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    })
}

pub fn row_bucket(y: f64, bucket_px: f64) -> i64 {
    (y / bucket_px).round() as i64
}

/// Keep visible cards centred inside the safe band with enough of their
/// height on screen, collapse duplicates and order them row by row, left to
/// right.
pub fn select_candidates(
    viewport: &ViewportInfo,
    probes: Vec<CardProbe>,
    grid: &GridSettings,
) -> Vec<VisitCandidate> {
    let band = SafeBand::of(viewport);
    let mut seen: HashSet<(Option<String>, i64, Option<i64>)> = HashSet::new();
    let mut out = Vec::new();

    for probe in probes {
        if !probe.visible {
            continue;
        }
        let center_y = probe.rect.center_y();
        let visibility = visibility_ratio(&probe.rect, viewport.height);
        if !band.contains(center_y) || visibility < grid.min_visibility {
            debug!(
                "card #{} skipped (center_y={:.0}, visibility={:.2})",
                probe.index, center_y, visibility
            );
            continue;
        }

        let product_id = infer_card_id(&probe.hints);
        let row = row_bucket(center_y, grid.row_bucket_px);
        let center_x = probe.rect.center_x();
        // Without an id, only an exact grid cell counts as the same card.
        let column = product_id
            .is_none()
            .then(|| row_bucket(center_x, grid.row_bucket_px));
        if !seen.insert((product_id.clone(), row, column)) {
            continue;
        }

        out.push(VisitCandidate {
            index: probe.index,
            kind: probe.kind,
            product_id,
            center_x,
            center_y,
            height: probe.rect.height,
            visibility,
            row_bucket: row,
        });
    }

    out.sort_by(|a, b| {
        a.row_bucket
            .cmp(&b.row_bucket)
            .then_with(|| a.center_x.total_cmp(&b.center_x))
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProbeKind, Rect};

    fn viewport() -> ViewportInfo {
        ViewportInfo {
            width: 1280.0,
            height: 900.0,
            header_height: 100.0,
            footer_height: 0.0,
        }
    }

    fn probe(index: usize, x: f64, y: f64, id: Option<&str>) -> CardProbe {
        CardProbe {
            index,
            kind: ProbeKind::Img,
            rect: Rect { x, y, width: 200.0, height: 180.0 },
            visible: true,
            hints: IdHints {
                dataset: id
                    .map(|v| vec![("idProducto".to_string(), v.to_string())])
                    .unwrap_or_default(),
                href: None,
                image_src: None,
            },
        }
    }

    #[test]
    fn test_two_by_two_grid_visits_row_major() {
        // Document order deliberately scrambled.
        let probes = vec![
            probe(0, 400.0, 400.0, Some("4")),
            probe(1, 100.0, 150.0, Some("1")),
            probe(2, 100.0, 402.0, Some("3")),
            probe(3, 400.0, 148.0, Some("2")),
        ];
        let order: Vec<String> = select_candidates(&viewport(), probes, &GridSettings::default())
            .into_iter()
            .map(|c| c.product_id.unwrap())
            .collect();
        assert_eq!(order, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_filters_band_visibility_and_hidden() {
        let mut hidden = probe(0, 100.0, 300.0, Some("1"));
        hidden.visible = false;
        let under_header = probe(1, 100.0, -20.0, Some("2")); // center 70 < header 100
        let clipped = probe(2, 100.0, 780.0, Some("3")); // center 870, only 120/180 visible
        let ok = probe(3, 100.0, 500.0, Some("4"));
        let picked = select_candidates(
            &viewport(),
            vec![hidden, under_header, clipped, ok],
            &GridSettings::default(),
        );
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].product_id.as_deref(), Some("4"));
        assert!((picked[0].center_y - 590.0).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_detection_collapses_same_card() {
        let probes = vec![
            probe(0, 100.0, 300.0, Some("9")),
            probe(1, 130.0, 301.0, Some("9")),
            probe(2, 100.0, 300.0, None),
            probe(3, 400.0, 300.0, None),
            probe(4, 100.0, 301.0, None),
        ];
        let picked = select_candidates(&viewport(), probes, &GridSettings::default());
        let indices: Vec<usize> = picked.iter().map(|c| c.index).collect();
        // #1 repeats id 9 in the same row; #4 repeats the id-less cell of #2.
        assert_eq!(indices, vec![0, 2, 3]);
    }

    #[test]
    fn test_id_inference_priority() {
        let all = IdHints {
            dataset: vec![
                ("color".into(), "123".into()),
                ("productoId".into(), "55".into()),
            ],
            href: Some("/productos/66".into()),
            image_src: Some("https://cdn/img/77777.png".into()),
        };
        assert_eq!(infer_card_id(&all), Some("55".into()));

        let href_only = IdHints {
            dataset: vec![("id".into(), "abc".into())],
            href: Some("/catalogo?page=2&id=66".into()),
            image_src: Some("/img/777.png".into()),
        };
        assert_eq!(infer_card_id(&href_only), Some("66".into()));

        let image_only = IdHints {
            href: Some("/about".into()),
            image_src: Some("https://cdn/products/4821/thumb.jpg".into()),
            ..Default::default()
        };
        assert_eq!(infer_card_id(&image_only), Some("4821".into()));

        let short_image = IdHints {
            image_src: Some("/img/12.png".into()),
            ..Default::default()
        };
        assert_eq!(infer_card_id(&short_image), None);
    }
}
