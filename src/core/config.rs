use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// HarvesterConfig: file-based config loader (catalog-harvester.json) with env-var fallback
// ---------------------------------------------------------------------------

pub const ENV_CONFIG_PATH: &str = "CATALOG_HARVESTER_CONFIG";
pub const ENV_CDP_URL: &str = "HARVESTER_CDP_URL";
pub const ENV_OUTPUT: &str = "HARVESTER_OUTPUT";
pub const ENV_DEBUG_DIR: &str = "HARVESTER_DEBUG_DIR";
pub const ENV_LISTEN_SECS: &str = "HARVESTER_LISTEN_SECS";
pub const ENV_AUTO_SCROLL: &str = "HARVESTER_AUTO_SCROLL";

const DEFAULT_CDP_URL: &str = "http://127.0.0.1:9222";
const DEFAULT_SNAPSHOT_PATH: &str = "outputs/panacea_clicks_enriquecido.json";
const DEFAULT_DEBUG_DIR: &str = "panacea_debug";

/// Browser session sub-config (`session` key).
#[derive(serde::Deserialize, Default, Clone, Debug)]
#[serde(default)]
pub struct SessionSection {
    /// DevTools endpoint of an already running Chromium, e.g. `http://127.0.0.1:9222`.
    /// A `ws://` URL is used as-is.
    pub cdp_url: Option<String>,
}

/// Output sub-config (`output` key).
#[derive(serde::Deserialize, Default, Clone, Debug)]
#[serde(default)]
pub struct OutputSection {
    pub snapshot_path: Option<PathBuf>,
    pub debug_dir: Option<PathBuf>,
    /// How many raw network payloads to keep for offline inspection. Default: 80.
    pub max_debug_dumps: Option<usize>,
}

/// Timing sub-config (`timing` key). All values in the unit named by the field.
#[derive(serde::Deserialize, Default, Clone, Debug)]
#[serde(default)]
pub struct TimingSection {
    pub run_ceiling_secs: Option<u64>,
    pub buffer_poll_ms: Option<u64>,
    pub save_interval_secs: Option<u64>,
    pub detail_timeout_ms: Option<u64>,
    pub detail_poll_ms: Option<u64>,
    pub settle_ms: Option<u64>,
    pub dismiss_pause_ms: Option<u64>,
    pub rerender_pause_ms: Option<u64>,
}

/// Card-grid sub-config (`grid` key).
#[derive(serde::Deserialize, Default, Clone, Debug)]
#[serde(default)]
pub struct GridSection {
    /// Case-insensitive regex matched against card text to find clickable cards.
    pub card_marker: Option<String>,
    pub min_visibility: Option<f64>,
    pub row_bucket_px: Option<f64>,
    pub scroll_margin_px: Option<f64>,
    pub fallback_scroll_fraction: Option<f64>,
}

/// Top-level config loaded from `catalog-harvester.json`.
#[derive(serde::Deserialize, Default, Clone, Debug)]
#[serde(default)]
pub struct HarvesterConfig {
    pub session: SessionSection,
    pub output: OutputSection,
    pub timing: TimingSection,
    pub grid: GridSection,
    /// Start with auto-scroll already enabled instead of waiting for the operator.
    pub start_enabled: Option<bool>,
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(key: &str) -> Option<bool> {
    let v = env_string(key)?.to_ascii_lowercase();
    Some(matches!(v.as_str(), "1" | "true" | "yes" | "on"))
}

impl HarvesterConfig {
    /// CDP endpoint: JSON field → `HARVESTER_CDP_URL` → `http://127.0.0.1:9222`.
    pub fn resolve_cdp_url(&self) -> String {
        if let Some(u) = &self.session.cdp_url {
            if !u.trim().is_empty() {
                return u.trim().to_string();
            }
        }
        env_string(ENV_CDP_URL).unwrap_or_else(|| DEFAULT_CDP_URL.to_string())
    }

    /// Snapshot path: JSON field → `HARVESTER_OUTPUT` → `outputs/panacea_clicks_enriquecido.json`.
    pub fn resolve_snapshot_path(&self) -> PathBuf {
        if let Some(p) = &self.output.snapshot_path {
            return p.clone();
        }
        env_string(ENV_OUTPUT)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_PATH))
    }

    /// Debug dump directory: JSON field → `HARVESTER_DEBUG_DIR` → `panacea_debug`.
    pub fn resolve_debug_dir(&self) -> PathBuf {
        if let Some(p) = &self.output.debug_dir {
            return p.clone();
        }
        env_string(ENV_DEBUG_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DEBUG_DIR))
    }

    /// Hard wall-clock ceiling: JSON field → `HARVESTER_LISTEN_SECS` → 4 hours.
    pub fn resolve_run_ceiling(&self) -> Duration {
        let secs = self
            .timing
            .run_ceiling_secs
            .or_else(|| env_string(ENV_LISTEN_SECS).and_then(|v| v.parse().ok()))
            .unwrap_or(14_400);
        Duration::from_secs(secs)
    }

    /// Initial auto-scroll state: JSON field → `HARVESTER_AUTO_SCROLL` → off.
    pub fn resolve_start_enabled(&self) -> bool {
        self.start_enabled
            .or_else(|| env_flag(ENV_AUTO_SCROLL))
            .unwrap_or(false)
    }

    /// Resolve every field into the concrete settings the engine runs with.
    pub fn resolve(&self) -> EngineSettings {
        let t = &self.timing;
        let ms = |v: Option<u64>, default: u64| Duration::from_millis(v.unwrap_or(default));
        let grid_defaults = GridSettings::default();

        EngineSettings {
            cdp_url: self.resolve_cdp_url(),
            snapshot_path: self.resolve_snapshot_path(),
            debug_dir: self.resolve_debug_dir(),
            max_debug_dumps: self.output.max_debug_dumps.unwrap_or(80),
            start_enabled: self.resolve_start_enabled(),
            timing: TimingSettings {
                run_ceiling: self.resolve_run_ceiling(),
                buffer_poll: ms(t.buffer_poll_ms, 500),
                save_interval: Duration::from_secs(t.save_interval_secs.unwrap_or(10)),
                detail_timeout: ms(t.detail_timeout_ms, 8_000),
                detail_poll: ms(t.detail_poll_ms, 50),
                settle: ms(t.settle_ms, 500),
                dismiss_pause: ms(t.dismiss_pause_ms, 300),
                rerender_pause: ms(t.rerender_pause_ms, 800),
            },
            grid: GridSettings {
                card_marker: self
                    .grid
                    .card_marker
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or(grid_defaults.card_marker),
                min_visibility: self
                    .grid
                    .min_visibility
                    .unwrap_or(grid_defaults.min_visibility),
                row_bucket_px: self
                    .grid
                    .row_bucket_px
                    .filter(|v| *v > 0.0)
                    .unwrap_or(grid_defaults.row_bucket_px),
                scroll_margin_px: self
                    .grid
                    .scroll_margin_px
                    .unwrap_or(grid_defaults.scroll_margin_px),
                fallback_scroll_fraction: self
                    .grid
                    .fallback_scroll_fraction
                    .unwrap_or(grid_defaults.fallback_scroll_fraction),
            },
        }
    }
}

/// Load `catalog-harvester.json`.
///
/// Search order (first found wins):
/// 1. `explicit` (the `--config` flag)
/// 2. `CATALOG_HARVESTER_CONFIG` env var path
/// 3. `./catalog-harvester.json`
/// 4. `../catalog-harvester.json`
///
/// Missing file → `HarvesterConfig::default()` (all env-var fallbacks apply).
/// Parse error → log a warning, return `HarvesterConfig::default()`.
pub fn load_harvester_config(explicit: Option<&Path>) -> HarvesterConfig {
    let mut candidates = vec![
        PathBuf::from("catalog-harvester.json"),
        PathBuf::from("../catalog-harvester.json"),
    ];
    if let Some(env_path) = env_string(ENV_CONFIG_PATH) {
        candidates.insert(0, PathBuf::from(env_path));
    }
    if let Some(p) = explicit {
        candidates.insert(0, p.to_path_buf());
    }

    for path in &candidates {
        let Ok(contents) = std::fs::read_to_string(path) else {
            continue;
        };
        match serde_json::from_str::<HarvesterConfig>(&contents) {
            Ok(cfg) => {
                tracing::info!("catalog-harvester.json loaded from {}", path.display());
                return cfg;
            }
            Err(e) => {
                tracing::warn!(
                    "catalog-harvester.json parse error at {}: {}; using defaults",
                    path.display(),
                    e
                );
                return HarvesterConfig::default();
            }
        }
    }

    HarvesterConfig::default()
}

// ---------------------------------------------------------------------------

/// Geometry knobs for candidate selection and scroll planning.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSettings {
    pub card_marker: String,
    /// Minimum fraction of a card's height that must be on screen.
    pub min_visibility: f64,
    pub row_bucket_px: f64,
    pub scroll_margin_px: f64,
    /// Fraction of the viewport height scrolled when nothing was visited.
    pub fallback_scroll_fraction: f64,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            card_marker: "Ficha T.cnica".to_string(),
            min_visibility: 0.80,
            row_bucket_px: 10.0,
            scroll_margin_px: 20.0,
            fallback_scroll_fraction: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimingSettings {
    pub run_ceiling: Duration,
    pub buffer_poll: Duration,
    pub save_interval: Duration,
    pub detail_timeout: Duration,
    pub detail_poll: Duration,
    pub settle: Duration,
    pub dismiss_pause: Duration,
    pub rerender_pause: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub cdp_url: String,
    pub snapshot_path: PathBuf,
    pub debug_dir: PathBuf,
    pub max_debug_dumps: usize,
    pub start_enabled: bool,
    pub timing: TimingSettings,
    pub grid: GridSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        HarvesterConfig::default().resolve()
    }
}
