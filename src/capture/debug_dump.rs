use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Keeps the first few product-bearing network payloads on disk so the
/// payload shapes can be inspected offline.
#[derive(Debug)]
pub struct DebugDumper {
    dir: PathBuf,
    limit: usize,
    written: AtomicUsize,
}

impl DebugDumper {
    pub fn new(dir: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            dir: dir.into(),
            limit,
            written: AtomicUsize::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> usize {
        self.written.load(Ordering::SeqCst).min(self.limit)
    }

    /// Write `data` as `net_NNN.json` when it mentions products and the limit
    /// has not been reached. Returns the path written, if any.
    pub fn maybe_dump(&self, url: &str, data: &Value) -> Option<PathBuf> {
        if self.written.load(Ordering::SeqCst) >= self.limit {
            return None;
        }
        let text = serde_json::to_string(data).ok()?;
        if !text.contains("producto") {
            return None;
        }

        let slot = self.written.fetch_add(1, Ordering::SeqCst);
        if slot >= self.limit {
            return None;
        }

        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!("debug dump: failed to create {}: {}", self.dir.display(), e);
            return None;
        }
        let path = self.dir.join(format!("net_{:03}.json", slot));
        let body = json!({ "url": url, "data": data });
        let pretty = serde_json::to_string_pretty(&body).ok()?;
        match std::fs::write(&path, pretty) {
            Ok(()) => {
                debug!("debug dump: {} ← {}", path.display(), url);
                Some(path)
            }
            Err(e) => {
                warn!("debug dump: failed to write {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dumps_only_product_payloads_up_to_limit() {
        let tmp = tempfile::tempdir().unwrap();
        let dumper = DebugDumper::new(tmp.path().join("debug"), 2);

        assert!(dumper.maybe_dump("https://x/api/config", &json!({"theme": "dark"})).is_none());
        let first = dumper
            .maybe_dump("https://x/api/list", &json!({"productos": []}))
            .unwrap();
        assert!(first.ends_with("net_000.json"));
        assert!(dumper.maybe_dump("https://x/api/p/1", &json!({"id_producto": 1})).is_some());
        assert!(dumper.maybe_dump("https://x/api/p/2", &json!({"id_producto": 2})).is_none());
        assert_eq!(dumper.written(), 2);

        let saved: Value =
            serde_json::from_str(&std::fs::read_to_string(first).unwrap()).unwrap();
        assert_eq!(saved["url"], json!("https://x/api/list"));
    }
}
