use crate::capture::CaptureAggregator;
use crate::core::config::EngineSettings;
use crate::features::command_channel::ScrollSwitch;
use crate::features::snapshot::SnapshotWriter;
use std::sync::Arc;
use tracing::warn;

/// Shared handles the driver, the interaction cycle and the background tasks
/// operate on. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HarvestState {
    pub aggregator: Arc<CaptureAggregator>,
    pub writer: Arc<SnapshotWriter>,
    pub auto_scroll: ScrollSwitch,
    pub settings: Arc<EngineSettings>,
}

impl HarvestState {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            aggregator: Arc::new(CaptureAggregator::new()),
            writer: Arc::new(SnapshotWriter::new(settings.snapshot_path.clone())),
            auto_scroll: ScrollSwitch::new(settings.start_enabled),
            settings: Arc::new(settings),
        }
    }

    /// Persist the current record set. Failures are logged and reported as
    /// `false`; the next tick retries.
    pub fn flush(&self) -> bool {
        let records = self.aggregator.snapshot();
        match self.writer.write(&records) {
            Ok(_) => true,
            Err(e) => {
                warn!("snapshot write failed (will retry): {}", e);
                false
            }
        }
    }
}
