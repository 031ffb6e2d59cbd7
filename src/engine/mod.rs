//! Driver loop: runs passes while auto-scroll is on, keeps the periodic work
//! alive while it is off, and stops at the wall-clock ceiling or on shutdown.

pub mod cadence;

use crate::capture::CaptureStats;
use crate::core::HarvestState;
use crate::interaction::{run_pass, PageSurface, PassReport};
use cadence::Cadence;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{info, warn};

const IDLE_TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Deadline,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub stop_reason: StopReason,
    pub passes: usize,
    pub failed_passes: usize,
    pub visited: usize,
    pub harvested: usize,
    pub timed_out: usize,
    pub products: usize,
    pub capture: CaptureStats,
}

#[derive(Debug, Default)]
struct Tally {
    passes: usize,
    failed_passes: usize,
    visited: usize,
    harvested: usize,
    timed_out: usize,
}

impl Tally {
    fn add(&mut self, report: &PassReport) {
        self.passes += 1;
        self.visited += report.visited;
        self.harvested += report.harvested;
        self.timed_out += report.timed_out + report.failed;
    }
}

async fn tick(
    surface: &dyn PageSurface,
    state: &HarvestState,
    cadence: &mut Cadence,
    tally: &mut Tally,
) {
    cadence.service(surface, state).await;
    if !state.auto_scroll.is_enabled() {
        sleep(IDLE_TICK).await;
        return;
    }
    match run_pass(surface, state, cadence).await {
        Ok(report) => tally.add(&report),
        Err(e) => {
            tally.failed_passes += 1;
            warn!("pass failed: {}", e);
            cadence
                .sleep_serviced(surface, state, state.settings.timing.rerender_pause)
                .await;
        }
    }
}

/// Run until the configured ceiling elapses or `shutdown` resolves, then
/// flush one last time.
pub async fn drive<F>(surface: &dyn PageSurface, state: &HarvestState, shutdown: F) -> RunSummary
where
    F: Future<Output = ()>,
{
    let ceiling = state.settings.timing.run_ceiling;
    info!(
        "[*] listening for up to {}s (auto-scroll {})",
        ceiling.as_secs(),
        if state.auto_scroll.is_enabled() { "on" } else { "off" }
    );

    let deadline = sleep_until(Instant::now() + ceiling);
    tokio::pin!(deadline);
    tokio::pin!(shutdown);

    let mut cadence = Cadence::from_state(state);
    let mut tally = Tally::default();
    let stop_reason = loop {
        tokio::select! {
            _ = &mut shutdown => break StopReason::Shutdown,
            _ = &mut deadline => break StopReason::Deadline,
            _ = tick(surface, state, &mut cadence, &mut tally) => {}
        }
    };
    info!("[■] stopping ({:?})", stop_reason);

    // A pass cut short may have left a product awaited.
    state.aggregator.set_awaited(None);
    state.flush();

    RunSummary {
        stop_reason,
        passes: tally.passes,
        failed_passes: tally.failed_passes,
        visited: tally.visited,
        harvested: tally.harvested,
        timed_out: tally.timed_out,
        products: state.aggregator.len(),
        capture: state.aggregator.stats(),
    }
}
