//! Periodic work that must keep running while the cycle waits: draining the
//! in-page capture buffer and saving the snapshot on a timer.

use crate::capture::CaptureAggregator;
use crate::core::HarvestState;
use crate::interaction::surface::PageSurface;
use crate::types::SourceLabel;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Drain the page-side buffer and submit every payload as `MEMORY_CACHE`.
/// A failed drain is skipped; the next poll picks the payloads up.
pub async fn poll_capture_buffer(surface: &dyn PageSurface, aggregator: &CaptureAggregator) -> usize {
    match surface.drain_capture_buffer().await {
        Ok(payloads) => {
            for payload in &payloads {
                aggregator.submit(payload, SourceLabel::MemoryCache);
            }
            if !payloads.is_empty() {
                debug!("buffer poll: {} payload(s) drained", payloads.len());
            }
            payloads.len()
        }
        Err(e) => {
            debug!("buffer poll failed: {}", e);
            0
        }
    }
}

#[derive(Debug)]
pub struct Cadence {
    buffer_poll: Duration,
    save_interval: Duration,
    last_poll: Option<Instant>,
    last_save: Instant,
}

impl Cadence {
    pub fn new(buffer_poll: Duration, save_interval: Duration) -> Self {
        Self {
            buffer_poll,
            save_interval,
            last_poll: None,
            last_save: Instant::now(),
        }
    }

    pub fn from_state(state: &HarvestState) -> Self {
        let timing = &state.settings.timing;
        Self::new(timing.buffer_poll, timing.save_interval)
    }

    /// Run whatever is due. Cheap when nothing is.
    pub async fn service(&mut self, surface: &dyn PageSurface, state: &HarvestState) {
        let now = Instant::now();
        if self
            .last_poll
            .is_none_or(|t| now.duration_since(t) >= self.buffer_poll)
        {
            self.last_poll = Some(now);
            poll_capture_buffer(surface, &state.aggregator).await;
        }
        if now.duration_since(self.last_save) >= self.save_interval {
            self.last_save = now;
            state.flush();
        }
    }

    /// Sleep for `duration` without starving the periodic work.
    pub async fn sleep_serviced(
        &mut self,
        surface: &dyn PageSurface,
        state: &HarvestState,
        duration: Duration,
    ) {
        let deadline = Instant::now() + duration;
        loop {
            self.service(surface, state).await;
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let step = self.buffer_poll.min(deadline - now).max(Duration::from_millis(1));
            tokio::time::sleep(step).await;
        }
    }
}
