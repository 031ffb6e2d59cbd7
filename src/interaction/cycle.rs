//! Interaction cycle: click a card, wait for the detail surface, harvest,
//! dismiss, and move on to the next card.

use super::candidates::select_candidates;
use super::detection::{detect_detail, DEFAULT_HEURISTICS};
use super::geometry::{measure_viewport, probe_cards};
use super::scroll::{apply_scroll, plan_advance};
use super::surface::PageSurface;
use crate::core::HarvestState;
use crate::engine::cadence::Cadence;
use crate::types::VisitCandidate;
use anyhow::Result;
use chrono::Utc;
use std::collections::HashSet;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    ClickSent,
    WaitDetail,
    Harvested,
    TimedOut,
    Dismissed,
}

fn log_state(state: CycleState) {
    info!("cycle_state={:?}", state);
}

#[derive(Debug, Clone, PartialEq)]
pub enum VisitOutcome {
    Harvested {
        /// Name of the heuristic that recognised the detail surface.
        heuristic: &'static str,
        /// Whether data for this product reached the aggregator during the visit.
        data_received: bool,
    },
    TimedOut,
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    pub candidates: usize,
    pub visited: usize,
    pub harvested: usize,
    pub timed_out: usize,
    pub failed: usize,
    pub skipped_duplicates: usize,
    /// The operator turned auto-scroll off mid-pass.
    pub aborted: bool,
    /// Distance scrolled at the end of the pass, if any.
    pub advance: Option<f64>,
}

/// Poll the detail heuristics until one fires or the timeout elapses.
pub async fn wait_for_detail(
    surface: &dyn PageSurface,
    state: &HarvestState,
    cadence: &mut Cadence,
) -> Option<&'static str> {
    let timing = &state.settings.timing;
    let deadline = Instant::now() + timing.detail_timeout;
    loop {
        if let Some(name) = detect_detail(surface, DEFAULT_HEURISTICS).await {
            return Some(name);
        }
        cadence.service(surface, state).await;
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        tokio::time::sleep(timing.detail_poll.min(deadline - now)).await;
    }
}

async fn click_and_wait(
    surface: &dyn PageSurface,
    state: &HarvestState,
    cadence: &mut Cadence,
    candidate: &VisitCandidate,
) -> Result<VisitOutcome> {
    let started = Utc::now();
    surface.click(candidate.center_x, candidate.center_y).await?;
    log_state(CycleState::ClickSent);

    log_state(CycleState::WaitDetail);
    let Some(heuristic) = wait_for_detail(surface, state, cadence).await else {
        return Ok(VisitOutcome::TimedOut);
    };
    log_state(CycleState::Harvested);
    info!("[+] detail open for {} ({})", candidate.label(), heuristic);

    cadence
        .sleep_serviced(surface, state, state.settings.timing.settle)
        .await;
    let data_received = candidate.product_id.is_some() && state.aggregator.harvested_since(started);
    state.flush();
    Ok(VisitOutcome::Harvested {
        heuristic,
        data_received,
    })
}

/// Visit one card. Dismissal always runs, whatever happened before it.
pub async fn visit_candidate(
    surface: &dyn PageSurface,
    state: &HarvestState,
    cadence: &mut Cadence,
    candidate: &VisitCandidate,
) -> VisitOutcome {
    state.aggregator.set_awaited(candidate.product_id.clone());

    let outcome = match click_and_wait(surface, state, cadence, candidate).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("visit {} failed: {}", candidate.label(), e);
            VisitOutcome::Failed(e.to_string())
        }
    };
    if !matches!(outcome, VisitOutcome::Harvested { .. }) {
        log_state(CycleState::TimedOut);
    }

    state.aggregator.set_awaited(None);
    if let Err(e) = surface.press_key("Escape").await {
        warn!("dismiss after {} failed: {}", candidate.label(), e);
    }
    log_state(CycleState::Dismissed);
    cadence
        .sleep_serviced(surface, state, state.settings.timing.dismiss_pause)
        .await;
    log_state(CycleState::Idle);
    outcome
}

/// One full pass over the cards currently on screen, followed by a scroll
/// unless the operator paused mid-pass.
pub async fn run_pass(
    surface: &dyn PageSurface,
    state: &HarvestState,
    cadence: &mut Cadence,
) -> Result<PassReport> {
    let grid = &state.settings.grid;
    let viewport = measure_viewport(surface).await?;
    let probes = probe_cards(surface, &grid.card_marker).await?;
    let candidates = select_candidates(&viewport, probes, grid);

    let mut report = PassReport {
        candidates: candidates.len(),
        ..Default::default()
    };
    info!("[▶] pass: {} candidate(s) in view", candidates.len());

    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut visited: Vec<VisitCandidate> = Vec::new();
    for candidate in candidates {
        if !state.auto_scroll.is_enabled() {
            info!("[⏸] auto-scroll paused; pass aborted");
            report.aborted = true;
            break;
        }
        if let Some(id) = &candidate.product_id {
            if !seen_ids.insert(id.clone()) {
                report.skipped_duplicates += 1;
                continue;
            }
        }

        match visit_candidate(surface, state, cadence, &candidate).await {
            VisitOutcome::Harvested { .. } => report.harvested += 1,
            VisitOutcome::TimedOut => report.timed_out += 1,
            VisitOutcome::Failed(_) => report.failed += 1,
        }
        report.visited += 1;
        visited.push(candidate);
    }

    if report.aborted {
        return Ok(report);
    }

    let distance = plan_advance(&visited, viewport.height, grid);
    // The visits already happened; a failed scroll only costs the advance.
    match apply_scroll(surface, &viewport, distance).await {
        Ok(()) => {
            report.advance = Some(distance);
            info!(
                "[↓] scrolled {:.0}px after {} visit(s) ({} harvested)",
                distance, report.visited, report.harvested
            );
        }
        Err(e) => warn!("scroll of {:.0}px failed: {}", distance, e),
    }
    cadence
        .sleep_serviced(surface, state, state.settings.timing.rerender_pause)
        .await;
    Ok(report)
}
