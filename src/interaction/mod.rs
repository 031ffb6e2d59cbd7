//! Page interaction: geometry probing, candidate selection, detail detection,
//! the click/harvest/dismiss cycle and scroll planning. Everything here talks
//! to the page through [`PageSurface`].

pub mod candidates;
pub mod cycle;
pub mod detection;
pub mod geometry;
pub mod scroll;
pub mod surface;

pub use cycle::{run_pass, visit_candidate, CycleState, PassReport, VisitOutcome};
pub use surface::PageSurface;
