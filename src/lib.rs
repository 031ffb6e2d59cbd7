pub mod capture;
pub mod core;
pub mod engine;
pub mod features;
pub mod interaction;
pub mod scraping;

// --- Primary core exports ---
pub use core::config;
pub use core::types;
pub use core::types::*;
pub use core::HarvestState;

pub use capture::CaptureAggregator;
pub use engine::{drive, RunSummary, StopReason};
pub use interaction::PageSurface;
