pub mod browser_manager;
pub mod network;
pub mod page_surface;
pub mod scripts;

pub use browser_manager::{BrowserSession, SessionError};
pub use page_surface::CdpPageSurface;
