//! REST API for the WMB browser

pub mod browser_routes;

pub use browser_routes::{create_browser_router, BrowserState, ErrorResponse};
