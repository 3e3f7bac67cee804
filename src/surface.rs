//! The interaction surface the driver acts on
//!
//! A surface is anything that can render the journey under test, take a
//! screenshot of it and receive pointer clicks: a Chrome page in production,
//! an in-memory fake in tests.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait Surface: Send + Sync {
    /// Capture a screenshot as encoded image bytes (PNG)
    async fn capture(&self, full_page: bool) -> Result<Vec<u8>>;

    /// Dispatch a left click at page-relative coordinates.
    ///
    /// Returns once the click is dispatched, not after any resulting animation.
    async fn click_at(&self, x: f64, y: f64) -> Result<()>;

    async fn navigate(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// Wait until `selector` is present, failing with `ElementNotFound` after `timeout`
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Top-left corner of the first element matching `selector`, page-relative
    async fn element_origin(&self, selector: &str) -> Result<(f64, f64)>;

    /// Whether the surface still responds
    async fn is_alive(&self) -> bool {
        true
    }

    /// Release the surface; it is dropped right after
    async fn close(&mut self) -> Result<()>;
}
