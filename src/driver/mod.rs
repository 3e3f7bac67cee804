//! The automation session
//!
//! [`AutomationDriver`] owns the one live [`Surface`] and runs both operating
//! modes against it: replaying a path through the UI state graph
//! ([`AutomationDriver::execute_graph`]) and the oracle-driven journey loop
//! ([`AutomationDriver::run_journey`]). Exclusive access is enforced by
//! `&mut self`; callers that share a driver put it behind a lock and keep a
//! [`CancelHandle`] outside of it.

mod journey;
mod tour;

pub use journey::CancelHandle;
pub use tour::{prototype_url, with_node_id};

use crate::config::JourneyConfig;
use crate::error::{JourneyError, Result};
use crate::oracle::JourneyOracle;
use crate::store::ImageStore;
use crate::surface::Surface;
use crate::vision::RegionDetector;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    Ready,
    Navigating,
    Capturing,
    Closed,
}

pub struct AutomationDriver {
    surface: Option<Box<dyn Surface>>,
    oracle: Arc<dyn JourneyOracle>,
    store: Arc<dyn ImageStore>,
    detector: RegionDetector,
    config: JourneyConfig,
    state: SessionState,
    cancel: CancelHandle,
}

impl AutomationDriver {
    pub fn new(
        config: JourneyConfig,
        oracle: Arc<dyn JourneyOracle>,
        store: Arc<dyn ImageStore>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            surface: None,
            oracle,
            store,
            detector: RegionDetector::new(config.detector.clone()),
            config,
            state: SessionState::Uninitialized,
            cancel: CancelHandle::new(),
        })
    }

    /// Attach a surface and open the session.
    ///
    /// A surface that is already attached is closed first.
    pub async fn start(&mut self, surface: Box<dyn Surface>) -> Result<()> {
        if self.surface.is_some() {
            log::warn!("Session already active, closing it before starting a new one");
            self.close().await?;
        }
        self.surface = Some(surface);
        self.state = SessionState::Ready;
        log::info!("Automation session started");
        Ok(())
    }

    /// Close the session. Closing an inactive session is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut surface) = self.surface.take() {
            self.state = SessionState::Closed;
            surface.close().await?;
            log::info!("Automation session closed");
        }
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.surface.is_some()
    }

    pub fn config(&self) -> &JourneyConfig {
        &self.config
    }

    pub fn detector(&self) -> &RegionDetector {
        &self.detector
    }

    /// Handle that stops a running journey between steps
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Whether a session is open and its surface still responds
    pub async fn is_alive(&self) -> bool {
        match &self.surface {
            Some(surface) => surface.is_alive().await,
            None => false,
        }
    }

    pub async fn navigate(&mut self, url: &str) -> Result<()> {
        self.ensure_ready()?;
        self.state = SessionState::Navigating;
        let result = self.surface()?.navigate(url).await;
        self.state = SessionState::Ready;
        if let Err(e) = &result {
            log::error!("Navigation to {} failed: {}", url, e);
        }
        result
    }

    pub async fn current_url(&self) -> Result<String> {
        self.surface()?.current_url().await
    }

    async fn capture(&mut self) -> Result<Vec<u8>> {
        self.ensure_ready()?;
        self.state = SessionState::Capturing;
        let result = self.surface()?.capture(self.config.full_page).await;
        self.state = SessionState::Ready;
        result
    }

    fn surface(&self) -> Result<&dyn Surface> {
        self.surface.as_deref().ok_or(JourneyError::SessionNotReady)
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.surface.is_none() {
            log::error!("Session used before start (state: {:?})", self.state);
            return Err(JourneyError::SessionNotReady);
        }
        Ok(())
    }
}
