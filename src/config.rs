//! Journey configuration
//!
//! Loaded from a JSON file (every field optional) or built from defaults.

use crate::error::{JourneyError, Result};
use crate::vision::DetectorOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JourneyConfig {
    /// Outer attempts of the oracle-driven loop
    pub max_retries: u32,

    /// Inner steps per attempt
    pub max_steps_per_attempt: u32,

    /// Wait after the surface is ready, before the first step
    pub initial_settle_ms: u64,

    /// Wait after clicking the chosen element
    pub post_click_settle_ms: u64,

    /// Fixed wait after each guided-tour navigation
    pub navigation_settle_ms: u64,

    /// Element awaited before a journey; its top-left corner is the click origin
    pub ready_selector: Option<String>,

    /// Point, relative to the click origin, that makes the surface flash its hotspots
    pub flash_trigger: (f64, f64),

    pub full_page: bool,

    /// URL marker guided traversal requires
    pub supported_surface: String,

    /// Navigate back to the starting URL once a journey ends
    pub reset_after_journey: bool,

    pub detector: DetectorOptions,
}

impl Default for JourneyConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            max_steps_per_attempt: 10,
            initial_settle_ms: 2000,
            post_click_settle_ms: 2000,
            navigation_settle_ms: 6000,
            ready_selector: Some("canvas".to_string()),
            flash_trigger: (198.0, 65.0),
            full_page: true,
            supported_surface: "figma.com/design".to_string(),
            reset_after_journey: true,
            detector: DetectorOptions {
                invert: true,
                ..DetectorOptions::default()
            },
        }
    }
}

impl JourneyConfig {
    /// Load and validate a JSON config file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            JourneyError::InvalidInput(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(JourneyError::InvalidInput(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if self.max_steps_per_attempt == 0 {
            return Err(JourneyError::InvalidInput(
                "max_steps_per_attempt must be at least 1".to_string(),
            ));
        }
        if self.supported_surface.is_empty() {
            return Err(JourneyError::InvalidInput(
                "supported_surface cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn initial_settle(&self) -> Duration {
        Duration::from_millis(self.initial_settle_ms)
    }

    pub fn post_click_settle(&self) -> Duration {
        Duration::from_millis(self.post_click_settle_ms)
    }

    pub fn navigation_settle(&self) -> Duration {
        Duration::from_millis(self.navigation_settle_ms)
    }
}
