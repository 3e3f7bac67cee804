//! Journey step records
//!
//! A journey is a sequence of steps, each one the outcome of asking the
//! oracle what to do next, finding the element on screen and clicking it.
//! Steps are accumulated for the duration of one journey, handed to the
//! summary oracle and returned to the caller; nothing here is persisted.

use crate::vision::Rectangle;
use serde::{Deserialize, Serialize};

/// Stable reference to an image handed to (or produced for) an oracle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Store key, e.g. `A_B.png`
    pub key: String,

    /// Where the image can be read back: a file path or URL
    pub location: String,

    /// File size in bytes
    pub size_bytes: usize,

    /// SHA-256 hash for deduplication
    pub sha256: String,
}

/// The element the oracle picked for a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepAction {
    pub element_name: String,

    /// `None` when no candidate matched the action
    pub bounding_box: Option<Rectangle>,
}

/// One completed unit of the oracle-driven loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyStep {
    /// Step number within the attempt, starting at 1
    pub step: usize,

    /// Attempt number, starting at 1
    pub attempt: u32,

    pub action_description: String,
    pub rationale: String,
    pub action: StepAction,

    /// Screenshot taken before anything was clicked
    pub before_image: ImageRef,

    /// Flash screenshot with candidate regions outlined
    pub annotated_image: ImageRef,

    /// Screenshot taken once the click has settled
    pub after_image: ImageRef,

    /// Page-relative point that was clicked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clicked_at: Option<(f64, f64)>,

    /// ISO 8601 timestamp when the step completed
    pub timestamp: String,
}

/// Result of one journey, returned whether or not the task was achieved
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyOutcome {
    pub success: bool,

    /// The journey was stopped from outside before it finished
    pub cancelled: bool,

    /// Attempts started
    pub attempts: u32,

    pub steps: Vec<JourneyStep>,
    pub summary: String,
}

impl JourneyOutcome {
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}
