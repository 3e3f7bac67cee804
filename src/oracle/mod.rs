//! Decision oracles for the journey loop
//!
//! Four calls drive a journey: what to do next, which on-screen element
//! matches that intent, whether the task is done, and a final report. Every
//! response has an explicit schema; anything that does not fit it is an
//! [`JourneyError::OracleFailure`].

pub mod claude;
pub mod prompt;

pub use claude::ClaudeOracle;

use crate::error::{JourneyError, Result};
use crate::step::{ImageRef, JourneyStep};
use crate::vision::{Rectangle, Region};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Who the oracle pretends to be while choosing actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    /// e.g. "a first-time visitor"
    pub title: String,
    pub attributes: PersonaAttributes,
}

/// Ordinal traits, each a percentage in `0..=100`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaAttributes {
    /// How well the persona knows similar products
    pub product_familiarity: u8,
    /// How likely the persona is to persist through friction
    pub patience: u8,
    pub tech_savviness: u8,
}

impl Default for PersonaAttributes {
    fn default() -> Self {
        Self {
            product_familiarity: 50,
            patience: 50,
            tech_savviness: 50,
        }
    }
}

impl Persona {
    pub fn new(title: impl Into<String>, attributes: PersonaAttributes) -> Self {
        Self {
            title: title.into(),
            attributes,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(JourneyError::InvalidInput(
                "Persona title cannot be empty".to_string(),
            ));
        }
        let traits = [
            ("productFamiliarity", self.attributes.product_familiarity),
            ("patience", self.attributes.patience),
            ("techSavviness", self.attributes.tech_savviness),
        ];
        for (name, value) in traits {
            if value > 100 {
                return Err(JourneyError::InvalidInput(format!(
                    "Persona attribute {} must be between 0 and 100, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// The next thing the persona would do, in plain language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextAction {
    pub action_description: String,
    pub rationale: String,
}

/// The element matching an action, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementChoice {
    pub element_name: String,

    /// `None` means no candidate matched. It is a valid answer, not a malformed one.
    pub bounding_box: Option<Rectangle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalCheck {
    pub achieved: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

/// What the next-action oracle is told about the journey so far
#[derive(Debug, Clone, Copy)]
pub struct NextActionRequest<'a> {
    pub task: &'a str,
    pub persona: &'a Persona,
    pub history: &'a [JourneyStep],
    /// Screenshot of the surface as it is now
    pub screenshot: &'a ImageRef,
}

impl NextActionRequest<'_> {
    /// Description of the most recent completed step, empty on the first step
    pub fn last_action(&self) -> &str {
        self.history
            .last()
            .map(|step| step.action_description.as_str())
            .unwrap_or("")
    }
}

#[async_trait]
pub trait JourneyOracle: Send + Sync {
    async fn next_action(&self, request: NextActionRequest<'_>) -> Result<NextAction>;

    /// Pick the candidate region that matches `action_description`
    async fn select_element(
        &self,
        action_description: &str,
        annotated: &ImageRef,
        candidates: &[Region],
    ) -> Result<ElementChoice>;

    async fn goal_achieved(&self, screenshot: &ImageRef, task: &str) -> Result<GoalCheck>;

    /// Free-text report over the whole step history
    async fn summarize(&self, steps: &[JourneyStep], task: &str) -> Result<String>;
}
