//! Oracle-driven journey loop
//!
//! Each step: screenshot, ask for the next action, make the surface flash its
//! hotspots, detect the flashed regions, ask which one matches, click it and
//! check the goal. Attempts are retried up to `max_retries`; a journey always
//! ends with a summary, whatever happened.

use super::AutomationDriver;
use crate::error::Result;
use crate::oracle::{NextActionRequest, Persona};
use crate::step::{JourneyOutcome, JourneyStep, StepAction};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Stops a running journey between steps
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

enum AttemptEnd {
    GoalReached,
    /// The element oracle found nothing to click
    Stuck,
    OutOfSteps,
    Cancelled,
}

impl AutomationDriver {
    /// Run the oracle-driven loop for `task` as `persona`.
    ///
    /// Oracle failures end the current attempt and count against the retry
    /// budget; surface, detection and storage errors end the journey.
    pub async fn run_journey(&mut self, task: &str, persona: &Persona) -> Result<JourneyOutcome> {
        self.ensure_ready()?;
        persona.validate()?;
        self.cancel.reset();

        let start_url = self.current_url().await?;
        let journey_id = Uuid::new_v4();
        log::info!("Journey {} started: {}", journey_id, task);

        if let Some(selector) = self.config.ready_selector.clone() {
            self.surface()?
                .wait_for_selector(&selector, READY_TIMEOUT)
                .await?;
        }
        tokio::time::sleep(self.config.initial_settle()).await;

        let mut steps: Vec<JourneyStep> = Vec::new();
        let mut success = false;
        let mut cancelled = false;
        let mut attempts = 0;

        while !success && attempts < self.config.max_retries {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            attempts += 1;
            log::info!(
                "Attempt {}/{} of journey {}",
                attempts,
                self.config.max_retries,
                journey_id
            );

            match self
                .run_attempt(journey_id, attempts, task, persona, &mut steps)
                .await
            {
                Ok(AttemptEnd::GoalReached) => success = true,
                Ok(AttemptEnd::Cancelled) => {
                    cancelled = true;
                    break;
                }
                Ok(AttemptEnd::Stuck) | Ok(AttemptEnd::OutOfSteps) => {
                    log::warn!("Goal not achieved in attempt {}", attempts);
                }
                Err(e) if e.is_oracle_failure() => {
                    log::warn!("Attempt {} ended by oracle failure: {}", attempts, e);
                }
                Err(e) => {
                    log::error!("Journey {} aborted: {}", journey_id, e);
                    return Err(e);
                }
            }
        }

        if self.config.reset_after_journey {
            if let Err(e) = self.navigate(&start_url).await {
                log::warn!("Could not reset to {}: {}", start_url, e);
            }
        }

        if cancelled {
            log::info!("Journey {} cancelled after {} steps", journey_id, steps.len());
        }

        let summary = match self.oracle.summarize(&steps, task).await {
            Ok(summary) => summary,
            Err(e) => {
                log::warn!("Summary unavailable: {}", e);
                let outcome = if cancelled {
                    "Journey cancelled"
                } else if success {
                    "Goal achieved"
                } else {
                    "Goal not achieved"
                };
                format!("Summary unavailable ({}). {} after {} steps.", e, outcome, steps.len())
            }
        };

        log::info!(
            "Journey {} finished: success={}, steps={}",
            journey_id,
            success,
            steps.len()
        );
        Ok(JourneyOutcome {
            success,
            cancelled,
            attempts,
            steps,
            summary,
        })
    }

    async fn run_attempt(
        &mut self,
        journey_id: Uuid,
        attempt: u32,
        task: &str,
        persona: &Persona,
        steps: &mut Vec<JourneyStep>,
    ) -> Result<AttemptEnd> {
        // the interaction region may have moved since the last attempt
        let origin = match self.config.ready_selector.clone() {
            Some(selector) => self.surface()?.element_origin(&selector).await?,
            None => (0.0, 0.0),
        };
        let prefix = format!("journeys/{}/attempt_{}", journey_id, attempt);

        for step in 1..=self.config.max_steps_per_attempt as usize {
            if self.cancel.is_cancelled() {
                return Ok(AttemptEnd::Cancelled);
            }

            let before = self.capture().await?;
            let before_image = self
                .store
                .put(&before, &format!("{}/before_{}.png", prefix, step))
                .await?;

            let next = self
                .oracle
                .next_action(NextActionRequest {
                    task,
                    persona,
                    history: steps.as_slice(),
                    screenshot: &before_image,
                })
                .await?;
            log::info!("Step {}: {}", step, next.action_description);

            let (trigger_x, trigger_y) = self.config.flash_trigger;
            self.surface()?
                .click_at(origin.0 + trigger_x, origin.1 + trigger_y)
                .await?;
            let after = self.capture().await?;

            let detection = self.detector.detect_transition_png(&before, &after)?;
            log::debug!("{} candidate regions", detection.regions.len());
            let annotated_image = self
                .store
                .put(
                    &detection.annotated_png()?,
                    &format!("{}/annotated_{}.png", prefix, step),
                )
                .await?;

            let choice = self
                .oracle
                .select_element(&next.action_description, &annotated_image, &detection.regions)
                .await?;

            let Some(bounding_box) = choice.bounding_box else {
                log::warn!("No element matches '{}', ending attempt", next.action_description);
                return Ok(AttemptEnd::Stuck);
            };

            let (center_x, center_y) = bounding_box.center();
            let clicked_at = (origin.0 + center_x, origin.1 + center_y);
            self.surface()?.click_at(clicked_at.0, clicked_at.1).await?;
            tokio::time::sleep(self.config.post_click_settle()).await;

            log::info!(
                "Clicked '{}' at ({:.1}, {:.1})",
                choice.element_name,
                clicked_at.0,
                clicked_at.1
            );

            let after = self.capture().await?;
            let after_image = self
                .store
                .put(&after, &format!("{}/after_{}.png", prefix, step))
                .await?;

            steps.push(JourneyStep {
                step,
                attempt,
                action_description: next.action_description,
                rationale: next.rationale,
                action: StepAction {
                    element_name: choice.element_name,
                    bounding_box: Some(bounding_box),
                },
                before_image,
                annotated_image,
                after_image: after_image.clone(),
                clicked_at: Some(clicked_at),
                timestamp: chrono::Utc::now().to_rfc3339(),
            });

            let check = self.oracle.goal_achieved(&after_image, task).await?;
            if check.achieved {
                log::info!(
                    "Goal achieved{}",
                    check.reason.map(|r| format!(": {}", r)).unwrap_or_default()
                );
                return Ok(AttemptEnd::GoalReached);
            }
        }

        Ok(AttemptEnd::OutOfSteps)
    }
}
