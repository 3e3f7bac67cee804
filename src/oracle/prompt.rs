//! Claude prompt templates for the journey oracles
//!
//! Images are passed by reference: each prompt names the screenshot location
//! and asks the model to open it before answering.

use super::{ElementChoice, GoalCheck, NextAction, NextActionRequest};
use crate::step::{ImageRef, JourneyStep};
use crate::vision::Region;

/// Prompt for choosing the next action of a persona
pub fn next_action_prompt(request: &NextActionRequest<'_>) -> String {
    let attributes = &request.persona.attributes;
    let history = format_history(request.history);
    let last_action = match request.last_action() {
        "" => "none, this is the first step".to_string(),
        action => action.to_string(),
    };

    format!(
        r#"You are testing a product prototype while embodying {title}, with these traits:
- Product familiarity: {familiarity}% (how well you know similar applications)
- Patience level: {patience}% (how likely you are to persist with challenges)
- Technical savviness: {savviness}% (your comfort level with technology)

TASK: {task}

CURRENT SCREEN: open and inspect the screenshot at {screenshot}

PREVIOUS STEPS:
{history}

LAST ACTION: {last_action}

Decide the single next interaction this persona would make to move toward the task.
Describe the element to interact with by what it looks like and says, not by coordinates.

RULES:
1. One action only, usually a click on one visible element
2. Do not repeat an action that did not change the screen
3. Stay in character: low familiarity explores more, low patience takes the most obvious path

OUTPUT FORMAT (JSON only, no markdown):
{{
  "actionDescription": "Click the 'Get started' button in the hero section",
  "rationale": "Why this persona would do this now"
}}"#,
        title = request.persona.title,
        familiarity = attributes.product_familiarity,
        patience = attributes.patience,
        savviness = attributes.tech_savviness,
        task = request.task,
        screenshot = request.screenshot.location,
        history = history,
        last_action = last_action,
    )
}

/// Prompt for matching an action description to one of the flashed regions
pub fn select_element_prompt(
    action_description: &str,
    annotated: &ImageRef,
    candidates: &[Region],
) -> String {
    let candidates_json =
        serde_json::to_string_pretty(candidates).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"You analyze a screenshot and pick the clickable element that matches an intended action.

ACTION: {action_description}

SCREENSHOT: open and inspect the image at {image}
Every clickable region is outlined in blue and labelled in red with its corner
coordinates "(minX, minY to maxX, maxY)".

CANDIDATE REGIONS:
{candidates_json}

Choose the ONE candidate that performs the action. Copy its coordinates exactly.
If no candidate matches, set "boundingBox" to null.

OUTPUT FORMAT (JSON only, no markdown):
{{
  "elementName": "Short name of the element",
  "boundingBox": {{"minX": 10, "minY": 20, "maxX": 110, "maxY": 60}}
}}"#,
        action_description = action_description,
        image = annotated.location,
        candidates_json = candidates_json,
    )
}

/// Prompt for the goal verification oracle
pub fn goal_check_prompt(screenshot: &ImageRef, task: &str) -> String {
    format!(
        r#"You are a precise goal verification assistant. Your ONLY task is to determine if the current goal has been achieved.

GOAL: {task}

CURRENT SCREEN: open and inspect the screenshot at {screenshot}

VERIFICATION RULES:
1. Navigation goals: the expected screen is visible
2. UI changes: the change is visibly applied
3. Content goals: the content is present and in the right state

False positives (saying complete when not) are WORSE than false negatives.
When in doubt, answer false.

OUTPUT FORMAT (JSON only, no markdown):
{{
  "achieved": false,
  "reason": "What on screen supports the answer"
}}"#,
        task = task,
        screenshot = screenshot.location,
    )
}

/// Prompt for the end-of-journey report
pub fn summary_prompt(steps: &[JourneyStep], task: &str) -> String {
    format!(
        r#"You are a UX evaluation expert familiar with Nielsen's 10 usability heuristics.

A simulated user attempted this task: {task}

STEPS TAKEN:
{history}

Each step lists the screenshot before the action, the annotated screenshot of clickable regions and the screenshot after the click; open them as needed.

Write a short report with:
1. Overall journey analysis: completion efficiency, points of friction, intuitiveness of the path
2. Heuristic evaluation of visibility of system status, match with the real world, user control, consistency and error prevention
3. Up to 3 concrete recommendations

Base the analysis only on the steps and screenshots. Plain text, no JSON."#,
        task = task,
        history = format_history(steps),
    )
}

fn format_history(steps: &[JourneyStep]) -> String {
    if steps.is_empty() {
        return "(none)".to_string();
    }
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            format!(
                "{}. [attempt {}] {} -> clicked '{}' (because: {})\n   before: {}\n   annotated: {}\n   after: {}",
                i + 1,
                step.attempt,
                step.action_description,
                step.action.element_name,
                step.rationale,
                step.before_image.location,
                step.annotated_image.location,
                step.after_image.location,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Validate a next-action response
pub fn validate_next_action(json: &str) -> Result<NextAction, String> {
    let action: NextAction =
        serde_json::from_str(json).map_err(|e| format!("Invalid JSON: {}", e))?;

    if action.action_description.trim().is_empty() {
        return Err("actionDescription cannot be empty".to_string());
    }

    Ok(action)
}

/// Validate an element-selection response
pub fn validate_element_choice(json: &str) -> Result<ElementChoice, String> {
    let choice: ElementChoice =
        serde_json::from_str(json).map_err(|e| format!("Invalid JSON: {}", e))?;

    if let Some(rect) = &choice.bounding_box {
        if !rect.is_well_formed() {
            return Err(format!(
                "boundingBox {} has max below min",
                rect.label()
            ));
        }
    }

    Ok(choice)
}

/// Validate a goal-check response
pub fn validate_goal_check(json: &str) -> Result<GoalCheck, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid JSON: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{Persona, PersonaAttributes};

    fn image(name: &str) -> ImageRef {
        ImageRef {
            key: name.to_string(),
            location: format!("/tmp/{}", name),
            size_bytes: 1,
            sha256: String::new(),
        }
    }

    fn screenshot() -> ImageRef {
        image("before.png")
    }

    #[test]
    fn test_next_action_prompt_mentions_persona_and_task() {
        let persona = Persona::new(
            "a busy product manager",
            PersonaAttributes {
                product_familiarity: 70,
                patience: 15,
                tech_savviness: 40,
            },
        );
        let image = screenshot();
        let prompt = next_action_prompt(&NextActionRequest {
            task: "Create a new project",
            persona: &persona,
            history: &[],
            screenshot: &image,
        });

        assert!(prompt.contains("a busy product manager"));
        assert!(prompt.contains("Patience level: 15%"));
        assert!(prompt.contains("TASK: Create a new project"));
        assert!(prompt.contains("/tmp/before.png"));
        assert!(prompt.contains("first step"));
    }

    #[test]
    fn test_select_prompt_lists_candidates() {
        let regions = vec![Region::from(crate::vision::Rectangle::new(10, 20, 110, 60))];
        let prompt = select_element_prompt("Open settings", &screenshot(), &regions);
        assert!(prompt.contains("ACTION: Open settings"));
        assert!(prompt.contains("\"minX\": 10"));
        assert!(prompt.contains("\"area\": 4000"));
    }

    #[test]
    fn test_summary_prompt_lists_step_images() {
        let step = JourneyStep {
            step: 1,
            attempt: 1,
            action_description: "Open the cart".to_string(),
            rationale: "Checkout starts there".to_string(),
            action: crate::step::StepAction {
                element_name: "Cart".to_string(),
                bounding_box: None,
            },
            before_image: image("before_1.png"),
            annotated_image: image("annotated_1.png"),
            after_image: image("after_1.png"),
            clicked_at: None,
            timestamp: String::new(),
        };

        let prompt = summary_prompt(&[step], "Reach checkout");
        assert!(prompt.contains("clicked 'Cart'"));
        assert!(prompt.contains("before: /tmp/before_1.png"));
        assert!(prompt.contains("annotated: /tmp/annotated_1.png"));
        assert!(prompt.contains("after: /tmp/after_1.png"));
    }

    #[test]
    fn test_validate_next_action() {
        let ok = validate_next_action(
            r#"{"actionDescription": "Click Sign up", "rationale": "new user"}"#,
        );
        assert!(ok.is_ok());

        let empty = validate_next_action(r#"{"actionDescription": " ", "rationale": "x"}"#);
        assert!(empty.unwrap_err().contains("cannot be empty"));

        let missing = validate_next_action(r#"{"rationale": "x"}"#);
        assert!(missing.unwrap_err().contains("Invalid JSON"));
    }

    #[test]
    fn test_validate_element_choice() {
        let choice = validate_element_choice(
            r#"{"elementName": "Sign up", "boundingBox": {"minX": 1, "minY": 2, "maxX": 30, "maxY": 40}}"#,
        )
        .unwrap();
        assert_eq!(choice.bounding_box.unwrap().max_x, 30);

        let none = validate_element_choice(r#"{"elementName": "", "boundingBox": null}"#).unwrap();
        assert!(none.bounding_box.is_none());

        let inverted = validate_element_choice(
            r#"{"elementName": "x", "boundingBox": {"minX": 50, "minY": 2, "maxX": 30, "maxY": 40}}"#,
        );
        assert!(inverted.is_err());
    }

    #[test]
    fn test_validate_goal_check() {
        let check = validate_goal_check(r#"{"achieved": true}"#).unwrap();
        assert!(check.achieved);
        assert!(check.reason.is_none());
        assert!(validate_goal_check(r#"{"achieved": "yes"}"#).is_err());
    }
}
