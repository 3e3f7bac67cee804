//! Journey oracle backed by the Claude CLI
//!
//! Each oracle call is one non-interactive `claude --print` run. Screenshots
//! are referenced by location in the prompt, so the CLI must be able to read
//! the image store.

use super::prompt::{
    goal_check_prompt, next_action_prompt, select_element_prompt, summary_prompt,
    validate_element_choice, validate_goal_check, validate_next_action,
};
use super::{ElementChoice, GoalCheck, JourneyOracle, NextAction, NextActionRequest};
use crate::error::{JourneyError, Result};
use crate::step::{ImageRef, JourneyStep};
use crate::vision::Region;
use anyhow::Context;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub struct ClaudeOracle {
    claude_path: String,
    model: Option<String>,
}

impl ClaudeOracle {
    /// Create a new oracle with default Claude CLI path
    pub fn new() -> Self {
        Self {
            claude_path: "claude".to_string(),
            model: None,
        }
    }

    /// Set custom Claude CLI path
    pub fn with_claude_path(mut self, path: String) -> Self {
        self.claude_path = path;
        self
    }

    /// Set Claude model to use (e.g., "sonnet", "opus")
    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    /// Run one prompt and return the model's text, fences stripped
    async fn ask(&self, prompt: &str) -> Result<String> {
        log::debug!("Sending {} byte prompt to Claude", prompt.len());
        let response = self
            .call_claude(prompt)
            .await
            .map_err(|e| JourneyError::OracleFailure(format!("{:#}", e)))?;
        Ok(clean_response(&response))
    }

    /// Call Claude CLI with a prompt
    async fn call_claude(&self, prompt: &str) -> anyhow::Result<String> {
        let mut cmd = Command::new(&self.claude_path);
        cmd.arg("--print") // Non-interactive mode
            .arg("--output-format")
            .arg("json")
            .arg("--dangerously-skip-permissions"); // screenshots are read without prompting

        if let Some(model) = &self.model {
            cmd.arg("--model").arg(model);
        }

        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .context("Failed to spawn Claude CLI. Is 'claude' installed?")?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .context("Failed to write prompt to Claude")?;
            stdin.shutdown().await.context("Failed to close stdin")?;
        }

        let output = child
            .wait_with_output()
            .await
            .context("Failed to wait for Claude CLI")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Claude CLI failed: {}", stderr);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        extract_text(&stdout)
    }
}

impl Default for ClaudeOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JourneyOracle for ClaudeOracle {
    async fn next_action(&self, request: NextActionRequest<'_>) -> Result<NextAction> {
        let json = self.ask(&next_action_prompt(&request)).await?;
        validate_next_action(&json)
            .map_err(|e| JourneyError::OracleFailure(format!("next action: {}", e)))
    }

    async fn select_element(
        &self,
        action_description: &str,
        annotated: &ImageRef,
        candidates: &[Region],
    ) -> Result<ElementChoice> {
        let prompt = select_element_prompt(action_description, annotated, candidates);
        let json = self.ask(&prompt).await?;
        validate_element_choice(&json)
            .map_err(|e| JourneyError::OracleFailure(format!("element selection: {}", e)))
    }

    async fn goal_achieved(&self, screenshot: &ImageRef, task: &str) -> Result<GoalCheck> {
        let json = self.ask(&goal_check_prompt(screenshot, task)).await?;
        validate_goal_check(&json)
            .map_err(|e| JourneyError::OracleFailure(format!("goal check: {}", e)))
    }

    async fn summarize(&self, steps: &[JourneyStep], task: &str) -> Result<String> {
        let text = self.ask(&summary_prompt(steps, task)).await?;
        if text.is_empty() {
            return Err(JourneyError::OracleFailure(
                "summary: empty response".to_string(),
            ));
        }
        Ok(text)
    }
}

/// Pull the model's text out of the CLI's JSON envelope.
///
/// Recent CLI versions put it under `result`, older ones under `text`.
fn extract_text(stdout: &str) -> anyhow::Result<String> {
    let response: serde_json::Value =
        serde_json::from_str(stdout).context("Failed to parse Claude CLI output as JSON")?;

    if response.get("is_error").and_then(|v| v.as_bool()) == Some(true) {
        anyhow::bail!("Claude CLI reported an error: {}", response);
    }

    response
        .get("result")
        .or_else(|| response.get("text"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Claude response missing 'result' field"))
}

/// Clean Claude's response (remove markdown formatting if present)
fn clean_response(response: &str) -> String {
    let trimmed = response.trim();

    if trimmed.starts_with("```json") {
        trimmed
            .strip_prefix("```json")
            .and_then(|s| s.strip_suffix("```"))
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| trimmed.to_string())
    } else if trimmed.starts_with("```") {
        trimmed
            .strip_prefix("```")
            .and_then(|s| s.strip_suffix("```"))
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| trimmed.to_string())
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_response() {
        let response = r#"```json
{"achieved": true}
```"#;
        assert_eq!(clean_response(response), r#"{"achieved": true}"#);

        let response = r#"{"achieved": true}"#;
        assert_eq!(clean_response(response), r#"{"achieved": true}"#);

        assert_eq!(clean_response("```\nplain\n```"), "plain");
    }

    #[test]
    fn test_extract_text_envelopes() {
        let current = r#"{"type": "result", "is_error": false, "result": "{\"achieved\": false}"}"#;
        assert_eq!(extract_text(current).unwrap(), r#"{"achieved": false}"#);

        let legacy = r#"{"text": "hello"}"#;
        assert_eq!(extract_text(legacy).unwrap(), "hello");

        let failed = r#"{"is_error": true, "result": "rate limited"}"#;
        assert!(extract_text(failed).is_err());

        assert!(extract_text("not json").is_err());
    }

    #[tokio::test]
    async fn test_missing_cli_is_oracle_failure() {
        let oracle = ClaudeOracle::new()
            .with_claude_path("/nonexistent/claude-cli".to_string())
            .with_model("sonnet".to_string());
        let image = ImageRef {
            key: "x.png".to_string(),
            location: "/tmp/x.png".to_string(),
            size_bytes: 0,
            sha256: String::new(),
        };

        let err = oracle.goal_achieved(&image, "anything").await.unwrap_err();
        assert!(err.is_oracle_failure());
    }

    // Calls against the real CLI live in tests/ and are #[ignore]d
}
