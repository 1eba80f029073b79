//! Self-correction: feed a failing workflow and its error back to the model.

use serde_json::Value;
use tracing::info;

use crate::classify::{classify, ErrorCategory};
use crate::clients::{extract_json_object, CompletionRequest, LlmClient};
use crate::error::{Error, Result};
use crate::prompt;

/// Result of one correction round.
#[derive(Debug, Clone)]
pub struct Correction {
    pub category: ErrorCategory,
    pub workflow: Value,
}

pub struct WorkflowCorrector<'a> {
    client: &'a LlmClient,
}

impl<'a> WorkflowCorrector<'a> {
    pub fn new(client: &'a LlmClient) -> Self {
        Self { client }
    }

    pub async fn correct(
        &self,
        previous: &Value,
        intent: &str,
        error_message: &str,
    ) -> Result<Correction> {
        let error_message = error_message.trim();
        if error_message.is_empty() {
            return Err(Error::InvalidWorkflow(
                "no error message to correct against".to_string(),
            ));
        }

        let category = classify(error_message);
        info!(category = %category, "Classified validation error");

        let settings = self.client.settings();
        let request = CompletionRequest {
            model: settings.models.standard.clone(),
            system: prompt::CORRECTION_SYSTEM_PROMPT.to_string(),
            prompt: prompt::build_correction_prompt(previous, intent, error_message, category),
            temperature: settings.correction_temperature,
        };

        let reply = self.client.complete(&request).await?;
        let workflow = extract_json_object(&reply)?;
        correction_gate(&workflow)?;

        Ok(Correction { category, workflow })
    }
}

/// Corrected output must keep the three top-level containers.
pub fn correction_gate(workflow: &Value) -> Result<()> {
    if !workflow.get("nodes").is_some_and(Value::is_array) {
        return Err(Error::InvalidWorkflow(
            "corrected workflow is missing a nodes array".to_string(),
        ));
    }
    if !workflow.get("connections").is_some_and(Value::is_object) {
        return Err(Error::InvalidWorkflow(
            "corrected workflow is missing a connections object".to_string(),
        ));
    }
    if !workflow.get("settings").is_some_and(Value::is_object) {
        return Err(Error::InvalidWorkflow(
            "corrected workflow is missing a settings object".to_string(),
        ));
    }
    Ok(())
}
