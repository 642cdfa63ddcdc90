//! Structured output generation with reparse retry.
//!
//! The structured-output profile is asked for a JSON record. When the reply
//! does not parse or validate, the conversation is resubmitted with the
//! malformed reply and a repair request, up to a bound. Every upstream call,
//! the repairs included, runs under the transient-failure retry policy.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::errors::{PipelineError, PipelineResult};
use crate::domain::models::{
    ModelProfile, MultiStepReasoning, PromptMessage, ReasoningStep, StrategySelection,
};
use crate::domain::ports::TextGenerator;
use crate::infrastructure::llm::RetryPolicy;
use crate::infrastructure::prompts::{names, PromptRegistry};
use crate::infrastructure::validators::{extract_json_payload, parse_json_output};

/// A record the structured-output model is asked to produce.
pub trait StructuredRecord: Sized {
    /// Human-readable record name for errors and logs.
    const NAME: &'static str;

    /// Parse and validate raw model output.
    ///
    /// The error string is shown to the model in the repair prompt.
    fn parse_output(raw: &str) -> Result<Self, String>;
}

impl StructuredRecord for StrategySelection {
    const NAME: &'static str = "strategy selection";

    fn parse_output(raw: &str) -> Result<Self, String> {
        parse_json_output::<Self>(raw)
    }
}

impl StructuredRecord for MultiStepReasoning {
    const NAME: &'static str = "multi-step reasoning";

    /// Accepts `{"steps": [...]}` or a bare array of steps.
    fn parse_output(raw: &str) -> Result<Self, String> {
        let value: Value = parse_json_output(raw)?;
        let steps_value = match value {
            Value::Object(mut object) => object
                .remove("steps")
                .ok_or_else(|| "the JSON object has no 'steps' key".to_string())?,
            array @ Value::Array(_) => array,
            other => return Err(format!("expected a JSON object with 'steps', got {other}")),
        };

        let steps: Vec<ReasoningStep> = serde_json::from_value(steps_value)
            .map_err(|e| format!("'steps' must be a list of {{step, explanation}} objects: {e}"))?;

        let reasoning = Self { steps };
        reasoning.validate()?;
        Ok(reasoning)
    }
}

/// Generates structured records through the structured-output profile.
#[derive(Clone)]
pub struct StructuredOutputParser {
    generator: Arc<dyn TextGenerator>,
    registry: Arc<PromptRegistry>,
    profile: ModelProfile,
    retry: RetryPolicy,
    reparse_attempts: u32,
}

impl StructuredOutputParser {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        registry: Arc<PromptRegistry>,
        profile: ModelProfile,
        retry: RetryPolicy,
        reparse_attempts: u32,
    ) -> Self {
        Self {
            generator,
            registry,
            profile,
            retry,
            reparse_attempts,
        }
    }

    /// Submit `messages` and parse the reply as `T`, repairing on failure.
    ///
    /// Makes one initial attempt plus up to `reparse_attempts` repairs.
    pub async fn generate<T: StructuredRecord>(&self, messages: &[PromptMessage]) -> PipelineResult<T> {
        let mut raw = self.call(messages).await?;
        let mut last_error = match T::parse_output(&raw) {
            Ok(record) => return Ok(record),
            Err(err) => err,
        };

        for repair in 1..=self.reparse_attempts {
            warn!(
                record = T::NAME,
                repair,
                max_repairs = self.reparse_attempts,
                error = %last_error,
                "Structured output failed to parse; requesting a repair"
            );

            let repair_messages = self.repair_prompt(messages, &raw, &last_error)?;
            raw = self.call(&repair_messages).await?;

            match T::parse_output(&raw) {
                Ok(record) => {
                    debug!(record = T::NAME, repair, "Structured output repaired");
                    return Ok(record);
                }
                Err(err) => last_error = err,
            }
        }

        Err(PipelineError::StructuredParseFailure {
            record: T::NAME,
            attempts: self.reparse_attempts + 1,
            last_error,
        })
    }

    async fn call(&self, messages: &[PromptMessage]) -> PipelineResult<String> {
        let result = self
            .retry
            .execute(&self.profile.name, || self.generator.generate(&self.profile, messages))
            .await?;
        debug!(profile = %self.profile.name, raw = %result.text, "Structured output received");
        Ok(result.text)
    }

    /// Original prompt, the malformed reply, then the repair request.
    fn repair_prompt(
        &self,
        original: &[PromptMessage],
        malformed: &str,
        error: &str,
    ) -> PipelineResult<Vec<PromptMessage>> {
        let shown_reply = if malformed.trim().is_empty() {
            "(empty reply)"
        } else {
            extract_json_payload(malformed)
        };

        let mut messages = original.to_vec();
        messages.push(PromptMessage::ai(shown_reply));
        messages.extend(
            self.registry
                .render(names::STRUCTURED_OUTPUT_REPAIR, &[("error", error)])?,
        );
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_parses_with_prose() {
        let selection =
            StrategySelection::parse_output("Selected strategy: {\"rationale\": \"r\", \"strategy\": 1}")
                .unwrap();
        assert_eq!(selection, StrategySelection::new("r", 1));
    }

    #[test]
    fn test_selection_requires_strategy_field() {
        let err = StrategySelection::parse_output("{\"rationale\": \"r\"}").unwrap_err();
        assert!(err.contains("strategy"));
    }

    #[test]
    fn test_reasoning_accepts_object_and_bare_array() {
        let steps = r#"[{"step":"a","explanation":"1"},{"step":"b","explanation":"2"},{"step":"c","explanation":"3"}]"#;
        let from_array = MultiStepReasoning::parse_output(steps).unwrap();
        let from_object = MultiStepReasoning::parse_output(&format!("{{\"steps\": {steps}}}")).unwrap();
        assert_eq!(from_array, from_object);
        assert_eq!(from_array.steps.len(), 3);
    }

    #[test]
    fn test_reasoning_rejects_wrong_count() {
        let err = MultiStepReasoning::parse_output(r#"{"steps":[{"step":"a","explanation":"x"}]}"#)
            .unwrap_err();
        assert!(err.contains("between 3 and 6"));
    }

    #[test]
    fn test_reasoning_rejects_missing_key() {
        let err = MultiStepReasoning::parse_output(r#"{"plan": []}"#).unwrap_err();
        assert!(err.contains("'steps'"));
    }
}
