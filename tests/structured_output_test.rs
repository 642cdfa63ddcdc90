//! Structured-output extraction and the repair loop.

mod common;

use proptest::prelude::*;
use std::sync::Arc;

use common::*;
use prometheia::adapters::generators::{ScriptedGenerator, ScriptedReply};
use prometheia::domain::errors::PipelineError;
use prometheia::domain::models::{
    ModelProfile, MultiStepReasoning, PromptMessage, PromptRole, ReasoningStep, StrategySelection,
};
use prometheia::infrastructure::llm::RetryPolicy;
use prometheia::infrastructure::prompts::{names, PromptRegistry};
use prometheia::infrastructure::validators::extract_json_payload;
use prometheia::services::{StructuredOutputParser, StructuredRecord};

fn parser(generator: &ScriptedGenerator, reparse_attempts: u32) -> StructuredOutputParser {
    StructuredOutputParser::new(
        Arc::new(generator.clone()),
        Arc::new(PromptRegistry::builtin().unwrap()),
        ModelProfile::new(STRUCTURED, "test-model", 0.0),
        RetryPolicy::from(&fast_retry()),
        reparse_attempts,
    )
}

fn prompt() -> Vec<PromptMessage> {
    vec![PromptMessage::system("Return JSON."), PromptMessage::human("Pick a strategy")]
}

proptest! {
    #[test]
    fn selection_survives_prose_and_fences(
        rationale in "[a-zA-Z ,.]{0,40}",
        strategy in 1i64..=4,
        prefix in "[a-zA-Z :]{0,20}",
        suffix in "[a-zA-Z .]{0,20}",
        fenced in any::<bool>(),
    ) {
        let body = serde_json::json!({"rationale": rationale, "strategy": strategy}).to_string();
        let wrapped = if fenced {
            format!("{prefix}\n```json\n{body}\n```\n{suffix}")
        } else {
            format!("{prefix}{body}{suffix}")
        };

        let parsed = StrategySelection::parse_output(&wrapped).unwrap();
        prop_assert_eq!(parsed, StrategySelection::new(rationale, strategy));
    }

    #[test]
    fn extraction_never_grows_the_input(text in ".{0,80}") {
        prop_assert!(extract_json_payload(&text).len() <= text.len());
    }

    #[test]
    fn reasoning_step_count_is_bounded(count in 0usize..10) {
        let steps: Vec<_> = (0..count)
            .map(|n| serde_json::json!({"step": format!("s{n}"), "explanation": "e"}))
            .collect();
        let raw = serde_json::json!({"steps": steps}).to_string();

        let result = MultiStepReasoning::parse_output(&raw);
        prop_assert_eq!(result.is_ok(), (3..=6).contains(&count));
    }

    #[test]
    fn reasoning_steps_survive_the_answer_prompt(
        steps in prop::collection::vec(
            ("[a-zA-Z][a-zA-Z0-9 {}\\[\\]:,.\"]{0,24}", "[a-zA-Z0-9 {}\\[\\]:,.\"\n]{0,40}"),
            3..=6,
        )
    ) {
        let reasoning = MultiStepReasoning {
            steps: steps.iter().map(|(step, explanation)| ReasoningStep::new(step, explanation)).collect(),
        };
        let steps_json = reasoning.to_prompt_json();

        let messages = PromptRegistry::builtin()
            .unwrap()
            .render(
                names::MULTI_STEP_REASONING_RESPONSE,
                &[
                    ("intention", "understand the topic"),
                    ("steps", steps_json.as_str()),
                    ("conversation_history", "###USER###\nExplain\n###END###\n"),
                ],
            )
            .unwrap();

        let system = messages.iter().find(|m| m.role == PromptRole::System).unwrap();
        let payload = system
            .content
            .lines()
            .find_map(|line| line.strip_prefix("Steps: "))
            .unwrap();
        let parsed = MultiStepReasoning::parse_output(payload).unwrap();

        prop_assert_eq!(parsed.steps.len(), reasoning.steps.len());
        prop_assert_eq!(parsed.steps, reasoning.steps);
    }
}

#[test]
fn test_first_valid_reply_needs_no_repair() {
    let generator = ScriptedGenerator::new();
    generator.push(STRUCTURED, ScriptedReply::text(selection_json(2)));

    let selection: StrategySelection = tokio_test::block_on(parser(&generator, 3).generate(&prompt())).unwrap();

    assert_eq!(selection.strategy, 2);
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test]
async fn test_repair_prompt_carries_error_and_reply() {
    let generator = ScriptedGenerator::new();
    generator.push(STRUCTURED, ScriptedReply::text("```json\n{\"rationale\": \"r\"}\n```"));
    generator.push(STRUCTURED, ScriptedReply::text(selection_json(1)));

    let selection: StrategySelection = parser(&generator, 3).generate(&prompt()).await.unwrap();
    assert_eq!(selection.strategy, 1);

    let repair = &generator.calls()[1].messages;
    assert_eq!(repair.len(), prompt().len() + 2);
    assert_eq!(repair[..2], prompt()[..]);
    assert_eq!(repair[2], PromptMessage::ai("{\"rationale\": \"r\"}"));
    assert!(repair[3].content.contains("strategy"));
}

#[tokio::test]
async fn test_zero_repairs_means_single_attempt() {
    let generator = ScriptedGenerator::new();
    generator.set_default(STRUCTURED, ScriptedReply::text("nope"));

    let err = parser(&generator, 0)
        .generate::<StrategySelection>(&prompt())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::StructuredParseFailure { attempts: 1, .. }));
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test]
async fn test_empty_reply_is_shown_as_placeholder() {
    let generator = ScriptedGenerator::new();
    generator.push(STRUCTURED, ScriptedReply::text("   "));
    generator.push(STRUCTURED, ScriptedReply::text(selection_json(1)));

    parser(&generator, 1).generate::<StrategySelection>(&prompt()).await.unwrap();

    let repair = &generator.calls()[1].messages;
    assert_eq!(repair[2], PromptMessage::ai("(empty reply)"));
}
