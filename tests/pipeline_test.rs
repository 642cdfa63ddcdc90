//! Blocking pipeline runs against a scripted upstream.

mod common;

use common::*;
use prometheia::adapters::generators::{ScriptedGenerator, ScriptedReply};
use prometheia::domain::errors::{PipelineError, UpstreamError};
use prometheia::domain::models::{ConversationHistory, PromptRole, ReasoningStep};

#[tokio::test]
async fn test_standard_response_uses_quality_profile() {
    let generator = ScriptedGenerator::new();
    script_preamble(&generator, 1);
    generator.push(QUALITY, ScriptedReply::text("Paris is the capital of France."));

    let response = pipeline(&generator)
        .run_blocking(&single_turn("What is the capital of France?"))
        .await
        .unwrap();

    assert_eq!(response.message, "Paris is the capital of France.");
    assert!(response.steps.is_empty());

    let profiles: Vec<String> = generator.calls().into_iter().map(|call| call.profile).collect();
    assert_eq!(profiles, vec![FAST, FAST, STRUCTURED, QUALITY]);
}

#[tokio::test]
async fn test_digest_and_intent_feed_later_prompts() {
    let generator = ScriptedGenerator::new();
    script_preamble(&generator, 1);

    pipeline(&generator)
        .run_blocking(&single_turn("Recommend a book"))
        .await
        .unwrap();

    let calls = generator.calls();
    let intent_prompt: String = calls[1].messages.iter().map(|m| m.content.as_str()).collect();
    assert!(intent_prompt.contains("Recommend a book"));
    assert!(intent_prompt.contains("Relevant points from previous conversation:\n- the user likes concise answers"));

    let selection_prompt: String = calls[2].messages.iter().map(|m| m.content.as_str()).collect();
    assert!(selection_prompt.contains("get a quick answer"));

    let answer_prompt: String = calls[3].messages.iter().map(|m| m.content.as_str()).collect();
    assert!(answer_prompt.contains("###USER###\nRecommend a book\n###END###"));
}

#[tokio::test]
async fn test_multi_step_reasoning_returns_steps() {
    let generator = ScriptedGenerator::new();
    script_preamble(&generator, 2);
    generator.push(STRUCTURED, ScriptedReply::text(reasoning_json()));
    generator.push(QUALITY, ScriptedReply::text("Option B is the better fit."));

    let response = pipeline(&generator)
        .run_blocking(&single_turn("Should I pick A or B?"))
        .await
        .unwrap();

    assert_eq!(response.message, "Option B is the better fit.");
    assert_eq!(response.steps.len(), 3);
    assert_eq!(response.steps[0], ReasoningStep::new("Understand", "Restate the question"));

    let answer_prompt: String = generator.calls_for(QUALITY)[0]
        .messages
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert!(answer_prompt.contains("Weigh the options"));
}

#[tokio::test]
async fn test_unknown_strategy_falls_back_to_multi_step() {
    let generator = ScriptedGenerator::new();
    script_preamble(&generator, 7);
    generator.push(STRUCTURED, ScriptedReply::text(reasoning_json()));

    let response = pipeline(&generator)
        .run_blocking(&single_turn("Something unusual"))
        .await
        .unwrap();

    assert_eq!(response.steps.len(), 3);
    assert_eq!(generator.calls_for(STRUCTURED).len(), 2);
}

#[tokio::test]
async fn test_placeholder_strategies_skip_final_generation() {
    for (code, heading) in [(3, "# Plan Actions Strategy"), (4, "# Multi-Agent Workflow Strategy")] {
        let generator = ScriptedGenerator::new();
        script_preamble(&generator, code);

        let response = pipeline(&generator)
            .run_blocking(&single_turn("Organize my move"))
            .await
            .unwrap();

        assert!(response.message.starts_with(heading));
        assert!(response.message.contains("## Inferred Intention\nget a quick answer"));
        assert!(response.message.contains("## Strategy Rationale\nPicked for the test."));
        assert_eq!(response.steps.len(), 3);
        assert!(generator.calls_for(QUALITY).is_empty());
    }
}

#[tokio::test]
async fn test_malformed_history_makes_no_upstream_calls() {
    let generator = ScriptedGenerator::new();
    let pipeline = pipeline(&generator);

    for raw in ["", "hello", "###USER###\nunterminated", "###AI###\nanswer\n###END###\n"] {
        let err = pipeline.run_blocking(raw).await.unwrap_err();
        assert!(matches!(err, PipelineError::MalformedHistory(_)), "{raw:?} gave {err:?}");
    }
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_selection_is_repaired_after_bad_output() {
    let generator = ScriptedGenerator::new();
    generator.push(FAST, ScriptedReply::text("digest"));
    generator.push(FAST, ScriptedReply::text("intent"));
    generator.push(STRUCTURED, ScriptedReply::text("I would go with strategy one."));
    generator.push(STRUCTURED, ScriptedReply::text(selection_json(1)));

    let response = pipeline(&generator).run_blocking(&single_turn("Hi")).await.unwrap();
    assert_eq!(response.message, "Scripted reply.");

    let structured = generator.calls_for(STRUCTURED);
    assert_eq!(structured.len(), 2);
    let repair = &structured[1].messages;
    let malformed = &repair[repair.len() - 2];
    assert_eq!(malformed.role, PromptRole::Ai);
    assert_eq!(malformed.content, "I would go with strategy one.");
    assert!(repair[repair.len() - 1].content.contains("could not be used"));
}

#[tokio::test]
async fn test_reparse_exhaustion_is_fatal() {
    let generator = ScriptedGenerator::new();
    generator.push(FAST, ScriptedReply::text("digest"));
    generator.push(FAST, ScriptedReply::text("intent"));
    generator.set_default(STRUCTURED, ScriptedReply::text("not json at all"));

    let err = pipeline(&generator).run_blocking(&single_turn("Hi")).await.unwrap_err();

    match err {
        PipelineError::StructuredParseFailure { attempts, .. } => assert_eq!(attempts, 4),
        other => panic!("expected parse failure, got {other:?}"),
    }
    assert_eq!(generator.calls_for(STRUCTURED).len(), 4);
    assert!(generator.calls_for(QUALITY).is_empty());
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let generator = ScriptedGenerator::new();
    generator.push(FAST, ScriptedReply::Fail(UpstreamError::RateLimited));
    generator.push(
        FAST,
        ScriptedReply::Fail(UpstreamError::Server {
            status: 503,
            body: "busy".to_string(),
        }),
    );
    script_preamble(&generator, 1);

    let response = pipeline(&generator).run_blocking(&single_turn("Hi")).await.unwrap();
    assert_eq!(response.message, "Scripted reply.");
    assert_eq!(generator.calls_for(FAST).len(), 4);
}

#[tokio::test]
async fn test_transient_exhaustion_reports_attempts() {
    let generator = ScriptedGenerator::new();
    generator.set_default(FAST, ScriptedReply::Fail(UpstreamError::Timeout));

    let err = pipeline(&generator).run_blocking(&single_turn("Hi")).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::UpstreamTransientFailure {
            attempts: 3,
            source: UpstreamError::Timeout
        }
    ));
    assert_eq!(generator.call_count(), 3);
}

#[tokio::test]
async fn test_permanent_failures_are_not_retried() {
    let generator = ScriptedGenerator::new();
    generator.push(FAST, ScriptedReply::Fail(UpstreamError::Unauthorized("bad key".to_string())));

    let err = pipeline(&generator).run_blocking(&single_turn("Hi")).await.unwrap_err();

    assert!(matches!(err, PipelineError::Upstream(UpstreamError::Unauthorized(_))));
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test]
async fn test_digest_is_repeatable_for_the_same_history() {
    let generator = ScriptedGenerator::new();
    generator.set_default(FAST, ScriptedReply::text("- prefers short answers\n- asked about trains"));
    let pipeline = pipeline(&generator);
    let history = ConversationHistory::parse(
        "###USER###\nHi\n###END###\n###AI###\nHello!\n###END###\n###USER###\nTrain or plane?\n###END###\n",
    )
    .unwrap();

    let first = pipeline.digest_history(&history).await.unwrap();
    let second = pipeline.digest_history(&history).await.unwrap();

    assert_eq!(first, second);
    let calls = generator.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|call| call.profile == FAST));
    assert_eq!(calls[0].messages, calls[1].messages);
}

#[tokio::test]
async fn test_run_reports_resolved_strategy() {
    let generator = ScriptedGenerator::new();
    script_preamble(&generator, 3);

    let reply = pipeline(&generator)
        .run_blocking_with_strategy(&single_turn("Book me a flight"))
        .await
        .unwrap();

    assert_eq!(reply.strategy, prometheia::domain::models::Strategy::PlanActions);
    assert_eq!(reply.response.steps.len(), 3);
}
