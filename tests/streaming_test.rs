//! Streaming pipeline runs: event order, failures and cancellation.

mod common;

use common::*;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;

use prometheia::adapters::generators::{ScriptedGenerator, ScriptedReply};
use prometheia::domain::errors::{PipelineError, UpstreamError};
use prometheia::domain::models::StreamEvent;
use prometheia::services::pipeline::step_labels;

#[tokio::test]
async fn test_standard_response_event_order() {
    let generator = ScriptedGenerator::new();
    script_preamble(&generator, 1);
    generator.push(QUALITY, ScriptedReply::fragments(["Hel", "lo", " there"]));

    let stream = pipeline(&generator).run_streaming(&single_turn("Hi")).unwrap();
    let events = collect(stream).await;

    assert_eq!(
        events,
        vec![
            StreamEvent::step(
                step_labels::ANALYZING_CONTEXT,
                "Reading the conversation for points relevant to your message"
            ),
            StreamEvent::step(step_labels::CONTEXT_ANALYZED, "- the user likes concise answers"),
            StreamEvent::step(step_labels::INFERRING_INTENTION, "Working out what you want to achieve"),
            StreamEvent::step(step_labels::INTENTION_INFERRED, "get a quick answer"),
            StreamEvent::Strategy("Standard Response".to_string()),
            StreamEvent::step("Strategy: Standard Response", "Picked for the test."),
            StreamEvent::Content("Hel".to_string()),
            StreamEvent::Content("lo".to_string()),
            StreamEvent::Content(" there".to_string()),
            StreamEvent::End,
        ]
    );

    let quality = generator.calls_for(QUALITY);
    assert_eq!(quality.len(), 1);
    assert!(quality[0].streaming);
}

#[tokio::test]
async fn test_multi_step_streams_reasoning_before_content() {
    let generator = ScriptedGenerator::new();
    script_preamble(&generator, 2);
    generator.push(STRUCTURED, ScriptedReply::text(reasoning_json()));
    generator.push(QUALITY, ScriptedReply::text("Go with B."));

    let events = collect(pipeline(&generator).run_streaming(&single_turn("A or B?")).unwrap()).await;

    assert_eq!(
        kinds(&events),
        vec![
            "steps", "steps", "steps", "steps", "strategy", "steps", "steps", "steps", "steps", "content",
            "content", "content", "end"
        ]
    );
    assert_eq!(events[4], StreamEvent::Strategy("Multi-Step Reasoning".to_string()));
    assert_eq!(events[6], StreamEvent::step("Understand", "Restate the question"));
    assert_eq!(events[8], StreamEvent::step("Conclude", "Pick the best option"));
    assert_eq!(content_of(&events), "Go with B.");
}

#[tokio::test]
async fn test_unknown_strategy_streams_as_multi_step() {
    let generator = ScriptedGenerator::new();
    script_preamble(&generator, 9);
    generator.push(STRUCTURED, ScriptedReply::text(reasoning_json()));

    let events = collect(pipeline(&generator).run_streaming(&single_turn("Hm")).unwrap()).await;

    assert_eq!(events[4], StreamEvent::Strategy("Multi-Step Reasoning".to_string()));
    assert!(!kinds(&events).contains(&"warning"));
    assert_eq!(events.last(), Some(&StreamEvent::End));
}

#[tokio::test]
async fn test_placeholder_strategies_warn_then_stream_standard_answer() {
    for (code, name) in [(3, "Plan Actions"), (4, "Multi-Agent Workflow")] {
        let generator = ScriptedGenerator::new();
        script_preamble(&generator, code);
        generator.push(QUALITY, ScriptedReply::text("Here is a direct answer."));

        let events = collect(pipeline(&generator).run_streaming(&single_turn("Plan it")).unwrap()).await;

        assert_eq!(events[4], StreamEvent::Strategy(name.to_string()));
        assert_eq!(events[5], StreamEvent::step(format!("Strategy: {name}"), "Picked for the test."));
        match &events[6] {
            StreamEvent::Warning(text) => assert!(text.contains(name) && text.contains("not implemented")),
            other => panic!("expected a warning, got {other:?}"),
        }
        assert_eq!(content_of(&events), "Here is a direct answer.");
        assert_eq!(events.last(), Some(&StreamEvent::End));
    }
}

#[tokio::test]
async fn test_streamed_content_matches_blocking_message() {
    let answer = "The quick brown fox jumps over the lazy dog.";

    let blocking = ScriptedGenerator::new();
    script_preamble(&blocking, 1);
    blocking.push(QUALITY, ScriptedReply::text(answer));
    let response = pipeline(&blocking).run_blocking(&single_turn("Fox?")).await.unwrap();

    let streaming = ScriptedGenerator::new();
    script_preamble(&streaming, 1);
    streaming.push(QUALITY, ScriptedReply::text(answer));
    let events = collect(pipeline(&streaming).run_streaming(&single_turn("Fox?")).unwrap()).await;

    assert_eq!(content_of(&events), response.message);
    assert!(events.iter().filter(|e| e.kind() == "content").count() > 1);
}

#[tokio::test]
async fn test_empty_fragments_are_not_forwarded() {
    let generator = ScriptedGenerator::new();
    script_preamble(&generator, 1);
    generator.push(QUALITY, ScriptedReply::fragments(["", "a", "", "b"]));

    let events = collect(pipeline(&generator).run_streaming(&single_turn("Hi")).unwrap()).await;

    let contents: Vec<&StreamEvent> = events.iter().filter(|e| e.kind() == "content").collect();
    assert_eq!(contents.len(), 2);
    assert_eq!(content_of(&events), "ab");
}

#[tokio::test]
async fn test_malformed_history_fails_before_streaming() {
    let generator = ScriptedGenerator::new();

    let result = pipeline(&generator).run_streaming("no delimiters here");

    assert!(matches!(result, Err(PipelineError::MalformedHistory(_))));
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_failure_is_reported_in_band_then_ends() {
    let generator = ScriptedGenerator::new();
    generator.push(FAST, ScriptedReply::text("digest"));
    generator.push(FAST, ScriptedReply::Fail(UpstreamError::Unauthorized("bad key".to_string())));

    let events = collect(pipeline(&generator).run_streaming(&single_turn("Hi")).unwrap()).await;

    assert_eq!(kinds(&events), vec!["steps", "steps", "steps", "error", "end"]);
    match &events[3] {
        StreamEvent::Error(text) => assert!(text.contains("bad key")),
        other => panic!("expected an error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_mid_stream_failure_keeps_delivered_content() {
    let generator = ScriptedGenerator::new();
    script_preamble(&generator, 1);
    generator.push(
        QUALITY,
        ScriptedReply::BrokenStream(vec!["partial ".to_string()], UpstreamError::Network("reset".to_string())),
    );

    let events = collect(pipeline(&generator).run_streaming(&single_turn("Hi")).unwrap()).await;

    let tail: Vec<&str> = kinds(&events).into_iter().rev().take(3).collect();
    assert_eq!(tail, vec!["end", "error", "content"]);
    assert_eq!(content_of(&events), "partial ");
    assert_eq!(generator.calls_for(QUALITY).len(), 1);
}

#[tokio::test]
async fn test_stream_establishment_is_retried() {
    let generator = ScriptedGenerator::new();
    script_preamble(&generator, 1);
    generator.push(QUALITY, ScriptedReply::Fail(UpstreamError::RateLimited));
    generator.push(QUALITY, ScriptedReply::text("second try"));

    let events = collect(pipeline(&generator).run_streaming(&single_turn("Hi")).unwrap()).await;

    assert_eq!(content_of(&events), "second try");
    assert!(!kinds(&events).contains(&"error"));
    assert_eq!(generator.calls_for(QUALITY).len(), 2);
}

#[tokio::test]
async fn test_dropping_the_stream_cancels_the_run() {
    let generator = ScriptedGenerator::new();
    script_preamble(&generator, 1);
    generator.push(QUALITY, ScriptedReply::Hang);

    let pipeline = pipeline(&generator);
    let mut stream = pipeline.run_streaming(&single_turn("Hi")).unwrap();

    // read up to the strategy event, then walk away while the answer hangs
    while let Some(event) = stream.next().await {
        if matches!(event, StreamEvent::Strategy(_)) {
            break;
        }
    }
    drop(stream);

    let released = tokio::time::timeout(Duration::from_secs(2), async {
        while Arc::strong_count(&pipeline) > 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(released.is_ok(), "producer task kept running after the consumer left");
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let generator = ScriptedGenerator::new();
    generator.set_default(FAST, ScriptedReply::text("shared"));
    generator.set_default(STRUCTURED, ScriptedReply::text(selection_json(1)));
    generator.set_default(QUALITY, ScriptedReply::text("same answer"));
    let pipeline = pipeline(&generator);

    let runs = (0..4).map(|i| {
        let pipeline = Arc::clone(&pipeline);
        async move { collect(pipeline.run_streaming(&single_turn(&format!("q{i}"))).unwrap()).await }
    });
    let results = futures::future::join_all(runs).await;

    for events in results {
        assert_eq!(content_of(&events), "same answer");
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }
}
