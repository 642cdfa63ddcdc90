//! Strategy pipeline
//!
//! Digest the conversation, infer the user's intention, let the classifier
//! pick a strategy, then run it. Blocking mode returns a [`ResponseEnvelope`];
//! streaming mode yields [`StreamEvent`]s from a spawned producer that stops
//! as soon as the consumer drops the stream.
//!
//! Only the final answer is streamed from upstream. The earlier steps use
//! whole-result generation under the transient retry policy.

pub mod events;
pub mod state;
pub mod steps;
pub mod strategies;

pub use events::{PipelineEventStream, EVENT_BUFFER};
pub use state::{PipelineRun, PipelineStage};
pub use steps::{combined_input, resolve_strategy, RunContext};
pub use strategies::placeholder_response;

use std::sync::Arc;
use tracing::{debug, error, info, info_span, instrument, Instrument};

use crate::domain::errors::PipelineResult;
use crate::domain::models::{
    Config, ConversationHistory, ModelProfile, ModelsConfig, PromptMessage, ResponseEnvelope,
    RetryConfig, Strategy, StreamEvent,
};
use crate::domain::ports::{FragmentStream, TextGenerator};
use crate::infrastructure::llm::RetryPolicy;
use crate::infrastructure::prompts::PromptRegistry;
use crate::services::structured_output::StructuredOutputParser;
use events::{EventSink, Interrupt};

/// Progress step labels shown in streaming mode.
pub mod step_labels {
    pub const ANALYZING_CONTEXT: &str = "Analyzing conversation context";
    pub const CONTEXT_ANALYZED: &str = "Context analyzed";
    pub const INFERRING_INTENTION: &str = "Inferring your intention";
    pub const INTENTION_INFERRED: &str = "Intention inferred";
}

/// A model profile with its resolved retry policy.
#[derive(Debug, Clone)]
pub(crate) struct ProfileBinding {
    pub profile: ModelProfile,
    pub retry: RetryPolicy,
}

impl ProfileBinding {
    fn new(profile: &ModelProfile, global: &RetryConfig) -> Self {
        Self {
            profile: profile.clone(),
            retry: RetryPolicy::from(profile.effective_retry(global)),
        }
    }
}

/// A blocking run's response together with the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingReply {
    pub strategy: Strategy,
    pub response: ResponseEnvelope,
}

/// The conversational strategy pipeline.
///
/// Holds no per-request state; one instance serves concurrent requests.
pub struct StrategyPipeline {
    generator: Arc<dyn TextGenerator>,
    registry: Arc<PromptRegistry>,
    fast: ProfileBinding,
    quality: ProfileBinding,
    structured: StructuredOutputParser,
}

impl StrategyPipeline {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        registry: Arc<PromptRegistry>,
        models: &ModelsConfig,
        retry: &RetryConfig,
        reparse_attempts: u32,
    ) -> Self {
        let structured = ProfileBinding::new(&models.structured, retry);
        Self {
            structured: StructuredOutputParser::new(
                Arc::clone(&generator),
                Arc::clone(&registry),
                structured.profile,
                structured.retry,
                reparse_attempts,
            ),
            fast: ProfileBinding::new(&models.fast, retry),
            quality: ProfileBinding::new(&models.quality, retry),
            generator,
            registry,
        }
    }

    pub fn from_config(generator: Arc<dyn TextGenerator>, registry: Arc<PromptRegistry>, config: &Config) -> Self {
        Self::new(
            generator,
            registry,
            &config.models,
            &config.retry,
            config.pipeline.reparse_attempts,
        )
    }

    /// Run the whole pipeline and return the complete response.
    ///
    /// # Errors
    /// `MalformedHistory` before any upstream call; otherwise the first fatal
    /// upstream, parse or template failure. No partial response is returned.
    pub async fn run_blocking(&self, raw_history: &str) -> PipelineResult<ResponseEnvelope> {
        self.run_blocking_with_strategy(raw_history)
            .await
            .map(|reply| reply.response)
    }

    /// Like [`Self::run_blocking`], also reporting the resolved strategy.
    #[instrument(skip_all, fields(history_len = raw_history.len()))]
    pub async fn run_blocking_with_strategy(&self, raw_history: &str) -> PipelineResult<BlockingReply> {
        let history = ConversationHistory::parse(raw_history)?;
        let mut run = PipelineRun::start();

        match self.blocking_run(history, &mut run).await {
            Ok(reply) => {
                run.advance(PipelineStage::Done);
                info!(
                    run_id = %run.id(),
                    strategy = reply.strategy.as_str(),
                    steps = reply.response.steps.len(),
                    "Pipeline run completed"
                );
                Ok(reply)
            }
            Err(err) => {
                run.fail();
                error!(run_id = %run.id(), code = err.code(), error = %err, "Pipeline run failed");
                Err(err)
            }
        }
    }

    /// Start a streaming run.
    ///
    /// The history is validated before anything is spawned, so a malformed
    /// history fails here without touching upstream. Every later failure is
    /// delivered in-band as `error` followed by `end`.
    pub fn run_streaming(self: &Arc<Self>, raw_history: &str) -> PipelineResult<PipelineEventStream> {
        let history = ConversationHistory::parse(raw_history)?;
        let (sink, stream) = PipelineEventStream::channel();

        let pipeline = Arc::clone(self);
        let span = info_span!("pipeline_stream", history_len = raw_history.len());
        tokio::spawn(async move { pipeline.produce(history, sink).await }.instrument(span));

        Ok(stream)
    }

    async fn blocking_run(
        &self,
        history: ConversationHistory,
        run: &mut PipelineRun,
    ) -> PipelineResult<BlockingReply> {
        let digest = self.digest_history(&history).await?;
        let combined = combined_input(history.last_user_message(), &digest);

        run.advance(PipelineStage::InferringIntent);
        let intention = self.infer_intent(&combined).await?;

        run.advance(PipelineStage::SelectingStrategy);
        let selection = self.select_strategy(&combined, &intention).await?;
        let strategy = resolve_strategy(&selection);

        run.advance(PipelineStage::ExecutingStrategy);
        let ctx = RunContext {
            history,
            digest,
            combined_input: combined,
            intention,
            selection,
            strategy,
        };
        let response = self.execute_strategy(&ctx).await?;
        Ok(BlockingReply { strategy, response })
    }

    /// Drive one streaming run to its terminal event.
    async fn produce(&self, history: ConversationHistory, sink: EventSink) {
        let mut run = PipelineRun::start();

        let outcome = tokio::select! {
            outcome = self.streaming_run(history, &mut run, &sink) => outcome,
            () = sink.closed() => Err(Interrupt::Cancelled),
        };

        match outcome {
            Ok(()) => {
                run.advance(PipelineStage::Done);
                info!(run_id = %run.id(), "Pipeline stream completed");
                if sink.emit(StreamEvent::End).await.is_err() {
                    debug!(run_id = %run.id(), "Consumer left before the end event");
                }
            }
            Err(Interrupt::Failed(err)) => {
                run.fail();
                error!(run_id = %run.id(), code = err.code(), error = %err, "Pipeline stream failed");
                if sink.emit(StreamEvent::Error(err.to_string())).await.is_ok() {
                    let _ = sink.emit(StreamEvent::End).await;
                }
            }
            Err(Interrupt::Cancelled) => {
                run.fail();
                info!(run_id = %run.id(), "Consumer disconnected; pipeline stream cancelled");
            }
        }
    }

    async fn streaming_run(
        &self,
        history: ConversationHistory,
        run: &mut PipelineRun,
        sink: &EventSink,
    ) -> Result<(), Interrupt> {
        sink.emit(StreamEvent::step(
            step_labels::ANALYZING_CONTEXT,
            "Reading the conversation for points relevant to your message",
        ))
        .await?;
        let digest = self.digest_history(&history).await?;
        sink.emit(StreamEvent::step(step_labels::CONTEXT_ANALYZED, digest.as_str()))
            .await?;
        let combined = combined_input(history.last_user_message(), &digest);

        run.advance(PipelineStage::InferringIntent);
        sink.emit(StreamEvent::step(
            step_labels::INFERRING_INTENTION,
            "Working out what you want to achieve",
        ))
        .await?;
        let intention = self.infer_intent(&combined).await?;
        sink.emit(StreamEvent::step(step_labels::INTENTION_INFERRED, intention.as_str()))
            .await?;

        run.advance(PipelineStage::SelectingStrategy);
        let selection = self.select_strategy(&combined, &intention).await?;
        let strategy = resolve_strategy(&selection);
        sink.emit(StreamEvent::Strategy(strategy.display_name().to_string()))
            .await?;
        sink.emit(StreamEvent::step(
            format!("Strategy: {}", strategy.display_name()),
            selection.rationale.as_str(),
        ))
        .await?;

        run.advance(PipelineStage::ExecutingStrategy);
        let ctx = RunContext {
            history,
            digest,
            combined_input: combined,
            intention,
            selection,
            strategy,
        };
        self.stream_strategy(&ctx, sink).await
    }

    /// Whole-result generation under the profile's retry policy.
    pub(crate) async fn complete(&self, binding: &ProfileBinding, messages: &[PromptMessage]) -> PipelineResult<String> {
        let result = binding
            .retry
            .execute(&binding.profile.name, || self.generator.generate(&binding.profile, messages))
            .await?;
        if !result.stopped {
            debug!(profile = %binding.profile.name, "Upstream did not report a natural stop");
        }
        Ok(result.text)
    }

    /// Open a fragment stream; only establishing it is retried.
    pub(crate) async fn open_stream(
        &self,
        binding: &ProfileBinding,
        messages: &[PromptMessage],
    ) -> PipelineResult<FragmentStream> {
        binding
            .retry
            .execute(&binding.profile.name, || self.generator.stream(&binding.profile, messages))
            .await
    }
}
