//! Strategy handlers, blocking and streaming.

use futures::StreamExt;
use tracing::{debug, info, warn};

use super::events::{EventSink, Interrupt};
use super::steps::RunContext;
use super::{ProfileBinding, StrategyPipeline};
use crate::domain::errors::{PipelineError, PipelineResult};
use crate::domain::models::{
    MultiStepReasoning, PromptMessage, ReasoningStep, ResponseEnvelope, Strategy, StreamEvent,
};
use crate::infrastructure::prompts::names;

/// Number of canned items in a placeholder response.
const PLACEHOLDER_ITEMS: usize = 3;

impl StrategyPipeline {
    /// Run the resolved strategy and return the whole response.
    pub(super) async fn execute_strategy(&self, ctx: &RunContext) -> PipelineResult<ResponseEnvelope> {
        info!(strategy = ctx.strategy.as_str(), "Executing strategy");
        match ctx.strategy {
            Strategy::StandardResponse => {
                let messages = self.standard_prompt(ctx)?;
                let message = self.complete(&self.quality, &messages).await?;
                Ok(ResponseEnvelope::new(message, Vec::new()))
            }
            Strategy::MultiStepReasoning => {
                let reasoning = self.reason_in_steps(ctx).await?;
                let messages = self.reasoning_answer_prompt(ctx, &reasoning)?;
                let message = self.complete(&self.quality, &messages).await?;
                Ok(ResponseEnvelope::new(message, reasoning.steps))
            }
            Strategy::PlanActions | Strategy::MultiAgentWorkflow => {
                let response = placeholder_response(ctx);
                info!(strategy = ctx.strategy.as_str(), "Returning placeholder response");
                Ok(response)
            }
        }
    }

    /// Run the resolved strategy, emitting its events.
    pub(super) async fn stream_strategy(&self, ctx: &RunContext, sink: &EventSink) -> Result<(), Interrupt> {
        info!(strategy = ctx.strategy.as_str(), "Streaming strategy");
        match ctx.strategy {
            Strategy::StandardResponse => {
                let messages = self.standard_prompt(ctx)?;
                self.stream_answer(&self.quality, &messages, sink).await
            }
            Strategy::MultiStepReasoning => {
                let reasoning = self.reason_in_steps(ctx).await?;
                let messages = self.reasoning_answer_prompt(ctx, &reasoning)?;
                for step in reasoning.steps {
                    sink.emit(StreamEvent::Steps(step)).await?;
                }
                self.stream_answer(&self.quality, &messages, sink).await
            }
            Strategy::PlanActions | Strategy::MultiAgentWorkflow => {
                let recovered = PipelineError::UnimplementedStrategy(ctx.strategy);
                warn!(code = recovered.code(), strategy = ctx.strategy.as_str(), "{recovered}");
                sink.emit(StreamEvent::Warning(recovered.to_string())).await?;

                let messages = self.standard_prompt(ctx)?;
                self.stream_answer(&self.quality, &messages, sink).await
            }
        }
    }

    fn standard_prompt(&self, ctx: &RunContext) -> PipelineResult<Vec<PromptMessage>> {
        Ok(self.registry.render(
            names::STANDARD_RESPONSE,
            &[
                ("intention", ctx.intention.as_str()),
                ("conversation_history", ctx.history.raw()),
            ],
        )?)
    }

    /// Break the problem into 3 to 6 steps through the structured-output profile.
    async fn reason_in_steps(&self, ctx: &RunContext) -> PipelineResult<MultiStepReasoning> {
        let messages = self.registry.render(
            names::MULTI_STEP_REASONING,
            &[
                ("conversation_history", ctx.history.raw()),
                ("combined_input", ctx.combined_input.as_str()),
            ],
        )?;
        let reasoning: MultiStepReasoning = self.structured.generate(&messages).await?;
        debug!(steps = reasoning.steps.len(), "Reasoning steps generated");
        Ok(reasoning)
    }

    fn reasoning_answer_prompt(
        &self,
        ctx: &RunContext,
        reasoning: &MultiStepReasoning,
    ) -> PipelineResult<Vec<PromptMessage>> {
        let steps = reasoning.to_prompt_json();
        Ok(self.registry.render(
            names::MULTI_STEP_REASONING_RESPONSE,
            &[
                ("intention", ctx.intention.as_str()),
                ("steps", steps.as_str()),
                ("conversation_history", ctx.history.raw()),
            ],
        )?)
    }

    /// Forward answer fragments as `content` events.
    ///
    /// Only opening the stream is retried; a failure after fragments have
    /// been delivered is fatal.
    async fn stream_answer(
        &self,
        binding: &ProfileBinding,
        messages: &[PromptMessage],
        sink: &EventSink,
    ) -> Result<(), Interrupt> {
        let mut fragments = self.open_stream(binding, messages).await?;
        let mut delivered = 0_usize;

        while let Some(fragment) = fragments.next().await {
            let fragment = fragment.map_err(PipelineError::Upstream)?;
            if fragment.is_empty() {
                continue;
            }
            delivered += fragment.len();
            sink.emit(StreamEvent::Content(fragment)).await?;
        }

        debug!(profile = %binding.profile.name, bytes = delivered, "Answer stream finished");
        Ok(())
    }
}

/// Canned response for strategies without a real implementation.
pub fn placeholder_response(ctx: &RunContext) -> ResponseEnvelope {
    let steps = placeholder_steps(ctx.strategy);
    let items = steps
        .iter()
        .enumerate()
        .map(|(index, step)| format!("{}. {}: {}", index + 1, step.step, step.explanation))
        .collect::<Vec<_>>()
        .join("\n");

    let message = format!(
        "# {name} Strategy\n\n\
         ## Conversation History\n{history}\n\n\
         ## Inferred Intention\n{intention}\n\n\
         ## Strategy Rationale\n{rationale}\n\n\
         This strategy is not yet fully implemented. Here's a placeholder response:\n\n\
         {items}",
        name = ctx.strategy.display_name(),
        history = ctx.history.raw(),
        intention = ctx.intention,
        rationale = ctx.selection.rationale,
    );

    ResponseEnvelope::new(message, steps)
}

fn placeholder_steps(strategy: Strategy) -> Vec<ReasoningStep> {
    (1..=PLACEHOLDER_ITEMS)
        .map(|n| match strategy {
            Strategy::MultiAgentWorkflow => {
                ReasoningStep::new(format!("Agent {n} Task"), format!("Description of Agent {n}'s task"))
            }
            _ => ReasoningStep::new(format!("Action {n}"), format!("Description of action {n}")),
        })
        .collect()
}
