//! Shared pipeline steps: digest, intent inference and strategy selection.

use tracing::{debug, info, warn};

use super::StrategyPipeline;
use crate::domain::errors::{PipelineError, PipelineResult};
use crate::domain::models::{ConversationHistory, Strategy, StrategySelection};
use crate::infrastructure::prompts::names;

/// Everything the strategy handlers need from the earlier steps.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub history: ConversationHistory,
    pub digest: String,
    pub combined_input: String,
    pub intention: String,
    pub selection: StrategySelection,
    /// Strategy the selection resolves to, unknown codes already mapped
    pub strategy: Strategy,
}

/// The user's current message followed by the conversation digest.
pub fn combined_input(last_message: &str, digest: &str) -> String {
    format!("{last_message}\n\nRelevant points from previous conversation:\n{digest}")
}

/// Map a classifier code to a strategy; unknown codes become multi-step reasoning.
pub fn resolve_strategy(selection: &StrategySelection) -> Strategy {
    selection.known_strategy().unwrap_or_else(|| {
        let recovered = PipelineError::UnknownStrategy(selection.strategy);
        warn!(code = recovered.code(), strategy = selection.strategy, "{recovered}");
        Strategy::MultiStepReasoning
    })
}

impl StrategyPipeline {
    /// Condense the conversation into the points relevant to the last message.
    pub async fn digest_history(&self, history: &ConversationHistory) -> PipelineResult<String> {
        let messages = self
            .registry
            .render(names::DIGEST_CONVERSATION, &[("conversation_history", history.raw())])?;
        let digest = self.complete(&self.fast, &messages).await?;
        debug!(digest = %digest, "Conversation digested");
        Ok(digest)
    }

    /// State the user's goal in one sentence.
    pub async fn infer_intent(&self, combined_input: &str) -> PipelineResult<String> {
        let messages = self
            .registry
            .render(names::INFER_INTENTION, &[("combined_input", combined_input)])?;
        let intention = self.complete(&self.fast, &messages).await?;
        debug!(intention = %intention, "Intention inferred");
        Ok(intention)
    }

    /// Ask the classifier which strategy fits.
    pub async fn select_strategy(
        &self,
        combined_input: &str,
        intention: &str,
    ) -> PipelineResult<StrategySelection> {
        let messages = self.registry.render(
            names::SELECT_STRATEGY,
            &[("combined_input", combined_input), ("intention", intention)],
        )?;
        let selection: StrategySelection = self.structured.generate(&messages).await?;
        info!(strategy = selection.strategy, rationale = %selection.rationale, "Strategy selected");
        Ok(selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_input_layout() {
        assert_eq!(
            combined_input("What next?", "- likes Rust"),
            "What next?\n\nRelevant points from previous conversation:\n- likes Rust"
        );
    }

    #[test]
    fn test_known_codes_resolve_to_their_strategy() {
        for strategy in Strategy::ALL {
            let selection = StrategySelection::new("r", strategy.code());
            assert_eq!(resolve_strategy(&selection), strategy);
        }
    }

    #[test]
    fn test_unknown_codes_fall_back_to_multi_step() {
        for code in [0, 5, -1, 42] {
            assert_eq!(resolve_strategy(&StrategySelection::new("r", code)), Strategy::MultiStepReasoning);
        }
    }
}
