//! Implementation of the `prometheia ask` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::HistoryInput;
use crate::cli::bootstrap::{build_generator, build_pipeline};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, ReasoningStep, ResponseEnvelope};

#[derive(Args, Debug)]
pub struct AskArgs {
    #[command(flatten)]
    pub input: HistoryInput,

    /// Answer with canned replies instead of calling the upstream model
    #[arg(long)]
    pub offline: bool,
}

#[derive(Debug, Serialize)]
pub struct AskOutput {
    pub message: String,
    pub steps: Vec<ReasoningStep>,
}

impl From<ResponseEnvelope> for AskOutput {
    fn from(response: ResponseEnvelope) -> Self {
        Self {
            message: response.message,
            steps: response.steps,
        }
    }
}

impl CommandOutput for AskOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if !self.steps.is_empty() {
            lines.push("\nSteps:".to_string());
            for (index, step) in self.steps.iter().enumerate() {
                lines.push(format!("  {}. {}: {}", index + 1, step.step, step.explanation));
            }
        }
        lines.join("\n")
    }
}

pub async fn execute(args: AskArgs, config: &Config, json_mode: bool) -> Result<()> {
    let history = args.input.resolve().await?;
    let pipeline = build_pipeline(config, build_generator(config, args.offline)?)?;

    let response = pipeline.run_blocking(&history).await?;
    output(&AskOutput::from(response), json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_output_lists_steps() {
        let output = AskOutput {
            message: "Answer".to_string(),
            steps: vec![ReasoningStep::new("Look", "Check the facts")],
        };
        assert_eq!(output.to_human(), "Answer\n\nSteps:\n  1. Look: Check the facts");
    }

    #[test]
    fn test_json_output_shape() {
        let output = AskOutput {
            message: "Answer".to_string(),
            steps: Vec::new(),
        };
        assert_eq!(output.to_json(), serde_json::json!({"message": "Answer", "steps": []}));
    }
}
