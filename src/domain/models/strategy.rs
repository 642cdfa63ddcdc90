//! Strategy selection and reasoning-step records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum number of reasoning steps accepted from the structured model.
pub const MIN_REASONING_STEPS: usize = 3;
/// Maximum number of reasoning steps accepted from the structured model.
pub const MAX_REASONING_STEPS: usize = 6;

/// The four response-generation modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    StandardResponse,
    MultiStepReasoning,
    PlanActions,
    MultiAgentWorkflow,
}

impl Strategy {
    /// All strategies in code order.
    pub const ALL: [Self; 4] = [
        Self::StandardResponse,
        Self::MultiStepReasoning,
        Self::PlanActions,
        Self::MultiAgentWorkflow,
    ];

    /// Map a classifier code to a strategy.
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::StandardResponse),
            2 => Some(Self::MultiStepReasoning),
            3 => Some(Self::PlanActions),
            4 => Some(Self::MultiAgentWorkflow),
            _ => None,
        }
    }

    pub const fn code(self) -> i64 {
        match self {
            Self::StandardResponse => 1,
            Self::MultiStepReasoning => 2,
            Self::PlanActions => 3,
            Self::MultiAgentWorkflow => 4,
        }
    }

    /// Name shown to users in `strategy` events.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::StandardResponse => "Standard Response",
            Self::MultiStepReasoning => "Multi-Step Reasoning",
            Self::PlanActions => "Plan Actions",
            Self::MultiAgentWorkflow => "Multi-Agent Workflow",
        }
    }

    /// Whether the strategy has a real implementation.
    pub const fn is_implemented(self) -> bool {
        matches!(self, Self::StandardResponse | Self::MultiStepReasoning)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StandardResponse => "standard_response",
            Self::MultiStepReasoning => "multi_step_reasoning",
            Self::PlanActions => "plan_actions",
            Self::MultiAgentWorkflow => "multi_agent_workflow",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Output of the strategy classifier.
///
/// `strategy` stays a raw integer: out-of-range codes are a recoverable
/// condition handled by the executor, not a parse failure. Classifiers
/// sometimes quote the code or write it as `2.0`; both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategySelection {
    pub rationale: String,
    #[serde(deserialize_with = "deserialize_strategy_code")]
    pub strategy: i64,
}

impl StrategySelection {
    pub fn new(rationale: impl Into<String>, strategy: i64) -> Self {
        Self {
            rationale: rationale.into(),
            strategy,
        }
    }

    /// The known strategy for this selection, if any.
    pub const fn known_strategy(&self) -> Option<Strategy> {
        Strategy::from_code(self.strategy)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCode {
    Int(i64),
    Float(f64),
    Text(String),
}

#[allow(clippy::cast_possible_truncation)]
fn whole_number(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15).then(|| value as i64)
}

fn deserialize_strategy_code<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let code = match RawCode::deserialize(deserializer)? {
        RawCode::Int(code) => Some(code),
        RawCode::Float(value) => whole_number(value),
        RawCode::Text(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(whole_number))
        }
    };
    code.ok_or_else(|| serde::de::Error::custom("strategy must be a whole number"))
}

/// One step of a reasoning narrative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub step: String,
    #[serde(default)]
    pub explanation: String,
}

impl ReasoningStep {
    pub fn new(step: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            explanation: explanation.into(),
        }
    }
}

/// An ordered sequence of 3 to 6 reasoning steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiStepReasoning {
    pub steps: Vec<ReasoningStep>,
}

impl MultiStepReasoning {
    /// Check the step count and that every step names an action.
    pub fn validate(&self) -> Result<(), String> {
        let count = self.steps.len();
        if !(MIN_REASONING_STEPS..=MAX_REASONING_STEPS).contains(&count) {
            return Err(format!(
                "expected between {MIN_REASONING_STEPS} and {MAX_REASONING_STEPS} steps, got {count}"
            ));
        }
        if let Some(position) = self.steps.iter().position(|s| s.step.trim().is_empty()) {
            return Err(format!("step {} has an empty 'step' field", position + 1));
        }
        Ok(())
    }

    /// JSON form fed back into the final-answer prompt.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string(&self.steps).unwrap_or_else(|_| "[]".to_string())
    }
}
