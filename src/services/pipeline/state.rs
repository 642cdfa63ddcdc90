//! Pipeline stage tracking.

use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

/// Stages of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    DigestingHistory,
    InferringIntent,
    SelectingStrategy,
    ExecutingStrategy,
    Done,
    Failed,
}

impl PipelineStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DigestingHistory => "digesting_history",
            Self::InferringIntent => "inferring_intent",
            Self::SelectingStrategy => "selecting_strategy",
            Self::ExecutingStrategy => "executing_strategy",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// The only stage that may follow this one on the success path.
    pub const fn successor(self) -> Option<Self> {
        match self {
            Self::DigestingHistory => Some(Self::InferringIntent),
            Self::InferringIntent => Some(Self::SelectingStrategy),
            Self::SelectingStrategy => Some(Self::ExecutingStrategy),
            Self::ExecutingStrategy => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    /// Linear progression; any non-terminal stage may fail.
    pub fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == Self::Failed || self.successor() == Some(next)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the stage of a single run and logs each transition.
#[derive(Debug)]
pub struct PipelineRun {
    id: Uuid,
    stage: PipelineStage,
}

impl PipelineRun {
    pub fn start() -> Self {
        let run = Self {
            id: Uuid::new_v4(),
            stage: PipelineStage::DigestingHistory,
        };
        info!(run_id = %run.id, stage = %run.stage, "Pipeline run started");
        run
    }

    pub const fn id(&self) -> Uuid {
        self.id
    }

    pub const fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Move to the next stage.
    ///
    /// Out-of-order transitions are logged and ignored.
    pub fn advance(&mut self, next: PipelineStage) {
        if self.stage.can_transition_to(next) {
            info!(run_id = %self.id, from = %self.stage, to = %next, "Pipeline stage changed");
            self.stage = next;
        } else {
            warn!(run_id = %self.id, from = %self.stage, to = %next, "Ignoring invalid pipeline transition");
        }
    }

    pub fn fail(&mut self) {
        self.advance(PipelineStage::Failed);
    }
}
