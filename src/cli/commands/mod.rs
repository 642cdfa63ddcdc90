//! CLI command implementations.

pub mod ask;
pub mod serve;
pub mod stream;

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::domain::models::{serialize_turns, Turn};

/// Where the conversation comes from.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct HistoryInput {
    /// A single user message, sent as a one-turn conversation
    #[arg(short, long)]
    pub message: Option<String>,

    /// File holding a serialized conversation history
    #[arg(long)]
    pub history_file: Option<PathBuf>,
}

impl HistoryInput {
    /// The conversation in the turn grammar.
    pub async fn resolve(&self) -> Result<String> {
        match (&self.message, &self.history_file) {
            (Some(message), _) => Ok(serialize_turns(&[Turn::user(message.as_str())])),
            (None, Some(path)) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read history file {}", path.display())),
            (None, None) => anyhow::bail!("either --message or --history-file is required"),
        }
    }
}
