//! Implementation of the `prometheia stream` command.

use anyhow::{bail, Result};
use clap::Args;
use futures::StreamExt;
use std::io::Write;

use super::HistoryInput;
use crate::cli::bootstrap::{build_generator, build_pipeline};
use crate::domain::models::{Config, StreamEvent};

#[derive(Args, Debug)]
pub struct StreamArgs {
    #[command(flatten)]
    pub input: HistoryInput,

    /// Answer with canned replies instead of calling the upstream model
    #[arg(long)]
    pub offline: bool,
}

/// One event as printed: an SSE frame, or a JSON line in JSON mode.
pub fn render_event(event: &StreamEvent, json_mode: bool) -> String {
    if json_mode {
        format!("{}\n", event.to_json())
    } else {
        event.to_sse_frame()
    }
}

pub async fn execute(args: StreamArgs, config: &Config, json_mode: bool) -> Result<()> {
    let history = args.input.resolve().await?;
    let pipeline = build_pipeline(config, build_generator(config, args.offline)?)?;

    let mut events = pipeline.run_streaming(&history)?;
    let mut failure = None;
    let mut stdout = std::io::stdout();

    while let Some(event) = events.next().await {
        if let StreamEvent::Error(message) = &event {
            failure = Some(message.clone());
        }
        stdout.write_all(render_event(&event, json_mode).as_bytes())?;
        stdout.flush()?;
        if event.is_terminal() {
            break;
        }
    }

    match failure {
        Some(message) => bail!("stream ended with an error: {message}"),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_as_sse_frame() {
        let rendered = render_event(&StreamEvent::Content("Hi".to_string()), false);
        assert_eq!(rendered, StreamEvent::Content("Hi".to_string()).to_sse_frame());
        assert!(rendered.starts_with("data: "));
    }

    #[test]
    fn test_render_as_json_line() {
        let rendered = render_event(&StreamEvent::End, true);
        assert!(rendered.ends_with('\n'));
        assert!(!rendered.starts_with("data: "));
    }
}
