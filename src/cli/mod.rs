//! Command-line interface.

pub mod bootstrap;
pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{ask::AskArgs, serve::ServeArgs, stream::StreamArgs};

#[derive(Parser, Debug)]
#[command(name = "prometheia")]
#[command(about = "PrometheiA - strategy-selecting conversational backend", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Load configuration from this file instead of `.prometheia/`
    #[arg(short, long, global = true, env = "PROMETHEIA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API server
    Serve(ServeArgs),

    /// Answer a conversation and print the whole response
    Ask(AskArgs),

    /// Answer a conversation and print each event as it arrives
    Stream(StreamArgs),
}

/// Print a failure the way the selected output mode expects and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({ "error": format!("{err:#}") });
        eprintln!("{body}");
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_global_flags() {
        let cli = Cli::try_parse_from(["prometheia", "ask", "--message", "hello", "--json", "--config", "p.yaml"])
            .unwrap();
        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("p.yaml")));
        match cli.command {
            Commands::Ask(args) => assert_eq!(args.input.message.as_deref(), Some("hello")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_message_and_history_file_conflict() {
        let result = Cli::try_parse_from([
            "prometheia",
            "stream",
            "--message",
            "hi",
            "--history-file",
            "h.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::try_parse_from(["prometheia", "serve", "--port", "9000"]).unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.port, Some(9000));
                assert_eq!(args.host, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
