//! PrometheiA CLI entry point.

use clap::Parser;

use prometheia::cli::bootstrap::{init_logging, load_config};
use prometheia::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => prometheia::cli::handle_error(err, cli.json),
    };

    let _logger = match init_logging(&config) {
        Ok(logger) => logger,
        Err(err) => prometheia::cli::handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Serve(args) => prometheia::cli::commands::serve::execute(args, &config, cli.json).await,
        Commands::Ask(args) => prometheia::cli::commands::ask::execute(args, &config, cli.json).await,
        Commands::Stream(args) => prometheia::cli::commands::stream::execute(args, &config, cli.json).await,
    };

    if let Err(err) = result {
        prometheia::cli::handle_error(err, cli.json);
    }
}
