//! Implementation of the `prometheia serve` command.

use anyhow::{anyhow, Context, Result};
use clap::Args;
use std::sync::Arc;
use tracing::info;

use crate::adapters::http::{ApiHttpConfig, ApiHttpServer, AppState};
use crate::adapters::sqlite::{
    initialize_database, SqliteCatalogRepository, SqliteConversationRepository, SqliteTaskRepository,
};
use crate::cli::bootstrap::{build_generator, build_pipeline};
use crate::domain::models::Config;
use crate::services::{CatalogService, ConversationService, TaskService};

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind, overriding `server.host`
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on, overriding `server.port`
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Answer with canned replies instead of calling the upstream model
    #[arg(long)]
    pub offline: bool,
}

impl ServeArgs {
    fn http_config(&self, config: &Config) -> ApiHttpConfig {
        let mut http = ApiHttpConfig::from(&config.server);
        if let Some(host) = &self.host {
            http.host = host.clone();
        }
        if let Some(port) = self.port {
            http.port = port;
        }
        http
    }
}

pub async fn execute(args: ServeArgs, config: &Config, _json_mode: bool) -> Result<()> {
    let pool = initialize_database(&config.database)
        .await
        .context("Failed to initialize database")?;
    let pipeline = build_pipeline(config, build_generator(config, args.offline)?)?;
    let conversations = Arc::new(ConversationService::new(
        Arc::new(SqliteConversationRepository::new(pool.clone())),
        pipeline.clone(),
    ));
    let tasks = Arc::new(TaskService::new(
        Arc::new(SqliteTaskRepository::new(pool.clone())),
        pipeline.clone(),
    ));
    let catalog = Arc::new(CatalogService::new(Arc::new(SqliteCatalogRepository::new(pool))));
    catalog
        .seed(&config.catalog)
        .await
        .context("Failed to seed agent and tool catalog")?;

    let http = args.http_config(config);
    info!(host = %http.host, port = http.port, "Starting API server");

    let server = ApiHttpServer::new(AppState::new(pipeline, conversations, tasks, catalog, http));
    server
        .serve_with_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .map_err(|e| anyhow!(e))
        .context("API server failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply_on_top_of_config() {
        let args = ServeArgs {
            host: Some("0.0.0.0".to_string()),
            port: None,
            offline: false,
        };
        let config = Config::default();
        let http = args.http_config(&config);

        assert_eq!(http.host, "0.0.0.0");
        assert_eq!(http.port, config.server.port);
    }
}
