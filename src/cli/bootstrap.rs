//! Wiring shared by the commands: configuration, logging and the pipeline.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::adapters::generators::ScriptedGenerator;
use crate::domain::models::Config;
use crate::domain::ports::TextGenerator;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::llm::{ChatClientConfig, ChatCompletionsClient, UpstreamRateLimiter};
use crate::infrastructure::logging::{LogConfig, LoggerImpl};
use crate::infrastructure::prompts::PromptRegistry;
use crate::services::StrategyPipeline;

/// Load configuration from `path`, or from the project files when absent.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Install the global subscriber; keep the returned guard alive.
pub fn init_logging(config: &Config) -> Result<LoggerImpl> {
    LoggerImpl::init(&LogConfig::from(&config.logging)).context("Failed to initialize logging")
}

/// The upstream client, or canned replies when `offline` is set.
pub fn build_generator(config: &Config, offline: bool) -> Result<Arc<dyn TextGenerator>> {
    if offline {
        info!("Using offline scripted generator");
        return Ok(Arc::new(ScriptedGenerator::offline(
            &config.models.fast.name,
            &config.models.quality.name,
            &config.models.structured.name,
        )));
    }

    let client_config = ChatClientConfig::from(&config.upstream);
    if client_config.api_key.is_none() {
        warn!("No upstream API key configured; set upstream.api_key or GROQ_API_KEY");
    }

    let client = ChatCompletionsClient::new(client_config, UpstreamRateLimiter::from(&config.rate_limit))
        .context("Failed to create upstream client")?;
    Ok(Arc::new(client))
}

pub fn build_pipeline(config: &Config, generator: Arc<dyn TextGenerator>) -> Result<Arc<StrategyPipeline>> {
    let registry = PromptRegistry::load(config.pipeline.templates_path.as_deref())?;
    info!(generator = generator.name(), "Pipeline ready");
    Ok(Arc::new(StrategyPipeline::from_config(generator, Arc::new(registry), config)))
}
