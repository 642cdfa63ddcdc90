use super::config::{LogConfig, LogFormat, RotationPolicy};
use anyhow::{bail, Context, Result};
use std::io;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const LOG_FILE_PREFIX: &str = "prometheia.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Process-wide tracing setup.
///
/// Keep the value alive for the life of the process: it owns the background
/// writer for the log file, and dropping it flushes what is buffered.
pub struct LoggerImpl {
    _guard: Option<WorkerGuard>,
}

impl LoggerImpl {
    /// Install the global subscriber described by `config`.
    ///
    /// `RUST_LOG` overrides `config.level`. Fails on an unknown level or when a
    /// subscriber is already installed in this process.
    pub fn init(config: &LogConfig) -> Result<Self> {
        let level = level_from_name(&config.level)?;
        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut guard = None;

        if let Some(dir) = &config.log_dir {
            let (writer, file_guard) = tracing_appender::non_blocking(appender(dir, config)?);
            guard = Some(file_guard);
            layers.push(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(writer)
                    .with_ansi(false)
                    .boxed(),
            );
        }

        // stdout carries command output, so the console sink is stderr
        if config.enable_console || config.log_dir.is_none() {
            let console = match config.format {
                LogFormat::Json => tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(io::stderr)
                    .boxed(),
                LogFormat::Pretty => tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_span_events(FmtSpan::CLOSE)
                    .with_writer(io::stderr)
                    .boxed(),
            };
            layers.push(console);
        }

        let filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();

        tracing_subscriber::registry()
            .with(layers.with_filter(filter))
            .try_init()
            .context("A global tracing subscriber is already installed")?;

        tracing::debug!(level = %config.level, format = ?config.format, "Logging ready");
        Ok(Self { _guard: guard })
    }
}

fn appender(dir: &Path, config: &LogConfig) -> Result<RollingFileAppender> {
    let rotation = match config.rotation {
        RotationPolicy::Daily => Rotation::DAILY,
        RotationPolicy::Hourly => Rotation::HOURLY,
        RotationPolicy::Never => Rotation::NEVER,
    };
    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(LOG_FILE_PREFIX);
    if let Some(count) = config.retained_files {
        builder = builder.max_log_files(count);
    }
    builder
        .build(dir)
        .with_context(|| format!("Cannot write log files in {}", dir.display()))
}

fn level_from_name(name: &str) -> Result<Level> {
    let level = match name.trim().to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => bail!("Unknown log level '{name}'"),
    };
    Ok(level)
}
