// Installs the global subscriber, so this file holds a single test.

use std::fs;
use tempfile::TempDir;
use tracing::{info, instrument, warn};

use prometheia::infrastructure::logging::{LogConfig, LogFormat, LoggerImpl, RotationPolicy};

#[instrument]
fn classify(code: i64) -> &'static str {
    if (1..=4).contains(&code) {
        "known"
    } else {
        warn!(code, "Unknown strategy code");
        "unknown"
    }
}

#[test]
fn test_file_output_is_json_lines() {
    let temp_dir = TempDir::new().unwrap();
    let config = LogConfig {
        level: "info".to_string(),
        format: LogFormat::Json,
        log_dir: Some(temp_dir.path().to_path_buf()),
        enable_console: false,
        rotation: RotationPolicy::Never,
        retained_files: None,
    };

    let logger = LoggerImpl::init(&config).unwrap();

    info!(run_id = "abc", "Pipeline run completed");
    assert_eq!(classify(9), "unknown");
    tracing::debug!("filtered out at info level");

    // dropping the guard flushes the non-blocking writer
    drop(logger);

    let log_file = temp_dir.path().join("prometheia.log");
    let contents = fs::read_to_string(&log_file).unwrap();
    let lines: Vec<serde_json::Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert!(lines
        .iter()
        .any(|line| line["fields"]["message"] == "Pipeline run completed" && line["fields"]["run_id"] == "abc"));
    assert!(lines.iter().any(|line| {
        line["level"] == "WARN" && line["fields"]["code"] == 9 && line["span"]["name"] == "classify"
    }));
    assert!(!contents.contains("filtered out"));

    // a second install in the same process is refused
    assert!(LoggerImpl::init(&config).is_err());
}
