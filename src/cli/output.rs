//! Rendering of command results for people or for scripts.

use serde::Serialize;

/// A command result printable as text or as JSON (`--json`).
pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Print to stdout in the selected mode.
pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    let rendered = if json_mode {
        serde_json::to_string_pretty(&result.to_json()).unwrap_or_else(|_| "null".to_string())
    } else {
        result.to_human()
    };
    println!("{rendered}");
}
