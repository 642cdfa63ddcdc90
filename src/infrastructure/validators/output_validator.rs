//! JSON extraction for structured model output
//!
//! Models asked for JSON often wrap it in markdown code blocks or surround
//! it with prose. These helpers recover the JSON text before parsing.

use serde::de::DeserializeOwned;

/// Strip a markdown code block from output
///
/// Handles formats like:
/// - ```json\n{...}\n```
/// - ```\n{...}\n```
/// - prose before and after a fenced block
pub fn strip_markdown_code_blocks(output: &str) -> &str {
    let trimmed = output.trim();

    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };
    let after_fence = &trimmed[open + 3..];
    // skip the language tag line
    let body_start = after_fence.find('\n').map_or(0, |pos| pos + 1);
    let body = &after_fence[body_start..];

    match body.find("```") {
        Some(close) => {
            tracing::debug!(input_length = trimmed.len(), "Stripped markdown code block from output");
            body[..close].trim()
        }
        None => trimmed,
    }
}

/// Locate the JSON payload inside model output
///
/// After removing code fences, considers the span from the first `{` to the
/// last `}` and the span from the first `[` to the last `]`, earliest opener
/// first, and returns the first one that is valid JSON. Falls back to the
/// earliest span, or the trimmed input when there is no opener at all.
pub fn extract_json_payload(output: &str) -> &str {
    let stripped = strip_markdown_code_blocks(output);
    let candidates = candidate_spans(stripped);

    candidates
        .iter()
        .find(|span| serde_json::from_str::<serde::de::IgnoredAny>(span).is_ok())
        .or_else(|| candidates.first())
        .copied()
        .unwrap_or(stripped)
}

/// Parse JSON from model output into a typed record
///
/// Every candidate span is tried in order, so a bracketed aside in the prose
/// does not hide the record that follows it. The error string is suitable
/// for feeding back to the model.
pub fn parse_json_output<T: DeserializeOwned>(output: &str) -> Result<T, String> {
    let stripped = strip_markdown_code_blocks(output);
    if stripped.is_empty() {
        return Err("the reply was empty".to_string());
    }

    let candidates = candidate_spans(stripped);
    let mut first_error = None;
    for span in &candidates {
        match serde_json::from_str(span) {
            Ok(record) => return Ok(record),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    let err = match first_error {
        Some(e) => e,
        None => match serde_json::from_str::<T>(stripped) {
            Ok(record) => return Ok(record),
            Err(e) => e,
        },
    };
    Err(format!("invalid JSON: {err}"))
}

fn candidate_spans(text: &str) -> Vec<&str> {
    let mut spans: Vec<(usize, &str)> = [('{', '}'), ('[', ']')]
        .into_iter()
        .filter_map(|(open, close)| {
            let start = text.find(open)?;
            let end = text.rfind(close).filter(|end| *end > start)?;
            Some((start, &text[start..=end]))
        })
        .collect();
    spans.sort_by_key(|(start, _)| *start);
    spans.into_iter().map(|(_, span)| span).collect()
}
