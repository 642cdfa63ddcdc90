//! Structured-output validation helpers.

pub mod output_validator;

pub use output_validator::{extract_json_payload, parse_json_output, strip_markdown_code_blocks};
