//! Prompt template registry loaded from YAML
//!
//! Templates are immutable after loading. The built-in set is compiled into
//! the binary; a YAML file with the same layout may replace it at startup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::domain::errors::TemplateError;
use crate::domain::models::{PromptMessage, PromptRole};

const BUILTIN_TEMPLATES: &str = include_str!("prompts.yaml");

/// Variable filled from the registry's default header when not supplied.
pub const DEFAULT_HEADER_VARIABLE: &str = "DEFAULT_HEADER";

/// Names of the templates the pipeline renders.
pub mod names {
    pub const DIGEST_CONVERSATION: &str = "digest_conversation";
    pub const INFER_INTENTION: &str = "infer_intention";
    pub const SELECT_STRATEGY: &str = "select_strategy";
    pub const STANDARD_RESPONSE: &str = "standard_response";
    pub const MULTI_STEP_REASONING: &str = "multi_step_reasoning";
    pub const MULTI_STEP_REASONING_RESPONSE: &str = "multi_step_reasoning_response";
    pub const STRUCTURED_OUTPUT_REPAIR: &str = "structured_output_repair";

    /// Every template a registry must define.
    pub const REQUIRED: [&str; 7] = [
        DIGEST_CONVERSATION,
        INFER_INTENTION,
        SELECT_STRATEGY,
        STANDARD_RESPONSE,
        MULTI_STEP_REASONING,
        MULTI_STEP_REASONING_RESPONSE,
        STRUCTURED_OUTPUT_REPAIR,
    ];
}

/// One (role, text) pair of a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatePart {
    pub role: PromptRole,
    pub text: String,
}

/// File layout for template YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateFile {
    pub default_header: String,
    pub templates: HashMap<String, Vec<TemplatePart>>,
}

/// Registry of named prompt templates
#[derive(Debug, Clone)]
pub struct PromptRegistry {
    default_header: String,
    templates: HashMap<String, Vec<TemplatePart>>,
}

impl PromptRegistry {
    /// The templates compiled into the binary.
    pub fn builtin() -> Result<Self, TemplateError> {
        Self::from_yaml_str(BUILTIN_TEMPLATES)
    }

    /// Parse and validate a template file.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, TemplateError> {
        let file: TemplateFile =
            serde_yaml::from_str(yaml).map_err(|e| TemplateError::InvalidTemplate(e.to_string()))?;
        Self::from_file_contents(file)
    }

    /// Load templates from a YAML file on disk.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading prompt templates from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read template file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid template file: {}", path.display()))
    }

    /// Built-in templates, or the file at `path` when given.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::builtin()?),
        }
    }

    fn from_file_contents(file: TemplateFile) -> Result<Self, TemplateError> {
        for name in names::REQUIRED {
            match file.templates.get(name) {
                Some(parts) if !parts.is_empty() => {}
                Some(_) => {
                    return Err(TemplateError::InvalidTemplate(format!(
                        "template '{name}' has no messages"
                    )))
                }
                None => return Err(TemplateError::TemplateNotFound(name.to_string())),
            }
        }

        debug!(count = file.templates.len(), "Prompt templates loaded");
        Ok(Self {
            default_header: file.default_header,
            templates: file.templates,
        })
    }

    pub fn default_header(&self) -> &str {
        &self.default_header
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Render a template into role-tagged messages.
    ///
    /// Fails with `TemplateNotFound` for an unregistered name and with
    /// `MissingVariable` when a placeholder has no value.
    pub fn render(&self, name: &str, variables: &[(&str, &str)]) -> Result<Vec<PromptMessage>, TemplateError> {
        let parts = self
            .templates
            .get(name)
            .ok_or_else(|| TemplateError::TemplateNotFound(name.to_string()))?;

        parts
            .iter()
            .map(|part| {
                substitute(name, &part.text, variables, &self.default_header)
                    .map(|text| PromptMessage::new(part.role, text))
            })
            .collect()
    }
}

/// Replace `{name}` placeholders and unescape doubled braces.
///
/// A `{` that does not open a well-formed placeholder is kept literally.
/// Substituted values are not scanned again.
fn substitute(
    template: &str,
    text: &str,
    variables: &[(&str, &str)],
    default_header: &str,
) -> Result<String, TemplateError> {
    let lookup = |variable: &str| {
        variables
            .iter()
            .find(|(key, _)| *key == variable)
            .map(|(_, value)| *value)
            .or_else(|| (variable == DEFAULT_HEADER_VARIABLE).then_some(default_header))
    };

    let mut out = String::with_capacity(text.len());
    let mut pos = 0;

    while let Some(c) = text[pos..].chars().next() {
        let rest = &text[pos..];
        match c {
            '{' if rest.starts_with("{{") => {
                out.push('{');
                pos += 2;
            }
            '}' if rest.starts_with("}}") => {
                out.push('}');
                pos += 2;
            }
            '{' => match rest[1..].find('}').map(|end| &rest[1..=end]) {
                Some(variable) if is_identifier(variable) => {
                    let value = lookup(variable).ok_or_else(|| TemplateError::MissingVariable {
                        template: template.to_string(),
                        variable: variable.to_string(),
                    })?;
                    out.push_str(value);
                    pos += variable.len() + 2;
                }
                _ => {
                    out.push('{');
                    pos += 1;
                }
            },
            _ => {
                out.push(c);
                pos += c.len_utf8();
            }
        }
    }

    Ok(out)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_templates_load() {
        let registry = PromptRegistry::builtin().unwrap();
        for name in names::REQUIRED {
            assert!(registry.contains(name), "missing {name}");
        }
        assert!(registry.default_header().starts_with("## Who you are"));
    }

    #[test]
    fn test_render_digest() {
        let registry = PromptRegistry::builtin().unwrap();
        let messages = registry
            .render(names::DIGEST_CONVERSATION, &[("conversation_history", "USER\nhi\n###END###")])
            .unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, PromptRole::System);
        assert_eq!(messages[1].role, PromptRole::Human);
        assert!(messages[1].content.contains("USER\nhi\n###END###"));
        assert!(messages[1].content.ends_with("Relevant points (provide as a bulleted list):"));
    }

    #[test]
    fn test_render_unescapes_json_examples() {
        let registry = PromptRegistry::builtin().unwrap();
        let messages = registry
            .render(names::SELECT_STRATEGY, &[("intention", "i"), ("combined_input", "q")])
            .unwrap();

        let system = &messages[0].content;
        assert!(system.contains(r#"{"rationale": "Detailed explanation of why this strategy was chosen", "strategy": 1 or 2 or 3 or 4}"#));
        assert!(!system.contains("{{"));
    }

    #[test]
    fn test_default_header_is_injected() {
        let registry = PromptRegistry::builtin().unwrap();
        let messages = registry
            .render(
                names::STANDARD_RESPONSE,
                &[("intention", "Current weather information"), ("conversation_history", "h")],
            )
            .unwrap();

        assert!(messages[0].content.starts_with(registry.default_header()));
        assert!(messages[0].content.ends_with("Inferred intention: Current weather information"));
    }

    #[test]
    fn test_unknown_template() {
        let registry = PromptRegistry::builtin().unwrap();
        assert_eq!(
            registry.render("nope", &[]).unwrap_err(),
            TemplateError::TemplateNotFound("nope".to_string())
        );
    }

    #[test]
    fn test_missing_variable() {
        let registry = PromptRegistry::builtin().unwrap();
        let err = registry.render(names::INFER_INTENTION, &[]).unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingVariable {
                template: names::INFER_INTENTION.to_string(),
                variable: "combined_input".to_string(),
            }
        );
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let out = substitute("t", "<{x}>", &[("x", "{y} and }}")], "").unwrap();
        assert_eq!(out, "<{y} and }}>");
    }

    #[test]
    fn test_stray_braces_are_literal() {
        assert_eq!(substitute("t", "a { b } c", &[], "").unwrap(), "a { b } c");
        assert_eq!(substitute("t", "{not valid}", &[], "").unwrap(), "{not valid}");
        assert_eq!(substitute("t", "Λ{{λ}}", &[], "").unwrap(), "Λ{λ}");
    }

    #[test]
    fn test_file_missing_required_template() {
        let yaml = "default_header: h\ntemplates:\n  digest_conversation:\n    - role: system\n      text: x\n";
        assert!(matches!(
            PromptRegistry::from_yaml_str(yaml),
            Err(TemplateError::TemplateNotFound(_))
        ));
    }
}
