//! Domain errors for the PrometheiA conversational backend.
//!
//! Three families live here:
//! - [`UpstreamError`]: classified failures from the text generator
//! - [`PipelineError`]: the strategy pipeline's error taxonomy
//! - [`DomainError`]: persistence and ownership failures for conversations

use thiserror::Error;

use super::models::strategy::Strategy;

/// Failures reported by the upstream text generator.
///
/// Payloads are plain strings so the error stays `Clone`; the retry
/// combinator needs to hand the last failure back after exhaustion.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    /// Invalid request parameters (HTTP 400)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or rejected credentials (HTTP 401/403)
    #[error("Upstream rejected credentials: {0}")]
    Unauthorized(String),

    /// Unknown model or endpoint (HTTP 404)
    #[error("Upstream resource not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded - too many requests")]
    RateLimited,

    /// Server-side failure (HTTP 5xx)
    #[error("Server error ({status}): {body}")]
    Server { status: u16, body: String },

    /// Connection-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Request timed out
    #[error("Request timeout")]
    Timeout,

    /// Response body could not be decoded
    #[error("Failed to decode upstream response: {0}")]
    Decode(String),

    /// Anything the classifier does not recognize
    #[error("Unknown upstream error ({status}): {body}")]
    Unknown { status: u16, body: String },
}

impl UpstreamError {
    /// Classify a non-success HTTP status into an upstream error.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400 => Self::InvalidRequest(body),
            401 | 403 => Self::Unauthorized(body),
            404 => Self::NotFound(body),
            408 => Self::Timeout,
            429 => Self::RateLimited,
            500..=599 => Self::Server { status, body },
            _ => Self::Unknown { status, body },
        }
    }

    /// Returns true if this error is transient and should be retried
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Server { .. } | Self::Network(_) | Self::Timeout
        )
    }

    /// Returns true if this is a permanent error that should not be retried
    pub const fn is_permanent(&self) -> bool {
        !self.is_transient()
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Prompt template registry failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Template '{template}' references '{{{variable}}}' but no value was supplied")]
    MissingVariable { template: String, variable: String },

    #[error("Invalid template definition: {0}")]
    InvalidTemplate(String),
}

/// Errors raised by the strategy pipeline.
///
/// Only `MalformedHistory`, `UpstreamTransientFailure`, `Upstream`,
/// `StructuredParseFailure` and `Template` ever reach a caller. The two
/// strategy variants describe conditions the executor recovers from and
/// are used for log lines and warning events.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("Malformed conversation history: {0}")]
    MalformedHistory(String),

    #[error("Upstream call failed after {attempts} attempts: {source}")]
    UpstreamTransientFailure {
        attempts: u32,
        #[source]
        source: UpstreamError,
    },

    #[error("Upstream call failed: {0}")]
    Upstream(#[source] UpstreamError),

    #[error("Could not parse {record} after {attempts} attempts: {last_error}")]
    StructuredParseFailure {
        record: &'static str,
        attempts: u32,
        last_error: String,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Unknown strategy code {0}; continuing with multi-step reasoning")]
    UnknownStrategy(i64),

    #[error("{} is not implemented yet; continuing with a standard response", .0.display_name())]
    UnimplementedStrategy(Strategy),
}

impl PipelineError {
    /// Stable machine-readable code used by the HTTP layer.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MalformedHistory(_) => "MALFORMED_HISTORY",
            Self::UpstreamTransientFailure { .. } => "UPSTREAM_UNAVAILABLE",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::StructuredParseFailure { .. } => "STRUCTURED_PARSE_FAILURE",
            Self::Template(_) => "TEMPLATE_ERROR",
            Self::UnknownStrategy(_) => "UNKNOWN_STRATEGY",
            Self::UnimplementedStrategy(_) => "UNIMPLEMENTED_STRATEGY",
        }
    }

    /// Whether the caller supplied bad input rather than the pipeline failing.
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::MalformedHistory(_))
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Domain-level errors raised by persistence use cases.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Conversation not found: {0}")]
    ConversationNotFound(i64),

    #[error("Task not found: {0}")]
    TaskNotFound(i64),

    #[error("Agent not found: {0}")]
    AgentNotFound(i64),

    #[error("Tool not found: {0}")]
    ToolNotFound(i64),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(UpstreamError::RateLimited.is_transient());
        assert!(UpstreamError::Server {
            status: 503,
            body: "overloaded".to_string()
        }
        .is_transient());
        assert!(UpstreamError::Timeout.is_transient());
        assert!(UpstreamError::Network("reset".to_string()).is_transient());
    }

    #[test]
    fn test_permanent_errors() {
        assert!(UpstreamError::InvalidRequest("bad".to_string()).is_permanent());
        assert!(UpstreamError::Unauthorized("no key".to_string()).is_permanent());
        assert!(UpstreamError::NotFound("model".to_string()).is_permanent());
        assert!(UpstreamError::Decode("eof".to_string()).is_permanent());
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(UpstreamError::from_status(429, String::new()), UpstreamError::RateLimited);
        assert!(matches!(
            UpstreamError::from_status(502, "bad gateway".to_string()),
            UpstreamError::Server { status: 502, .. }
        ));
        assert!(matches!(
            UpstreamError::from_status(403, String::new()),
            UpstreamError::Unauthorized(_)
        ));
        assert!(matches!(
            UpstreamError::from_status(418, String::new()),
            UpstreamError::Unknown { status: 418, .. }
        ));
    }

    #[test]
    fn test_pipeline_error_codes() {
        let malformed = PipelineError::MalformedHistory("no turns".to_string());
        assert!(malformed.is_client_error());
        assert_eq!(malformed.code(), "MALFORMED_HISTORY");

        let parse = PipelineError::StructuredParseFailure {
            record: "strategy selection",
            attempts: 3,
            last_error: "expected value".to_string(),
        };
        assert!(!parse.is_client_error());
        assert!(parse.to_string().contains("strategy selection"));
    }

    #[test]
    fn test_unimplemented_strategy_message() {
        let err = PipelineError::UnimplementedStrategy(Strategy::PlanActions);
        assert!(err.to_string().contains("Plan Actions"));
    }
}
