//! Error types and handling for the travel planner

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A single rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Name of the offending field as submitted (e.g. `budget`)
    pub field: String,
    /// What is wrong with it
    pub message: String,
}

impl FieldError {
    pub fn new<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn describe_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Main error type for the travel planner
#[derive(Error, Debug)]
pub enum PlannerError {
    /// Trip parameters failed validation
    #[error("Invalid input: {}", describe_fields(.fields))]
    Validation { fields: Vec<FieldError> },

    /// The LLM service could not be reached or refused the request
    #[error("LLM service unavailable: {message}")]
    ServiceUnavailable { message: String },

    /// Planning exceeded the configured deadline
    #[error("Trip planning timed out after {millis} ms")]
    Timeout { millis: u64 },

    /// The LLM answered with something that does not fit the expected structure
    #[error("Malformed {step} response: {message}")]
    MalformedResponse { step: String, message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Template rendering errors
    #[error("Render error: {message}")]
    Render { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl PlannerError {
    /// Create a validation error for a single field
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Validation {
            fields: vec![FieldError::new(field, message)],
        }
    }

    /// Create a new service-unavailable error
    pub fn service_unavailable<S: Into<String>>(message: S) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout(elapsed: std::time::Duration) -> Self {
        Self::Timeout {
            millis: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Create a new malformed-response error for a planning step
    pub fn malformed<S: Into<String>, M: Into<String>>(step: S, message: M) -> Self {
        Self::MalformedResponse {
            step: step.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new render error
    pub fn render<S: Into<String>>(message: S) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    /// Stable machine-readable name of the error kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            PlannerError::Validation { .. } => "validation",
            PlannerError::ServiceUnavailable { .. } => "service_unavailable",
            PlannerError::Timeout { .. } => "timeout",
            PlannerError::MalformedResponse { .. } => "malformed_response",
            PlannerError::Config { .. } => "config",
            PlannerError::Render { .. } => "render",
            PlannerError::Io { .. } => "io",
        }
    }

    /// Offending fields for validation errors, empty otherwise
    #[must_use]
    pub fn fields(&self) -> &[FieldError] {
        match self {
            PlannerError::Validation { fields } => fields,
            _ => &[],
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            PlannerError::Validation { fields } => {
                format!("Invalid input: {}", describe_fields(fields))
            }
            PlannerError::ServiceUnavailable { .. } => {
                "The travel planning service is currently unavailable. Please try again later."
                    .to_string()
            }
            PlannerError::Timeout { .. } => {
                "Planning your trip took too long. Please try again.".to_string()
            }
            PlannerError::MalformedResponse { .. } => {
                "The planning service returned an unexpected answer. Please try again.".to_string()
            }
            PlannerError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            PlannerError::Render { .. } | PlannerError::Io { .. } => {
                "Something went wrong while preparing your plan.".to_string()
            }
        }
    }
}

impl From<handlebars::RenderError> for PlannerError {
    fn from(err: handlebars::RenderError) -> Self {
        Self::render(err.to_string())
    }
}

impl From<handlebars::TemplateError> for PlannerError {
    fn from(err: handlebars::TemplateError) -> Self {
        Self::render(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_creation() {
        let validation_err = PlannerError::validation("budget", "must be greater than 0");
        assert!(matches!(validation_err, PlannerError::Validation { .. }));
        assert_eq!(validation_err.fields()[0].field, "budget");

        let unavailable = PlannerError::service_unavailable("connection refused");
        assert!(matches!(unavailable, PlannerError::ServiceUnavailable { .. }));
        assert!(unavailable.fields().is_empty());

        let timeout = PlannerError::timeout(Duration::from_millis(1500));
        assert!(matches!(timeout, PlannerError::Timeout { millis: 1500 }));
    }

    #[test]
    fn test_validation_message_lists_every_field() {
        let err = PlannerError::Validation {
            fields: vec![
                FieldError::new("budget", "must be greater than 0"),
                FieldError::new("duration_days", "must be greater than 0"),
            ],
        };
        let message = err.to_string();
        assert!(message.contains("budget: must be greater than 0"));
        assert!(message.contains("duration_days: must be greater than 0"));
        assert_eq!(err.user_message(), message);
    }

    #[test]
    fn test_user_messages_hide_internals() {
        let err = PlannerError::malformed("hotels", "expected value at line 1 column 1");
        assert_eq!(err.kind(), "malformed_response");
        assert!(!err.user_message().contains("line 1"));

        let err = PlannerError::config("missing API key");
        assert!(err.user_message().contains("Configuration error"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let planner_err: PlannerError = io_err.into();
        assert!(matches!(planner_err, PlannerError::Io { .. }));
        assert_eq!(planner_err.kind(), "io");
    }
}
