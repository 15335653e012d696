use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error codes surfaced to command callers.
pub mod code {
    pub const DAILY_LIMIT_EXCEEDED: &str = "DAILY_LIMIT_EXCEEDED";
    pub const INVALID_TRANSITION: &str = "INVALID_TRANSITION";
    pub const NO_CANDIDATE_OFFICER: &str = "NO_CANDIDATE_OFFICER";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const REPORT_NOT_FOUND: &str = "REPORT_NOT_FOUND";
    pub const OFFICER_NOT_FOUND: &str = "OFFICER_NOT_FOUND";
}

/// Single structured error shape used across engine layers and exposed to the UI collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(code::UNAUTHORIZED, message)
    }

    pub fn invalid_transition(message: impl Into<String>) -> Self {
        Self::new(code::INVALID_TRANSITION, message)
    }

    pub fn report_not_found(id: &str) -> Self {
        Self::new(code::REPORT_NOT_FOUND, "Report not found").with_details(format!("id={id}"))
    }

    pub fn officer_not_found(id: &str) -> Self {
        Self::new(code::OFFICER_NOT_FOUND, "Security officer not found")
            .with_details(format!("id={id}"))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
