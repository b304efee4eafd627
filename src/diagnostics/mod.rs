//! Diagnostics for operational errors
//!
//! Errors that reach the user (empty commits, commit sink failures, renderer
//! problems, rejected input in strict mode) are reported as a
//! [`CaptureError`] notification rather than propagated. None of them are
//! fatal: capture stays usable afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level for reported errors
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Stable error codes carried by error notifications
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    EmptyFragment,
    CommitHandlerError,
    RendererInitFailed,
    RenderFailed,
    InvalidElement,
    InvalidInput,
    InvalidConfig,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::EmptyFragment => "EMPTY_FRAGMENT",
            ErrorCode::CommitHandlerError => "COMMIT_HANDLER_ERROR",
            ErrorCode::RendererInitFailed => "RENDERER_INIT_FAILED",
            ErrorCode::RenderFailed => "RENDER_FAILED",
            ErrorCode::InvalidElement => "INVALID_ELEMENT",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-visible operational error
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CaptureError {
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    pub severity: Severity,
    pub recoverable: bool,
}

impl CaptureError {
    /// Create a recoverable error
    pub fn new(code: ErrorCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            severity,
            recoverable: true,
        }
    }

    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warning, message)
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, message)
    }

    /// Mark as needing a restart of capture to recover
    pub fn unrecoverable(mut self) -> Self {
        self.recoverable = false;
        self
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for CaptureError {}
