//! Error types for interaction dispatch.
//!
//! Every failure is classified into one of four [`ErrorKind`]s. The kind
//! decides what a user is allowed to see: validation and authorization
//! errors carry their own message, not-found errors get a generic message
//! and internal errors never leak their detail.

use thiserror::Error;

/// Generic text shown for internal failures.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Generic text shown when a route or entity does not exist.
pub const GENERIC_NOT_FOUND_MESSAGE: &str = "That item could not be found.";

/// Main error type for all dispatch operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Malformed input, invalid selection or wrong step type.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requester may not act on the target.
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Missing entity or unresolved route.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unexpected failure from a collaborator.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Encoded routing key exceeds the platform bound.
    #[error("Routing key is {len} characters, maximum is {max}")]
    KeyTooLong { len: usize, max: usize },

    /// Routing key could not be parsed or built.
    #[error("Malformed routing key: {0}")]
    MalformedKey(String),

    /// No handler resolved for the given pattern.
    #[error("No handler for pattern: {0}")]
    HandlerNotFound(String),

    /// Acknowledgment discipline violated (e.g. edit before respond).
    #[error("Responder error: {0}")]
    Responder(String),

    /// The event was cancelled before a response was produced.
    #[error("Interaction cancelled")]
    Cancelled,

    /// Every dispatch permit is taken; the event was dropped.
    #[error("Dispatch capacity reached ({0} concurrent events)")]
    AtCapacity(usize),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Payload token is not valid base64.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Coarse classification of a [`DispatchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    Internal,
}

impl DispatchError {
    /// Shorthand for a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Shorthand for an authorization error.
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    /// Shorthand for a not-found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Shorthand for an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_)
            | Self::KeyTooLong { .. }
            | Self::MalformedKey(_)
            | Self::Base64(_)
            | Self::MsgPackDecode(_) => ErrorKind::Validation,
            Self::Authorization(_) => ErrorKind::Authorization,
            Self::NotFound(_) | Self::HandlerNotFound(_) => ErrorKind::NotFound,
            Self::Internal(_)
            | Self::Responder(_)
            | Self::Cancelled
            | Self::AtCapacity(_)
            | Self::MsgPackEncode(_)
            | Self::Json(_)
            | Self::Config(_) => ErrorKind::Internal,
        }
    }

    /// Whether the error's own message may be shown to the user.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Authorization(_) | Self::KeyTooLong { .. } | Self::MalformedKey(_)
        )
    }

    /// The only text about this error that may reach a user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::Authorization(msg) => msg.clone(),
            Self::KeyTooLong { .. } | Self::MalformedKey(_) => {
                "That button is no longer valid. Please run the command again.".to_string()
            }
            _ => match self.kind() {
                ErrorKind::NotFound => GENERIC_NOT_FOUND_MESSAGE.to_string(),
                ErrorKind::Validation => "That input could not be understood.".to_string(),
                _ => GENERIC_FAILURE_MESSAGE.to_string(),
            },
        }
    }
}

/// Result type alias using DispatchError.
pub type Result<T> = std::result::Result<T, DispatchError>;
