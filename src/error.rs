//! Error types for the contents service.
//!
//! Every failure is constructed where it is detected and propagated unchanged
//! to the caller. Dispatchers map [`ErrorKind`] to their own status codes.

use std::io;
use thiserror::Error;

/// Errors produced by storage, checkpoint, and schema operations.
#[derive(Debug, Error)]
pub enum ContentsError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Destination not available: {0}")]
    InvalidDestination(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Unsupported schema version: {0}")]
    UnsupportedSchemaVersion(String),

    #[error("Unsupported reference: {0}")]
    UnsupportedReference(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Stable classification of [`ContentsError`] for dispatchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidDestination,
    Forbidden,
    PermissionDenied,
    SchemaError,
    UnsupportedSchemaVersion,
    UnsupportedReference,
    InvalidPayload,
    Unsupported,
    Config,
    Json,
    Io,
}

impl ContentsError {
    /// Map an OS error for `target` onto the matching error kind.
    pub fn from_io(err: io::Error, target: impl Into<String>) -> Self {
        let target = target.into();
        match err.kind() {
            io::ErrorKind::NotFound => ContentsError::NotFound(target),
            io::ErrorKind::AlreadyExists => ContentsError::AlreadyExists(target),
            io::ErrorKind::PermissionDenied => ContentsError::PermissionDenied(target),
            _ => ContentsError::Io(err),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ContentsError::NotFound(_) => ErrorKind::NotFound,
            ContentsError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            ContentsError::InvalidDestination(_) => ErrorKind::InvalidDestination,
            ContentsError::Forbidden(_) => ErrorKind::Forbidden,
            ContentsError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            ContentsError::SchemaError(_) => ErrorKind::SchemaError,
            ContentsError::UnsupportedSchemaVersion(_) => ErrorKind::UnsupportedSchemaVersion,
            ContentsError::UnsupportedReference(_) => ErrorKind::UnsupportedReference,
            ContentsError::InvalidPayload(_) => ErrorKind::InvalidPayload,
            ContentsError::Unsupported(_) => ErrorKind::Unsupported,
            ContentsError::Config(_) => ErrorKind::Config,
            ContentsError::Json(_) => ErrorKind::Json,
            ContentsError::Io(_) => ErrorKind::Io,
        }
    }

    /// HTTP-style status code for a transport collaborator.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::AlreadyExists => 409,
            ErrorKind::InvalidDestination => 400,
            ErrorKind::Forbidden | ErrorKind::PermissionDenied => 403,
            ErrorKind::SchemaError
            | ErrorKind::UnsupportedSchemaVersion
            | ErrorKind::UnsupportedReference => 500,
            ErrorKind::InvalidPayload | ErrorKind::Json => 400,
            ErrorKind::Unsupported => 501,
            ErrorKind::Config | ErrorKind::Io => 500,
        }
    }
}

impl From<config::ConfigError> for ContentsError {
    fn from(err: config::ConfigError) -> Self {
        ContentsError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ContentsError>;
