use std::path::PathBuf;

use crate::domain::IngestStage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("image upload is empty")]
    EmptyImage,

    #[error("invalid image name: {0} (expected <name>.jpg)")]
    InvalidImageName(String),

    #[error("failed to write image {}: {source}", .path.display())]
    BlobWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read image {}: {source}", .path.display())]
    BlobRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("category created concurrently, retry: {0}")]
    CategoryConflict(String),

    #[error("item not found: {0}")]
    ItemNotFound(i64),

    #[error("image not found: {0}")]
    BlobNotFound(String),

    #[error("deadline exceeded while {0}")]
    DeadlineExceeded(IngestStage),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Coarse failure categories exposed to the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Missing or malformed input; storage was never touched.
    Validation,
    /// A caller-supplied identifier is syntactically unacceptable.
    InvalidArgument,
    /// Image persistence failed before any transaction was opened.
    Blob,
    /// Any database failure, including constraint violations.
    Storage,
    NotFound,
    Timeout,
    Config,
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::MissingField(_) | Error::EmptyImage => ErrorClass::Validation,
            Error::InvalidImageName(_) => ErrorClass::InvalidArgument,
            Error::BlobWrite { .. } | Error::BlobRead { .. } => ErrorClass::Blob,
            Error::Database(_) | Error::Pool(_) | Error::Io(_) | Error::CategoryConflict(_) => {
                ErrorClass::Storage
            }
            Error::ItemNotFound(_) | Error::BlobNotFound(_) => ErrorClass::NotFound,
            Error::DeadlineExceeded(_) => ErrorClass::Timeout,
            Error::Config(_) | Error::ConfigParse(_) => ErrorClass::Config,
        }
    }

    /// Whether repeating the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::CategoryConflict(_) => true,
            Error::Database(e) => is_busy(e),
            _ => false,
        }
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked)
    )
}

/// True when `err` is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}

pub type Result<T> = std::result::Result<T, Error>;
