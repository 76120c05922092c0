// Error types for the upload flow. Every failure the uploader can hit is
// a variant here so the UI layer can print a tailored message and the
// binary can map any of them to exit code 1.

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("File not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("Invalid file type. Only .csv and .json files are allowed.")]
    UnsupportedFileType {
        path: PathBuf,
        extension: Option<String>,
    },

    #[error("File too large: {size} bytes (limit is {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("API key contains characters that are not allowed in an HTTP header")]
    InvalidApiKey,

    #[error("Error {}: {error}", .status.as_u16())]
    HttpStatus {
        status: StatusCode,
        error: String,
        message: String,
    },

    #[error("Request timed out. The file may be too large or the server is slow.")]
    Timeout {
        #[source]
        source: reqwest::Error,
    },

    #[error("Could not connect to server: {server_url}")]
    Connection {
        server_url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("{0}")]
    Unexpected(String),
}

/// Flat discriminant of [`UploadError`], handy for matching in tests and
/// for structured log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FileNotFound,
    UnsupportedFileType,
    FileTooLarge,
    InvalidApiKey,
    HttpNonSuccessStatus,
    Timeout,
    ConnectionError,
    OtherRequestError,
    UnexpectedError,
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::FileNotFound { .. } => ErrorKind::FileNotFound,
            UploadError::UnsupportedFileType { .. } => ErrorKind::UnsupportedFileType,
            UploadError::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            UploadError::InvalidApiKey => ErrorKind::InvalidApiKey,
            UploadError::HttpStatus { .. } => ErrorKind::HttpNonSuccessStatus,
            UploadError::Timeout { .. } => ErrorKind::Timeout,
            UploadError::Connection { .. } => ErrorKind::ConnectionError,
            UploadError::Request(_) => ErrorKind::OtherRequestError,
            UploadError::Unexpected(_) => ErrorKind::UnexpectedError,
        }
    }

    /// Sort a transport error from reqwest into timeout, connection or
    /// generic request failure. Timeout is checked first because a connect
    /// that times out reports both.
    pub fn from_transport(err: reqwest::Error, server_url: &str) -> Self {
        if err.is_timeout() {
            UploadError::Timeout { source: err }
        } else if err.is_connect() {
            UploadError::Connection {
                server_url: server_url.to_string(),
                source: err,
            }
        } else {
            UploadError::Request(err)
        }
    }
}

pub type UploadResult<T> = std::result::Result<T, UploadError>;
