//! Error types for the MinerU client.

use thiserror::Error;

/// Result type for MinerU client operations.
pub type Result<T> = std::result::Result<T, MineruError>;

/// MinerU client errors.
#[derive(Debug, Error)]
pub enum MineruError {
    /// Transport failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx HTTP response
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// 2xx response whose envelope carries a non-zero code
    #[error("MinerU API error (code {code}): {message}")]
    Provider { code: i64, message: String },

    /// Body was not the JSON we expected
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Result bundle could not be opened
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Result bundle opened but held no parseable JSON entry
    #[error("no valid JSON file found in archive")]
    NoJsonInArchive,
}
