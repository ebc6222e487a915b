//! Error types for the report store

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Query error
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Export error
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage errors
///
/// `NoData` is deliberately absent: an empty read is a first-class empty
/// result (`Vec::new()` / `Ok(None)`), never an error.
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be decoded from the given byte span
    #[error("Malformed record: need 16 bytes, got {len}")]
    MalformedRecord {
        /// Number of bytes actually available
        len: usize,
    },

    /// A report filename did not round-trip through the parser
    #[error("Invalid report filename: {0}")]
    InvalidFilename(String),

    /// User name would escape the data directory
    #[error("Invalid user name: {0}")]
    InvalidUser(String),
}

/// Query errors
#[derive(Error, Debug)]
pub enum QueryError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Response compression failed
    #[error("Compression failed: {0}")]
    Compression(String),
}

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    /// No device contributed any record to the export
    #[error("No data to export")]
    NoData,

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Mail collaborator rejected the artifact
    #[error("Mail delivery failed: {0}")]
    Mail(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
