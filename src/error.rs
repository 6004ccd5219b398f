//! Error handling for context-studio
//!
//! Only failures about the identity of an operation (an invalid scan root, an
//! unknown tree node) are errors. Failures on a single entry or file are
//! recovered where they happen and reported as diagnostics or sentinels.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal failures of a single scan call
#[derive(Error, Debug)]
pub enum ScanError {
    /// The root path does not exist
    #[error("Root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    /// The root path exists but is not a directory
    #[error("Root is not a directory: {}", .0.display())]
    RootNotADirectory(PathBuf),

    /// The root directory cannot be read
    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    /// The scan was cancelled; partial results are discarded
    #[error("Scan cancelled")]
    Cancelled,

    /// Any other I/O failure on the root itself
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    /// Classify an I/O failure on the root directory
    pub(crate) fn from_root_io(path: PathBuf, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => ScanError::RootNotFound(path),
            io::ErrorKind::PermissionDenied => ScanError::PermissionDenied(path),
            _ => ScanError::Io { path, source },
        }
    }
}

/// Failures of selection tree lookups
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// The path is not part of the scanned tree (usually a stale view)
    #[error("Node not found: {}", .0.display())]
    NodeNotFound(PathBuf),
}

/// Global error type for context-studio operations
#[derive(Error, Debug)]
pub enum StudioError {
    /// Scanner errors
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    /// Selection errors
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    /// File system errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON processing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Specialized Result type for context-studio operations
pub type Result<T> = std::result::Result<T, StudioError>;

/// Creates a StudioError with a formatted message
#[macro_export]
macro_rules! error {
    ($error_type:ident, $($arg:tt)*) => {
        $crate::error::StudioError::$error_type(format!($($arg)*))
    };
}

/// Returns an error result with a formatted message
#[macro_export]
macro_rules! bail {
    ($error_type:ident, $($arg:tt)*) => {
        return Err($crate::error!($error_type, $($arg)*))
    };
}

/// Ensures a condition is true, otherwise returns an error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $error_type:ident, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($error_type, $($arg)*)
        }
    };
}
