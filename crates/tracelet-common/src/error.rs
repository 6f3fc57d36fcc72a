//! Unified error types for the Tracelet workspace.
//!
//! Only *structural* failures are expressed as errors: conditions that make
//! the whole stop run impossible. Per-process and per-file failures are
//! outcome values recorded in the report, never `Err`.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum TraceletError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// The process table could not be enumerated at all.
    #[error("cannot enumerate processes under {path}: {source}")]
    ProcEnumeration {
        /// The proc filesystem root that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// No namespace (not even the host) was reachable.
    #[error("no reachable namespace; nothing to clean")]
    NoNamespaces,

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, TraceletError>;
