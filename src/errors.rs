/*!
 * Error types for the yadtwai application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

/// Errors that can occur in the anchor codec
#[derive(Error, Debug)]
pub enum CodecError {
    /// Source text already contains a reserved sentinel character
    #[error("Sentinel character U+{codepoint:04X} found in source text; structure cannot be encoded safely")]
    SentinelCollision {
        /// Code point of the offending character
        codepoint: u32,
    },

    /// Error parsing markup into a tree
    #[error("Markup parse error: {0}")]
    MarkupParse(String),
}

/// Errors that can occur in the translation pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Persisted state has a schema version this build does not understand
    #[error("Unsupported pipeline state version {found} (expected {expected})")]
    UnsupportedStateVersion {
        /// Version found in the state file
        found: u32,
        /// Version this build writes
        expected: u32,
    },

    /// State file exists but cannot be parsed
    #[error("Corrupt pipeline state: {0}")]
    CorruptState(String),

    /// A requested group index does not exist
    #[error("Group index {0} out of range")]
    GroupOutOfRange(usize),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the anchor codec
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Error from the pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
