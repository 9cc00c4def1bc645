//! Error types and handling for feedback-relay

use thiserror::Error;

/// Result type alias for feedback-relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// feedback-relay error types
///
/// These only surface below the channel boundary (config loading, request
/// signing). Everything above it reports failures as [`ChannelResult`]
/// values rather than errors.
///
/// [`ChannelResult`]: crate::channel::ChannelResult
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("HTTP error: {0}")]
    Http(String),
}
