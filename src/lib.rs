//! feedback-relay - the core of a small feedback-intake backend
//!
//! Accepts a message from a caller, throttles abusive callers with a
//! per-key sliding-window rate limiter, and forwards accepted messages to
//! an ordered list of notification channels, stopping at the first failure.
//!
//! The HTTP layer, auth, and config persistence are external collaborators:
//! they feed this crate a caller key and a [`MessageContext`], and consume
//! the [`RateLimiter`] admission decision and the [`ChannelRouter`] result.

pub mod channel;
pub mod config;
pub mod error;
pub mod limiter;
pub mod model;

// Re-export commonly used types for easy access
pub use channel::{
    ChannelResult, ChannelRouter, DingTalkChannel, MessageChannel, MessageContext,
};
pub use config::{DingTalkConfig, FeedbackConfig, RateLimitConfig, SharedConfig};
pub use error::{Error, Result};
pub use limiter::{RateLimiter, MAX_KEYS};
pub use model::{FeedbackRequest, FeedbackResponse, FeedbackStatus};
