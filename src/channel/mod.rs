//! Notification channels for accepted feedback
//!
//! A channel is one concrete delivery mechanism for a feedback message.
//! Channels report their outcome as a [`ChannelResult`] value; transport and
//! signing problems are converted to failure results at the channel
//! boundary and never propagate as errors.

pub mod dingtalk;
pub mod router;

use async_trait::async_trait;

pub use dingtalk::DingTalkChannel;
pub use router::ChannelRouter;

/// One feedback message, created per incoming request and read-only after
#[derive(Debug, Clone)]
pub struct MessageContext {
    pub message: String,
    pub contact: Option<String>,
    pub page_url: Option<String>,
    pub user_agent: Option<String>,
}

impl MessageContext {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            contact: None,
            page_url: None,
            user_agent: None,
        }
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }

    pub fn with_page_url(mut self, page_url: impl Into<String>) -> Self {
        self.page_url = Some(page_url.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Outcome of one channel send; `message` carries the cause on failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelResult {
    pub success: bool,
    pub message: Option<String>,
}

impl ChannelResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

/// One delivery mechanism for feedback messages
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Deliver one message. Failures are returned as results, never errors.
    async fn send(&self, context: &MessageContext) -> ChannelResult;

    /// Stable identifier for logging and selection
    fn name(&self) -> &str;
}
