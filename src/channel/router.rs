//! Sequential dispatch across the registered channels

use std::sync::Arc;
use tracing::{debug, warn};

use super::{ChannelResult, MessageChannel, MessageContext};
use crate::config::SharedConfig;

/// Routes one message through every registered channel in order, stopping
/// at the first failure.
///
/// Registration order is significant: earlier channels get the stronger
/// delivery guarantee. Dispatch is non-transactional; channels that already
/// succeeded are not rolled back when a later one fails.
pub struct ChannelRouter {
    config: Arc<SharedConfig>,
    channels: Vec<Arc<dyn MessageChannel>>,
}

impl ChannelRouter {
    pub fn new(config: Arc<SharedConfig>, channels: Vec<Arc<dyn MessageChannel>>) -> Self {
        Self { config, channels }
    }

    /// Append a channel at the end of the dispatch order
    pub fn register(&mut self, channel: Arc<dyn MessageChannel>) {
        self.channels.push(channel);
    }

    /// Dispatch `context` to every channel in order.
    ///
    /// Returns the first failing channel's result unchanged, or success if
    /// every channel succeeded. With the feature disabled or no channels
    /// registered, fails without invoking any channel.
    pub async fn route(&self, context: &MessageContext) -> ChannelResult {
        if !self.config.current().enabled {
            return ChannelResult::fail("Feedback disabled");
        }
        if self.channels.is_empty() {
            return ChannelResult::fail("No channel configured");
        }
        for channel in &self.channels {
            let result = channel.send(context).await;
            if !result.is_success() {
                warn!(
                    channel = channel.name(),
                    reason = result.message.as_deref().unwrap_or(""),
                    "channel send failed"
                );
                return result;
            }
            debug!(channel = channel.name(), "channel send succeeded");
        }
        ChannelResult::ok()
    }
}
