//! Configuration for the feedback intake core
//!
//! This module provides the configuration tree consumed by the rate limiter
//! and the notification channels:
//! - Serde-backed structs with TOML load/save for the collaborator that
//!   persists configuration
//! - Runtime validation of the rate-limit bounds
//! - A live, swappable handle so admin edits take effect on the next
//!   decision without a restart

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Top-level feedback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Master switch; when false the router rejects every message.
    pub enabled: bool,
    pub rate_limit: RateLimitConfig,
    pub ding_talk: DingTalkConfig,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate_limit: RateLimitConfig::default(),
            ding_talk: DingTalkConfig::default(),
        }
    }
}

impl FeedbackConfig {
    /// Validate the whole tree
    pub fn validate(&self) -> Result<()> {
        self.rate_limit.validate()
    }

    /// Load and validate configuration from a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Persist configuration to a TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }
}

/// Sliding-window rate limit parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Max requests allowed within the window.
    pub max_requests: u32,
    /// Time window in minutes.
    pub window_minutes: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 3,
            window_minutes: 60,
        }
    }
}

impl RateLimitConfig {
    /// Window size in epoch-millisecond units
    pub fn window_millis(&self) -> u64 {
        self.window_minutes.saturating_mul(60_000)
    }

    /// Both bounds must be strictly positive while limiting is enabled.
    /// The limiter independently fails closed on non-positive values, so a
    /// config that slips past this check still cannot admit unbounded
    /// traffic.
    pub fn validate(&self) -> Result<()> {
        if self.enabled && (self.max_requests == 0 || self.window_minutes == 0) {
            return Err(Error::Config(
                "rate limit max_requests and window_minutes must be positive when enabled"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// DingTalk webhook credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DingTalkConfig {
    pub webhook: String,
    pub secret: String,
}

/// Live configuration handle shared by the limiter and the channels
///
/// Readers take a fresh snapshot on every decision; writers swap in a whole
/// new tree. Lock-free on the read path.
pub struct SharedConfig {
    inner: ArcSwap<FeedbackConfig>,
}

impl SharedConfig {
    pub fn new(config: FeedbackConfig) -> Self {
        Self {
            inner: ArcSwap::from_pointee(config),
        }
    }

    /// Current snapshot
    pub fn current(&self) -> Arc<FeedbackConfig> {
        self.inner.load_full()
    }

    /// Replace the whole configuration tree
    pub fn replace(&self, config: FeedbackConfig) {
        self.inner.store(Arc::new(config));
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self::new(FeedbackConfig::default())
    }
}
