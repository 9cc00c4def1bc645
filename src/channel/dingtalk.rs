//! DingTalk webhook channel
//!
//! Delivers feedback as a markdown message to a DingTalk group robot.
//! When a signing secret is configured, the webhook URL is extended with
//! `timestamp` and `sign` query parameters where
//! `sign = percent_encode(base64(hmac_sha256(secret, "{timestamp}\n{secret}")))`.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::warn;

use super::{ChannelResult, MessageChannel, MessageContext};
use crate::config::SharedConfig;
use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CONTACT_MASK: &str = "***";

pub struct DingTalkChannel {
    config: Arc<SharedConfig>,
    client: reqwest::Client,
}

impl DingTalkChannel {
    pub fn new(config: Arc<SharedConfig>) -> Self {
        Self {
            config,
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl MessageChannel for DingTalkChannel {
    async fn send(&self, context: &MessageContext) -> ChannelResult {
        let cfg = self.config.current();
        let webhook = cfg.ding_talk.webhook.trim();
        if webhook.is_empty() {
            return ChannelResult::fail("DingTalk webhook not configured");
        }

        let url = signed_url(webhook, &cfg.ding_talk.secret, now_millis());
        let payload = build_payload(context);

        match self.client.post(&url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => ChannelResult::ok(),
            Ok(response) => {
                let status = response.status();
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "no response body".to_string());
                warn!(%status, body = %body, "DingTalk send failed");
                ChannelResult::fail(format!("DingTalk send failed with status {}", status))
            }
            Err(e) => {
                warn!(error = %e, "DingTalk send error");
                ChannelResult::fail(format!("DingTalk send error: {}", e))
            }
        }
    }

    fn name(&self) -> &str {
        "dingTalk"
    }
}

/// Append `timestamp` and `sign` query parameters when a secret is set.
/// A signing failure falls back to the unsigned URL; the robot will reject
/// it and the rejection surfaces as an ordinary send failure.
fn signed_url(webhook: &str, secret: &str, timestamp: u64) -> String {
    if secret.trim().is_empty() {
        return webhook.to_string();
    }
    match compute_signature(secret, timestamp) {
        Ok(sign) => {
            let connector = if webhook.contains('?') { '&' } else { '?' };
            format!("{webhook}{connector}timestamp={timestamp}&sign={sign}")
        }
        Err(e) => {
            warn!(error = %e, "failed to sign DingTalk request");
            webhook.to_string()
        }
    }
}

/// HMAC-SHA256 over `"{timestamp}\n{secret}"`, base64-encoded then
/// percent-encoded for URL embedding
fn compute_signature(secret: &str, timestamp: u64) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Signing(e.to_string()))?;
    mac.update(format!("{}\n{}", timestamp, secret).as_bytes());
    let digest = mac.finalize().into_bytes();
    Ok(urlencoding::encode(&BASE64.encode(digest)).into_owned())
}

fn build_payload(context: &MessageContext) -> serde_json::Value {
    let mut content = String::from("### \u{1F514} New user feedback\n\n");
    if let Some(page_url) = non_blank(context.page_url.as_deref()) {
        content.push_str("- **Page**: ");
        content.push_str(&escape_markdown(page_url));
        content.push('\n');
    }
    if let Some(contact) = non_blank(context.contact.as_deref()) {
        content.push_str("- **Contact**: ");
        content.push_str(&mask_contact(contact));
        content.push('\n');
    }
    content.push_str("\n**Message**:\n> ");
    content.push_str(&escape_markdown(&context.message));

    json!({
        "msgtype": "markdown",
        "markdown": {
            "title": "New user feedback",
            "text": content,
        }
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// Keep at most the first 3 characters of a contact, mask the rest
fn mask_contact(contact: &str) -> String {
    if contact.chars().count() < 3 {
        return CONTACT_MASK.to_string();
    }
    let kept: String = contact.chars().take(3).collect();
    format!("{kept}{CONTACT_MASK}")
}

/// Backslash-escape markdown control characters in free text and collapse
/// runs of spaces, so user input cannot break the message layout
fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    let mut last_was_space = false;
    for ch in text.chars() {
        if ch == ' ' {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
            continue;
        }
        last_was_space = false;
        if matches!(
            ch,
            '\\' | '`'
                | '*'
                | '_'
                | '{'
                | '}'
                | '['
                | ']'
                | '('
                | ')'
                | '#'
                | '+'
                | '-'
                | '.'
                | '!'
                | '~'
                | '|'
                | '>'
        ) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DingTalkConfig, FeedbackConfig};

    #[test]
    fn mask_keeps_first_three_characters() {
        assert_eq!(mask_contact("13812345678"), "138***");
        assert_eq!(mask_contact("user@example.com"), "use***");
    }

    #[test]
    fn mask_short_contacts_entirely() {
        assert_eq!(mask_contact("ab"), "***");
        assert_eq!(mask_contact(""), "***");
    }

    #[test]
    fn signature_is_deterministic_for_fixed_inputs() {
        let a = compute_signature("SECtest", 1_700_000_000_000).unwrap();
        let b = compute_signature("SECtest", 1_700_000_000_000).unwrap();
        assert_eq!(a, b);
        assert!(!a.is_empty());

        let other_ts = compute_signature("SECtest", 1_700_000_000_001).unwrap();
        assert_ne!(a, other_ts);
        let other_secret = compute_signature("SECother", 1_700_000_000_000).unwrap();
        assert_ne!(a, other_secret);
    }

    #[test]
    fn signature_is_url_safe() {
        let sign = compute_signature("SECtest", 1_700_000_000_000).unwrap();
        // base64's '+', '/' and '=' must all be percent-encoded
        assert!(!sign.contains('+'));
        assert!(!sign.contains('/'));
        assert!(!sign.contains('='));
    }

    #[test]
    fn signed_url_uses_question_mark_without_query() {
        let url = signed_url("https://oapi.dingtalk.com/robot/send", "SEC", 1_700_000_000_000);
        assert!(url.starts_with("https://oapi.dingtalk.com/robot/send?timestamp=1700000000000&sign="));
        assert_eq!(url.matches('?').count(), 1);
    }

    #[test]
    fn signed_url_uses_ampersand_with_existing_query() {
        let base = "https://oapi.dingtalk.com/robot/send?access_token=abc";
        let url = signed_url(base, "SEC", 1_700_000_000_000);
        assert!(url.starts_with("https://oapi.dingtalk.com/robot/send?access_token=abc&timestamp="));
        assert_eq!(url.matches('?').count(), 1);
    }

    #[test]
    fn blank_secret_leaves_url_unsigned() {
        let base = "https://oapi.dingtalk.com/robot/send?access_token=abc";
        assert_eq!(signed_url(base, "", 1_700_000_000_000), base);
        assert_eq!(signed_url(base, "   ", 1_700_000_000_000), base);
    }

    #[test]
    fn markdown_escape_covers_control_characters() {
        assert_eq!(escape_markdown("a*b_c"), "a\\*b\\_c");
        assert_eq!(escape_markdown("[link](x)"), "\\[link\\]\\(x\\)");
        assert_eq!(escape_markdown("back\\slash"), "back\\\\slash");
        assert_eq!(escape_markdown("> quote #1!"), "\\> quote \\#1\\!");
    }

    #[test]
    fn markdown_escape_collapses_space_runs() {
        assert_eq!(escape_markdown("a    b"), "a b");
        assert_eq!(escape_markdown("a b"), "a b");
    }

    #[test]
    fn payload_masks_contact_and_escapes_text() {
        let context = MessageContext::new("hello *world*")
            .with_contact("13812345678")
            .with_page_url("https://example.com/page");
        let payload = build_payload(&context);
        assert_eq!(payload["msgtype"], "markdown");
        let text = payload["markdown"]["text"].as_str().unwrap();
        assert!(text.contains("138***"));
        assert!(!text.contains("13812345678"));
        assert!(text.contains("hello \\*world\\*"));
    }

    #[test]
    fn payload_omits_blank_optional_fields() {
        let context = MessageContext::new("just a message").with_contact("   ");
        let payload = build_payload(&context);
        let text = payload["markdown"]["text"].as_str().unwrap();
        assert!(!text.contains("**Contact**"));
        assert!(!text.contains("**Page**"));
        assert!(text.contains("just a message"));
    }

    #[tokio::test]
    async fn missing_webhook_fails_without_network() {
        let config = FeedbackConfig {
            ding_talk: DingTalkConfig::default(),
            ..Default::default()
        };
        let channel = DingTalkChannel::new(Arc::new(SharedConfig::new(config)));
        let result = channel.send(&MessageContext::new("msg")).await;
        assert!(!result.is_success());
        assert_eq!(
            result.message.as_deref(),
            Some("DingTalk webhook not configured")
        );
    }

    #[test]
    fn channel_name_is_stable() {
        let channel = DingTalkChannel::new(Arc::new(SharedConfig::default()));
        assert_eq!(channel.name(), "dingTalk");
    }
}
