//! Wire-facing model types consumed by the HTTP collaborator
//!
//! The core never decides HTTP semantics; it exposes the closed status set
//! and the mapping from a channel failure reason to a status, and the HTTP
//! layer turns the status into a response.

use serde::{Deserialize, Serialize};

use crate::channel::ChannelResult;

/// Closed set of user-facing outcomes for a feedback submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedbackStatus {
    Success,
    Failed,
    TooFrequent,
    ChannelDisabled,
    ChannelNotConfigured,
    EndpointNotConfigured,
    ServerError,
}

impl FeedbackStatus {
    /// Map a router result onto the status set by failure-reason substring.
    ///
    /// Precedence: "disabled" wins over everything, then "not configured"
    /// (with "webhook" narrowing to the endpoint variant), then "frequent".
    /// A failure without a reason is a server error.
    pub fn from_result(result: &ChannelResult) -> Self {
        if result.is_success() {
            return Self::Success;
        }
        let Some(message) = result.message.as_deref() else {
            return Self::ServerError;
        };
        let lower = message.to_lowercase();
        if lower.contains("disabled") {
            return Self::ChannelDisabled;
        }
        if lower.contains("not configured") {
            if lower.contains("webhook") {
                return Self::EndpointNotConfigured;
            }
            return Self::ChannelNotConfigured;
        }
        if lower.contains("frequent") {
            return Self::TooFrequent;
        }
        Self::Failed
    }
}

/// One inbound feedback submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub message: String,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub page_url: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// Outcome returned to the submitter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub status: FeedbackStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FeedbackResponse {
    pub fn of(status: FeedbackStatus) -> Self {
        Self {
            status,
            message: None,
        }
    }

    pub fn with_message(status: FeedbackStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_maps_to_success() {
        assert_eq!(
            FeedbackStatus::from_result(&ChannelResult::ok()),
            FeedbackStatus::Success
        );
    }

    #[test]
    fn failure_reasons_map_onto_the_closed_set() {
        let cases = [
            ("Feedback disabled", FeedbackStatus::ChannelDisabled),
            (
                "DingTalk webhook not configured",
                FeedbackStatus::EndpointNotConfigured,
            ),
            ("channel not configured", FeedbackStatus::ChannelNotConfigured),
            ("too frequent", FeedbackStatus::TooFrequent),
            ("DingTalk send failed with status 500", FeedbackStatus::Failed),
        ];
        for (reason, expected) in cases {
            assert_eq!(
                FeedbackStatus::from_result(&ChannelResult::fail(reason)),
                expected,
                "reason: {reason}"
            );
        }
    }

    #[test]
    fn failure_without_reason_is_server_error() {
        let result = ChannelResult {
            success: false,
            message: None,
        };
        assert_eq!(
            FeedbackStatus::from_result(&result),
            FeedbackStatus::ServerError
        );
    }

    #[test]
    fn status_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&FeedbackStatus::TooFrequent).unwrap();
        assert_eq!(json, "\"TOO_FREQUENT\"");
        let json = serde_json::to_string(&FeedbackStatus::EndpointNotConfigured).unwrap();
        assert_eq!(json, "\"ENDPOINT_NOT_CONFIGURED\"");
    }

    #[test]
    fn response_omits_absent_message() {
        let json = serde_json::to_string(&FeedbackResponse::of(FeedbackStatus::Success)).unwrap();
        assert_eq!(json, "{\"status\":\"SUCCESS\"}");

        let json = serde_json::to_string(&FeedbackResponse::with_message(
            FeedbackStatus::Failed,
            "DingTalk send failed",
        ))
        .unwrap();
        assert!(json.contains("\"message\":\"DingTalk send failed\""));
    }

    #[test]
    fn request_optional_fields_default() {
        let request: FeedbackRequest =
            serde_json::from_str("{\"message\":\"hi\"}").unwrap();
        assert_eq!(request.message, "hi");
        assert!(request.contact.is_none());
        assert!(request.page_url.is_none());
        assert!(request.user_agent.is_none());
    }
}
