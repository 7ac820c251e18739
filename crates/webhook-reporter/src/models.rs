//! Report payload models
//!
//! Field names follow the notification and webhook-log request documents of
//! the receiving services. Over-long text fields are truncated before sending.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event type tag on switch port notifications
pub const SWITCH_PORT_CONFIG_EVENT: &str = "SWITCH_PORT_CONFIG";

/// Longest notification message
pub const MAX_MESSAGE_LEN: usize = 500;

/// Longest notification type tag
pub const MAX_TYPE_LEN: usize = 50;

/// Longest payload or response text in an audit log entry
pub const MAX_LOG_TEXT_LEN: usize = 4000;

const ELLIPSIS: &str = "...";

/// Notification severity tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Info,
    Success,
    Error,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Info => "INFO",
            MessageType::Success => "SUCCESS",
            MessageType::Error => "ERROR",
        }
    }
}

/// Notification request document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub webhook_id: Value,
    pub user_id: String,
    pub message: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub event_id: Option<String>,
    pub resource_id: Option<String>,
    pub event_type: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

impl NotificationRequest {
    /// Build a notification, truncating the message and type tag
    pub fn new(
        webhook_id: &str,
        user_id: impl Into<String>,
        message: &str,
        message_type: &str,
    ) -> Self {
        Self {
            webhook_id: correlation_id(webhook_id),
            user_id: user_id.into(),
            message: truncate_with_ellipsis(message, MAX_MESSAGE_LEN),
            message_type: message_type.chars().take(MAX_TYPE_LEN).collect(),
            event_id: None,
            resource_id: None,
            event_type: None,
            metadata: None,
        }
    }

    /// Notification about one switch port configure/restore outcome
    ///
    /// # Arguments
    /// * `resource_name` - Switch port the outcome is about
    /// * `error` - Failure reason; ignored when `success` is true
    pub fn switch_port(
        webhook_id: &str,
        user_id: &str,
        resource_name: &str,
        success: bool,
        error: Option<&str>,
        event_id: Option<&str>,
        resource_id: Option<&str>,
    ) -> Self {
        let (message, message_type) = if success {
            (
                format!("Switch port '{}' configured successfully", resource_name),
                MessageType::Success,
            )
        } else {
            let mut message = format!("Failed to configure switch port '{}'", resource_name);
            if let Some(error) = error.filter(|e| !e.is_empty()) {
                message.push_str(": ");
                message.push_str(error);
            }
            (message, MessageType::Error)
        };

        let mut metadata = Map::new();
        metadata.insert("resourceName".to_string(), Value::from(resource_name));

        Self {
            event_id: event_id.map(str::to_string),
            resource_id: resource_id.map(str::to_string),
            event_type: Some(SWITCH_PORT_CONFIG_EVENT.to_string()),
            metadata: Some(metadata),
            ..Self::new(webhook_id, user_id, &message, message_type.as_str())
        }
    }
}

/// Webhook audit-log request document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookLogRequest {
    pub webhook_id: Value,
    pub event_type: String,
    pub payload: String,
    pub success: bool,
    pub status_code: Option<u16>,
    pub response: Option<String>,
    pub retry_count: u32,
    pub resource_id: Option<Value>,
    pub metadata: Option<Map<String, Value>>,
}

impl WebhookLogRequest {
    /// Build an audit entry, truncating the payload and response text
    pub fn new(webhook_id: &str, event_type: &str, payload: &str, success: bool) -> Self {
        Self {
            webhook_id: correlation_id(webhook_id),
            event_type: event_type.to_string(),
            payload: truncate_with_ellipsis(payload, MAX_LOG_TEXT_LEN),
            success,
            status_code: None,
            response: None,
            retry_count: 0,
            resource_id: None,
            metadata: None,
        }
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_response(mut self, response: &str) -> Self {
        self.response = Some(truncate_with_ellipsis(response, MAX_LOG_TEXT_LEN));
        self
    }

    pub fn with_resource_id(mut self, resource_id: Option<&str>) -> Self {
        self.resource_id = resource_id.map(correlation_id);
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Truncate to `max` characters, ending in `...` when anything was cut
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }

    let keep = max.saturating_sub(ELLIPSIS.len());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// Identifiers are sent as numbers when they are numeric
fn correlation_id(raw: &str) -> Value {
    raw.parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(raw))
}
