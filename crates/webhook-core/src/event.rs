//! Webhook payload models
//!
//! The reservation service delivers three payload shapes to `POST /webhook`:
//! - a batch of reservation events (`EVENT_START` / `EVENT_END`) for one user
//! - a single reservation event with the same fields flattened to the top level
//! - an `EVENT_DELETED` notification describing a removed reservation
//!
//! The shape is decided once, by the explicit `eventType` value and the
//! presence of an `events` array, and decoded into [`WebhookEvent`].

use crate::error::EventError;
use crate::timestamp::serde_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Resource type handled by this service
pub const SWITCH_PORT_RESOURCE_TYPE: &str = "Switch Port";

/// Lifecycle event type carried in `eventType`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    /// Reservation started
    Start,
    /// Reservation ended
    End,
    /// Reservation record removed
    Deleted,
    /// Any other value; acknowledged without action
    Other(String),
}

impl EventType {
    /// Wire representation
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Start => "EVENT_START",
            EventType::End => "EVENT_END",
            EventType::Deleted => "EVENT_DELETED",
            EventType::Other(value) => value,
        }
    }
}

impl From<&str> for EventType {
    fn from(value: &str) -> Self {
        match value {
            "EVENT_START" => EventType::Start,
            "EVENT_END" => EventType::End,
            "EVENT_DELETED" => EventType::Deleted,
            other => EventType::Other(other.to_string()),
        }
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        EventType::from(value.as_str())
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reservation inside a batch payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub event_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_description: Option<String>,

    #[serde(with = "serde_timestamp")]
    pub event_start: DateTime<Utc>,

    #[serde(with = "serde_timestamp")]
    pub event_end: DateTime<Utc>,

    /// JSON-encoded custom parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_parameters: Option<String>,

    #[serde(default, deserialize_with = "optional_string_or_number", skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    /// Interface identity on the switch
    pub resource_name: String,

    /// Only "Switch Port" is acted upon
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_specs: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_location: Option<String>,

    #[serde(default, deserialize_with = "optional_string_or_number", skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
}

impl ReservationRecord {
    /// Whether this record targets a switch port
    pub fn is_switch_port(&self) -> bool {
        self.resource_type == SWITCH_PORT_RESOURCE_TYPE
    }
}

/// Batch of reservation events for one user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReservationEvent {
    #[serde(deserialize_with = "string_or_number")]
    pub webhook_id: String,

    pub event_type: EventType,

    #[serde(with = "serde_timestamp")]
    pub timestamp: DateTime<Utc>,

    pub event_count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_public_key: Option<String>,

    pub events: Vec<ReservationRecord>,

    /// Reservations of this user that are active right now
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_resources: Option<Vec<ReservationRecord>>,
}

impl BatchReservationEvent {
    /// Flatten every record of the batch, in the order received
    pub fn reservation_events(&self) -> Vec<ReservationEvent> {
        self.events
            .iter()
            .map(|record| ReservationEvent {
                event_id: record.event_id.clone(),
                event_type: self.event_type.clone(),
                resource_name: record.resource_name.clone(),
                resource_type: record.resource_type.clone(),
                custom_parameters: record.custom_parameters.clone(),
                username: self.username.clone(),
                user_id: self.user_id.clone(),
                webhook_id: self.webhook_id.clone(),
                resource_id: record.resource_id.clone(),
            })
            .collect()
    }

    /// Active reservations that are switch ports
    pub fn active_switch_ports(&self) -> Vec<&ReservationRecord> {
        self.active_resources
            .iter()
            .flatten()
            .filter(|record| record.is_switch_port())
            .collect()
    }
}

/// Single reservation event with its fields at the top level
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleReservationEvent {
    #[serde(deserialize_with = "string_or_number")]
    pub webhook_id: String,

    pub event_type: EventType,

    #[serde(default, with = "serde_timestamp::option", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(deserialize_with = "string_or_number")]
    pub event_id: String,

    pub resource_name: String,

    pub resource_type: String,

    #[serde(default, deserialize_with = "optional_string_or_number", skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_parameters: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, with = "serde_timestamp::option", skip_serializing_if = "Option::is_none")]
    pub event_start: Option<DateTime<Utc>>,

    #[serde(default, with = "serde_timestamp::option", skip_serializing_if = "Option::is_none")]
    pub event_end: Option<DateTime<Utc>>,
}

impl SingleReservationEvent {
    pub fn reservation_event(&self) -> ReservationEvent {
        ReservationEvent {
            event_id: self.event_id.clone(),
            event_type: self.event_type.clone(),
            resource_name: self.resource_name.clone(),
            resource_type: self.resource_type.clone(),
            custom_parameters: self.custom_parameters.clone(),
            username: self.username.clone(),
            user_id: self.user_id.clone(),
            webhook_id: self.webhook_id.clone(),
            resource_id: self.resource_id.clone(),
        }
    }
}

/// Resource released by a deletion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub name: String,

    #[serde(default, deserialize_with = "optional_string_or_number", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// `data` section of an `EVENT_DELETED` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionData {
    /// Deletion record id
    pub id: u64,

    /// Original reservation start
    #[serde(with = "serde_timestamp")]
    pub start: DateTime<Utc>,

    /// Original reservation end
    #[serde(with = "serde_timestamp")]
    pub end: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_parameters: Option<String>,

    pub resource: ResourceInfo,

    /// Identity of the requesting user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keycloak_id: Option<String>,
}

/// `EVENT_DELETED` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionEvent {
    pub event_type: EventType,

    /// Time of the deletion; the "now" of the reservation window check
    #[serde(with = "serde_timestamp")]
    pub timestamp: DateTime<Utc>,

    #[serde(deserialize_with = "string_or_number")]
    pub webhook_id: String,

    pub data: DeletionData,
}

impl DeletionEvent {
    /// View of the deleted reservation as a switch port event
    pub fn reservation_event(&self) -> ReservationEvent {
        ReservationEvent {
            event_id: self.data.id.to_string(),
            event_type: self.event_type.clone(),
            resource_name: self.data.resource.name.clone(),
            resource_type: SWITCH_PORT_RESOURCE_TYPE.to_string(),
            custom_parameters: self.data.custom_parameters.clone(),
            username: None,
            user_id: self.data.keycloak_id.clone(),
            webhook_id: self.webhook_id.clone(),
            resource_id: self.data.resource.id.clone(),
        }
    }
}

/// A decoded inbound webhook payload
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    Batch(BatchReservationEvent),
    Single(SingleReservationEvent),
    Deletion(DeletionEvent),
}

impl WebhookEvent {
    /// Decode a raw request body
    ///
    /// # Returns
    /// * `Ok(WebhookEvent)` - The payload in one of the known shapes
    /// * `Err(EventError::MalformedPayload)` - Missing or mistyped fields
    pub fn parse(raw: &[u8]) -> Result<Self, EventError> {
        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| EventError::MalformedPayload(format!("body is not valid JSON: {}", e)))?;

        let (event_type, has_events) = match &value {
            Value::Object(object) => match object.get("eventType") {
                Some(Value::String(event_type)) => {
                    (EventType::from(event_type.as_str()), object.contains_key("events"))
                }
                Some(_) => {
                    return Err(EventError::MalformedPayload("eventType must be a string".to_string()))
                }
                None => return Err(EventError::MalformedPayload("missing field `eventType`".to_string())),
            },
            _ => return Err(EventError::MalformedPayload("expected a JSON object".to_string())),
        };

        if event_type == EventType::Deleted {
            serde_json::from_value(value)
                .map(WebhookEvent::Deletion)
                .map_err(|e| EventError::MalformedPayload(format!("invalid EVENT_DELETED payload: {}", e)))
        } else if has_events {
            serde_json::from_value(value)
                .map(WebhookEvent::Batch)
                .map_err(|e| EventError::MalformedPayload(format!("invalid batch payload: {}", e)))
        } else {
            serde_json::from_value(value)
                .map(WebhookEvent::Single)
                .map_err(|e| EventError::MalformedPayload(format!("invalid single event payload: {}", e)))
        }
    }

    pub fn event_type(&self) -> &EventType {
        match self {
            WebhookEvent::Batch(batch) => &batch.event_type,
            WebhookEvent::Single(single) => &single.event_type,
            WebhookEvent::Deletion(deletion) => &deletion.event_type,
        }
    }

    pub fn webhook_id(&self) -> &str {
        match self {
            WebhookEvent::Batch(batch) => &batch.webhook_id,
            WebhookEvent::Single(single) => &single.webhook_id,
            WebhookEvent::Deletion(deletion) => &deletion.webhook_id,
        }
    }
}

/// One switch port lifecycle event, independent of the payload shape it came in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationEvent {
    pub event_id: String,
    pub event_type: EventType,
    pub resource_name: String,
    pub resource_type: String,
    pub custom_parameters: Option<String>,
    pub username: Option<String>,
    pub user_id: Option<String>,
    pub webhook_id: String,
    pub resource_id: Option<String>,
}

impl ReservationEvent {
    pub fn is_switch_port(&self) -> bool {
        self.resource_type == SWITCH_PORT_RESOURCE_TYPE
    }

    /// User id reported to the sinks
    pub fn user_id_or_unknown(&self) -> &str {
        self.user_id.as_deref().unwrap_or("unknown")
    }

    /// Name used when auto-creating VLANs for this user
    pub fn acting_username(&self) -> &str {
        self.username
            .as_deref()
            .or(self.user_id.as_deref())
            .unwrap_or("unknown")
    }
}

/// Accept identifiers sent either as JSON strings or numbers
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, found {}",
            other
        ))),
    }
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, found {}",
            other
        ))),
    }
}
