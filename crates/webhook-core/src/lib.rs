//! Reservation Webhook Core
//!
//! Shared types for the switch port reservation webhook:
//! - Typed payloads for batch, single and deletion lifecycle events
//! - Tolerant decoding of the `customParameters` side-channel
//! - ISO-8601 timestamp parsing normalized to UTC
//! - HMAC-SHA256 request signing and verification
//!
//! # Example
//!
//! ```
//! use webhook_core::{WebhookEvent, EventType};
//!
//! let raw = br#"{
//!     "eventType": "EVENT_DELETED",
//!     "timestamp": "2024-05-01T10:00:00Z",
//!     "webhookId": "wh-1",
//!     "data": {
//!         "id": 7,
//!         "start": "2024-05-01T09:00:00Z",
//!         "end": "2024-05-01T11:00:00Z",
//!         "resource": { "name": "Gi1/0/7" }
//!     }
//! }"#;
//!
//! match WebhookEvent::parse(raw).unwrap() {
//!     WebhookEvent::Deletion(deletion) => {
//!         assert_eq!(deletion.event_type, EventType::Deleted);
//!         assert_eq!(deletion.data.resource.name, "Gi1/0/7");
//!     }
//!     other => panic!("unexpected payload shape: {:?}", other),
//! }
//! ```

pub mod custom_params;
pub mod error;
pub mod event;
pub mod signature;
pub mod timestamp;

pub use custom_params::{
    get_custom_parameter, get_vlan_name_from_custom_params, has_custom_parameters,
    parse_custom_parameters, CustomParameters, VLAN_NAME_KEY,
};
pub use error::EventError;
pub use event::*;
pub use signature::{compute_signature, verify_signature, SIGNATURE_HEADER};
pub use timestamp::parse_timestamp;
