//! Test utilities for unit testing the dispatcher and HTTP surface
//!
//! This module provides a recording reporting sink, a dispatcher wired to a
//! mock switch, and payload builders.

#[cfg(test)]
use crate::dispatcher::Dispatcher;
#[cfg(test)]
use crate::resolver::Resolver;
#[cfg(test)]
use serde_json::{Value, json};
#[cfg(test)]
use std::sync::{Arc, Mutex};
#[cfg(test)]
use switch_client::{ManagerSettings, MockSessionFactory, MockSwitch, SwitchPortManager};
#[cfg(test)]
use webhook_reporter::{NotificationRequest, ReporterError, ReportingSink, WebhookLogRequest};

/// Reporting sink that records every request, optionally failing each call
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub notifications: Mutex<Vec<NotificationRequest>>,
    pub webhook_logs: Mutex<Vec<WebhookLogRequest>>,
    pub fail: bool,
}

#[cfg(test)]
impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn notifications(&self) -> Vec<NotificationRequest> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn webhook_logs(&self) -> Vec<WebhookLogRequest> {
        self.webhook_logs.lock().unwrap().clone()
    }

    fn result(&self) -> Result<(), ReporterError> {
        if self.fail {
            Err(ReporterError::Status {
                endpoint: "http://sink.test".to_string(),
                status: 503,
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl ReportingSink for RecordingSink {
    async fn send_notification(&self, request: &NotificationRequest) -> Result<(), ReporterError> {
        self.notifications.lock().unwrap().push(request.clone());
        self.result()
    }

    async fn send_webhook_log(&self, request: &WebhookLogRequest) -> Result<(), ReporterError> {
        self.webhook_logs.lock().unwrap().push(request.clone());
        self.result()
    }
}

/// Dispatcher over `switch` reporting into `sink`
#[cfg(test)]
pub fn create_test_dispatcher(switch: &MockSwitch, sink: Arc<RecordingSink>) -> Dispatcher {
    let manager = SwitchPortManager::new(
        Arc::new(MockSessionFactory::new(switch.clone())),
        ManagerSettings::default(),
    );
    Dispatcher::new(Arc::new(manager), sink, Resolver::default())
}

/// One batch record
#[cfg(test)]
pub fn record(event_id: &str, resource_name: &str, resource_type: &str, vlan: Option<&str>) -> Value {
    let custom_parameters = vlan.map(|vlan| json!({ "vlan_name": vlan }).to_string());
    json!({
        "eventId": event_id,
        "eventTitle": "Lab reservation",
        "eventStart": "2024-05-01T09:00:00Z",
        "eventEnd": "2024-05-01T17:00:00Z",
        "customParameters": custom_parameters,
        "resourceId": 40,
        "resourceName": resource_name,
        "resourceType": resource_type
    })
}

/// Batch payload of `events` with the given event type
#[cfg(test)]
pub fn batch_payload(event_type: &str, events: Vec<Value>) -> Value {
    json!({
        "webhookId": 17,
        "eventType": event_type,
        "timestamp": "2024-05-01T09:00:00.1234567Z",
        "eventCount": events.len(),
        "userId": "u-1",
        "username": "alice",
        "events": events
    })
}

/// Deletion payload whose reservation runs from 09:00 to 11:00
#[cfg(test)]
pub fn deletion_payload(resource_name: &str, now: &str) -> Value {
    json!({
        "eventType": "EVENT_DELETED",
        "timestamp": now,
        "webhookId": "wh-del",
        "data": {
            "id": 99,
            "start": "2024-05-01T09:00:00Z",
            "end": "2024-05-01T11:00:00Z",
            "resource": { "name": resource_name, "id": 40 },
            "keycloakId": "kc-7"
        }
    })
}
