//! Event dispatching
//!
//! Maps each decoded webhook payload to configure, restore or no-op actions,
//! runs them one at a time against the switch, and reports every outcome to
//! both reporting sinks. Per-event failures are collected, never raised.

use crate::resolver::{Resolver, SwitchTarget};
use crate::window::is_active;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use switch_client::SwitchPortManager;
use tracing::{debug, error, info, warn};
use webhook_core::{
    BatchReservationEvent, DeletionEvent, EventType, ReservationEvent, SingleReservationEvent,
    WebhookEvent,
};
use webhook_reporter::{NotificationRequest, ReportingSink, WebhookLogRequest};

/// What to do for one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Configure,
    Restore,
    NoOp,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Configure => "configure",
            Action::Restore => "restore",
            Action::NoOp => "none",
        }
    }

    fn past_tense(&self) -> &'static str {
        match self {
            Action::Configure => "configured",
            Action::Restore => "restored",
            Action::NoOp => "skipped",
        }
    }
}

/// Action for a reservation lifecycle event
pub fn classify(event: &ReservationEvent) -> Action {
    if !event.is_switch_port() {
        return Action::NoOp;
    }
    action_for(&event.event_type)
}

/// Action for a deletion: restore only while the reservation was running
pub fn classify_deletion(deletion: &DeletionEvent) -> Action {
    if is_active(deletion.timestamp, deletion.data.start, deletion.data.end) {
        Action::Restore
    } else {
        Action::NoOp
    }
}

fn action_for(event_type: &EventType) -> Action {
    match event_type {
        EventType::Start => Action::Configure,
        EventType::End => Action::Restore,
        _ => Action::NoOp,
    }
}

/// Result of one configure or restore attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub event_id: String,
    pub webhook_id: String,
    pub resource_name: String,
    pub action: Action,
    pub success: bool,
    /// Response text on success, failure reason otherwise
    pub message: String,
    /// Interface and VLAN acted on, when resolution succeeded
    pub target: Option<SwitchTarget>,
}

impl OperationOutcome {
    pub fn error(&self) -> Option<&str> {
        (!self.success).then_some(self.message.as_str())
    }
}

/// Entry of the failure list in a 500 response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedEvent {
    pub event_id: String,
    pub resource_name: String,
    pub action: &'static str,
}

/// Overall result of one webhook request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    Success {
        message: String,
        user_id: Option<String>,
        timestamp: Option<DateTime<Utc>>,
    },
    Failure {
        detail: String,
        failed: Vec<FailedEvent>,
    },
}

impl DispatchResult {
    fn message(message: impl Into<String>) -> Self {
        DispatchResult::Success {
            message: message.into(),
            user_id: None,
            timestamp: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DispatchResult::Success { .. })
    }
}

/// Runs webhook events against the switch and reports the outcomes
pub struct Dispatcher {
    manager: Arc<SwitchPortManager>,
    sink: Arc<dyn ReportingSink>,
    resolver: Resolver,
}

impl Dispatcher {
    pub fn new(manager: Arc<SwitchPortManager>, sink: Arc<dyn ReportingSink>, resolver: Resolver) -> Self {
        Self {
            manager,
            sink,
            resolver,
        }
    }

    /// Act on one decoded webhook
    ///
    /// `raw_payload` is the request body as received; it is what the audit
    /// log records for every event of the request.
    pub async fn dispatch(&self, event: &WebhookEvent, raw_payload: &str) -> DispatchResult {
        match event {
            WebhookEvent::Batch(batch) => self.dispatch_batch(batch, raw_payload).await,
            WebhookEvent::Single(single) => self.dispatch_single(single, raw_payload).await,
            WebhookEvent::Deletion(deletion) => self.dispatch_deletion(deletion, raw_payload).await,
        }
    }

    async fn dispatch_batch(&self, batch: &BatchReservationEvent, raw_payload: &str) -> DispatchResult {
        let username = batch.username.as_deref().unwrap_or("unknown");
        info!(
            "Processing switch port webhook. Event Type: '{}', User: '{}', Event Count: {}, Active Resources Count: {}.",
            batch.event_type,
            username,
            batch.event_count,
            batch.active_resources.as_ref().map_or(0, Vec::len)
        );

        let events = batch.reservation_events();
        let total = events.len();
        let switch_ports: Vec<ReservationEvent> =
            events.into_iter().filter(ReservationEvent::is_switch_port).collect();
        if switch_ports.len() != total {
            info!(
                "Filtered {} non-Switch Port events. Processing {} Switch Port events.",
                total - switch_ports.len(),
                switch_ports.len()
            );
        }

        if switch_ports.is_empty() {
            info!("No Switch Port events found in payload. No action taken.");
            return DispatchResult::message("No Switch Port events to process.");
        }

        let active = batch.active_switch_ports();
        if active.is_empty() {
            info!("User '{}' has no active Switch Port resources at this time.", username);
        } else {
            info!("User '{}' has {} active Switch Port resources:", username, active.len());
            for record in active {
                info!(
                    "  - Active Switch Port: '{}' Event: '{}' (until {})",
                    record.resource_name,
                    record.event_title.as_deref().unwrap_or(""),
                    record.event_end
                );
            }
        }

        self.process_events(&batch.event_type, &switch_ports, batch.user_id.clone(), raw_payload)
            .await
    }

    async fn dispatch_single(&self, single: &SingleReservationEvent, raw_payload: &str) -> DispatchResult {
        let event = single.reservation_event();
        info!(
            "Processing switch port event '{}' ({}) for resource '{}'",
            event.event_id, event.event_type, event.resource_name
        );

        if !event.is_switch_port() {
            info!(
                "Ignoring event for resource type '{}'. No action taken.",
                event.resource_type
            );
            return DispatchResult::message("No Switch Port events to process.");
        }

        let user_id = event.user_id.clone();
        self.process_events(&single.event_type, std::slice::from_ref(&event), user_id, raw_payload)
            .await
    }

    async fn dispatch_deletion(&self, deletion: &DeletionEvent, raw_payload: &str) -> DispatchResult {
        let resource_name = &deletion.data.resource.name;
        info!(
            "Processing switch port EVENT_DELETED webhook. Webhook ID: '{}', Resource Name: '{}'.",
            deletion.webhook_id, resource_name
        );
        debug!(
            "Current time (UTC): {}, Reservation Start: {}, Reservation End: {}",
            deletion.timestamp, deletion.data.start, deletion.data.end
        );

        if classify_deletion(deletion) == Action::NoOp {
            info!(
                "Reservation for switch port '{}' is not currently active. No action taken for EVENT_DELETED.",
                resource_name
            );
            return DispatchResult::message(format!(
                "No action taken for switch port '{}' as reservation is not currently active.",
                resource_name
            ));
        }

        info!(
            "Reservation for switch port '{}' is currently active. Restoring to default VLAN.",
            resource_name
        );
        let event = deletion.reservation_event();
        let outcome = self.run(&event, Action::Restore).await;
        self.report(&event, &outcome, raw_payload).await;

        if outcome.success {
            info!(
                "Successfully restored switch port '{}' to default VLAN due to EVENT_DELETED.",
                resource_name
            );
            DispatchResult::message(format!(
                "Switch port '{}' restored to default VLAN due to active reservation deletion.",
                resource_name
            ))
        } else {
            error!("Failed to restore switch port '{}' for EVENT_DELETED.", resource_name);
            DispatchResult::Failure {
                detail: format!(
                    "Failed to restore switch port '{}' after EVENT_DELETED.",
                    resource_name
                ),
                failed: vec![failed_event(&outcome)],
            }
        }
    }

    /// Run every switch port event of one request in order
    async fn process_events(
        &self,
        event_type: &EventType,
        events: &[ReservationEvent],
        user_id: Option<String>,
        raw_payload: &str,
    ) -> DispatchResult {
        let action = action_for(event_type);
        if action == Action::NoOp {
            info!("No action configured for event type '{}'.", event_type);
            return DispatchResult::message(format!(
                "No action needed for event type '{}'.",
                event_type
            ));
        }

        let mut processed = 0;
        let mut failed = Vec::new();
        for event in events {
            let outcome = self.run(event, classify(event)).await;
            self.report(event, &outcome, raw_payload).await;

            if outcome.success {
                processed += 1;
            } else {
                failed.push(failed_event(&outcome));
            }
        }

        if !failed.is_empty() {
            error!(
                "Switch port webhook processing (Event Type: {}) encountered {} failures out of {} events.",
                event_type,
                failed.len(),
                events.len()
            );
            let listing = serde_json::to_string(&failed).unwrap_or_default();
            return DispatchResult::Failure {
                detail: format!(
                    "Processing for event type '{}' failed for {} out of {} Switch Port events. Failures: {}",
                    event_type,
                    failed.len(),
                    events.len(),
                    listing
                ),
                failed,
            };
        }

        DispatchResult::Success {
            message: format!(
                "Successfully {} {} switch port(s)",
                action.past_tense(),
                processed
            ),
            user_id,
            timestamp: Some(Utc::now()),
        }
    }

    /// Execute one action; failures come back as an outcome
    async fn run(&self, event: &ReservationEvent, action: Action) -> OperationOutcome {
        let mut outcome = OperationOutcome {
            event_id: event.event_id.clone(),
            webhook_id: event.webhook_id.clone(),
            resource_name: event.resource_name.clone(),
            action,
            success: false,
            message: String::new(),
            target: None,
        };

        match action {
            Action::Configure => match self.resolver.resolve_target(event) {
                Ok(target) => {
                    let result = self
                        .manager
                        .configure_switch_port(&target.interface, &target.vlan, &target.username)
                        .await;
                    outcome.success = result.success;
                    outcome.message = if result.success {
                        format!(
                            "Switch port '{}' configured with VLAN '{}'",
                            event.resource_name, target.vlan
                        )
                    } else {
                        result.message
                    };
                    outcome.target = Some(target);
                }
                Err(e) => {
                    error!("[{}] {}", event.event_type, e);
                    outcome.message = e.to_string();
                }
            },
            Action::Restore => match self.resolver.resolve_interface(&event.resource_name) {
                Ok(interface) => {
                    let result = self.manager.restore_port_to_default_vlan(&interface).await;
                    outcome.success = result.success;
                    outcome.message = if result.success {
                        format!("Switch port '{}' restored to default VLAN", event.resource_name)
                    } else {
                        result.message
                    };
                    outcome.target = Some(SwitchTarget {
                        interface,
                        vlan: self.manager.settings().default_vlan_id.to_string(),
                        username: event.acting_username().to_string(),
                    });
                }
                Err(e) => {
                    error!("[{}] {}", event.event_type, e);
                    outcome.message = e.to_string();
                }
            },
            Action::NoOp => {
                outcome.success = true;
                outcome.message = format!("No action needed for switch port '{}'", event.resource_name);
            }
        }

        if outcome.success {
            info!(
                "[{}] {} (Event ID: {})",
                event.event_type, outcome.message, event.event_id
            );
        } else {
            error!(
                "[{}] Failed to {} switch port '{}' (Event ID: {}): {}",
                event.event_type,
                action.as_str(),
                event.resource_name,
                event.event_id,
                outcome.message
            );
        }
        outcome
    }

    /// Send the notification and the audit entry; failures are only logged
    async fn report(&self, event: &ReservationEvent, outcome: &OperationOutcome, raw_payload: &str) {
        let user_id = event.user_id_or_unknown();

        let notification = NotificationRequest::switch_port(
            &outcome.webhook_id,
            user_id,
            &outcome.resource_name,
            outcome.success,
            outcome.error(),
            Some(&outcome.event_id),
            event.resource_id.as_deref(),
        );
        if let Err(e) = self.sink.send_notification(&notification).await {
            warn!(
                "Notification for switch port '{}' was not delivered: {}",
                outcome.resource_name, e
            );
        }

        let mut metadata = Map::new();
        metadata.insert("resourceName".to_string(), Value::from(outcome.resource_name.as_str()));
        metadata.insert("userId".to_string(), Value::from(user_id));
        metadata.insert("eventId".to_string(), Value::from(outcome.event_id.as_str()));
        if let Some(target) = &outcome.target {
            metadata.insert("vlanName".to_string(), Value::from(target.vlan.as_str()));
        }

        let log = WebhookLogRequest::new(
            &outcome.webhook_id,
            event.event_type.as_str(),
            raw_payload,
            outcome.success,
        )
        .with_status_code(if outcome.success { 200 } else { 500 })
        .with_response(&outcome.message)
        .with_resource_id(event.resource_id.as_deref())
        .with_metadata(metadata);
        if let Err(e) = self.sink.send_webhook_log(&log).await {
            warn!(
                "Webhook log for switch port '{}' was not delivered: {}",
                outcome.resource_name, e
            );
        }
    }
}

fn failed_event(outcome: &OperationOutcome) -> FailedEvent {
    FailedEvent {
        event_id: outcome.event_id.clone(),
        resource_name: outcome.resource_name.clone(),
        action: outcome.action.as_str(),
    }
}
