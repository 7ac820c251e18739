//! Unit tests for the event dispatcher

#[cfg(test)]
mod tests {
    use crate::dispatcher::{Action, DispatchResult, Dispatcher, classify};
    use crate::test_utils::*;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use switch_client::{FailurePoint, MockSwitch};
    use webhook_core::{EventType, ReservationEvent, WebhookEvent};

    async fn dispatch(dispatcher: &Dispatcher, payload: Value) -> DispatchResult {
        let body = payload.to_string();
        let event = WebhookEvent::parse(body.as_bytes()).unwrap();
        dispatcher.dispatch(&event, &body).await
    }

    fn event(resource_type: &str, event_type: EventType) -> ReservationEvent {
        ReservationEvent {
            event_id: "1".to_string(),
            event_type,
            resource_name: "Gi1/0/1".to_string(),
            resource_type: resource_type.to_string(),
            custom_parameters: None,
            username: None,
            user_id: None,
            webhook_id: "1".to_string(),
            resource_id: None,
        }
    }

    #[test]
    fn test_classification_table() {
        assert_eq!(classify(&event("Switch Port", EventType::Start)), Action::Configure);
        assert_eq!(classify(&event("Switch Port", EventType::End)), Action::Restore);
        assert_eq!(
            classify(&event("Switch Port", EventType::Other("EVENT_UPDATED".to_string()))),
            Action::NoOp
        );
        assert_eq!(classify(&event("Server", EventType::Start)), Action::NoOp);
        assert_eq!(classify(&event("switch port", EventType::End)), Action::NoOp);
    }

    #[tokio::test]
    async fn test_non_switch_port_events_open_no_session() {
        let switch = MockSwitch::new();
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = create_test_dispatcher(&switch, sink.clone());

        let payload = batch_payload(
            "EVENT_START",
            vec![
                record("1", "server-01", "Server", Some("120")),
                record("2", "vm-02", "VM", Some("121")),
            ],
        );
        let result = dispatch(&dispatcher, payload).await;

        assert_eq!(
            result,
            DispatchResult::Success {
                message: "No Switch Port events to process.".to_string(),
                user_id: None,
                timestamp: None,
            }
        );
        assert_eq!(switch.connect_count(), 0);
        assert!(sink.notifications().is_empty());
        assert!(sink.webhook_logs().is_empty());
    }

    #[tokio::test]
    async fn test_batch_start_configures_each_port() {
        let switch = MockSwitch::new();
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = create_test_dispatcher(&switch, sink.clone());

        let payload = batch_payload(
            "EVENT_START",
            vec![
                record("1", "Gi1/0/1", "Switch Port", Some("120")),
                record("2", "server-01", "Server", Some("120")),
                record("3", "Gi1/0/2", "Switch Port", Some("120")),
            ],
        );
        let result = dispatch(&dispatcher, payload).await;

        match result {
            DispatchResult::Success { message, user_id, timestamp } => {
                assert_eq!(message, "Successfully configured 2 switch port(s)");
                assert_eq!(user_id.as_deref(), Some("u-1"));
                assert!(timestamp.is_some());
            }
            other => panic!("expected success, got {:?}", other),
        }

        assert_eq!(switch.port_vlan("Gi1/0/1"), Some(120));
        assert_eq!(switch.port_vlan("Gi1/0/2"), Some(120));
        assert_eq!(switch.connect_count(), 2);

        let notifications = sink.notifications();
        assert_eq!(notifications.len(), 2);
        assert!(notifications.iter().all(|n| n.message_type == "SUCCESS"));
        assert_eq!(notifications[0].webhook_id, json!(17));
        assert_eq!(notifications[0].user_id, "u-1");
        assert_eq!(notifications[0].resource_id.as_deref(), Some("40"));

        let logs = sink.webhook_logs();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].status_code, Some(200));
        assert_eq!(logs[0].event_type, "EVENT_START");
        assert_eq!(
            logs[0].response.as_deref(),
            Some("Switch port 'Gi1/0/1' configured with VLAN '120'")
        );
        let metadata = logs[0].metadata.as_ref().unwrap();
        assert_eq!(metadata["resourceName"], "Gi1/0/1");
        assert_eq!(metadata["userId"], "u-1");
        assert_eq!(metadata["eventId"], "1");
        assert_eq!(metadata["vlanName"], "120");
    }

    #[tokio::test]
    async fn test_resolution_failure_is_isolated_to_its_event() {
        let switch = MockSwitch::new();
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = create_test_dispatcher(&switch, sink.clone());

        let payload = batch_payload(
            "EVENT_START",
            vec![
                record("1", "Gi1/0/1", "Switch Port", Some("120")),
                record("2", "Gi1/0/2", "Switch Port", None),
                record("3", "Gi1/0/3", "Switch Port", Some("130")),
            ],
        );
        let result = dispatch(&dispatcher, payload).await;

        match result {
            DispatchResult::Failure { detail, failed } => {
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].event_id, "2");
                assert_eq!(failed[0].resource_name, "Gi1/0/2");
                assert_eq!(failed[0].action, "configure");
                assert!(detail.starts_with(
                    "Processing for event type 'EVENT_START' failed for 1 out of 3 Switch Port events."
                ));
                assert!(detail.contains(r#""event_id":"2""#));
            }
            other => panic!("expected failure, got {:?}", other),
        }

        // Events 1 and 3 ran; event 2 never reached the switch
        assert_eq!(switch.connect_count(), 2);
        assert_eq!(switch.port_vlan("Gi1/0/1"), Some(120));
        assert_eq!(switch.port_vlan("Gi1/0/2"), None);
        assert_eq!(switch.port_vlan("Gi1/0/3"), Some(130));

        // Every event is reported, failures included
        let notifications = sink.notifications();
        assert_eq!(notifications.len(), 3);
        assert_eq!(notifications[1].message_type, "ERROR");
        assert!(notifications[1].message.contains("No VLAN name provided"));
        let logs = sink.webhook_logs();
        assert_eq!(logs[1].status_code, Some(500));
        assert!(!logs[1].success);
        assert!(!logs[1].metadata.as_ref().unwrap().contains_key("vlanName"));
    }

    #[tokio::test]
    async fn test_persist_failure_fails_the_request() {
        let switch = MockSwitch::new();
        switch.fail_at(FailurePoint::Save);
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = create_test_dispatcher(&switch, sink.clone());

        let payload = batch_payload(
            "EVENT_START",
            vec![record("1", "Gi1/0/1", "Switch Port", Some("120"))],
        );
        let result = dispatch(&dispatcher, payload).await;

        assert!(!result.is_success());
        // The live port changed even though the request failed
        assert_eq!(switch.port_vlan("Gi1/0/1"), Some(120));
        assert_eq!(sink.notifications()[0].message_type, "ERROR");
    }

    #[tokio::test]
    async fn test_batch_end_restores_default_vlan() {
        let switch = MockSwitch::new();
        switch.add_vlan(120, "prognose-alice-120", &["Gi1/0/1"]);
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = create_test_dispatcher(&switch, sink.clone());

        let payload = batch_payload(
            "EVENT_END",
            vec![record("1", "Gi1/0/1", "Switch Port", None)],
        );
        let result = dispatch(&dispatcher, payload).await;

        match result {
            DispatchResult::Success { message, .. } => {
                assert_eq!(message, "Successfully restored 1 switch port(s)");
            }
            other => panic!("expected success, got {:?}", other),
        }
        assert_eq!(switch.port_vlan("Gi1/0/1"), Some(1));
        assert_eq!(sink.webhook_logs()[0].event_type, "EVENT_END");
    }

    #[tokio::test]
    async fn test_unknown_event_type_is_a_no_op() {
        let switch = MockSwitch::new();
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = create_test_dispatcher(&switch, sink.clone());

        let payload = batch_payload(
            "EVENT_UPDATED",
            vec![record("1", "Gi1/0/1", "Switch Port", Some("120"))],
        );
        let result = dispatch(&dispatcher, payload).await;

        assert_eq!(
            result,
            DispatchResult::Success {
                message: "No action needed for event type 'EVENT_UPDATED'.".to_string(),
                user_id: None,
                timestamp: None,
            }
        );
        assert_eq!(switch.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_single_event_payload() {
        let switch = MockSwitch::new();
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = create_test_dispatcher(&switch, sink.clone());

        let payload = json!({
            "webhookId": "wh-9",
            "eventType": "EVENT_START",
            "eventId": 5,
            "resourceName": "Gi1/0/5",
            "resourceType": "Switch Port",
            "customParameters": "{\"vlan_name\": \"150\"}",
            "userId": "u-2"
        });
        let result = dispatch(&dispatcher, payload).await;

        assert!(result.is_success());
        assert_eq!(switch.port_vlan("Gi1/0/5"), Some(150));
        // No username: the user id names the VLAN
        assert_eq!(switch.vlan_name(150).as_deref(), Some("prognose-u-2-150"));
        assert_eq!(sink.notifications()[0].event_id.as_deref(), Some("5"));
    }

    #[tokio::test]
    async fn test_deletion_inside_window_restores() {
        let switch = MockSwitch::new();
        switch.add_vlan(120, "lab", &["Gi1/0/7"]);
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = create_test_dispatcher(&switch, sink.clone());

        let result = dispatch(&dispatcher, deletion_payload("Gi1/0/7", "2024-05-01T10:00:00Z")).await;

        assert_eq!(
            result,
            DispatchResult::Success {
                message: "Switch port 'Gi1/0/7' restored to default VLAN due to active reservation deletion."
                    .to_string(),
                user_id: None,
                timestamp: None,
            }
        );
        assert_eq!(switch.port_vlan("Gi1/0/7"), Some(1));

        let notification = &sink.notifications()[0];
        assert_eq!(notification.user_id, "kc-7");
        assert_eq!(notification.event_id.as_deref(), Some("99"));
        assert_eq!(sink.webhook_logs()[0].event_type, "EVENT_DELETED");
    }

    #[tokio::test]
    async fn test_deletion_at_window_end_is_a_no_op() {
        let switch = MockSwitch::new();
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = create_test_dispatcher(&switch, sink.clone());

        let result = dispatch(&dispatcher, deletion_payload("Gi1/0/7", "2024-05-01T11:00:00Z")).await;

        assert_eq!(
            result,
            DispatchResult::Success {
                message: "No action taken for switch port 'Gi1/0/7' as reservation is not currently active."
                    .to_string(),
                user_id: None,
                timestamp: None,
            }
        );
        assert_eq!(switch.connect_count(), 0);
        assert!(sink.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_deletion_restore_failure() {
        let switch = MockSwitch::new();
        switch.fail_at(FailurePoint::AssignPort);
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = create_test_dispatcher(&switch, sink.clone());

        let result = dispatch(&dispatcher, deletion_payload("Gi1/0/7", "2024-05-01T09:00:00Z")).await;

        match result {
            DispatchResult::Failure { detail, failed } => {
                assert_eq!(detail, "Failed to restore switch port 'Gi1/0/7' after EVENT_DELETED.");
                assert_eq!(failed[0].action, "restore");
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sink_failures_do_not_change_the_outcome() {
        let switch = MockSwitch::new();
        let sink = Arc::new(RecordingSink::failing());
        let dispatcher = create_test_dispatcher(&switch, sink.clone());

        let payload = batch_payload(
            "EVENT_START",
            vec![record("1", "Gi1/0/1", "Switch Port", Some("120"))],
        );
        let result = dispatch(&dispatcher, payload).await;

        assert!(result.is_success());
        // Both sinks were still attempted
        assert_eq!(sink.notifications().len(), 1);
        assert_eq!(sink.webhook_logs().len(), 1);
    }

    #[tokio::test]
    async fn test_audit_log_records_the_request_body() {
        let switch = MockSwitch::new();
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = create_test_dispatcher(&switch, sink.clone());

        let mut payload = batch_payload(
            "EVENT_START",
            vec![
                record("1", "Gi1/0/1", "Switch Port", Some("120")),
                record("2", "Gi1/0/2", "Switch Port", Some("121")),
            ],
        );
        payload["activeResources"] = json!([]);
        let body = payload.to_string();
        dispatch(&dispatcher, payload).await;

        let logs = sink.webhook_logs();
        assert_eq!(logs.len(), 2);
        for log in &logs {
            assert_eq!(log.payload, body);
            let logged: Value = serde_json::from_str(&log.payload).unwrap();
            assert_eq!(logged["eventCount"], 2);
            assert_eq!(logged["activeResources"], json!([]));
        }
    }
}
