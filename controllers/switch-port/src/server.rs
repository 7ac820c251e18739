//! HTTP surface
//!
//! `POST /webhook` verifies the signature over the raw body, decodes the
//! payload, and hands it to the dispatcher. `GET /healthz` reports liveness.

use crate::dispatcher::{DispatchResult, Dispatcher};
use anyhow::Context;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Map, Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use webhook_core::{SIGNATURE_HEADER, WebhookEvent, timestamp::format_timestamp, verify_signature};

/// Shared state of the webhook handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub webhook_secret: Option<String>,
    pub service_name: String,
}

/// Build the router
///
/// With `disable_healthz_logs` the health route sits outside the trace layer
/// so probes do not show up in the access log.
pub fn router(state: AppState, disable_healthz_logs: bool) -> Router {
    let webhook = Router::new().route("/webhook", post(handle_webhook));
    let health = Router::new().route("/healthz", get(health_check));

    let app = if disable_healthz_logs {
        webhook.layer(TraceLayer::new_for_http()).merge(health)
    } else {
        webhook.merge(health).layer(TraceLayer::new_for_http())
    };

    app.with_state(state)
}

/// Serve `app` on all interfaces until Ctrl-C
pub async fn serve(app: Router, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Switch port webhook listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Switch port webhook stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn handle_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    info!("Received webhook request. Attempting to parse payload.");

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    if !verify_signature(&body, signature, state.webhook_secret.as_deref()) {
        warn!("Webhook signature verification failed");
        return detail(StatusCode::UNAUTHORIZED, "Invalid webhook signature");
    }

    let event = match WebhookEvent::parse(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("Rejecting webhook payload: {}", e);
            return detail(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string());
        }
    };

    let raw_payload = String::from_utf8_lossy(&body);
    let result = state.dispatcher.dispatch(&event, &raw_payload).await;
    info!(
        "Webhook {} ({}) processed, success: {}",
        event.webhook_id(),
        event.event_type(),
        result.is_success()
    );

    match result {
        DispatchResult::Success {
            message,
            user_id,
            timestamp,
        } => {
            let mut response = Map::new();
            response.insert("status".to_string(), Value::from("success"));
            response.insert("message".to_string(), Value::from(message));
            if let Some(user_id) = user_id {
                response.insert("userId".to_string(), Value::from(user_id));
            }
            if let Some(timestamp) = timestamp {
                response.insert("timestamp".to_string(), Value::from(format_timestamp(&timestamp)));
            }
            (StatusCode::OK, Json(Value::Object(response))).into_response()
        }
        DispatchResult::Failure { detail: text, .. } => detail(StatusCode::INTERNAL_SERVER_ERROR, &text),
    }
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "status": "healthy", "service": state.service_name }))
}

fn detail(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use switch_client::{FailurePoint, MockSwitch};
    use tower::ServiceExt;
    use webhook_core::compute_signature;

    const SECRET: &str = "s3cr3t";

    fn app(switch: &MockSwitch, secret: Option<&str>) -> Router {
        let sink = Arc::new(RecordingSink::default());
        let state = AppState {
            dispatcher: Arc::new(create_test_dispatcher(switch, sink)),
            webhook_secret: secret.map(str::to_string),
            service_name: "switch-port-webhook".to_string(),
        };
        router(state, true)
    }

    fn post_webhook(body: &str, signature: Option<String>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn start_body(vlan: Option<&str>) -> String {
        batch_payload("EVENT_START", vec![record("1", "Gi1/0/1", "Switch Port", vlan)]).to_string()
    }

    #[tokio::test]
    async fn test_healthz() {
        let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
        let (status, body) = send(app(&MockSwitch::new(), None), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "healthy", "service": "switch-port-webhook" }));
    }

    #[tokio::test]
    async fn test_signed_webhook_is_processed() {
        let switch = MockSwitch::new();
        let body = start_body(Some("120"));
        let signature = compute_signature(SECRET, body.as_bytes()).unwrap();

        let (status, response) = send(app(&switch, Some(SECRET)), post_webhook(&body, Some(signature))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["status"], "success");
        assert_eq!(response["message"], "Successfully configured 1 switch port(s)");
        assert_eq!(response["userId"], "u-1");
        assert!(response["timestamp"].is_string());
        assert_eq!(switch.port_vlan("Gi1/0/1"), Some(120));
    }

    #[tokio::test]
    async fn test_bad_signature_is_rejected_before_any_session() {
        let switch = MockSwitch::new();
        let body = start_body(Some("120"));
        // Signed over different bytes
        let signature = compute_signature(SECRET, body.replace("120", "121").as_bytes()).unwrap();

        for signature in [Some(signature), None] {
            let (status, response) =
                send(app(&switch, Some(SECRET)), post_webhook(&body, signature)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(response, json!({ "detail": "Invalid webhook signature" }));
        }
        assert_eq!(switch.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_unsigned_accepted_without_secret() {
        let switch = MockSwitch::new();
        let (status, _) = send(app(&switch, None), post_webhook(&start_body(Some("120")), None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_unprocessable() {
        let switch = MockSwitch::new();
        for body in ["not json", r#"{"events": []}"#, r#"{"eventType": "EVENT_DELETED", "data": {}}"#] {
            let (status, response) = send(app(&switch, None), post_webhook(body, None)).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", body);
            assert!(response["detail"].is_string());
        }
        assert_eq!(switch.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_event_returns_500_with_detail() {
        let switch = MockSwitch::new();
        switch.fail_at(FailurePoint::Authentication);

        let (status, response) =
            send(app(&switch, None), post_webhook(&start_body(Some("120")), None)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let detail = response["detail"].as_str().unwrap();
        assert!(detail.contains("failed for 1 out of 1 Switch Port events"));
        assert!(detail.contains(r#""resource_name":"Gi1/0/1""#));
        assert!(detail.contains(r#""action":"configure""#));
    }
}
