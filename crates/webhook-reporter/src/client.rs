//! HTTP reporter
//!
//! Posts notification and audit-log documents with reqwest. Each sink has its
//! own endpoint and timeout; an unset endpoint turns that sink into a no-op.

use crate::error::ReporterError;
use crate::models::{NotificationRequest, WebhookLogRequest};
use crate::reporter_trait::ReportingSink;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info};
use webhook_core::{SIGNATURE_HEADER, compute_signature};

/// One outbound sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkEndpoint {
    pub url: String,
    pub timeout: Duration,
}

/// Reporter configuration
#[derive(Debug, Clone, Default)]
pub struct ReporterConfig {
    pub notification: Option<SinkEndpoint>,
    pub webhook_log: Option<SinkEndpoint>,
    /// Shared secret used to sign request bodies
    pub secret: Option<String>,
}

/// Reporter that posts to the configured HTTP sinks
#[derive(Debug, Clone)]
pub struct HttpReporter {
    client: Client,
    config: ReporterConfig,
}

impl HttpReporter {
    /// Create a new reporter
    pub fn new(config: ReporterConfig) -> Result<Self, ReporterError> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    /// Create a reporter on an existing reqwest client
    pub fn from_reqwest(client: Client, config: ReporterConfig) -> Self {
        Self { client, config }
    }

    /// Serialize once, sign the exact bytes, and post them
    async fn post_signed<T: Serialize + Sync>(
        &self,
        endpoint: &SinkEndpoint,
        body: &T,
    ) -> Result<(), ReporterError> {
        let bytes = serde_json::to_vec(body)?;

        let mut request = self
            .client
            .post(&endpoint.url)
            .timeout(endpoint.timeout)
            .header(CONTENT_TYPE, "application/json");

        if let Some(secret) = self.config.secret.as_deref().filter(|s| !s.is_empty()) {
            let signature = compute_signature(secret, &bytes)
                .map_err(|e| ReporterError::Signature(e.to_string()))?;
            debug!("Generated signature for payload: {}", signature);
            request = request.header(SIGNATURE_HEADER, signature);
        }

        let response = request.body(bytes).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ReporterError::Status {
                endpoint: endpoint.url.clone(),
                status: status.as_u16(),
            });
        }

        debug!("Successfully sent request to {}: {}", endpoint.url, status);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ReportingSink for HttpReporter {
    async fn send_notification(&self, request: &NotificationRequest) -> Result<(), ReporterError> {
        let Some(endpoint) = &self.config.notification else {
            debug!("No notification endpoint configured, skipping notification");
            return Ok(());
        };

        info!(
            "Sending switch port notification ({}) for webhook {}",
            request.message_type, request.webhook_id
        );
        self.post_signed(endpoint, request).await.inspect_err(|e| {
            error!("Error sending notification to {}: {}", endpoint.url, e);
        })
    }

    async fn send_webhook_log(&self, request: &WebhookLogRequest) -> Result<(), ReporterError> {
        let Some(endpoint) = &self.config.webhook_log else {
            debug!("No webhook log endpoint configured, skipping webhook log");
            return Ok(());
        };

        info!(
            "Sending webhook log for webhook {} (success: {})",
            request.webhook_id, request.success
        );
        self.post_signed(endpoint, request).await.inspect_err(|e| {
            error!("Error sending webhook log to {}: {}", endpoint.url, e);
        })
    }
}
