//! ReportingSink trait for mocking
//!
//! The dispatcher only depends on this trait; tests substitute a recording
//! implementation for the HTTP reporter.

use crate::error::ReporterError;
use crate::models::{NotificationRequest, WebhookLogRequest};

/// Destination for switch port outcome reports
///
/// Failures are returned for logging only; callers never let them change the
/// outcome they report.
#[async_trait::async_trait]
pub trait ReportingSink: Send + Sync {
    /// Send a user notification
    async fn send_notification(&self, request: &NotificationRequest) -> Result<(), ReporterError>;

    /// Record a processed webhook in the audit log
    async fn send_webhook_log(&self, request: &WebhookLogRequest) -> Result<(), ReporterError>;
}
