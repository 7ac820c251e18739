//! Webhook Reporter
//!
//! Best-effort senders for the two outcome sinks of the switch port webhook:
//! - the notification service, which tells the user what happened
//! - the webhook audit log, which records every processed delivery
//!
//! Request bodies are serialized once and, when a shared secret is configured,
//! signed with the same HMAC-SHA256 scheme used for inbound webhooks.
//! A sink without a configured endpoint is skipped.

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod reporter_trait;

pub use client::{HttpReporter, ReporterConfig, SinkEndpoint};
pub use error::ReporterError;
pub use models::*;
pub use reporter_trait::ReportingSink;
