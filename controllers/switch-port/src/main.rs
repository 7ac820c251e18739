//! Switch Port Webhook
//!
//! Receives reservation lifecycle webhooks for switch port resources and
//! drives the switch over SSH:
//! - EVENT_START: place the port into the VLAN named in the reservation
//! - EVENT_END: restore the port to the default VLAN
//! - EVENT_DELETED: restore the port if the reservation was still running
//!
//! Every outcome is reported to the notification and webhook-log services.

mod config;
mod dispatcher;
mod error;
mod resolver;
mod server;
mod window;

#[cfg(test)]
mod dispatcher_test;
#[cfg(test)]
mod test_utils;

use crate::config::AppConfig;
use crate::dispatcher::Dispatcher;
use crate::error::ControllerError;
use crate::resolver::Resolver;
use crate::server::AppState;
use std::sync::Arc;
use switch_client::{SshSessionFactory, SwitchPortManager};
use tracing::info;
use tracing_subscriber::EnvFilter;
use webhook_reporter::HttpReporter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    let config = AppConfig::from_env()?;

    // RUST_LOG wins over LOG_LEVEL when both are set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Switch Port Webhook");
    config.log_summary();

    let factory = SshSessionFactory::new(config.connection.clone());
    let manager = SwitchPortManager::new(Arc::new(factory), config.manager.clone());
    let reporter = HttpReporter::new(config.reporter.clone())?;
    let dispatcher = Dispatcher::new(
        Arc::new(manager),
        Arc::new(reporter),
        Resolver::new(config.interface_strategy.clone()),
    );

    let state = AppState {
        dispatcher: Arc::new(dispatcher),
        webhook_secret: config.webhook_secret.clone(),
        service_name: config.service_name.clone(),
    };
    let app = server::router(state, config.disable_healthz_logs);

    server::serve(app, config.port)
        .await
        .map_err(|e| ControllerError::Server(format!("{:#}", e)))?;

    Ok(())
}
