//! Integration tests for the SSH switch client
//!
//! These tests require a reachable lab switch.
//! Set SWITCH_HOST, SWITCH_USERNAME and SWITCH_PASSWORD to run; SWITCH_TEST_PORT
//! names a spare access port that may be reconfigured.

use std::sync::Arc;
use std::time::Duration;
use switch_client::{
    ConnectionSettings, DeviceProfile, ManagerSettings, SessionFactory, SshSessionFactory,
    SwitchPortManager, commands::SHOW_VLAN_BRIEF, parse_vlan_brief,
};

fn factory_from_env() -> SshSessionFactory {
    let host = std::env::var("SWITCH_HOST").expect("SWITCH_HOST environment variable must be set");
    let username =
        std::env::var("SWITCH_USERNAME").expect("SWITCH_USERNAME environment variable must be set");
    let password =
        std::env::var("SWITCH_PASSWORD").expect("SWITCH_PASSWORD environment variable must be set");
    let profile = std::env::var("SWITCH_DEVICE_TYPE")
        .unwrap_or_else(|_| "cisco_ios".to_string())
        .parse::<DeviceProfile>()
        .expect("Unsupported SWITCH_DEVICE_TYPE");

    SshSessionFactory::new(ConnectionSettings {
        host,
        port: 22,
        username,
        password,
        enable_secret: std::env::var("SWITCH_ENABLE_SECRET").ok(),
        profile,
        timeout: Duration::from_secs(30),
    })
}

#[tokio::test]
#[ignore] // Requires a reachable switch
async fn test_connect_and_list_vlans() {
    let factory = factory_from_env();

    let mut session = factory.connect().await.expect("Failed to connect");
    session.enable().await.expect("Failed to enter privileged mode");
    let output = session
        .send_command(SHOW_VLAN_BRIEF)
        .await
        .expect("Failed to list VLANs");
    session.disconnect().await.expect("Failed to disconnect");

    let vlans = parse_vlan_brief(&output);
    assert!(vlans.iter().any(|vlan| vlan.id == 1), "VLAN 1 should always exist");
    println!("Found {} VLANs", vlans.len());
}

#[tokio::test]
#[ignore]
async fn test_configure_and_restore_port() {
    let interface =
        std::env::var("SWITCH_TEST_PORT").expect("SWITCH_TEST_PORT environment variable must be set");
    let manager = SwitchPortManager::new(Arc::new(factory_from_env()), ManagerSettings::default());

    let configured = manager.configure_switch_port(&interface, "3999", "integration").await;
    assert!(configured.success, "{}", configured.message);
    assert!(manager.list_interfaces_for_vlan(3999).await.contains(&interface));

    let restored = manager.restore_port_to_default_vlan(&interface).await;
    assert!(restored.success, "{}", restored.message);
}
