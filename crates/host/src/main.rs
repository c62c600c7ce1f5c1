use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{error, info};

use arxlink_backend_sysfs::SysfsProbe;
use arxlink_common::backend::PermissionGate;
use arxlink_common::types::RuntimePermission;
use arxlink_common::{DBUS_NAME, DBUS_PATH};
use arxlink_host::config::HostConfig;
use arxlink_host::dbus::{forward_state_changes, HostInterface};
use arxlink_host::gate::DeviceNodePermissionGate;
use arxlink_host::polkit::PolkitPermissionFlow;
use arxlink_host::service::CommandConnector;
use arxlink_host::session::{PeerConnectionFactory, SessionManager, SignalingClient};
use arxlink_host::shutdown::{self, ShutdownSignal};
use arxlink_host::{run_event_loop, AccessoryConnectionController, HostEvent};

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    info!(target: "arxlink", event = "host_start", "arxlink-host starting");

    let config = HostConfig::load();
    DeviceNodePermissionGate::default().request(&[RuntimePermission::Camera, RuntimePermission::Microphone]);

    let session = SessionManager::new(
        SignalingClient::new(config.signaling.url.as_str()),
        PeerConnectionFactory::default(),
    );

    let probe = SysfsProbe::new(config.required_accessories());
    let (shutdown_signal, mut shutdown_rx) = ShutdownSignal::new();
    let (host_tx, host_rx) = mpsc::unbounded_channel();

    // polkit lives on the system bus, the host surface on the session bus
    let system_bus = zbus::Connection::system().await?;
    let flow = PolkitPermissionFlow::new(system_bus, config.permission.action_id.as_str(), probe.clone())
        .with_grant_command(config.permission.grant_command.clone());
    let controller = AccessoryConnectionController::new(
        CommandConnector::new(config.service.clone()),
        probe.clone(),
        flow,
        shutdown_signal.clone(),
        config.accessory.resolution,
    );
    let status_rx = controller.subscribe();

    let iface = HostInterface::new(
        host_tx.clone(),
        status_rx.clone(),
        session.session_state(),
        Arc::new(probe.clone()),
        shutdown_signal.clone(),
    );
    let session_bus = zbus::ConnectionBuilder::session()?
        .name(DBUS_NAME)?
        .serve_at(DBUS_PATH, iface)?
        .build()
        .await?;
    tokio::spawn(forward_state_changes(session_bus.clone(), status_rx));

    #[cfg(feature = "udev-monitor")]
    {
        if let Some(headset) = probe.required().first().cloned() {
            arxlink_host::udev_monitor::spawn_udev_listener(headset, host_tx.clone())?;
        }
    }

    let event_loop = tokio::spawn(run_event_loop(controller, host_rx));

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("received ctrl_c, exiting");
        }
        _ = shutdown::requested(&mut shutdown_rx) => {
            info!(target: "arxlink", event = "exit_requested", "terminating host");
        }
    }

    let _ = host_tx.send(HostEvent::Shutdown);
    match event_loop.await? {
        Ok(state) => info!(target: "arxlink", event = "host_stop", final_state = state.as_str()),
        Err(e) => error!(error = %e, "event loop failed"),
    }
    drop(session);
    Ok(())
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
