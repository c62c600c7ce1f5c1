use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use zbus::{interface, Connection, SignalContext};

use arxlink_common::backend::{AccessoryAvailability, ExitControl};
use arxlink_common::types::{ControllerState, SessionState};
use arxlink_common::DBUS_PATH;

use crate::controller::StatusSnapshot;
use crate::event_loop::HostEvent;
use crate::shutdown::ShutdownSignal;

#[derive(Debug, Clone, Serialize)]
pub struct HostStatus {
    pub controller: ControllerState,
    pub since: DateTime<Utc>,
    pub ready: bool,
    pub headset_permitted: bool,
    pub session: SessionState,
}

/// `org.arxlink.Host` on the session bus: host re-entry and status.
pub struct HostInterface {
    events: mpsc::UnboundedSender<HostEvent>,
    status: watch::Receiver<StatusSnapshot>,
    session: watch::Receiver<SessionState>,
    probe: Arc<dyn AccessoryAvailability>,
    shutdown: ShutdownSignal,
}

impl HostInterface {
    pub fn new(
        events: mpsc::UnboundedSender<HostEvent>,
        status: watch::Receiver<StatusSnapshot>,
        session: watch::Receiver<SessionState>,
        probe: Arc<dyn AccessoryAvailability>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            events,
            status,
            session,
            probe,
            shutdown,
        }
    }

    pub fn snapshot(&self) -> HostStatus {
        let status = *self.status.borrow();
        HostStatus {
            controller: status.state,
            since: status.since,
            ready: self.probe.is_all_required_usb_connected(),
            headset_permitted: self.probe.is_usb_device_connected_and_permission_given(),
            session: *self.session.borrow(),
        }
    }
}

#[interface(name = "org.arxlink.Host")]
impl HostInterface {
    /// Re-enter the running host; the accessory service is restarted.
    async fn activate(&self) -> bool {
        info!(target: "arxlink", event = "dbus_activate");
        self.events.send(HostEvent::Activation).is_ok()
    }

    async fn status(&self) -> String {
        render_status(&self.snapshot())
    }

    async fn quit(&self) -> bool {
        info!(target: "arxlink", event = "dbus_quit");
        self.shutdown.terminate();
        true
    }

    #[zbus(signal)]
    async fn state_changed(ctxt: &SignalContext<'_>, state: &str) -> zbus::Result<()>;
}

/// JSON body of the `Status` reply. Empty when serialization fails.
fn render_status<T: Serialize>(status: &T) -> String {
    match serde_json::to_string(status) {
        Ok(json) => json,
        Err(e) => {
            warn!(target: "arxlink", event = "status_serialize_failed", error = %e, "failed to serialize status");
            String::new()
        }
    }
}

/// Emit `StateChanged` for every controller transition until the controller goes away.
pub async fn forward_state_changes(connection: Connection, mut status: watch::Receiver<StatusSnapshot>) {
    while status.changed().await.is_ok() {
        let state = status.borrow_and_update().state;
        let ctxt = match SignalContext::new(&connection, DBUS_PATH) {
            Ok(ctxt) => ctxt,
            Err(e) => {
                warn!(error = %e, "invalid signal context");
                return;
            }
        };
        if let Err(e) = HostInterface::state_changed(&ctxt, state.as_str()).await {
            warn!(error = %e, "failed to emit StateChanged");
        }
    }
}
