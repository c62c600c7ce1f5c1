use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use arxlink_common::backend::{
    AccessoryAvailability, AccessoryConnector, AccessoryEventSender, AccessoryEventSink,
    AccessoryService, ExitControl, PermissionFlowLauncher, PermissionFlowTicket,
};
use arxlink_common::types::{ControllerState, IgnoredEvent, PermissionFlowOutcome, Resolution};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("controller already initialized")]
    AlreadyInitialized,
    #[error("controller terminated")]
    Terminated,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusSnapshot {
    pub state: ControllerState,
    pub since: DateTime<Utc>,
}

impl StatusSnapshot {
    fn now(state: ControllerState) -> Self {
        Self {
            state,
            since: Utc::now(),
        }
    }
}

/// Decides when to start the headset service, ask for consent, or exit.
///
/// All methods run on one sequential context and never block; a launched
/// permission flow is held as a ticket and its outcome is fed back through
/// [`on_permission_flow_result`](Self::on_permission_flow_result).
pub struct AccessoryConnectionController<C, P, L, X>
where
    C: AccessoryConnector,
{
    connector: C,
    probe: P,
    launcher: L,
    exit: X,
    resolution: Resolution,
    handler: Option<C::Service>,
    pending_flow: Option<PermissionFlowTicket>,
    /// A start went out while the current flow was pending.
    started_during_flow: bool,
    status: watch::Sender<StatusSnapshot>,
}

impl<C, P, L, X> AccessoryConnectionController<C, P, L, X>
where
    C: AccessoryConnector,
    P: AccessoryAvailability,
    L: PermissionFlowLauncher,
    X: ExitControl,
{
    pub fn new(connector: C, probe: P, launcher: L, exit: X, resolution: Resolution) -> Self {
        let (status, _) = watch::channel(StatusSnapshot::now(ControllerState::Idle));
        Self {
            connector,
            probe,
            launcher,
            exit,
            resolution,
            handler: None,
            pending_flow: None,
            started_during_flow: false,
            status,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.status.borrow().state
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.subscribe()
    }

    pub fn has_pending_flow(&self) -> bool {
        self.pending_flow.is_some()
    }

    /// Bind `events` as the accessory's callback target, then try a start.
    pub fn initialize(&mut self, events: AccessoryEventSender) -> Result<(), ControllerError> {
        if self.state() == ControllerState::Terminated {
            return Err(ControllerError::Terminated);
        }
        if self.handler.is_some() {
            return Err(ControllerError::AlreadyInitialized);
        }
        self.handler = Some(self.connector.connect(events));
        info!(target: "arxlink", event = "controller_init", resolution = %self.resolution, "accessory handler bound");
        self.attempt_start();
        Ok(())
    }

    /// Start the headset service only if every required accessory is ready.
    pub fn attempt_start(&mut self) {
        if self.terminated("attempt_start") {
            return;
        }
        if self.probe.is_all_required_usb_connected() {
            self.issue_start("readiness");
        } else {
            debug!(target: "arxlink", event = "start_skipped", "accessory not attached or not permitted");
        }
    }

    /// Host re-entry. Restarts without re-querying readiness.
    pub fn on_activation_event(&mut self) {
        if self.terminated("activation") {
            return;
        }
        self.issue_start("activation");
    }

    pub fn on_permission_flow_result(&mut self, outcome: PermissionFlowOutcome) {
        self.pending_flow = None;
        if self.terminated("permission_flow_result") {
            return;
        }
        info!(target: "arxlink", event = "permission_flow_result", ?outcome);
        match outcome {
            PermissionFlowOutcome::AllPermissionsGranted => {
                self.settle_after_flow();
                self.attempt_start();
            }
            PermissionFlowOutcome::UsbDisconnected | PermissionFlowOutcome::BackPressed => {
                self.settle_after_flow();
            }
            PermissionFlowOutcome::CloseAppRequested => {
                self.started_during_flow = false;
                info!(target: "arxlink", event = "terminate", "close requested from permission flow");
                self.set_state(ControllerState::Terminated);
                self.exit.terminate();
            }
        }
    }

    /// The flow's result channel closed without an outcome.
    pub fn on_permission_flow_abandoned(&mut self) {
        self.pending_flow = None;
        warn!(target: "arxlink", event = "permission_flow_abandoned", "permission flow ended without a result");
        if !self.terminated("permission_flow_abandoned") {
            self.settle_after_flow();
        }
    }

    /// Resolves when the in-flight permission flow reports. Pending forever
    /// while no flow is in flight, so it can sit in a `select!`.
    pub async fn next_flow_outcome(&mut self) -> Option<PermissionFlowOutcome> {
        let outcome = match self.pending_flow.as_mut() {
            Some(ticket) => ticket.await.ok(),
            None => std::future::pending().await,
        };
        self.pending_flow = None;
        outcome
    }

    /// Stop the service and release the handler. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if let Some(mut handler) = self.handler.take() {
            handler.stop_headset_service();
            info!(target: "arxlink", event = "controller_disposed", "accessory service stopped");
        }
        self.pending_flow = None;
        self.started_during_flow = false;
        if self.state() != ControllerState::Terminated {
            self.set_state(ControllerState::Idle);
        }
    }

    fn issue_start(&mut self, reason: &'static str) {
        match self.handler.as_mut() {
            Some(handler) => {
                handler.start_headset_service(self.resolution);
                info!(target: "arxlink", event = "start_issued", reason, resolution = %self.resolution);
                if self.pending_flow.is_some() {
                    self.started_during_flow = true;
                }
                self.set_state(ControllerState::Running);
            }
            None => warn!(target: "arxlink", event = "start_without_handler", reason, "controller not initialized"),
        }
    }

    /// Leave the flow: back to `Running` if the service was started meanwhile.
    fn settle_after_flow(&mut self) {
        let state = if std::mem::take(&mut self.started_during_flow) {
            ControllerState::Running
        } else {
            ControllerState::Idle
        };
        self.set_state(state);
    }

    fn terminated(&self, op: &'static str) -> bool {
        let done = self.state() == ControllerState::Terminated;
        if done {
            debug!(target: "arxlink", op, "dropping event after termination");
        }
        done
    }

    fn set_state(&self, state: ControllerState) {
        self.status.send_if_modified(|snapshot| {
            if snapshot.state == state {
                return false;
            }
            debug!(target: "arxlink", from = snapshot.state.as_str(), to = state.as_str(), "controller state");
            *snapshot = StatusSnapshot::now(state);
            true
        });
    }
}

impl<C, P, L, X> AccessoryEventSink for AccessoryConnectionController<C, P, L, X>
where
    C: AccessoryConnector,
    P: AccessoryAvailability,
    L: PermissionFlowLauncher,
    X: ExitControl,
{
    fn on_permission_denied(&mut self) {
        if self.terminated("permission_denied") {
            return;
        }
        if self.probe.is_usb_device_connected_and_permission_given() {
            debug!(target: "arxlink", event = "flow_suppressed", "stale permission denial, device already permitted");
            return;
        }
        if self.pending_flow.is_some() {
            debug!(target: "arxlink", event = "flow_suppressed", "permission flow already in flight");
            return;
        }
        info!(target: "arxlink", event = "flow_launched", "requesting accessory permission");
        self.pending_flow = Some(self.launcher.launch(true));
        self.started_during_flow = false;
        self.set_state(ControllerState::AwaitingPermission);
    }

    fn on_ignored(&mut self, event: IgnoredEvent) {
        match &event {
            IgnoredEvent::DeviceConnectionError(error) => {
                warn!(target: "arxlink", event = event.name(), %error, "accessory reported an error")
            }
            IgnoredEvent::Disconnect => {
                info!(target: "arxlink", event = event.name(), "accessory disconnected, waiting for reattach")
            }
            _ => trace!(target: "arxlink", event = event.name(), "ignored accessory event"),
        }
    }
}
