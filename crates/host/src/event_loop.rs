use tokio::sync::mpsc;
use tracing::info;

use arxlink_common::backend::{
    AccessoryAvailability, AccessoryConnector, AccessoryEventSink, ExitControl, PermissionFlowLauncher,
};
use arxlink_common::types::{AccessoryEvent, ControllerState};

use crate::controller::{AccessoryConnectionController, ControllerError};

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// The host was re-entered while running, or the OS saw the accessory attach.
    Activation,
    Accessory(AccessoryEvent),
    Shutdown,
}

/// Owns the controller and feeds it host events, accessory callbacks and
/// permission flow outcomes in arrival order. Returns the final state.
pub async fn run_event_loop<C, P, L, X>(
    mut controller: AccessoryConnectionController<C, P, L, X>,
    mut host_events: mpsc::UnboundedReceiver<HostEvent>,
) -> Result<ControllerState, ControllerError>
where
    C: AccessoryConnector,
    P: AccessoryAvailability,
    L: PermissionFlowLauncher,
    X: ExitControl,
{
    let (accessory_tx, mut accessory_rx) = mpsc::unbounded_channel();
    controller.initialize(accessory_tx)?;

    while controller.state() != ControllerState::Terminated {
        tokio::select! {
            biased;

            event = host_events.recv() => match event {
                Some(HostEvent::Activation) => controller.on_activation_event(),
                Some(HostEvent::Accessory(event)) => controller.on_accessory_event(event),
                Some(HostEvent::Shutdown) | None => {
                    info!(target: "arxlink", event = "event_loop_shutdown", "host shutting down");
                    break;
                }
            },
            Some(event) = accessory_rx.recv() => controller.on_accessory_event(event),
            outcome = controller.next_flow_outcome() => match outcome {
                Some(outcome) => controller.on_permission_flow_result(outcome),
                None => controller.on_permission_flow_abandoned(),
            },
        }
    }

    let state = controller.state();
    controller.dispose();
    Ok(state)
}
