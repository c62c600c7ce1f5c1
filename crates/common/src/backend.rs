use tokio::sync::{mpsc, oneshot};

use crate::types::{AccessoryEvent, IgnoredEvent, PermissionFlowOutcome, Resolution, RuntimePermission};

/// Sender half the accessory uses to report its callbacks.
pub type AccessoryEventSender = mpsc::UnboundedSender<AccessoryEvent>;

/// Receives exactly one outcome for a launched permission flow.
pub type PermissionFlowTicket = oneshot::Receiver<PermissionFlowOutcome>;

/// Control surface of a connected accessory handler.
pub trait AccessoryService: Send {
    /// Fire-and-forget. Failures come back later as accessory events.
    fn start_headset_service(&mut self, resolution: Resolution);
    fn stop_headset_service(&mut self);
}

/// Creates the accessory handler and binds the event sink it reports to.
pub trait AccessoryConnector: Send {
    type Service: AccessoryService;

    fn connect(&mut self, events: AccessoryEventSender) -> Self::Service;
}

/// Live query over USB state. Implementations must not cache.
pub trait AccessoryAvailability: Send + Sync {
    /// Every required accessory is attached with access granted.
    fn is_all_required_usb_connected(&self) -> bool;
    /// The headset is attached and device access has already been granted.
    fn is_usb_device_connected_and_permission_given(&self) -> bool;
}

pub trait PermissionFlowLauncher: Send {
    fn launch(&mut self, request: bool) -> PermissionFlowTicket;
}

pub trait PermissionGate {
    fn request(&self, permissions: &[RuntimePermission]);
}

pub trait ExitControl: Send {
    fn terminate(&self);
}

/// Handlers for accessory callbacks.
pub trait AccessoryEventSink {
    fn on_permission_denied(&mut self);

    fn on_ignored(&mut self, _event: IgnoredEvent) {}

    fn on_accessory_event(&mut self, event: AccessoryEvent) {
        match event {
            AccessoryEvent::PermissionDenied => self.on_permission_denied(),
            AccessoryEvent::Ignored(ignored) => self.on_ignored(ignored),
        }
    }
}
