use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use arxlink_common::backend::{
    AccessoryAvailability, AccessoryConnector, AccessoryEventSender, AccessoryService, ExitControl,
    PermissionFlowLauncher, PermissionFlowTicket,
};
use arxlink_common::types::{AccessoryEvent, PermissionFlowOutcome, Resolution};
use tokio::sync::oneshot;

/// Everything the mock collaborators observed.
#[derive(Debug, Default)]
pub struct Recorder {
    pub starts: Vec<Resolution>,
    pub stops: usize,
    pub connects: usize,
    pub launches: Vec<bool>,
    pub terminations: usize,
    pending: Vec<oneshot::Sender<PermissionFlowOutcome>>,
    events: Option<AccessoryEventSender>,
}

/// Shared handle to a scripted accessory, usb probe, permission flow and exit control.
#[derive(Clone, Default)]
pub struct MockAccessory {
    recorder: Arc<Mutex<Recorder>>,
    all_connected: Arc<AtomicBool>,
    headset_permitted: Arc<AtomicBool>,
}

impl MockAccessory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device attached and permitted.
    pub fn new_ready() -> Self {
        let mock = Self::default();
        mock.set_ready(true);
        mock
    }

    pub fn set_ready(&self, ready: bool) {
        self.all_connected.store(ready, Ordering::SeqCst);
        self.headset_permitted.store(ready, Ordering::SeqCst);
    }

    pub fn set_all_connected(&self, value: bool) {
        self.all_connected.store(value, Ordering::SeqCst);
    }

    pub fn set_headset_permitted(&self, value: bool) {
        self.headset_permitted.store(value, Ordering::SeqCst);
    }

    pub fn starts(&self) -> Vec<Resolution> {
        self.recorder.lock().unwrap().starts.clone()
    }

    pub fn stops(&self) -> usize {
        self.recorder.lock().unwrap().stops
    }

    pub fn connects(&self) -> usize {
        self.recorder.lock().unwrap().connects
    }

    pub fn launches(&self) -> Vec<bool> {
        self.recorder.lock().unwrap().launches.clone()
    }

    pub fn terminations(&self) -> usize {
        self.recorder.lock().unwrap().terminations
    }

    /// Resolve the oldest pending permission flow. Returns false if none is pending.
    pub fn resolve_flow(&self, outcome: PermissionFlowOutcome) -> bool {
        let mut rec = self.recorder.lock().unwrap();
        if rec.pending.is_empty() {
            return false;
        }
        let tx = rec.pending.remove(0);
        tx.send(outcome).is_ok()
    }

    /// Drop the oldest pending flow without an outcome, as a crashed agent would.
    pub fn abandon_flow(&self) -> bool {
        let mut rec = self.recorder.lock().unwrap();
        if rec.pending.is_empty() {
            return false;
        }
        drop(rec.pending.remove(0));
        true
    }

    /// Deliver an accessory callback through the sink bound at connect time.
    pub fn emit(&self, event: AccessoryEvent) -> bool {
        match &self.recorder.lock().unwrap().events {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

pub struct MockService {
    recorder: Arc<Mutex<Recorder>>,
}

impl AccessoryService for MockService {
    fn start_headset_service(&mut self, resolution: Resolution) {
        self.recorder.lock().unwrap().starts.push(resolution);
    }

    fn stop_headset_service(&mut self) {
        self.recorder.lock().unwrap().stops += 1;
    }
}

impl AccessoryConnector for MockAccessory {
    type Service = MockService;

    fn connect(&mut self, events: AccessoryEventSender) -> MockService {
        let mut rec = self.recorder.lock().unwrap();
        rec.connects += 1;
        rec.events = Some(events);
        MockService {
            recorder: self.recorder.clone(),
        }
    }
}

impl AccessoryAvailability for MockAccessory {
    fn is_all_required_usb_connected(&self) -> bool {
        self.all_connected.load(Ordering::SeqCst)
    }

    fn is_usb_device_connected_and_permission_given(&self) -> bool {
        self.headset_permitted.load(Ordering::SeqCst)
    }
}

impl PermissionFlowLauncher for MockAccessory {
    fn launch(&mut self, request: bool) -> PermissionFlowTicket {
        let (tx, rx) = oneshot::channel();
        let mut rec = self.recorder.lock().unwrap();
        rec.launches.push(request);
        rec.pending.push(tx);
        rx
    }
}

impl ExitControl for MockAccessory {
    fn terminate(&self) {
        self.recorder.lock().unwrap().terminations += 1;
    }
}
