use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use arxlink_common::backend::{AccessoryConnector, AccessoryEventSender, AccessoryService};
use arxlink_common::types::{AccessoryEvent, IgnoredEvent, Resolution};

use crate::config::ServiceConfig;

/// Hands out [`CommandAccessoryService`] handles that run the capture helper.
pub struct CommandConnector {
    config: ServiceConfig,
}

impl CommandConnector {
    pub fn new(config: ServiceConfig) -> Self {
        Self { config }
    }
}

impl AccessoryConnector for CommandConnector {
    type Service = CommandAccessoryService;

    fn connect(&mut self, events: AccessoryEventSender) -> CommandAccessoryService {
        CommandAccessoryService {
            config: self.config.clone(),
            events,
            running: Arc::new(AtomicBool::new(false)),
            kill: None,
        }
    }
}

/// Headset capture service backed by a child process.
///
/// Starting while the helper is alive is a no-op. The helper's exit is
/// reported back on the event sink.
pub struct CommandAccessoryService {
    config: ServiceConfig,
    events: AccessoryEventSender,
    running: Arc<AtomicBool>,
    kill: Option<oneshot::Sender<()>>,
}

impl CommandAccessoryService {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl AccessoryService for CommandAccessoryService {
    fn start_headset_service(&mut self, resolution: Resolution) {
        if self.is_running() {
            debug!(target: "arxlink", event = "service_already_running", "capture helper alive, start ignored");
            return;
        }
        let spawned = Command::new(&self.config.command)
            .args(&self.config.args)
            .arg("--resolution")
            .arg(resolution.to_string())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                error!(target: "arxlink", command = %self.config.command, error = %e, "failed to spawn capture helper");
                let _ = self
                    .events
                    .send(IgnoredEvent::DeviceConnectionError(format!("spawn {}: {}", self.config.command, e)).into());
                return;
            }
        };
        info!(target: "arxlink", event = "service_started", pid = ?child.id(), %resolution);

        let (kill_tx, kill_rx) = oneshot::channel();
        self.kill = Some(kill_tx);
        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let events = self.events.clone();
        let denied_code = self.config.permission_denied_exit_code;
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    running.store(false, Ordering::SeqCst);
                    let event = match status {
                        Ok(status) => classify_exit(status, denied_code),
                        Err(e) => IgnoredEvent::DeviceConnectionError(e.to_string()).into(),
                    };
                    let _ = events.send(event);
                }
                _ = kill_rx => {
                    if let Err(e) = child.kill().await {
                        error!(target: "arxlink", error = %e, "failed to kill capture helper");
                    }
                    running.store(false, Ordering::SeqCst);
                }
            }
        });
    }

    fn stop_headset_service(&mut self) {
        if let Some(kill) = self.kill.take() {
            let _ = kill.send(());
            info!(target: "arxlink", event = "service_stopped");
        }
    }
}

fn classify_exit(status: ExitStatus, permission_denied_code: i32) -> AccessoryEvent {
    match status.code() {
        Some(code) if code == permission_denied_code => AccessoryEvent::PermissionDenied,
        Some(0) => IgnoredEvent::Disconnect.into(),
        _ => IgnoredEvent::DeviceConnectionError(format!("capture helper exited: {}", status)).into(),
    }
}
