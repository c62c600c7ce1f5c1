use std::io;
use std::os::unix::io::AsRawFd;
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use arxlink_common::types::{IgnoredEvent, RequiredAccessory};

use crate::event_loop::HostEvent;

/// Watch USB attach/detach on a dedicated thread and forward headset events.
pub fn spawn_udev_listener(
    headset: RequiredAccessory,
    events: mpsc::UnboundedSender<HostEvent>,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("udev-monitor".into())
        .spawn(move || {
            if let Err(e) = run_udev_listener(&headset, &events) {
                error!(error = ?e, "udev listener exited with error");
            }
        })
}

fn run_udev_listener(headset: &RequiredAccessory, events: &mpsc::UnboundedSender<HostEvent>) -> io::Result<()> {
    let socket = udev::MonitorBuilder::new()?
        .match_subsystem_devtype("usb", "usb_device")?
        .listen()?;
    info!(target: "arxlink", event = "udev_listening", vendor = %headset.vendor_id, product = %headset.product_id);

    let mut pollfd = libc::pollfd {
        fd: socket.as_raw_fd(),
        events: libc::POLLIN,
        revents: 0,
    };
    loop {
        let rc = unsafe { libc::poll(&mut pollfd, 1, -1) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        for event in socket.iter() {
            let action = match event.event_type() {
                udev::EventType::Add => "add",
                udev::EventType::Bind => "bind",
                udev::EventType::Remove => "remove",
                udev::EventType::Unbind => "unbind",
                _ => continue,
            };
            let vendor = event
                .property_value("ID_VENDOR_ID")
                .and_then(|s| s.to_str())
                .unwrap_or("");
            let product = event
                .property_value("ID_MODEL_ID")
                .and_then(|s| s.to_str())
                .unwrap_or("");
            if let Some(host_event) = classify(action, vendor, product, headset) {
                debug!(target: "arxlink", action, vendor, product, "headset udev event");
                if events.send(host_event).is_err() {
                    // event loop is gone
                    return Ok(());
                }
            }
        }
    }
}

fn classify(action: &str, vendor: &str, product: &str, headset: &RequiredAccessory) -> Option<HostEvent> {
    if !headset.matches(vendor, product) {
        return None;
    }
    match action {
        "add" | "bind" => Some(HostEvent::Activation),
        "remove" | "unbind" => Some(HostEvent::Accessory(IgnoredEvent::Disconnect.into())),
        _ => None,
    }
}
