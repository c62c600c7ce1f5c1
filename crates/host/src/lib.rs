pub mod config;
pub mod controller;
pub mod dbus;
pub mod event_loop;
pub mod gate;
pub mod polkit;
pub mod service;
pub mod session;
pub mod shutdown;
#[cfg(feature = "udev-monitor")]
pub mod udev_monitor;

pub use controller::{AccessoryConnectionController, ControllerError, StatusSnapshot};
pub use event_loop::{run_event_loop, HostEvent};
