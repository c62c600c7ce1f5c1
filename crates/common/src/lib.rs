pub mod backend;
pub mod types;

pub const APP_ID: &str = "arxlink";

/// Well-known D-Bus coordinates of the host.
pub const DBUS_NAME: &str = "org.arxlink.Host";
pub const DBUS_PATH: &str = "/org/arxlink/Host";
pub const DBUS_INTERFACE: &str = "org.arxlink.Host";
