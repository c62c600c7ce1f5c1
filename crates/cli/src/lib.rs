use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "arxlinkctl", version, about = "arxlink headset host control")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Commands {
    /// List USB devices visible in sysfs
    Devices,
    /// Show readiness of the configured headset
    Probe,
    /// Show the running host's status
    Status,
    /// Re-enter the running host and restart the headset service
    Activate,
    /// Ask the running host to exit
    Quit,
}
