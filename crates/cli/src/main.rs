use anyhow::Result;
use clap::Parser;
use serde_json::json;
use zbus::Connection;

use arxlink_backend_sysfs::SysfsProbe;
use arxlink_common::backend::AccessoryAvailability;
use arxlink_common::{DBUS_INTERFACE, DBUS_NAME, DBUS_PATH};
use arxlink_host::config::HostConfig;
use arxlinkctl::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = HostConfig::load();
    match cli.command {
        Commands::Devices => {
            let probe = SysfsProbe::new(config.required_accessories());
            let devices = probe.list_devices()?;
            println!("{}", serde_json::to_string_pretty(&devices)?);
        }
        Commands::Probe => {
            let probe = SysfsProbe::new(config.required_accessories());
            let report = json!({
                "required": probe.required(),
                "headset_attached": probe.headset_attached(),
                "headset_permitted": probe.is_usb_device_connected_and_permission_given(),
                "all_required_ready": probe.is_all_required_usb_connected(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Status | Commands::Activate | Commands::Quit => {
            let conn = Connection::session().await?;
            let proxy = zbus::Proxy::new(&conn, DBUS_NAME, DBUS_PATH, DBUS_INTERFACE).await?;
            match cli.command {
                Commands::Status => {
                    let status: String = proxy.call("Status", &()).await?;
                    let value: serde_json::Value = serde_json::from_str(&status)?;
                    println!("{}", serde_json::to_string_pretty(&value)?);
                }
                Commands::Activate => report(proxy.call("Activate", &()).await?),
                _ => report(proxy.call("Quit", &()).await?),
            }
        }
    }
    Ok(())
}

fn report(ok: bool) {
    if ok {
        println!("OK");
    } else {
        eprintln!("FAIL");
        std::process::exit(1);
    }
}
