use clap::{CommandFactory, Parser};
use arxlinkctl::{Cli, Commands};

#[test]
fn test_cli_parsing_devices() {
    let cli = Cli::parse_from(["arxlinkctl", "devices"]);
    assert_eq!(cli.command, Commands::Devices);
}

#[test]
fn test_cli_parsing_activate() {
    let cli = Cli::parse_from(["arxlinkctl", "activate"]);
    assert_eq!(cli.command, Commands::Activate);
}

#[test]
fn test_cli_rejects_unknown() {
    assert!(Cli::try_parse_from(["arxlinkctl", "allow", "2-1"]).is_err());
}

#[test]
fn test_cli_command_help() {
    Cli::command().debug_assert();
}
