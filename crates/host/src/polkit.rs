use std::collections::HashMap;
use std::path::Path;

use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use zbus::zvariant::Value;
use zbus::Connection;

use arxlink_backend_sysfs::SysfsProbe;
use arxlink_common::backend::{AccessoryAvailability, PermissionFlowLauncher, PermissionFlowTicket};
use arxlink_common::types::PermissionFlowOutcome;

/// polkit CheckAuthorizationFlags::AllowUserInteraction
const ALLOW_USER_INTERACTION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationResult {
    pub authorized: bool,
    pub dismissed: bool,
}

/// Ask polkit whether this process may access `action_id`, letting the
/// agent prompt the user when `interactive` is set.
pub async fn check_device_authorization(
    conn: &Connection,
    action_id: &str,
    interactive: bool,
) -> zbus::Result<AuthorizationResult> {
    let mut subject_details: HashMap<&str, Value<'_>> = HashMap::new();
    subject_details.insert("pid", Value::from(std::process::id()));
    subject_details.insert("start-time", Value::from(0u64));
    let subject = ("unix-process", subject_details);

    let details: HashMap<&str, &str> = HashMap::new();
    let flags: u32 = if interactive { ALLOW_USER_INTERACTION } else { 0 };
    let cancellation_id = "";

    let polkit = zbus::Proxy::new(
        conn,
        "org.freedesktop.PolicyKit1",
        "/org/freedesktop/PolicyKit1/Authority",
        "org.freedesktop.PolicyKit1.Authority",
    )
    .await?;
    // (IsAuthorized, IsChallenge, Details)
    let (authorized, _challenge, ret_details): (bool, bool, HashMap<String, String>) = polkit
        .call(
            "CheckAuthorization",
            &(subject, action_id, details, flags, cancellation_id),
        )
        .await?;
    let dismissed = ret_details.get("polkit.dismissed").map(String::as_str) == Some("true");
    Ok(AuthorizationResult { authorized, dismissed })
}

/// Headset gone wins over the dialog's answer. An authorization only
/// counts as granted once the headset node is actually usable; polkit
/// saying yes while the node stays locked would start nothing.
pub fn classify(result: AuthorizationResult, headset_attached: bool, headset_permitted: bool) -> PermissionFlowOutcome {
    if !headset_attached {
        PermissionFlowOutcome::UsbDisconnected
    } else if result.authorized && headset_permitted {
        PermissionFlowOutcome::AllPermissionsGranted
    } else {
        if result.authorized {
            warn!(target: "arxlink", event = "grant_ineffective", "authorized but headset node is still not accessible");
        }
        PermissionFlowOutcome::BackPressed
    }
}

/// Run the privileged grant helper against `node`. Failures are logged;
/// the caller re-checks the node either way.
async fn apply_grant(command: &str, node: &Path) {
    match Command::new(command).arg(node).status().await {
        Ok(status) if status.success() => {
            info!(target: "arxlink", event = "grant_applied", node = %node.display());
        }
        Ok(status) => {
            warn!(target: "arxlink", event = "grant_failed", node = %node.display(), code = ?status.code());
        }
        Err(e) => {
            error!(target: "arxlink", error = %e, command, "failed to run grant helper");
        }
    }
}

/// Permission flow backed by the system polkit agent.
pub struct PolkitPermissionFlow {
    connection: Connection,
    action_id: String,
    grant_command: Option<String>,
    probe: SysfsProbe,
}

impl PolkitPermissionFlow {
    pub fn new(connection: Connection, action_id: impl Into<String>, probe: SysfsProbe) -> Self {
        Self {
            connection,
            action_id: action_id.into(),
            grant_command: None,
            probe,
        }
    }

    pub fn with_grant_command(mut self, command: Option<String>) -> Self {
        self.grant_command = command;
        self
    }
}

impl PermissionFlowLauncher for PolkitPermissionFlow {
    fn launch(&mut self, request: bool) -> PermissionFlowTicket {
        let (tx, rx) = oneshot::channel();
        let conn = self.connection.clone();
        let action_id = self.action_id.clone();
        let grant_command = self.grant_command.clone();
        let probe = self.probe.clone();
        tokio::spawn(async move {
            let outcome = match check_device_authorization(&conn, &action_id, request).await {
                Ok(result) => {
                    info!(target: "arxlink", event = "polkit_answer", authorized = result.authorized, dismissed = result.dismissed);
                    if result.authorized && !probe.is_usb_device_connected_and_permission_given() {
                        if let (Some(command), Some(node)) = (grant_command.as_deref(), probe.headset_node()) {
                            apply_grant(command, &node).await;
                        }
                    }
                    classify(
                        result,
                        probe.headset_attached(),
                        probe.is_usb_device_connected_and_permission_given(),
                    )
                }
                Err(e) => {
                    error!(target: "arxlink", error = ?e, "polkit authorization failed");
                    PermissionFlowOutcome::BackPressed
                }
            };
            let _ = tx.send(outcome);
        });
        rx
    }
}
