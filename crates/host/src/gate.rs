use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use arxlink_backend_sysfs::node_accessible;
use arxlink_common::backend::PermissionGate;
use arxlink_common::types::RuntimePermission;

/// Checks camera and microphone device nodes once and logs what is missing.
pub struct DeviceNodePermissionGate {
    dev_root: PathBuf,
}

impl Default for DeviceNodePermissionGate {
    fn default() -> Self {
        Self::new("/dev")
    }
}

impl DeviceNodePermissionGate {
    pub fn new(dev_root: impl Into<PathBuf>) -> Self {
        Self {
            dev_root: dev_root.into(),
        }
    }

    pub fn granted(&self, permission: RuntimePermission) -> bool {
        match permission {
            RuntimePermission::Camera => any_accessible(&self.dev_root, |name| name.starts_with("video")),
            RuntimePermission::Microphone => {
                // capture PCM nodes look like pcmC0D0c
                any_accessible(&self.dev_root.join("snd"), |name| {
                    name.starts_with("pcmC") && name.ends_with('c')
                })
            }
        }
    }
}

impl PermissionGate for DeviceNodePermissionGate {
    fn request(&self, permissions: &[RuntimePermission]) {
        for &permission in permissions {
            if self.granted(permission) {
                info!(target: "arxlink", event = "runtime_permission", ?permission, granted = true);
            } else {
                warn!(target: "arxlink", event = "runtime_permission", ?permission, granted = false,
                    "no accessible device node; check group membership");
            }
        }
    }
}

fn any_accessible(dir: &Path, matches: impl Fn(&str) -> bool) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    entries
        .flatten()
        .filter(|e| e.file_name().to_str().is_some_and(&matches))
        .any(|e| node_accessible(&e.path()))
}
