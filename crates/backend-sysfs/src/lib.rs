use std::ffi::CString;
use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use arxlink_common::backend::AccessoryAvailability;
use arxlink_common::types::{normalize_hex_id, RequiredAccessory, UsbDeviceInfo};
use thiserror::Error;

pub const DEFAULT_SYS_ROOT: &str = "/sys/bus/usb/devices";
pub const DEFAULT_DEV_ROOT: &str = "/dev/bus/usb";

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Reads attached USB devices from sysfs on every call.
#[derive(Debug, Clone)]
pub struct SysfsProbe {
    sys_root: PathBuf,
    dev_root: PathBuf,
    required: Vec<RequiredAccessory>,
}

impl SysfsProbe {
    /// The first entry of `required` is the headset itself.
    pub fn new(required: Vec<RequiredAccessory>) -> Self {
        Self::with_roots(DEFAULT_SYS_ROOT, DEFAULT_DEV_ROOT, required)
    }

    pub fn with_roots(
        sys_root: impl Into<PathBuf>,
        dev_root: impl Into<PathBuf>,
        required: Vec<RequiredAccessory>,
    ) -> Self {
        Self {
            sys_root: sys_root.into(),
            dev_root: dev_root.into(),
            required,
        }
    }

    pub fn required(&self) -> &[RequiredAccessory] {
        &self.required
    }

    pub fn list_devices(&self) -> Result<Vec<UsbDeviceInfo>, ProbeError> {
        let entries = fs::read_dir(&self.sys_root).map_err(|source| ProbeError::Read {
            path: self.sys_root.clone(),
            source,
        })?;
        let mut devices = Vec::new();
        for entry in entries.flatten() {
            if let Some(info) = self.read_device(&entry.path()) {
                devices.push(info);
            }
        }
        devices.sort_by(|a, b| (a.busnum, a.devnum).cmp(&(b.busnum, b.devnum)));
        Ok(devices)
    }

    fn read_device(&self, dir: &Path) -> Option<UsbDeviceInfo> {
        // Interface directories (e.g. "1-1:1.0") carry no idVendor.
        let vendor_id = read_attr(dir, "idVendor")?;
        let product_id = read_attr(dir, "idProduct")?;
        let busnum: u16 = read_attr(dir, "busnum")?.parse().ok()?;
        let devnum: u16 = read_attr(dir, "devnum")?.parse().ok()?;
        let node = self.node_path(busnum, devnum);
        Some(UsbDeviceInfo {
            sysfs_name: dir.file_name()?.to_string_lossy().to_string(),
            vendor_id: normalize_hex_id(&vendor_id),
            product_id: normalize_hex_id(&product_id),
            busnum,
            devnum,
            serial: read_attr(dir, "serial").unwrap_or_default(),
            product: read_attr(dir, "product").unwrap_or_default(),
            permitted: node_accessible(&node),
        })
    }

    /// The headset is on the bus, whether or not access was granted.
    pub fn headset_attached(&self) -> bool {
        match self.required.first() {
            Some(headset) => self
                .snapshot()
                .iter()
                .any(|d| headset.matches(&d.vendor_id, &d.product_id)),
            None => false,
        }
    }

    /// usbfs node of the attached headset, e.g. `/dev/bus/usb/001/005`.
    pub fn headset_node(&self) -> Option<PathBuf> {
        let headset = self.required.first()?;
        self.snapshot()
            .iter()
            .find(|d| headset.matches(&d.vendor_id, &d.product_id))
            .map(|d| self.node_path(d.busnum, d.devnum))
    }

    fn node_path(&self, busnum: u16, devnum: u16) -> PathBuf {
        self.dev_root.join(format!("{:03}", busnum)).join(format!("{:03}", devnum))
    }

    fn ready(&self, devices: &[UsbDeviceInfo], accessory: &RequiredAccessory) -> bool {
        devices
            .iter()
            .any(|d| accessory.matches(&d.vendor_id, &d.product_id) && d.permitted)
    }

    fn snapshot(&self) -> Vec<UsbDeviceInfo> {
        match self.list_devices() {
            Ok(devices) => devices,
            Err(e) => {
                tracing::warn!(error = %e, "usb probe failed, treating accessory as absent");
                Vec::new()
            }
        }
    }
}

impl AccessoryAvailability for SysfsProbe {
    fn is_all_required_usb_connected(&self) -> bool {
        if self.required.is_empty() {
            return false;
        }
        let devices = self.snapshot();
        self.required.iter().all(|acc| self.ready(&devices, acc))
    }

    fn is_usb_device_connected_and_permission_given(&self) -> bool {
        match self.required.first() {
            Some(headset) => self.ready(&self.snapshot(), headset),
            None => false,
        }
    }
}

fn read_attr(dir: &Path, name: &str) -> Option<String> {
    let text = fs::read_to_string(dir.join(name)).ok()?;
    let value = text.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Read/write access to a device node, checked against the real uid.
pub fn node_accessible(node: &Path) -> bool {
    let Ok(c_path) = CString::new(node.as_os_str().as_bytes()) else {
        return false;
    };
    unsafe { libc::access(c_path.as_ptr(), libc::R_OK | libc::W_OK) == 0 }
}
