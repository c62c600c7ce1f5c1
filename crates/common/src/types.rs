use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Capture resolutions the headset service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum Resolution {
    Vga480,
    #[default]
    Hd720,
    FullHd1080,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [Resolution::Vga480, Resolution::Hd720, Resolution::FullHd1080];

    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Resolution::Vga480 => (640, 480),
            Resolution::Hd720 => (1280, 720),
            Resolution::FullHd1080 => (1920, 1080),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.dimensions();
        write!(f, "{}x{}", w, h)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported resolution: {0}")]
pub struct ResolutionParseError(pub String);

impl FromStr for Resolution {
    type Err = ResolutionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('_');
        Resolution::ALL
            .into_iter()
            .find(|r| r.to_string().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ResolutionParseError(s.to_string()))
    }
}

impl TryFrom<String> for Resolution {
    type Error = ResolutionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.to_string()
    }
}

/// Result of one run of the accessory consent flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionFlowOutcome {
    AllPermissionsGranted,
    UsbDisconnected,
    BackPressed,
    CloseAppRequested,
}

/// OS-level runtime permissions requested once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuntimePermission {
    Camera,
    Microphone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeadsetButton {
    Square,
    Circle,
    Triangle,
    Cross,
    Other(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ImuData {
    pub accel: [f32; 3],
    pub gyro: [f32; 3],
    pub timestamp_us: u64,
}

/// Callbacks the accessory delivers. Only `PermissionDenied` drives the
/// controller; everything else is carried as an [`IgnoredEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum AccessoryEvent {
    PermissionDenied,
    Ignored(IgnoredEvent),
}

/// Accessory callbacks that are accepted and intentionally produce no effect.
#[derive(Debug, Clone, PartialEq)]
pub enum IgnoredEvent {
    Disconnect,
    DeviceConnectionError(String),
    CameraResolutionUpdate {
        available: Vec<Resolution>,
        current: Resolution,
    },
    ButtonClicked {
        button: HeadsetButton,
        pressed: bool,
    },
    ImuDataUpdate(ImuData),
    DevicePhotoReceived {
        resolution: Resolution,
        bytes: Vec<u8>,
    },
    StillPhotoReceived {
        resolution: Resolution,
        bytes: Vec<u8>,
    },
}

impl IgnoredEvent {
    pub fn name(&self) -> &'static str {
        match self {
            IgnoredEvent::Disconnect => "disconnect",
            IgnoredEvent::DeviceConnectionError(_) => "device_connection_error",
            IgnoredEvent::CameraResolutionUpdate { .. } => "camera_resolution_update",
            IgnoredEvent::ButtonClicked { .. } => "button_clicked",
            IgnoredEvent::ImuDataUpdate(_) => "imu_data_update",
            IgnoredEvent::DevicePhotoReceived { .. } => "device_photo_received",
            IgnoredEvent::StillPhotoReceived { .. } => "still_photo_received",
        }
    }
}

impl From<IgnoredEvent> for AccessoryEvent {
    fn from(value: IgnoredEvent) -> Self {
        AccessoryEvent::Ignored(value)
    }
}

/// Vendor/product pair identifying the headset on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredAccessory {
    pub vendor_id: String,
    pub product_id: String,
}

impl RequiredAccessory {
    pub fn new(vendor_id: impl Into<String>, product_id: impl Into<String>) -> Self {
        Self {
            vendor_id: normalize_hex_id(&vendor_id.into()),
            product_id: normalize_hex_id(&product_id.into()),
        }
    }

    pub fn matches(&self, vendor_id: &str, product_id: &str) -> bool {
        self.vendor_id == normalize_hex_id(vendor_id) && self.product_id == normalize_hex_id(product_id)
    }
}

/// Lowercase, strip a `0x` prefix and surrounding whitespace.
pub fn normalize_hex_id(raw: &str) -> String {
    raw.trim().trim_start_matches("0x").trim_start_matches("0X").to_ascii_lowercase()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsbDeviceInfo {
    pub sysfs_name: String,
    pub vendor_id: String,
    pub product_id: String,
    pub busnum: u16,
    pub devnum: u16,
    pub serial: String,
    pub product: String,
    pub permitted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerState {
    Idle,
    AwaitingPermission,
    Running,
    Terminated,
}

impl ControllerState {
    pub fn as_str(self) -> &'static str {
        match self {
            ControllerState::Idle => "idle",
            ControllerState::AwaitingPermission => "awaiting_permission",
            ControllerState::Running => "running",
            ControllerState::Terminated => "terminated",
        }
    }
}

/// Signaling session states the presentation layer branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SessionState {
    #[default]
    Offline,
    Impossible,
    Ready,
    Creating,
    Active,
}
