//! Inverter operating state

use serde::Serialize;
use std::fmt;

/// Operating state reported in the inverter status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceStatus {
    Off,
    Sleeping,
    Starting,
    Producing,
    Throttled,
    ShuttingDown,
    Fault,
    Standby,
    /// Any code outside the documented table
    Unknown(i16),
}

impl From<i16> for DeviceStatus {
    fn from(code: i16) -> Self {
        match code {
            1 => DeviceStatus::Off,
            2 => DeviceStatus::Sleeping,
            3 => DeviceStatus::Starting,
            4 => DeviceStatus::Producing,
            5 => DeviceStatus::Throttled,
            6 => DeviceStatus::ShuttingDown,
            7 => DeviceStatus::Fault,
            8 => DeviceStatus::Standby,
            other => DeviceStatus::Unknown(other),
        }
    }
}

impl DeviceStatus {
    pub fn code(self) -> i16 {
        match self {
            DeviceStatus::Off => 1,
            DeviceStatus::Sleeping => 2,
            DeviceStatus::Starting => 3,
            DeviceStatus::Producing => 4,
            DeviceStatus::Throttled => 5,
            DeviceStatus::ShuttingDown => 6,
            DeviceStatus::Fault => 7,
            DeviceStatus::Standby => 8,
            DeviceStatus::Unknown(code) => code,
        }
    }

    pub fn description(self) -> String {
        let text = match self {
            DeviceStatus::Off => "Off",
            DeviceStatus::Sleeping => "Sleeping (auto-shutdown) – Night mode",
            DeviceStatus::Starting => "Grid Monitoring/wake-up",
            DeviceStatus::Producing => "Inverter is ON and producing power",
            DeviceStatus::Throttled => "Production (curtailed)",
            DeviceStatus::ShuttingDown => "Shutting down",
            DeviceStatus::Fault => "Fault",
            DeviceStatus::Standby => "Maintenance/setup",
            DeviceStatus::Unknown(code) => return format!("Unknown ({})", code),
        };
        text.to_string()
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}
