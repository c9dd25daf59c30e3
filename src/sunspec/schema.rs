//! Quantity descriptors shared by the decoders and the outputs

use serde::Serialize;
use std::fmt;

/// Unit of measurement attached to a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Unit {
    #[serde(rename = "A")]
    Ampere,
    #[serde(rename = "V")]
    Volt,
    #[serde(rename = "W")]
    Watt,
    #[serde(rename = "Hz")]
    Hertz,
    #[serde(rename = "VA")]
    VoltAmpere,
    #[serde(rename = "VAR")]
    VoltAmpereReactive,
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "kWh")]
    KilowattHour,
    #[serde(rename = "°C")]
    Celsius,
}

impl Unit {
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Ampere => "A",
            Unit::Volt => "V",
            Unit::Watt => "W",
            Unit::Hertz => "Hz",
            Unit::VoltAmpere => "VA",
            Unit::VoltAmpereReactive => "VAR",
            Unit::Percent => "%",
            Unit::KilowattHour => "kWh",
            Unit::Celsius => "°C",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Static description of one published quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuantitySpec {
    /// Stable key used in the store, MQTT topics and the HTTP API
    pub key: &'static str,
    /// Human-readable name
    pub name: &'static str,
    pub unit: Option<Unit>,
    /// Presentation hint (Material Design icon name)
    pub icon: Option<&'static str>,
}

const fn q(
    key: &'static str,
    name: &'static str,
    unit: Option<Unit>,
    icon: Option<&'static str>,
) -> QuantitySpec {
    QuantitySpec {
        key,
        name,
        unit,
        icon,
    }
}

const CURRENT_AC: Option<&str> = Some("mdi:current-ac");
const CURRENT_DC: Option<&str> = Some("mdi:current-dc");
const SOLAR: Option<&str> = Some("mdi:solar-power");
const FLASH: Option<&str> = Some("mdi:flash");
const EXPORT: Option<&str> = Some("mdi:arrow-expand-all");
const IMPORT: Option<&str> = Some("mdi:arrow-collapse-all");

use Unit::*;

pub static INVERTER_QUANTITIES: [QuantitySpec; 22] = [
    q("accurrent", "AC Current", Some(Ampere), CURRENT_AC),
    q("accurrenta", "AC Current A", Some(Ampere), CURRENT_AC),
    q("accurrentb", "AC Current B", Some(Ampere), CURRENT_AC),
    q("accurrentc", "AC Current C", Some(Ampere), CURRENT_AC),
    q("acvoltageab", "AC Voltage AB", Some(Volt), None),
    q("acvoltagebc", "AC Voltage BC", Some(Volt), None),
    q("acvoltageca", "AC Voltage CA", Some(Volt), None),
    q("acvoltagean", "AC Voltage AN", Some(Volt), None),
    q("acvoltagebn", "AC Voltage BN", Some(Volt), None),
    q("acvoltagecn", "AC Voltage CN", Some(Volt), None),
    q("acpower", "AC Power", Some(Watt), SOLAR),
    q("acfreq", "AC Frequency", Some(Hertz), None),
    q("acva", "AC VA", Some(VoltAmpere), None),
    q("acvar", "AC VAR", Some(VoltAmpereReactive), None),
    q("acpf", "AC PF", Some(Percent), None),
    q("acenergy", "AC Energy KWH", Some(KilowattHour), SOLAR),
    q("dccurrent", "DC Current", Some(Ampere), CURRENT_DC),
    q("dcvoltage", "DC Voltage", Some(Volt), None),
    q("dcpower", "DC Power", Some(Watt), SOLAR),
    q("tempsink", "Temp Sink", Some(Celsius), None),
    q("status", "Status", None, None),
    q("statusvendor", "Status Vendor", None, None),
];

pub static METER_QUANTITIES: [QuantitySpec; 37] = [
    q("m1accurrent", "Meter 1 AC Current", Some(Ampere), CURRENT_AC),
    q("m1accurrenta", "Meter 1 AC Current A", Some(Ampere), CURRENT_AC),
    q("m1accurrentb", "Meter 1 AC Current B", Some(Ampere), CURRENT_AC),
    q("m1accurrentc", "Meter 1 AC Current C", Some(Ampere), CURRENT_AC),
    q("m1acvoltagell", "Meter 1 AC Voltage LL", Some(Volt), None),
    q("m1acvoltageab", "Meter 1 AC Voltage AB", Some(Volt), None),
    q("m1acvoltagebc", "Meter 1 AC Voltage BC", Some(Volt), None),
    q("m1acvoltageca", "Meter 1 AC Voltage CA", Some(Volt), None),
    q("m1acvoltageln", "Meter 1 AC Voltage LN", Some(Volt), None),
    q("m1acvoltagean", "Meter 1 AC Voltage AN", Some(Volt), None),
    q("m1acvoltagebn", "Meter 1 AC Voltage BN", Some(Volt), None),
    q("m1acvoltagecn", "Meter 1 AC Voltage CN", Some(Volt), None),
    q("m1acfreq", "Meter 1 AC Frequency", Some(Hertz), None),
    q("m1acpower", "Meter 1 AC Power", Some(Watt), FLASH),
    q("m1acpowera", "Meter 1 AC Power A", Some(Watt), FLASH),
    q("m1acpowerb", "Meter 1 AC Power B", Some(Watt), FLASH),
    q("m1acpowerc", "Meter 1 AC Power C", Some(Watt), FLASH),
    q("m1acva", "Meter 1 AC Apparent Power", Some(VoltAmpere), FLASH),
    q("m1acvaa", "Meter 1 AC Apparent Power A", Some(VoltAmpere), FLASH),
    q("m1acvab", "Meter 1 AC Apparent Power B", Some(VoltAmpere), FLASH),
    q("m1acvac", "Meter 1 AC Apparent Power C", Some(VoltAmpere), FLASH),
    q("m1acvar", "Meter 1 AC Reactive Power", Some(VoltAmpereReactive), FLASH),
    q("m1acvara", "Meter 1 AC Reactive Power A", Some(VoltAmpereReactive), FLASH),
    q("m1acvarb", "Meter 1 AC Reactive Power B", Some(VoltAmpereReactive), FLASH),
    q("m1acvarc", "Meter 1 AC Reactive Power C", Some(VoltAmpereReactive), FLASH),
    q("m1acpf", "Meter 1 AC Power Factor", Some(Percent), FLASH),
    q("m1acpfa", "Meter 1 AC Power Factor A", Some(Percent), FLASH),
    q("m1acpfb", "Meter 1 AC Power Factor B", Some(Percent), FLASH),
    q("m1acpfc", "Meter 1 AC Power Factor C", Some(Percent), FLASH),
    q("m1acexported", "Meter 1 Exported Real Energy", Some(KilowattHour), EXPORT),
    q("m1acexporteda", "Meter 1 Exported Real Energy A", Some(KilowattHour), EXPORT),
    q("m1acexportedb", "Meter 1 Exported Real Energy B", Some(KilowattHour), EXPORT),
    q("m1acexportedc", "Meter 1 Exported Real Energy C", Some(KilowattHour), EXPORT),
    q("m1acimported", "Meter 1 Imported Real Energy", Some(KilowattHour), IMPORT),
    q("m1acimporteda", "Meter 1 Imported Real Energy A", Some(KilowattHour), IMPORT),
    q("m1acimportedb", "Meter 1 Imported Real Energy B", Some(KilowattHour), IMPORT),
    q("m1acimportedc", "Meter 1 Imported Real Energy C", Some(KilowattHour), IMPORT),
];

/// A fixed register range holding one device's telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Block {
    Inverter,
    Meter,
}

impl Block {
    pub const ALL: [Block; 2] = [Block::Inverter, Block::Meter];

    /// First holding register of the block.
    pub fn address(self) -> u16 {
        match self {
            Block::Inverter => 40071,
            Block::Meter => 40189,
        }
    }

    /// Number of registers in the block.
    pub fn word_count(self) -> u16 {
        match self {
            Block::Inverter => 38,
            Block::Meter => 53,
        }
    }

    pub fn quantities(self) -> &'static [QuantitySpec] {
        match self {
            Block::Inverter => &INVERTER_QUANTITIES,
            Block::Meter => &METER_QUANTITIES,
        }
    }

    pub fn spec(self, key: &str) -> Option<&'static QuantitySpec> {
        self.quantities().iter().find(|spec| spec.key == key)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Block::Inverter => "inverter",
            Block::Meter => "meter",
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Look a quantity up across every block.
pub fn find(key: &str) -> Option<(Block, &'static QuantitySpec)> {
    Block::ALL
        .iter()
        .find_map(|block| block.spec(key).map(|spec| (*block, spec)))
}
