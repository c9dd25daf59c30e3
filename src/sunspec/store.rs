//! Last known value of every quantity

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use super::schema::{Block, QuantitySpec, Unit};
use super::status::DeviceStatus;
use super::{Readings, Value};

/// Key of the quantity that carries a status description.
const STATUS_KEY: &str = "status";

/// One stored quantity with its descriptor and the time it was decoded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantityRecord {
    pub key: &'static str,
    pub name: &'static str,
    pub block: Block,
    pub value: Value,
    pub unit: Option<Unit>,
    pub icon: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl QuantityRecord {
    fn new(
        block: Block,
        spec: &'static QuantitySpec,
        value: Value,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let description = match value {
            Value::Code(code) if spec.key == STATUS_KEY => {
                Some(DeviceStatus::from(code).description())
            }
            _ => None,
        };
        Self {
            key: spec.key,
            name: spec.name,
            block,
            value,
            unit: spec.unit,
            icon: spec.icon,
            description,
            timestamp,
        }
    }
}

/// Point-in-time copy of the store, in schema order.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    pub quantities: Vec<QuantityRecord>,
}

/// Shared state for decoded quantities
pub type SharedStore = Arc<RwLock<DataStore>>;

/// Merged results of successive decode passes.
///
/// Entries are only ever replaced, never removed: a block that fails to
/// decode keeps its previous values.
#[derive(Debug, Default)]
pub struct DataStore {
    records: HashMap<&'static str, QuantityRecord>,
    updated: HashMap<Block, DateTime<Utc>>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedStore {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Replace the values owned by `block`; returns how many were written.
    pub fn merge(&mut self, block: Block, readings: &Readings) -> usize {
        let now = Utc::now();
        let mut written = 0;

        for spec in block.quantities() {
            if let Some(value) = readings.get(spec.key) {
                self.records
                    .insert(spec.key, QuantityRecord::new(block, spec, *value, now));
                written += 1;
            }
        }
        for key in readings.keys().filter(|key| block.spec(key).is_none()) {
            warn!("Ignoring {} reading {}: not part of the {} block", block, key, block);
        }
        self.updated.insert(block, now);

        written
    }

    pub fn merge_inverter(&mut self, readings: &Readings) -> usize {
        self.merge(Block::Inverter, readings)
    }

    pub fn merge_meter(&mut self, readings: &Readings) -> usize {
        self.merge(Block::Meter, readings)
    }

    pub fn get(&self, key: &str) -> Option<&QuantityRecord> {
        self.records.get(key)
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.records.get(key).map(|record| record.value)
    }

    /// Inverter operating state, once the inverter block has been decoded.
    pub fn status(&self) -> Option<DeviceStatus> {
        match self.value(STATUS_KEY)? {
            Value::Code(code) => Some(DeviceStatus::from(code)),
            Value::Measured(_) => None,
        }
    }

    /// Time of the last successful merge for `block`.
    pub fn last_updated(&self, block: Block) -> Option<DateTime<Utc>> {
        self.updated.get(&block).copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn snapshot(&self) -> Snapshot {
        let quantities = Block::ALL
            .iter()
            .flat_map(|block| block.quantities())
            .filter_map(|spec| self.records.get(spec.key).cloned())
            .collect();

        Snapshot {
            taken_at: Utc::now(),
            quantities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sunspec::testing::{InverterFrame, MeterFrame};
    use crate::sunspec::{inverter, meter};

    fn inverter_readings(frame: InverterFrame) -> Readings {
        inverter::decode(&frame.block()).unwrap()
    }

    #[test]
    fn test_merge_writes_only_block_keys() {
        let mut store = DataStore::new();

        let written = store.merge_inverter(&inverter_readings(InverterFrame::default()));

        assert_eq!(written, 22);
        assert_eq!(store.len(), 22);
        assert!(store.get("m1accurrent").is_none());
        assert!(store.last_updated(Block::Inverter).is_some());
        assert!(store.last_updated(Block::Meter).is_none());
    }

    #[test]
    fn test_merge_ignores_foreign_keys() {
        let mut store = DataStore::new();
        let mut readings = Readings::new();
        readings.insert("m1acfreq", Value::Measured(50.0));
        readings.insert("acfreq", Value::Measured(49.9));

        assert_eq!(store.merge(Block::Inverter, &readings), 1);
        assert!(store.get("m1acfreq").is_none());
        assert_eq!(store.value("acfreq"), Some(Value::Measured(49.9)));
    }

    #[test]
    fn test_later_merge_overwrites_in_place() {
        let mut store = DataStore::new();
        store.merge_inverter(&inverter_readings(InverterFrame::default()));
        store.merge_meter(&meter::decode(&MeterFrame::default().block()).unwrap());

        let frame = InverterFrame {
            power: 1000,
            ..InverterFrame::default()
        };
        store.merge_inverter(&inverter_readings(frame));

        assert_eq!(store.len(), 22 + 37);
        assert_eq!(store.value("acpower"), Some(Value::Measured(1000.0)));
        assert_eq!(store.value("m1acfreq"), Some(Value::Measured(49.98)));
    }

    #[test]
    fn test_status_description() {
        let mut store = DataStore::new();
        assert_eq!(store.status(), None);

        store.merge_inverter(&inverter_readings(InverterFrame::default()));
        assert_eq!(store.status(), Some(DeviceStatus::Producing));
        assert_eq!(
            store.get("status").unwrap().description.as_deref(),
            Some("Inverter is ON and producing power")
        );
        assert_eq!(store.get("statusvendor").unwrap().description, None);

        let frame = InverterFrame {
            status: 99,
            ..InverterFrame::default()
        };
        store.merge_inverter(&inverter_readings(frame));
        assert_eq!(store.status(), Some(DeviceStatus::Unknown(99)));
    }

    #[test]
    fn test_snapshot_follows_schema_order() {
        let mut store = DataStore::new();
        store.merge_meter(&meter::decode(&MeterFrame::default().block()).unwrap());
        store.merge_inverter(&inverter_readings(InverterFrame::default()));

        let snapshot = store.snapshot();

        assert_eq!(snapshot.quantities.len(), 59);
        assert_eq!(snapshot.quantities[0].key, "accurrent");
        assert_eq!(snapshot.quantities[22].key, "m1accurrent");
        let energy = snapshot
            .quantities
            .iter()
            .find(|record| record.key == "acenergy")
            .unwrap();
        assert_eq!(energy.unit, Some(Unit::KilowattHour));
    }

    #[test]
    fn test_record_serialization() {
        let mut store = DataStore::new();
        store.merge_inverter(&inverter_readings(InverterFrame::default()));

        let json = serde_json::to_value(store.get("acfreq").unwrap()).unwrap();

        assert_eq!(json["key"], "acfreq");
        assert_eq!(json["value"], 50.01);
        assert_eq!(json["unit"], "Hz");
        assert_eq!(json["block"], "inverter");
        assert!(json.get("description").is_none());
    }
}
