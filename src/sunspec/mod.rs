//! SunSpec register block decoding
//!
//! Each block is walked front to back by a [`RegisterCursor`]. Raw
//! magnitudes are collected into a [`ScaleGroup`] until the scale factor
//! that governs them has been read, then normalized together.

use serde::Serialize;
use std::collections::BTreeMap;

pub mod cursor;
pub mod inverter;
pub mod meter;
pub mod scale;
pub mod schema;
pub mod status;
pub mod store;
#[cfg(test)]
pub(crate) mod testing;

pub use cursor::{DecodeError, FieldKind, RawBlock, RegisterCursor};
pub use schema::{Block, QuantitySpec, Unit};
pub use status::DeviceStatus;
pub use store::{DataStore, QuantityRecord, SharedStore, Snapshot};

/// A decoded quantity value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Scaled physical measurement
    Measured(f64),
    /// Enumerated code passed through unscaled
    Code(i16),
}

impl Value {
    pub fn as_f64(self) -> f64 {
        match self {
            Value::Measured(v) => v,
            Value::Code(c) => f64::from(c),
        }
    }
}

/// Decoded values of one block, keyed by quantity key.
pub type Readings = BTreeMap<&'static str, Value>;

/// Raw magnitudes waiting for their scale factor.
#[derive(Debug, Default)]
pub struct ScaleGroup {
    pending: Vec<(&'static str, i64)>,
}

impl ScaleGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &'static str, raw: i64) {
        self.pending.push((key, raw));
    }

    pub fn read(
        &mut self,
        cursor: &mut RegisterCursor<'_>,
        kind: FieldKind,
        key: &'static str,
    ) -> Result<(), DecodeError> {
        let raw = cursor.read(kind)?;
        self.push(key, raw);
        Ok(())
    }

    /// Normalize every pending value with `scale_factor`.
    pub fn apply(self, scale_factor: i16, out: &mut Readings) {
        for (key, raw) in self.pending {
            let value = scale::normalize(raw, i32::from(scale_factor));
            out.insert(key, Value::Measured(value));
        }
    }
}

/// Read one field per key, then the trailing i16 scale factor shared by all.
pub fn read_group(
    cursor: &mut RegisterCursor<'_>,
    kind: FieldKind,
    keys: &[&'static str],
    out: &mut Readings,
) -> Result<(), DecodeError> {
    let mut group = ScaleGroup::new();
    for &key in keys {
        group.read(cursor, kind, key)?;
    }
    let scale_factor = cursor.read_i16()?;
    group.apply(scale_factor, out);
    Ok(())
}

fn check_length(block: Block, raw: &RawBlock) -> Result<(), DecodeError> {
    let expected = usize::from(block.word_count());
    let actual = raw.words().len();
    if actual != expected {
        return Err(DecodeError::BlockLength {
            block,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Decode a block fetched from `block.address()`.
pub fn decode(block: Block, raw: &RawBlock) -> Result<Readings, DecodeError> {
    check_length(block, raw)?;
    match block {
        Block::Inverter => inverter::decode(raw),
        Block::Meter => meter::decode(raw),
    }
}
