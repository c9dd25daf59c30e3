//! SolarEdge bridge
//!
//! Polls a SolarEdge inverter and its first energy meter over Modbus,
//! decodes the SunSpec register blocks and republishes the values over
//! MQTT and HTTP.

pub mod api;
pub mod config;
pub mod hub;
pub mod modbus;
pub mod mqtt;
pub mod sunspec;

pub use config::Config;
pub use hub::{CycleReport, CycleUpdate, Hub};
pub use modbus::{BlockSource, ModbusClient, TransportError};
pub use sunspec::{Block, DataStore, DeviceStatus, QuantityRecord, SharedStore, Value};
