//! Modbus transport
//!
//! Supports both TCP and RTU connections. Every operation on the link goes
//! through one lock, so only a single request is ever in flight.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_modbus::prelude::*;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::config::{ConnectionConfig, HubConfig, RtuConnection, TcpConnection};
use crate::sunspec::RawBlock;

pub mod client;

pub use client::TransportError;

/// Supplier of raw register blocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Open the link. Calling this on an open link does nothing.
    async fn connect(&self) -> Result<(), TransportError>;

    /// Drop the link if it is open.
    async fn close(&self);

    /// Read `count` holding registers starting at `address`.
    async fn read_block(&self, address: u16, count: u16) -> Result<RawBlock, TransportError>;
}

/// Modbus client for a single inverter, TCP or RTU
pub struct ModbusClient {
    connection: ConnectionConfig,
    timeout: Duration,
    context: Mutex<Option<client::Context>>,
}

impl ModbusClient {
    /// Create a client; the link is opened by [`BlockSource::connect`] or the first read.
    pub fn new(config: &HubConfig) -> Self {
        Self {
            connection: config.connection.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
            context: Mutex::new(None),
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.context.lock().await.is_some()
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    async fn open(&self) -> Result<client::Context, TransportError> {
        let opening = async {
            match &self.connection {
                ConnectionConfig::Tcp(tcp) => open_tcp(tcp).await,
                ConnectionConfig::Rtu(rtu) => open_rtu(rtu),
            }
        };
        timeout(self.timeout, opening)
            .await
            .map_err(|_| TransportError::Timeout(self.timeout_ms()))?
    }
}

async fn open_tcp(tcp: &TcpConnection) -> Result<client::Context, TransportError> {
    let addr = tokio::net::lookup_host((tcp.host.as_str(), tcp.port))
        .await?
        .next()
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} did not resolve", tcp.host),
            )
        })?;

    info!("Connecting to Modbus TCP: {} (unit {})", addr, tcp.unit_id);

    let ctx = tcp::connect_slave(addr, Slave(tcp.unit_id)).await?;
    Ok(client::Context::tcp(ctx))
}

fn open_rtu(rtu: &RtuConnection) -> Result<client::Context, TransportError> {
    info!(
        "Connecting to Modbus RTU: {} @ {} baud (unit {})",
        rtu.port, rtu.baud_rate, rtu.unit_id
    );

    let parity = match rtu.parity.to_lowercase().as_str() {
        "none" => tokio_serial::Parity::None,
        "even" => tokio_serial::Parity::Even,
        "odd" => tokio_serial::Parity::Odd,
        _ => {
            warn!("Unknown parity '{}', using None", rtu.parity);
            tokio_serial::Parity::None
        }
    };

    let stop_bits = match rtu.stop_bits {
        1 => tokio_serial::StopBits::One,
        2 => tokio_serial::StopBits::Two,
        _ => {
            warn!("Unknown stop bits {}, using 1", rtu.stop_bits);
            tokio_serial::StopBits::One
        }
    };

    let data_bits = match rtu.data_bits {
        5 => tokio_serial::DataBits::Five,
        6 => tokio_serial::DataBits::Six,
        7 => tokio_serial::DataBits::Seven,
        8 => tokio_serial::DataBits::Eight,
        _ => {
            warn!("Unknown data bits {}, using 8", rtu.data_bits);
            tokio_serial::DataBits::Eight
        }
    };

    let port = tokio_serial::new(&rtu.port, rtu.baud_rate)
        .parity(parity)
        .stop_bits(stop_bits)
        .data_bits(data_bits)
        .open_native_async()
        .map_err(|e| {
            TransportError::Serial(format!(
                "Failed to open serial port {} at {} baud: {}",
                rtu.port, rtu.baud_rate, e
            ))
        })?;

    Ok(client::Context::rtu(rtu::attach_slave(port, Slave(rtu.unit_id))))
}

#[async_trait]
impl BlockSource for ModbusClient {
    async fn connect(&self) -> Result<(), TransportError> {
        let mut context = self.context.lock().await;
        if context.is_none() {
            let ctx = self.open().await?;
            info!("Modbus {} client ready", ctx.link());
            *context = Some(ctx);
        }
        Ok(())
    }

    async fn close(&self) {
        if self.context.lock().await.take().is_some() {
            info!("Modbus connection closed");
        }
    }

    async fn read_block(&self, address: u16, count: u16) -> Result<RawBlock, TransportError> {
        let mut context = self.context.lock().await;
        if context.is_none() {
            *context = Some(self.open().await?);
        }
        let ctx = context.as_mut().ok_or(TransportError::NotConnected)?;

        debug!(
            "Reading {} holding registers from address {} ({})",
            count,
            address,
            ctx.link()
        );

        let result = timeout(self.timeout, ctx.read_holding_registers(address, count))
            .await
            .unwrap_or(Err(TransportError::Timeout(self.timeout_ms())));

        match result {
            Ok(words) => Ok(RawBlock::new(address, words)),
            Err(e) => {
                // a protocol-level exception leaves the link usable
                if !matches!(e, TransportError::Exception(_)) {
                    *context = None;
                }
                Err(e)
            }
        }
    }
}
