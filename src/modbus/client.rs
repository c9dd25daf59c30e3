//! Modbus client context types
//!
//! Supports both TCP and RTU (serial) connections

use std::fmt;
use tokio_modbus::prelude::*;
use tokio_modbus::Exception;

/// Error type for transport operations
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Modbus exception: {0:?}")]
    Exception(Exception),
    #[error("Transport error: {0}")]
    Transport(#[from] tokio_modbus::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serial port error: {0}")]
    Serial(String),
    #[error("Not connected")]
    NotConnected,
    #[error("Timed out after {0}ms")]
    Timeout(u64),
    #[error("Short read: expected {expected} registers, got {actual}")]
    ShortRead { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    Tcp,
    Rtu,
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Link::Tcp => f.write_str("TCP"),
            Link::Rtu => f.write_str("RTU"),
        }
    }
}

/// An open connection and the link it runs over
pub struct Context {
    link: Link,
    inner: tokio_modbus::client::Context,
}

impl Context {
    pub fn tcp(inner: tokio_modbus::client::Context) -> Self {
        Self {
            link: Link::Tcp,
            inner,
        }
    }

    pub fn rtu(inner: tokio_modbus::client::Context) -> Self {
        Self {
            link: Link::Rtu,
            inner,
        }
    }

    pub fn link(&self) -> Link {
        self.link
    }

    pub async fn read_holding_registers(
        &mut self,
        addr: u16,
        cnt: u16,
    ) -> Result<Vec<u16>, TransportError> {
        let result = self.inner.read_holding_registers(addr, cnt).await?;
        let words = result.map_err(TransportError::Exception)?;
        if words.len() != usize::from(cnt) {
            return Err(TransportError::ShortRead {
                expected: usize::from(cnt),
                actual: words.len(),
            });
        }
        Ok(words)
    }
}
