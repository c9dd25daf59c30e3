//! Polling hub
//!
//! Runs one decode pass per scan interval while at least one consumer is
//! subscribed, merges each decoded block into the shared store and tells
//! consumers about complete cycles.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::modbus::{BlockSource, TransportError};
use crate::sunspec::{self, Block, DataStore, DecodeError, SharedStore, Snapshot};

/// Why a block kept its previous values this cycle
#[derive(Debug, Error)]
pub enum BlockError {
    #[error("read failed: {0}")]
    Transport(#[from] TransportError),
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
}

/// Outcome of one decode pass
#[derive(Debug)]
pub struct CycleReport {
    pub inverter: Result<usize, BlockError>,
    pub meter: Result<usize, BlockError>,
}

impl CycleReport {
    /// A cycle only counts as successful when both blocks were decoded.
    pub fn is_success(&self) -> bool {
        self.inverter.is_ok() && self.meter.is_ok()
    }
}

/// Sent to consumers after every successful cycle
#[derive(Debug, Clone)]
pub struct CycleUpdate {
    pub hub: String,
    pub timestamp: DateTime<Utc>,
    pub snapshot: Arc<Snapshot>,
}

pub struct Hub {
    name: String,
    scan_interval: Duration,
    source: Arc<dyn BlockSource>,
    store: SharedStore,
    updates: broadcast::Sender<CycleUpdate>,
    active: AtomicBool,
}

impl Hub {
    pub fn new(
        name: impl Into<String>,
        scan_interval: Duration,
        source: Arc<dyn BlockSource>,
        store: SharedStore,
    ) -> Self {
        let (updates, _) = broadcast::channel(16);
        Self {
            name: name.into(),
            scan_interval,
            source,
            store,
            updates,
            active: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    pub fn consumer_count(&self) -> usize {
        self.updates.receiver_count()
    }

    /// Register a consumer. The first one opens the connection.
    ///
    /// A failed connect is logged and left to the first read to retry.
    /// Dropping the receiver unsubscribes; once none remain, polling stops
    /// and the connection is closed on the next tick.
    pub async fn subscribe(&self) -> broadcast::Receiver<CycleUpdate> {
        if self.consumer_count() == 0 {
            info!("First consumer registered for {}", self.name);
            if let Err(e) = self.source.connect().await {
                warn!("{}: could not connect yet, {}", self.name, e);
            }
            self.active.store(true, Ordering::SeqCst);
        }
        self.updates.subscribe()
    }

    async fn poll_block(&self, block: Block) -> Result<usize, BlockError> {
        let raw = self
            .source
            .read_block(block.address(), block.word_count())
            .await?;
        let readings = sunspec::decode(block, &raw)?;
        let written = self.store.write().await.merge(block, &readings);
        Ok(written)
    }

    fn record(&self, block: Block, result: &Result<usize, BlockError>) {
        match result {
            Ok(written) => debug!("{}: {} block updated {} values", self.name, block, written),
            Err(BlockError::Transport(e)) => {
                warn!("{}: {} block kept stale values, {}", self.name, block, e);
                metrics::counter!("solaredge_block_failures_total", "block" => block.as_str())
                    .increment(1);
            }
            Err(BlockError::Decode(e)) => {
                error!("{}: {} block layout mismatch, {}", self.name, block, e);
                metrics::counter!("solaredge_block_failures_total", "block" => block.as_str())
                    .increment(1);
            }
        }
    }

    /// Run one decode pass: inverter block, then meter block.
    pub async fn refresh(&self) -> CycleReport {
        let inverter = self.poll_block(Block::Inverter).await;
        self.record(Block::Inverter, &inverter);
        let meter = self.poll_block(Block::Meter).await;
        self.record(Block::Meter, &meter);

        let report = CycleReport { inverter, meter };
        metrics::counter!("solaredge_poll_cycles_total").increment(1);

        if report.is_success() {
            let snapshot = self.store.read().await.snapshot();
            for record in &snapshot.quantities {
                metrics::gauge!("solaredge_quantity", "key" => record.key)
                    .set(record.value.as_f64());
            }
            let update = CycleUpdate {
                hub: self.name.clone(),
                timestamp: snapshot.taken_at,
                snapshot: Arc::new(snapshot),
            };
            // no receivers left is not an error, the next tick goes idle
            let _ = self.updates.send(update);
        }

        report
    }

    /// One scheduler tick. Returns `None` when nobody is listening.
    pub async fn tick(&self) -> Option<CycleReport> {
        if self.consumer_count() == 0 {
            if self.active.swap(false, Ordering::SeqCst) {
                info!("No consumers left for {}, closing connection", self.name);
                self.source.close().await;
            }
            return None;
        }
        Some(self.refresh().await)
    }

    /// Poll every scan interval until shutdown.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        info!(
            "Starting polling for {} every {}s",
            self.name,
            self.scan_interval.as_secs()
        );

        let mut ticker = interval(self.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(report) = self.tick().await {
                        debug!("{}: cycle complete, success={}", self.name, report.is_success());
                    }
                }
                _ = shutdown.recv() => {
                    info!("Stopping polling for {}", self.name);
                    break;
                }
            }
        }

        self.source.close().await;
    }
}

/// Build a hub over a fresh, empty store
pub fn with_new_store(
    name: impl Into<String>,
    scan_interval: Duration,
    source: Arc<dyn BlockSource>,
) -> Hub {
    Hub::new(name, scan_interval, source, DataStore::shared())
}
