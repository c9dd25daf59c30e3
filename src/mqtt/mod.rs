//! MQTT publisher module
//!
//! Publishes every quantity after each successful cycle with topics like:
//! `{prefix}/{hub}/{key}`

use anyhow::{Context, Result};
use rumqttc::{AsyncClient, Event, EventLoop, LastWill, MqttOptions, Packet, QoS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::config::MqttConfig;
use crate::hub::CycleUpdate;
use crate::sunspec::QuantityRecord;

/// MQTT Publisher for sending decoded quantities
pub struct MqttPublisher {
    client: AsyncClient,
    topic_prefix: String,
    hub: String,
    qos: QoS,
    retain: bool,
    connected: Arc<AtomicBool>,
}

fn qos_level(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        2 => QoS::ExactlyOnce,
        _ => {
            warn!("Invalid QoS level {}, using 1", level);
            QoS::AtLeastOnce
        }
    }
}

fn availability_topic(prefix: &str, hub: &str) -> String {
    format!("{}/{}/availability", prefix, hub)
}

fn quantity_topic(prefix: &str, hub: &str, key: &str) -> String {
    format!("{}/{}/{}", prefix, hub, key)
}

fn quantity_payload(record: &QuantityRecord) -> serde_json::Value {
    let mut payload = serde_json::json!({
        "value": record.value,
        "unit": record.unit,
        "name": record.name,
        "timestamp": record.timestamp,
    });
    if let Some(description) = &record.description {
        payload["description"] = serde_json::Value::from(description.as_str());
    }
    payload
}

impl MqttPublisher {
    /// Create a new MQTT publisher for the hub called `hub`
    pub fn new(config: &MqttConfig, hub: &str) -> Self {
        let mut mqttoptions = MqttOptions::new(&config.client_id, &config.host, config.port);

        mqttoptions.set_keep_alive(Duration::from_secs(30));
        mqttoptions.set_clean_session(true);
        mqttoptions.set_last_will(LastWill::new(
            availability_topic(&config.topic_prefix, hub),
            "offline",
            QoS::AtLeastOnce,
            true,
        ));

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            mqttoptions.set_credentials(user, pass);
        }

        let (client, eventloop) = AsyncClient::new(mqttoptions, 100);
        let connected = Arc::new(AtomicBool::new(false));

        Self::spawn_event_loop(
            eventloop,
            connected.clone(),
            config.host.clone(),
            config.port,
        );

        info!(
            "MQTT publisher initialized: {}:{} (prefix: {}, qos: {})",
            config.host, config.port, config.topic_prefix, config.qos
        );

        Self {
            client,
            topic_prefix: config.topic_prefix.clone(),
            hub: hub.to_string(),
            qos: qos_level(config.qos),
            retain: config.retain,
            connected,
        }
    }

    /// Spawn the MQTT event loop handler
    fn spawn_event_loop(
        mut eventloop: EventLoop,
        connected: Arc<AtomicBool>,
        host: String,
        port: u16,
    ) {
        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        if ack.code == rumqttc::ConnectReturnCode::Success {
                            connected.store(true, Ordering::SeqCst);
                            info!("Connected to MQTT broker at {}:{}", host, port);
                        } else {
                            error!("MQTT connection rejected: {:?}", ack.code);
                        }
                    }
                    Ok(Event::Incoming(Packet::Disconnect)) => {
                        connected.store(false, Ordering::SeqCst);
                        warn!("Disconnected from MQTT broker");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        connected.store(false, Ordering::SeqCst);
                        error!("MQTT error: {:?}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Publish every quantity in a cycle update
    pub async fn publish_update(&self, update: &CycleUpdate) -> Result<()> {
        for record in &update.snapshot.quantities {
            let topic = quantity_topic(&self.topic_prefix, &self.hub, record.key);
            let payload_str = serde_json::to_string(&quantity_payload(record))
                .with_context(|| "Failed to serialize payload")?;

            self.client
                .publish(&topic, self.qos, self.retain, payload_str.as_bytes())
                .await
                .with_context(|| format!("Failed to publish to {}", topic))?;
        }

        debug!(
            "MQTT published {} quantities for {}",
            update.snapshot.quantities.len(),
            self.hub
        );

        Ok(())
    }

    /// Publish hub availability (online/offline), always retained
    pub async fn publish_availability(&self, online: bool) -> Result<()> {
        let topic = availability_topic(&self.topic_prefix, &self.hub);
        let payload = if online { "online" } else { "offline" };

        self.client
            .publish(&topic, QoS::AtLeastOnce, true, payload.as_bytes())
            .await
            .with_context(|| format!("Failed to publish status to {}", topic))?;

        info!("MQTT availability: {} = {}", topic, payload);

        Ok(())
    }

    /// Publish updates from the hub until the channel closes or shutdown
    pub async fn start_publishing(
        self: Arc<Self>,
        mut update_rx: broadcast::Receiver<CycleUpdate>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        info!("MQTT publishing loop started");

        if let Err(e) = self.publish_availability(true).await {
            error!("MQTT publish error: {}", e);
        }

        loop {
            tokio::select! {
                received = update_rx.recv() => match received {
                    Ok(update) => {
                        if let Err(e) = self.publish_update(&update).await {
                            error!("MQTT publish error: {}", e);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("MQTT publisher lagged, missed {} updates", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Hub update channel closed, stopping publisher");
                        break;
                    }
                },
                _ = shutdown.recv() => break,
            }
        }

        if let Err(e) = self.publish_availability(false).await {
            error!("MQTT publish error: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sunspec::testing::InverterFrame;
    use crate::sunspec::{inverter, DataStore};

    #[test]
    fn test_qos_mapping() {
        assert!(matches!(qos_level(0), QoS::AtMostOnce));
        assert!(matches!(qos_level(1), QoS::AtLeastOnce));
        assert!(matches!(qos_level(2), QoS::ExactlyOnce));
        assert!(matches!(qos_level(7), QoS::AtLeastOnce));
    }

    #[test]
    fn test_topic_format() {
        assert_eq!(
            quantity_topic("solaredge", "roof", "acpower"),
            "solaredge/roof/acpower"
        );
        assert_eq!(
            availability_topic("solaredge", "roof"),
            "solaredge/roof/availability"
        );
    }

    #[test]
    fn test_payload() {
        let mut store = DataStore::new();
        store.merge_inverter(&inverter::decode(&InverterFrame::default().block()).unwrap());

        let payload = quantity_payload(store.get("acpower").unwrap());
        assert_eq!(payload["value"], 2850.0);
        assert_eq!(payload["unit"], "W");
        assert_eq!(payload["name"], "AC Power");
        assert!(payload.get("description").is_none());

        let payload = quantity_payload(store.get("status").unwrap());
        assert_eq!(payload["value"], 4);
        assert!(payload["unit"].is_null());
        assert_eq!(payload["description"], "Inverter is ON and producing power");
    }
}
