//! MQTT transport adapter (ESP-IDF only).
//!
//! Implements [`StatusTransport`] on top of `esp_idf_svc`'s MQTT client.
//! Inbound payloads on the command topic are copied into the
//! [`inbox`](crate::inbox); the control loop picks them up on its next
//! iteration.  The client reconnects on its own; the subscription is
//! re-issued from `poll` after every reconnect, and the status publisher
//! then re-announces the current state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};
use log::{info, warn};

use crate::app::ports::StatusTransport;
use crate::error::TransportError;
use crate::inbox;

use super::status_publisher::TopicString;

pub struct MqttTransport {
    client: EspMqttClient<'static>,
    connected: Arc<AtomicBool>,
    subscribed: bool,
    command_topic: TopicString,
}

impl MqttTransport {
    pub fn connect(
        broker_url: &str,
        client_id: &str,
        command_topic: TopicString,
    ) -> Result<Self, TransportError> {
        let connected = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&connected);

        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            ..Default::default()
        };

        let client = EspMqttClient::new_cb(broker_url, &conf, move |event| match event.payload() {
            EventPayload::Connected(_) => {
                info!("MQTT: connected");
                flag.store(true, Ordering::Release);
            }
            EventPayload::Disconnected => {
                warn!("MQTT: disconnected");
                flag.store(false, Ordering::Release);
            }
            EventPayload::Received { data, .. } => match core::str::from_utf8(data) {
                Ok(text) => {
                    if !inbox::push_command(text) {
                        warn!("MQTT: command dropped");
                    }
                }
                Err(_) => warn!("MQTT: non-UTF-8 command ignored"),
            },
            _ => {}
        })
        .map_err(|e| {
            warn!("MQTT: client init failed: {}", e);
            TransportError::NotConnected
        })?;

        info!("MQTT: client '{}' -> {}", client_id, broker_url);
        Ok(Self {
            client,
            connected,
            subscribed: false,
            command_topic,
        })
    }

}

impl StatusTransport for MqttTransport {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), TransportError> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload.as_bytes())
            .map(|_| ())
            .map_err(|_| TransportError::PublishFailed)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Re-subscribe after (re)connect.  `true` once per fresh session.
    fn poll(&mut self) -> Result<bool, TransportError> {
        if !self.connected.load(Ordering::Acquire) {
            self.subscribed = false;
            return Ok(false);
        }
        if self.subscribed {
            return Ok(false);
        }
        self.client
            .subscribe(self.command_topic.as_str(), QoS::AtLeastOnce)
            .map_err(|_| TransportError::SubscribeFailed)?;
        self.subscribed = true;
        info!("MQTT: subscribed to {}", self.command_topic);
        Ok(true)
    }
}
