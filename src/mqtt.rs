//! Publishing over MQTT.

use crate::config::{Credentials, MqttConfig};
use log::{debug, info, trace, warn};
use rumqttc::{
    Client, ClientError, ConnectReturnCode, Connection, ConnectionError, Event, MqttOptions,
    Packet, QoS,
};
use std::{
    thread::{self, JoinHandle},
    time::Duration,
};
use thiserror::Error;

const REQUEST_CAPACITY: usize = 10;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Sends a message body to a topic.
pub trait Publisher {
    type Error;

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), Self::Error>;
}

impl<P: Publisher + ?Sized> Publisher for &mut P {
    type Error = P::Error;

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), Self::Error> {
        (**self).publish(topic, payload)
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("MQTT connection failed: {0}")]
    Connection(#[from] ConnectionError),
    #[error("broker refused the connection: {0:?}")]
    Refused(ConnectReturnCode),
    #[error("MQTT connection closed before the broker answered")]
    Closed,
    #[error("MQTT request failed: {0}")]
    Client(#[from] ClientError),
    #[error("failed to start the MQTT event loop: {0}")]
    Worker(#[from] std::io::Error),
}

/// MQTT client whose event loop runs on a background thread.
pub struct MqttPublisher {
    client: Client,
    worker: Option<JoinHandle<()>>,
}

impl MqttPublisher {
    /// Connects to the broker and waits for its acknowledgement. A refused
    /// connection (bad credentials, unknown client) is an error rather than
    /// something to retry.
    pub fn connect(config: &MqttConfig, credentials: &Credentials) -> Result<Self, PublishError> {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_credentials(&credentials.user, &credentials.password);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));

        let (mut client, mut connection) = Client::new(options, REQUEST_CAPACITY);

        info!("connecting to {}:{}", config.host, config.port);
        wait_for_connack(&mut connection)?;
        info!("connected to {} as {}", config.host, config.client_id);

        if let Some(topic) = &config.subscribe_topic {
            client.subscribe(topic, QoS::AtMostOnce)?;
            info!("subscribed to {}", topic);
        }

        let worker = thread::Builder::new()
            .name("mqtt".to_string())
            .spawn(move || run_event_loop(connection))?;

        Ok(Self {
            client,
            worker: Some(worker),
        })
    }

    /// Disconnects from the broker and waits for the event loop to stop.
    pub fn disconnect(mut self) -> Result<(), PublishError> {
        self.client.disconnect()?;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("MQTT event loop panicked");
            }
        }

        Ok(())
    }
}

impl Publisher for MqttPublisher {
    type Error = PublishError;

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), PublishError> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload.as_bytes().to_vec())?;

        Ok(())
    }
}

fn wait_for_connack(connection: &mut Connection) -> Result<(), PublishError> {
    for notification in connection.iter() {
        match notification? {
            Event::Incoming(Packet::ConnAck(ack)) => {
                return match ack.code {
                    ConnectReturnCode::Success => Ok(()),
                    code => Err(PublishError::Refused(code)),
                };
            }
            event => trace!("waiting for CONNACK: {:?}", event),
        }
    }

    Err(PublishError::Closed)
}

fn run_event_loop(mut connection: Connection) {
    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Packet::Publish(message))) => {
                match serde_json::from_slice::<serde_json::Value>(&message.payload) {
                    Ok(body) => debug!("received on {}: {}", message.topic, body),
                    Err(error) => warn!("ignoring non-JSON message on {}: {}", message.topic, error),
                }
            }
            Ok(Event::Outgoing(rumqttc::Outgoing::Disconnect)) => {
                debug!("disconnecting");
                break;
            }
            Ok(event) => trace!("{:?}", event),
            Err(error) => {
                warn!("MQTT connection lost: {}, reconnecting in {:?}", error, RECONNECT_DELAY);
                thread::sleep(RECONNECT_DELAY);
            }
        }
    }
}
