//! BrokerSink - MQTT publish path for raw frames
//!
//! The client is created once at sink construction and reused across frames;
//! a background task drives the rumqttc event loop and tracks connectivity
//! so publish failures can be classified as connection vs. transmit errors.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{ContractError, FrameBuffer, FrameSink, SinkStatus};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS, Transport};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Configuration for BrokerSink
#[derive(Debug, Clone)]
pub struct BrokerSinkConfig {
    /// Broker hostname
    pub host: String,
    /// Broker port
    pub port: u16,
    /// MQTT client identifier
    pub client_id: String,
    /// Publish topic for frame payloads
    pub topic: String,
    /// Credentials
    pub username: Option<String>,
    pub password: Option<String>,
    /// PEM trust material for TLS (None = plain TCP)
    pub ca_path: Option<PathBuf>,
    /// Refuse publishes when trust material is configured but unreadable.
    /// With `false` the sink falls back to plain TCP and warns once.
    pub fail_closed: bool,
    /// MQTT keep-alive interval
    pub keep_alive: Duration,
    /// Client request queue capacity
    pub request_capacity: usize,
}

impl Default for BrokerSinkConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "camrelay".to_string(),
            topic: "camrelay/frames".to_string(),
            username: None,
            password: None,
            ca_path: None,
            fail_closed: true,
            keep_alive: Duration::from_secs(60),
            request_capacity: 10,
        }
    }
}

/// Sink that publishes raw frame payloads to an MQTT broker
pub struct BrokerSink {
    name: String,
    topic: String,
    client: AsyncClient,
    connected: Arc<AtomicBool>,
    driver: JoinHandle<()>,
    /// Latched at construction when trust material was missing and the
    /// policy is fail-closed; every publish reports it instead of sending.
    config_error: Option<(String, String)>,
}

impl BrokerSink {
    /// Create the sink and start its connection driver
    ///
    /// Configuration is validated before any publish can happen. A missing
    /// trust-material file is reported here once; whether publishes are then
    /// refused or attempted over plain TCP is the `fail_closed` choice, never
    /// a silent default.
    pub fn connect(name: impl Into<String>, config: BrokerSinkConfig) -> Self {
        let name = name.into();
        let mut config_error = None;

        let transport = match &config.ca_path {
            Some(path) => match std::fs::read(path) {
                Ok(ca) => Some(Transport::tls(ca, None, None)),
                Err(e) => {
                    error!(
                        sink = %name,
                        path = %path.display(),
                        error = %e,
                        fail_closed = config.fail_closed,
                        "broker trust material unreadable"
                    );
                    if config.fail_closed {
                        config_error = Some((
                            "broker trust material".to_string(),
                            path.display().to_string(),
                        ));
                    } else {
                        warn!(sink = %name, "proceeding without TLS (fail_closed = false)");
                    }
                    None
                }
            },
            None => None,
        };

        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(config.keep_alive);
        options.set_clean_session(true);
        if let Some(user) = &config.username {
            options.set_credentials(user, config.password.as_deref().unwrap_or_default());
        }
        if let Some(transport) = transport {
            options.set_transport(transport);
        }

        let (client, mut eventloop) = AsyncClient::new(options, config.request_capacity);

        let connected = Arc::new(AtomicBool::new(false));
        let driver_connected = Arc::clone(&connected);
        let driver_name = name.clone();

        // Drive the protocol state machine; connectivity flips on ConnAck
        // and on any poll error.
        let driver = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!(sink = %driver_name, "broker connection established");
                        driver_connected.store(true, Ordering::SeqCst);
                    }
                    Ok(Event::Incoming(Packet::Disconnect)) => {
                        warn!(sink = %driver_name, "broker sent disconnect");
                        driver_connected.store(false, Ordering::SeqCst);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        debug!(sink = %driver_name, error = %e, "broker event loop error");
                        driver_connected.store(false, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Self {
            name,
            topic: config.topic,
            client,
            connected,
            driver,
            config_error,
        }
    }

    /// Whether the broker link is currently up
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl FrameSink for BrokerSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn emit(&mut self, frame: &FrameBuffer) -> Result<SinkStatus, ContractError> {
        if let Some((what, path)) = &self.config_error {
            return Err(ContractError::configuration_missing(what, path));
        }

        if !self.is_connected() {
            return Err(ContractError::sink_connection(
                &self.name,
                format!("broker not connected (topic '{}')", self.topic),
            ));
        }

        self.client
            .publish(
                &self.topic,
                QoS::AtLeastOnce,
                false,
                frame.payload.to_vec(),
            )
            .await
            .map_err(|e| ContractError::sink_transmit(&self.name, e.to_string()))?;

        debug!(sink = %self.name, seq = frame.seq, topic = %self.topic, "frame published");
        Ok(SinkStatus::Published {
            topic: self.topic.clone(),
        })
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        // Best effort; the broker may already be gone
        let _ = self.client.disconnect().await;
        self.driver.abort();
        debug!(sink = %self.name, "BrokerSink closed");
        Ok(())
    }
}
