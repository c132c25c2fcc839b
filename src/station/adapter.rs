/// Host-facing lifecycle: open, pull readings, close
use futures_util::stream::{self, Stream};
use std::sync::Arc;
use tokio::time::{sleep, Duration};

use crate::config::{ConfigError, StationConfig};
use crate::logging::{FacadeLog, StationLog};
use crate::models::Reading;
use crate::socket::connection::{ConnectionState, EventConnection};
use crate::socket::transport::{EventHandler, EventTransport, SocketIoTransport};
use crate::station::converter::convert_payload;
use crate::station::relay::ReadingRelay;

/// Name of the event the bridge emits for each sensor sample
pub const WEATHER_EVENT: &str = "weather message";
pub const POLL_INTERVAL_SECS: u64 = 5;

pub struct StationAdapter {
    config: StationConfig,
    relay: Arc<ReadingRelay>,
    connection: EventConnection,
    log: Arc<dyn StationLog>,
}

impl StationAdapter {
    /// Open the bridge connection over Socket.IO, logging through `log`
    pub async fn connect(config: StationConfig) -> Result<Self, ConfigError> {
        let log = FacadeLog::shared();
        let transport = SocketIoTransport::from_config(&config, Arc::clone(&log))?;
        Ok(Self::open(config, Box::new(transport), log).await)
    }

    /// Start the background connection on `transport` and wire its events
    /// through the converter into the relay.
    pub async fn open(
        config: StationConfig,
        transport: Box<dyn EventTransport>,
        log: Arc<dyn StationLog>,
    ) -> Self {
        log.info(&format!(
            "Connecting to socket on {} port {}",
            config.host, config.port
        ));

        let relay = Arc::new(ReadingRelay::new());
        let handler = weather_handler(Arc::clone(&relay), Arc::clone(&log));
        let connection = EventConnection::open(transport, handler, Arc::clone(&log)).await;

        log.info(&format!(
            "Connected to host {} on port {}",
            config.host, config.port
        ));

        StationAdapter {
            config,
            relay,
            connection,
            log,
        }
    }

    pub fn hardware_name(&self) -> &str {
        &self.config.hardware
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Take whatever the relay holds, valid or not
    pub fn consume(&self) -> Option<Reading> {
        self.relay.consume()
    }

    /// One poll cycle: take the pending reading and drop it if it is the
    /// all-zero sentinel.
    pub fn poll_once(&self) -> Option<Reading> {
        let reading = self.relay.consume()?;
        self.log.info("Retrieved packet");
        self.log.debug(&format!("{:?}", reading));

        if !reading.is_valid() {
            self.log.info("Bad packet data, discarding");
            return None;
        }
        Some(reading)
    }

    /// Endless stream of valid readings, polled every `POLL_INTERVAL_SECS`.
    ///
    /// Ends once the adapter is closed.
    pub fn readings(&self) -> impl Stream<Item = Reading> + '_ {
        stream::unfold(self, |adapter| async move {
            loop {
                sleep(Duration::from_secs(POLL_INTERVAL_SECS)).await;
                if adapter.relay.is_closed() {
                    return None;
                }
                if let Some(reading) = adapter.poll_once() {
                    return Some((reading, adapter));
                }
            }
        })
    }

    /// Drop any pending reading and signal the connection to close.
    /// Returns without waiting for the background task.
    pub fn close(&self) {
        self.relay.close();
        self.connection.disconnect();
    }

    /// Close, then wait up to `timeout` for the background task to finish
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.close();
        self.connection.join(timeout).await
    }
}

fn weather_handler(relay: Arc<ReadingRelay>, log: Arc<dyn StationLog>) -> EventHandler {
    EventHandler::new(WEATHER_EVENT, move |payload| {
        log.debug(&format!("weather message: {}", payload));
        match convert_payload(payload) {
            Ok(reading) => {
                if relay.publish(reading) {
                    log.debug("Unconsumed reading replaced by newer one");
                }
            }
            Err(e) => log.error(&format!("Discarding weather message: {}", e)),
        }
    })
}
