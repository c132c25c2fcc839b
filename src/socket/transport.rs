/// Event channel to the station bridge
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use crate::config::{ConfigError, StationConfig};
use crate::logging::StationLog;
use crate::socket::protocol::{
    decode_frame, ping_interval, EngineIo, Frame, ProtocolError, CONNECT, DEFAULT_NAMESPACE,
    DISCONNECT, PING, PONG,
};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("bridge refused the connection: {0}")]
    Refused(String),
}

type Callback = Arc<dyn Fn(&Value) + Send + Sync>;

/// One named event and the function invoked with its first argument
#[derive(Clone)]
pub struct EventHandler {
    name: String,
    callback: Callback,
}

impl EventHandler {
    pub fn new<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        EventHandler {
            name: name.into(),
            callback: Arc::new(callback),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dispatch(&self, payload: &Value) {
        (self.callback)(payload)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A reliable, ordered, named-event channel.
///
/// `serve` connects, delivers every event named like `handler` to it, and
/// returns when the peer goes away, the channel fails, or `shutdown` flips to
/// `true` (or its sender is dropped).
#[async_trait]
pub trait EventTransport: Send {
    async fn serve(
        &mut self,
        handler: &EventHandler,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), TransportError>;
}

/// Socket.IO client over a plain WebSocket, default namespace only
pub struct SocketIoTransport {
    url: Url,
    engine_io: EngineIo,
    log: Arc<dyn StationLog>,
}

impl SocketIoTransport {
    pub fn new(url: Url, engine_io: EngineIo, log: Arc<dyn StationLog>) -> Self {
        SocketIoTransport {
            url,
            engine_io,
            log,
        }
    }

    pub fn from_config(
        config: &StationConfig,
        log: Arc<dyn StationLog>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(config.socket_url()?, config.engine_io, log))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

fn stop_requested(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

fn heartbeat(period: Duration) -> Interval {
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticks
}

/// Next heartbeat tick, or never while no heartbeat is armed
async fn next_beat(ticks: &mut Option<Interval>) {
    match ticks {
        Some(ticks) => {
            ticks.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[async_trait]
impl EventTransport for SocketIoTransport {
    async fn serve(
        &mut self,
        handler: &EventHandler,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), TransportError> {
        if stop_requested(shutdown) {
            return Ok(());
        }

        let socket = tokio::select! {
            connected = connect_async(self.url.as_str()) => connected?.0,
            _ = shutdown.changed() => return Ok(()),
        };
        self.log.debug(&format!("WebSocket open to {}", self.url));
        let (mut sink, mut stream) = socket.split();
        // Armed on the open handshake when the client owns the heartbeat (v3)
        let mut beats: Option<Interval> = None;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || stop_requested(shutdown) {
                        // Best effort: the bridge may already be gone
                        let _ = sink.send(Message::Text(DISCONNECT.to_string())).await;
                        let _ = sink.close().await;
                        return Ok(());
                    }
                }
                _ = next_beat(&mut beats) => {
                    sink.send(Message::Text(PING.to_string())).await?;
                }
                message = stream.next() => {
                    let text = match message {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Ping(payload))) => {
                            sink.send(Message::Pong(payload)).await?;
                            continue;
                        }
                        Some(Ok(Message::Close(_))) | None => return Ok(()),
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => return Err(e.into()),
                    };

                    let frame = match decode_frame(&text) {
                        Ok(frame) => frame,
                        Err(e) => {
                            self.log.error(&format!("Ignoring undecodable frame: {}", e));
                            continue;
                        }
                    };

                    match frame {
                        Frame::Open(handshake) => {
                            if self.engine_io.client_sends_pings() {
                                beats = Some(heartbeat(ping_interval(&handshake)));
                            }
                            if self.engine_io.client_joins_namespace() {
                                sink.send(Message::Text(CONNECT.to_string())).await?;
                            }
                        }
                        Frame::Ping => sink.send(Message::Text(PONG.to_string())).await?,
                        Frame::Connected => self.log.debug("Joined default namespace"),
                        Frame::Event { namespace, name, .. } if namespace != DEFAULT_NAMESPACE => {
                            self.log.debug(&format!(
                                "Ignoring event '{}' from namespace {}",
                                name, namespace
                            ))
                        }
                        Frame::Event { name, args, .. } if name == handler.name() => {
                            handler.dispatch(args.first().unwrap_or(&Value::Null))
                        }
                        Frame::Event { name, .. } => {
                            self.log.debug(&format!("Ignoring unhandled event '{}'", name))
                        }
                        Frame::Close | Frame::Disconnected => return Ok(()),
                        Frame::ConnectError(message) => return Err(TransportError::Refused(message)),
                        Frame::Pong | Frame::Noop | Frame::Ack | Frame::Unsupported(_) => {}
                    }
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use tokio::sync::mpsc;

    /// Transport double fed from an in-process channel
    pub struct ChannelTransport {
        events: mpsc::UnboundedReceiver<(String, Value)>,
    }

    impl ChannelTransport {
        pub fn new() -> (mpsc::UnboundedSender<(String, Value)>, Self) {
            let (tx, rx) = mpsc::unbounded_channel();
            (tx, ChannelTransport { events: rx })
        }
    }

    #[async_trait]
    impl EventTransport for ChannelTransport {
        async fn serve(
            &mut self,
            handler: &EventHandler,
            shutdown: &mut watch::Receiver<bool>,
        ) -> Result<(), TransportError> {
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            return Ok(());
                        }
                    }
                    event = self.events.recv() => {
                        match event {
                            Some((name, payload)) if name == handler.name() => {
                                handler.dispatch(&payload)
                            }
                            Some(_) => {}
                            None => return Ok(()),
                        }
                    }
                }
            }
        }
    }
}
