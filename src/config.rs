use std::collections::HashMap;
use std::env;
use thiserror::Error;
use url::Url;

use crate::socket::protocol::EngineIo;

pub const HOST_KEY: &str = "host_ip";
pub const PORT_KEY: &str = "host_port";
pub const HARDWARE_KEY: &str = "hardware";
pub const ENGINE_IO_KEY: &str = "engine_io";

const DEFAULT_HARDWARE: &str = "Unknown";
const SOCKET_IO_PATH: &str = "/socket.io/";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("host_ip is not configured")]
    MissingHost,
    #[error("host_port is not configured")]
    MissingPort,
    #[error("host_port '{0}' is not a valid port number")]
    InvalidPort(String),
    #[error("engine_io '{0}' is not a supported Engine.IO revision (3 or 4)")]
    InvalidEngineIo(String),
    #[error("cannot build bridge URL: {0}")]
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationConfig {
    pub host: String,
    pub port: u16,
    pub hardware: String,
    /// Engine.IO revision of the bridge; decides who sends heartbeats
    pub engine_io: EngineIo,
}

impl StationConfig {
    /// Build from the host application's key/value section
    /// (`host_ip`, `host_port`, `hardware`, `engine_io`).
    pub fn from_map(values: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let host = values
            .get(HOST_KEY)
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
            .ok_or(ConfigError::MissingHost)?
            .to_string();

        let raw_port = values.get(PORT_KEY).ok_or(ConfigError::MissingPort)?;
        let port = raw_port
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort(raw_port.clone()))?;

        let hardware = values
            .get(HARDWARE_KEY)
            .cloned()
            .unwrap_or_else(|| DEFAULT_HARDWARE.to_string());

        let engine_io = match values.get(ENGINE_IO_KEY) {
            Some(raw) => raw.parse::<EngineIo>().map_err(ConfigError::InvalidEngineIo)?,
            None => EngineIo::default(),
        };

        Ok(StationConfig {
            host,
            port,
            hardware,
            engine_io,
        })
    }

    /// Load from HOST_IP / HOST_PORT / HARDWARE / ENGINE_IO, reading a `.env`
    /// file first
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut values = HashMap::new();
        for (var, key) in [
            ("HOST_IP", HOST_KEY),
            ("HOST_PORT", PORT_KEY),
            ("HARDWARE", HARDWARE_KEY),
            ("ENGINE_IO", ENGINE_IO_KEY),
        ] {
            if let Ok(value) = env::var(var) {
                values.insert(key.to_string(), value);
            }
        }

        Self::from_map(&values)
    }

    /// WebSocket endpoint of the bridge's Socket.IO server
    pub fn socket_url(&self) -> Result<Url, ConfigError> {
        let mut url = Url::parse(&format!("ws://{}:{}", self.host, self.port))
            .map_err(|e| ConfigError::Url(e.to_string()))?;
        url.set_path(SOCKET_IO_PATH);
        url.query_pairs_mut()
            .append_pair("EIO", self.engine_io.query_value())
            .append_pair("transport", "websocket");
        Ok(url)
    }
}
