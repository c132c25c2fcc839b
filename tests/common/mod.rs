#![allow(dead_code)]

use async_trait::async_trait;
use knimbus_ingest::{EventHandler, EventTransport, StationConfig, StationLog, TransportError};
use serde_json::{json, Value};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
    Debug,
}

#[derive(Debug, Default)]
pub struct RecordingLog {
    entries: Mutex<Vec<(Level, String)>>,
}

impl RecordingLog {
    pub fn count(&self, level: Level, needle: &str) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|(l, m)| *l == level && m.contains(needle))
            .count()
    }

    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.count(level, needle) > 0
    }

    fn push(&self, level: Level, message: &str) {
        self.entries.lock().push((level, message.to_string()));
    }
}

impl StationLog for RecordingLog {
    fn info(&self, message: &str) {
        self.push(Level::Info, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }

    fn debug(&self, message: &str) {
        self.push(Level::Debug, message);
    }
}

/// Fires each payload after its delay, then idles until shut down
pub struct ScriptedTransport {
    script: Vec<(Duration, Value)>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<(Duration, Value)>) -> Self {
        ScriptedTransport { script }
    }
}

#[async_trait]
impl EventTransport for ScriptedTransport {
    async fn serve(
        &mut self,
        handler: &EventHandler,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), TransportError> {
        for (delay, payload) in self.script.drain(..) {
            tokio::select! {
                _ = sleep(delay) => handler.dispatch(&payload),
                _ = shutdown.changed() => return Ok(()),
            }
        }
        let _ = shutdown.changed().await;
        Ok(())
    }
}

/// Local bridge config with the default Engine.IO revision
pub fn config(port: u16) -> StationConfig {
    let section: HashMap<String, String> = [
        ("host_ip", "127.0.0.1".to_string()),
        ("host_port", port.to_string()),
        ("hardware", "WX1".to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    StationConfig::from_map(&section).unwrap()
}

pub fn config_with(port: u16, engine_io: &str) -> StationConfig {
    let section: HashMap<String, String> = [
        ("host_ip", "127.0.0.1".to_string()),
        ("host_port", port.to_string()),
        ("hardware", "WX1".to_string()),
        ("engine_io", engine_io.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    StationConfig::from_map(&section).unwrap()
}

pub fn weather_payload(temperature: i64, humidity: i64) -> Value {
    json!({
        "Temperature": temperature,
        "Humidity": humidity,
        "BaroTemperature": 2210,
        "BaroHumidity": 3800,
        "BaroPressure": 10132,
        "RainClicks": 250,
        "WindDirection": 270,
        "WindSpeed": 1000
    })
}
