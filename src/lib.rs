//! Ingestion adapter for a Knimbus weather-station bridge.
//!
//! A background task holds a Socket.IO connection to the bridge and turns
//! each `weather message` event into a metric [`Reading`]. The host pulls
//! readings from [`StationAdapter::readings`] at its own pace; only the
//! newest unconsumed reading is kept.

pub mod config;
pub mod logging;
pub mod models;
pub mod socket;
pub mod station;
pub mod utils;

pub use config::{ConfigError, StationConfig};
pub use logging::{FacadeLog, StationLog};
pub use models::{RawEvent, Reading, UnitSystem};
pub use socket::{
    ConnectionState, EventConnection, EventHandler, EventTransport, SocketIoTransport,
    TransportError,
};
pub use station::{ConvertError, ReadingRelay, StationAdapter};
