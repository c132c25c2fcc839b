pub mod adapter;
pub mod converter;
pub mod relay;

pub use adapter::{StationAdapter, POLL_INTERVAL_SECS, WEATHER_EVENT};
pub use converter::{convert, convert_payload, decode_payload, ConvertError};
pub use relay::ReadingRelay;
