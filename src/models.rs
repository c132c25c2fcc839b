use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// Unit system tag carried by every reading, using the weewx numeric code.
/// Readings are always metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSystem {
    Metric,
}

impl UnitSystem {
    pub fn code(self) -> u8 {
        match self {
            UnitSystem::Metric => 0x10,
        }
    }
}

impl Serialize for UnitSystem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// One sample exactly as the station bridge sent it: sensor field name to
/// station-native integer (e.g. temperature x 100).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEvent {
    fields: HashMap<String, i64>,
}

impl RawEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for assembling events by hand.
    pub fn with(mut self, name: &str, value: i64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: i64) {
        self.fields.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.fields.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, i64)> for RawEvent {
    fn from_iter<I: IntoIterator<Item = (K, i64)>>(iter: I) -> Self {
        RawEvent {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Normalized reading in canonical units: °C, %, hPa, mm, degrees, km/h.
///
/// Serializes as a weewx loop packet so a host application can consume it
/// without knowing this crate's field names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    /// Seconds since the epoch, taken when the event was decoded.
    #[serde(rename = "dateTime")]
    pub timestamp: i64,
    #[serde(rename = "usUnits")]
    pub unit_system: UnitSystem,
    #[serde(rename = "outTemp")]
    pub outdoor_temperature: f64,
    #[serde(rename = "outHumidity")]
    pub outdoor_humidity: f64,
    #[serde(rename = "inTemp")]
    pub indoor_temperature: f64,
    #[serde(rename = "inHumidity")]
    pub indoor_humidity: f64,
    pub pressure: f64,
    #[serde(rename = "rain")]
    pub rain_accumulation: f64,
    #[serde(rename = "windDir")]
    pub wind_direction: f64,
    #[serde(rename = "windSpeed")]
    pub wind_speed: f64,
}

impl Reading {
    /// The bridge reports a corrupt or empty sample as zero outdoor
    /// temperature together with zero outdoor humidity.
    pub fn is_valid(&self) -> bool {
        !(self.outdoor_humidity == 0.0 && self.outdoor_temperature == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reading(outdoor_temperature: f64, outdoor_humidity: f64) -> Reading {
        Reading {
            timestamp: 1_500_000_000,
            unit_system: UnitSystem::Metric,
            outdoor_temperature,
            outdoor_humidity,
            indoor_temperature: 20.0,
            indoor_humidity: 40.0,
            pressure: 1013.2,
            rain_accumulation: 0.0,
            wind_direction: 180.0,
            wind_speed: 3.2,
        }
    }

    #[test]
    fn sentinel_reading_is_invalid() {
        assert!(!reading(0.0, 0.0).is_valid());
    }

    #[test]
    fn single_zero_field_is_still_valid() {
        assert!(reading(0.0, 55.0).is_valid());
        assert!(reading(-3.5, 0.0).is_valid());
        assert!(reading(12.25, 60.5).is_valid());
    }

    #[test]
    fn negative_zero_counts_as_sentinel() {
        assert!(!reading(-0.0, 0.0).is_valid());
    }

    #[test]
    fn serializes_as_weewx_packet() {
        let value = serde_json::to_value(reading(21.5, 45.0)).unwrap();
        assert_eq!(value["dateTime"], json!(1_500_000_000));
        assert_eq!(value["usUnits"], json!(16));
        assert_eq!(value["outTemp"], json!(21.5));
        assert_eq!(value["outHumidity"], json!(45.0));
        assert_eq!(value["windDir"], json!(180.0));
        assert!(value.get("outdoor_temperature").is_none());
    }

    #[test]
    fn raw_event_collects_from_pairs() {
        let raw: RawEvent = vec![("Temperature", 2150), ("Humidity", 4500)]
            .into_iter()
            .collect();
        assert_eq!(raw.get("Temperature"), Some(2150));
        assert_eq!(raw.get("WindSpeed"), None);
        assert_eq!(raw.len(), 2);
    }
}
