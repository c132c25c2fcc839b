/// Conversion of station-native event payloads into canonical readings
use serde_json::Value;
use thiserror::Error;

use crate::models::{RawEvent, Reading, UnitSystem};
use crate::utils::unix_now;

pub const TEMPERATURE: &str = "Temperature";
pub const HUMIDITY: &str = "Humidity";
pub const BARO_TEMPERATURE: &str = "BaroTemperature";
pub const BARO_HUMIDITY: &str = "BaroHumidity";
pub const BARO_PRESSURE: &str = "BaroPressure";
pub const RAIN_CLICKS: &str = "RainClicks";
pub const WIND_DIRECTION: &str = "WindDirection";
pub const WIND_SPEED: &str = "WindSpeed";

/// Every field a payload must carry to produce a reading
pub const REQUIRED_FIELDS: [&str; 8] = [
    TEMPERATURE,
    HUMIDITY,
    BARO_TEMPERATURE,
    BARO_HUMIDITY,
    BARO_PRESSURE,
    RAIN_CLICKS,
    WIND_DIRECTION,
    WIND_SPEED,
];

// Station-native fixed-point scales
const HUNDREDTHS: f64 = 100.0;
const TENTHS: f64 = 10.0;
const RAIN_CLICKS_PER_UNIT: i64 = 100;
const KMH_PER_MPH: f64 = 1.609344;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvertError {
    #[error("missing sensor field '{0}'")]
    MissingField(String),
    #[error("sensor field '{0}' is not an integer")]
    NotAnInteger(String),
    #[error("payload is not a key/value object (got {0})")]
    MalformedPayload(&'static str),
}

/// Decode one event argument from the transport into a raw event
///
/// Non-integer values are tolerated on fields we do not read; on a required
/// field they reject the whole payload. Integral floats (e.g. `2150.0`) are
/// accepted as integers.
pub fn decode_payload(payload: &Value) -> Result<RawEvent, ConvertError> {
    let object = payload
        .as_object()
        .ok_or_else(|| ConvertError::MalformedPayload(json_kind(payload)))?;

    let mut raw = RawEvent::new();
    for (name, value) in object {
        match as_integer(value) {
            Some(v) => raw.insert(name, v),
            None if REQUIRED_FIELDS.contains(&name.as_str()) => {
                return Err(ConvertError::NotAnInteger(name.clone()))
            }
            None => {}
        }
    }
    Ok(raw)
}

/// Convert a raw event, stamping it with the current wall clock
pub fn convert(raw: &RawEvent) -> Result<Reading, ConvertError> {
    convert_at(raw, unix_now())
}

/// Convert a raw event using an explicit timestamp
///
/// Either every field is converted or no reading is produced.
pub fn convert_at(raw: &RawEvent, timestamp: i64) -> Result<Reading, ConvertError> {
    let temperature = field(raw, TEMPERATURE)?;
    let humidity = field(raw, HUMIDITY)?;
    let baro_temperature = field(raw, BARO_TEMPERATURE)?;
    let baro_humidity = field(raw, BARO_HUMIDITY)?;
    let baro_pressure = field(raw, BARO_PRESSURE)?;
    let rain_clicks = field(raw, RAIN_CLICKS)?;
    let wind_direction = field(raw, WIND_DIRECTION)?;
    let wind_speed = field(raw, WIND_SPEED)?;

    Ok(Reading {
        timestamp,
        unit_system: UnitSystem::Metric,
        outdoor_temperature: temperature as f64 / HUNDREDTHS,
        outdoor_humidity: humidity as f64 / HUNDREDTHS,
        indoor_temperature: baro_temperature as f64 / HUNDREDTHS,
        indoor_humidity: baro_humidity as f64 / HUNDREDTHS,
        pressure: baro_pressure as f64 / TENTHS,
        // Whole units only: the bridge's counter is floor-divided
        rain_accumulation: rain_clicks.div_euclid(RAIN_CLICKS_PER_UNIT) as f64,
        wind_direction: wind_direction as f64,
        wind_speed: (wind_speed as f64 / HUNDREDTHS) * KMH_PER_MPH,
    })
}

/// Decode and convert in one step, as the event callback does
pub fn convert_payload(payload: &Value) -> Result<Reading, ConvertError> {
    decode_payload(payload).and_then(|raw| convert(&raw))
}

fn field(raw: &RawEvent, name: &str) -> Result<i64, ConvertError> {
    raw.get(name)
        .ok_or_else(|| ConvertError::MissingField(name.to_string()))
}

fn as_integer(value: &Value) -> Option<i64> {
    if let Some(v) = value.as_i64() {
        return Some(v);
    }
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
        .map(|f| f as i64)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> RawEvent {
        RawEvent::new()
            .with(TEMPERATURE, 2150)
            .with(HUMIDITY, 4525)
            .with(BARO_TEMPERATURE, 2210)
            .with(BARO_HUMIDITY, 3800)
            .with(BARO_PRESSURE, 10132)
            .with(RAIN_CLICKS, 250)
            .with(WIND_DIRECTION, 270)
            .with(WIND_SPEED, 1000)
    }

    #[test]
    fn applies_station_scale_factors() {
        let reading = convert_at(&sample(), 1_496_597_640).unwrap();
        assert_eq!(reading.timestamp, 1_496_597_640);
        assert_eq!(reading.unit_system, UnitSystem::Metric);
        assert_eq!(reading.outdoor_temperature, 21.5);
        assert_eq!(reading.outdoor_humidity, 45.25);
        assert_eq!(reading.indoor_temperature, 22.1);
        assert_eq!(reading.indoor_humidity, 38.0);
        assert_eq!(reading.pressure, 1013.2);
        assert_eq!(reading.wind_direction, 270.0);
        assert!((reading.wind_speed - 16.09344).abs() < 1e-9);
    }

    #[test]
    fn rain_uses_integer_division() {
        let reading = convert_at(&sample(), 0).unwrap();
        assert_eq!(reading.rain_accumulation, 2.0);

        let reading = convert_at(&sample().with(RAIN_CLICKS, 99), 0).unwrap();
        assert_eq!(reading.rain_accumulation, 0.0);
    }

    #[test]
    fn negative_temperatures_keep_their_fraction() {
        let reading = convert_at(&sample().with(TEMPERATURE, -725), 0).unwrap();
        assert_eq!(reading.outdoor_temperature, -7.25);
    }

    #[test]
    fn any_missing_field_fails_without_reading() {
        for missing in REQUIRED_FIELDS {
            let raw: RawEvent = REQUIRED_FIELDS
                .iter()
                .filter(|name| **name != missing)
                .map(|name| (*name, 100))
                .collect();
            assert_eq!(
                convert_at(&raw, 0),
                Err(ConvertError::MissingField(missing.to_string())),
                "field {missing}"
            );
        }
    }

    #[test]
    fn convert_stamps_wall_clock_time() {
        let before = unix_now();
        let reading = convert(&sample()).unwrap();
        assert!(reading.timestamp >= before);
        assert!(reading.timestamp <= unix_now());
    }

    #[test]
    fn decodes_object_payload_and_ignores_extras() {
        let raw = decode_payload(&json!({
            "Temperature": 2150,
            "Humidity": 4500.0,
            "StationName": "roof",
            "Battery": 3.7
        }))
        .unwrap();
        assert_eq!(raw.get(TEMPERATURE), Some(2150));
        assert_eq!(raw.get(HUMIDITY), Some(4500));
        assert_eq!(raw.get("StationName"), None);
        assert_eq!(raw.len(), 2);
    }

    #[test]
    fn rejects_non_integer_required_field() {
        assert_eq!(
            decode_payload(&json!({ "Temperature": "hot" })),
            Err(ConvertError::NotAnInteger("Temperature".into()))
        );
        assert_eq!(
            decode_payload(&json!({ "WindSpeed": 10.5 })),
            Err(ConvertError::NotAnInteger("WindSpeed".into()))
        );
    }

    #[test]
    fn rejects_non_object_payload() {
        assert_eq!(
            decode_payload(&json!([1, 2, 3])),
            Err(ConvertError::MalformedPayload("array"))
        );
        assert_eq!(
            convert_payload(&Value::Null),
            Err(ConvertError::MalformedPayload("null"))
        );
    }

    #[test]
    fn convert_payload_reports_missing_field() {
        assert_eq!(
            convert_payload(&json!({ "Temperature": 2150 })),
            Err(ConvertError::MissingField("Humidity".into()))
        );
    }
}
