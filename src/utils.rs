/// Wall-clock helpers shared by the converter and the host loop
use time::macros::format_description;
use time::OffsetDateTime;

/// Current wall-clock time as whole seconds since the Unix epoch
pub fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Format an epoch timestamp for human-readable logging
///
/// Renders DD.MM.YYYY - HH:MM:SS in UTC. Falls back to the raw number when
/// the timestamp is out of range.
pub fn format_datetime(timestamp: i64) -> String {
    let format = format_description!("[day].[month].[year] - [hour]:[minute]:[second]");
    OffsetDateTime::from_unix_timestamp(timestamp)
        .ok()
        .and_then(|dt| dt.format(&format).ok())
        .unwrap_or_else(|| timestamp.to_string())
}
