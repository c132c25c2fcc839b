/// Leveled logging capability handed to each component at construction
use std::sync::Arc;

const PREFIX: &str = "KnimbusSocket";
const TARGET: &str = "knimbus";

/// Sink for the driver's diagnostics. Components receive one of these
/// instead of calling the `log` macros directly, so tests can capture output.
pub trait StationLog: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
    fn debug(&self, message: &str);
}

/// Forwards to the `log` facade with the fixed component prefix
#[derive(Debug, Clone, Copy, Default)]
pub struct FacadeLog;

impl FacadeLog {
    pub fn shared() -> Arc<dyn StationLog> {
        Arc::new(FacadeLog)
    }
}

impl StationLog for FacadeLog {
    fn info(&self, message: &str) {
        log::info!(target: TARGET, "{}: {}", PREFIX, message);
    }

    fn error(&self, message: &str) {
        log::error!(target: TARGET, "{}: {}", PREFIX, message);
    }

    fn debug(&self, message: &str) {
        log::debug!(target: TARGET, "{}: {}", PREFIX, message);
    }
}

/// Initialize env_logger for the binary
///
/// Honors RUST_LOG, defaulting to info level with second-resolution timestamps.
pub fn init() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .init();
}
