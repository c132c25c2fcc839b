use futures_util::StreamExt;
use log::{error, info, warn};
use tokio::time::Duration;

use knimbus_ingest::utils::format_datetime;
use knimbus_ingest::{logging, StationAdapter, StationConfig};

const SHUTDOWN_GRACE_SECS: u64 = 3;

/// Print each valid reading to stdout as one weewx-style JSON packet
async fn forward_readings(adapter: &StationAdapter) {
    let readings = adapter.readings();
    tokio::pin!(readings);

    while let Some(reading) = readings.next().await {
        info!(
            "Reading at {}: {:.2}°C, {:.2}%, {:.1} hPa, wind {:.1} km/h from {:.0}°",
            format_datetime(reading.timestamp),
            reading.outdoor_temperature,
            reading.outdoor_humidity,
            reading.pressure,
            reading.wind_speed,
            reading.wind_direction
        );

        match serde_json::to_string(&reading) {
            Ok(line) => println!("{}", line),
            Err(e) => error!("Failed to serialize reading: {}", e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    logging::init();

    // Load configuration
    let config = match StationConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let adapter = StationAdapter::connect(config).await?;
    info!("Station hardware: {}", adapter.hardware_name());

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        let _ = tx.send(());
    });

    tokio::select! {
        _ = forward_readings(&adapter) => {
            info!("Reading stream ended");
        }
        Ok(()) = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    if !adapter
        .shutdown(Duration::from_secs(SHUTDOWN_GRACE_SECS))
        .await
    {
        warn!("Bridge connection still open after {}s, abandoning it", SHUTDOWN_GRACE_SECS);
    }

    Ok(())
}
