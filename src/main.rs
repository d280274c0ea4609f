mod acquire;
mod config;
mod moisture;
mod reader;
mod sim;
mod temperature_humidity;
mod util;

use std::time::Duration;

use anyhow::Result;
use envconfig::Envconfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use reader::SensorReader;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::init_from_env()?;

    if !util::is_raspberry_pi() {
        warn!("not running on a Raspberry Pi, expect simulated readings");
    }

    let mut reader = SensorReader::from_config(&config);
    info!("strategy chains: {}", reader.describe());

    loop {
        let climate = reader.read_temperature_humidity().await;
        let fahrenheit = climate.value.into_fahrenheit();
        info!(
            source = climate.source,
            at = %climate.taken_at,
            "temperature {:.1} C ({:.1} F), humidity {:.1} %",
            climate.value.temperature,
            fahrenheit.temperature,
            climate.value.humidity
        );

        let moisture = reader.read_moisture().await;
        info!(
            source = moisture.source,
            "soil moisture {:.1} % ({:?})",
            moisture.value.percent,
            moisture.value.raw
        );

        tokio::time::sleep(Duration::from_secs(config.read_interval_secs)).await;
    }
}
