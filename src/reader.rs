//! The facade the application layer talks to. Builds one strategy chain
//! per quantity and absorbs every hardware failure into a fallback.

use tracing::debug;

use crate::acquire::{Acquired, Chain};
use crate::config::AppConfig;
use crate::moisture::{DigitalProbe, Mcp3008Probe, MoistureReading, MoistureStrategy};
use crate::sim;
use crate::temperature_humidity::{ClimateReading, ClimateStrategy, EdgeTimedDht, MappedGpioDht};

pub struct SensorReader {
    climate: Chain<ClimateStrategy>,
    moisture: Chain<MoistureStrategy>,
}

impl SensorReader {
    /// Probe the hardware once and build both chains. Anything that does
    /// not come up is logged and left out; the simulated fallback keeps
    /// the reader usable either way.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut climate = Vec::new();
        match EdgeTimedDht::open(&config.gpio_chip, config.dht22_pin) {
            Ok(sensor) => climate.push(ClimateStrategy::EdgeTimed(sensor)),
            Err(e) => debug!(error = ?e, "gpio character device unusable for dht22"),
        }
        climate.push(ClimateStrategy::MappedGpio(MappedGpioDht::new(
            config.dht22_pin as u8,
        )));

        let mut moisture = Vec::new();
        match DigitalProbe::open(&config.gpio_chip, config.moisture_pin) {
            Ok(probe) => moisture.push(MoistureStrategy::Digital(probe)),
            Err(e) => debug!(error = ?e, "gpio character device unusable for moisture probe"),
        }
        match Mcp3008Probe::open(&config.spi_device, config.adc_channel) {
            Ok(probe) => moisture.push(MoistureStrategy::Analog(probe)),
            Err(e) => debug!(error = ?e, "spi adc unusable for moisture probe"),
        }

        Self::with_chains(
            Chain::new(climate, sim::climate_fallback()),
            Chain::new(moisture, sim::moisture_fallback()),
        )
    }

    pub fn with_chains(
        climate: Chain<ClimateStrategy>,
        moisture: Chain<MoistureStrategy>,
    ) -> Self {
        SensorReader { climate, moisture }
    }

    pub fn describe(&self) -> String {
        format!(
            "climate [{}], moisture [{}]",
            self.climate.describe(),
            self.moisture.describe()
        )
    }

    pub async fn read_temperature_humidity(&mut self) -> Acquired<ClimateReading> {
        self.climate.acquire().await
    }

    pub async fn read_moisture(&mut self) -> Acquired<MoistureReading> {
        self.moisture.acquire().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulated_only() -> SensorReader {
        SensorReader::with_chains(
            Chain::new(Vec::new(), sim::climate_fallback()),
            Chain::new(Vec::new(), sim::moisture_fallback()),
        )
    }

    #[tokio::test]
    async fn climate_falls_back_to_simulated_without_hardware() {
        let mut reader = simulated_only();

        let acquired = reader.read_temperature_humidity().await;

        assert_eq!(acquired.source, sim::SOURCE);
        assert!(acquired.value.temperature >= sim::TEMPERATURE_C.0);
        assert!(acquired.value.temperature <= sim::TEMPERATURE_C.1);
        assert!(acquired.value.humidity >= sim::HUMIDITY_PCT.0);
        assert!(acquired.value.humidity <= sim::HUMIDITY_PCT.1);
    }

    #[tokio::test]
    async fn moisture_falls_back_to_simulated_without_hardware() {
        let mut reader = simulated_only();

        let acquired = reader.read_moisture().await;

        assert_eq!(acquired.source, sim::SOURCE);
        assert!(acquired.value.percent >= sim::MOISTURE_PCT.0);
        assert!(acquired.value.percent <= sim::MOISTURE_PCT.1);
    }

    #[test]
    fn chain_description_ends_with_fallback() {
        let reader = simulated_only();

        assert_eq!(reader.describe(), "climate [simulated], moisture [simulated]");
    }
}
