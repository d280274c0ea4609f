//! Terminal fallback: plausible synthetic readings for environments with
//! no attached hardware (development, demos, CI).

use rand::Rng;

use crate::acquire::Fallback;
use crate::moisture::{MoistureReading, RawMoisture, ADC_FULL_SCALE};
use crate::temperature_humidity::ClimateReading;

pub const SOURCE: &str = "simulated";

pub const TEMPERATURE_C: (f32, f32) = (18.0, 22.0);
pub const HUMIDITY_PCT: (f32, f32) = (40.0, 50.0);
pub const MOISTURE_PCT: (f32, f32) = (30.0, 70.0);

pub fn climate() -> ClimateReading {
    let mut rng = rand::thread_rng();

    ClimateReading {
        humidity: round1(rng.gen_range(HUMIDITY_PCT.0..=HUMIDITY_PCT.1)),
        temperature: round1(rng.gen_range(TEMPERATURE_C.0..=TEMPERATURE_C.1)),
    }
}

pub fn moisture() -> MoistureReading {
    let mut rng = rand::thread_rng();
    let percent = round1(rng.gen_range(MOISTURE_PCT.0..=MOISTURE_PCT.1));
    // Synthesize the ADC count the analog probe would have reported.
    let raw = ADC_FULL_SCALE - (percent / 100.0 * ADC_FULL_SCALE as f32) as u16;

    MoistureReading {
        percent,
        raw: RawMoisture::Analog(raw),
    }
}

pub fn climate_fallback() -> Fallback<ClimateReading> {
    Fallback {
        label: SOURCE,
        generate: climate,
    }
}

pub fn moisture_fallback() -> Fallback<MoistureReading> {
    Fallback {
        label: SOURCE,
        generate: moisture,
    }
}

fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_decimal(value: f32) -> bool {
        ((value * 10.0).round() - value * 10.0).abs() < 1e-3
    }

    #[test]
    fn climate_stays_in_band() {
        for _ in 0..1000 {
            let reading = climate();

            assert!(reading.temperature >= TEMPERATURE_C.0);
            assert!(reading.temperature <= TEMPERATURE_C.1);
            assert!(reading.humidity >= HUMIDITY_PCT.0);
            assert!(reading.humidity <= HUMIDITY_PCT.1);
            assert!(one_decimal(reading.temperature));
            assert!(one_decimal(reading.humidity));
        }
    }

    #[test]
    fn moisture_stays_in_band() {
        for _ in 0..1000 {
            let reading = moisture();

            assert!(reading.percent >= MOISTURE_PCT.0);
            assert!(reading.percent <= MOISTURE_PCT.1);
            assert!(one_decimal(reading.percent));

            match reading.raw {
                RawMoisture::Analog(raw) => assert!(raw <= ADC_FULL_SCALE),
                RawMoisture::Digital(_) => panic!("simulated moisture is analog"),
            }
        }
    }
}
