//! Soil moisture probes: a digital comparator module on a GPIO line and
//! an analog capacitive probe behind an MCP3008 ADC.

use std::io;

use gpio_cdev::{Chip, Line, LineHandle, LineRequestFlags};
use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};

use crate::acquire::{Outcome, Strategy};
use crate::util::LazyInit;

/// Logic level the comparator output settles at in conductive soil.
/// Calibration constant: the module pulls its output low when wet and
/// the line idles high through the pull-up.
pub const WET_LEVEL: u8 = 0;

/// MCP3008 is a 10-bit converter.
pub const ADC_FULL_SCALE: u16 = 1023;

const SPI_CLOCK_HZ: u32 = 1_350_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoistureReading {
    pub percent: f32,
    pub raw: RawMoisture,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawMoisture {
    Digital(u8),
    Analog(u16),
}

pub fn level_to_percent(level: u8) -> f32 {
    if level == WET_LEVEL {
        100.0
    } else {
        0.0
    }
}

/// Wetter soil conducts more and reads lower, so the scale is inverted.
pub fn scale_adc(raw: u16) -> f32 {
    let raw = raw.min(ADC_FULL_SCALE);
    (ADC_FULL_SCALE - raw) as f32 / ADC_FULL_SCALE as f32 * 100.0
}

/// Start bit, single-ended mode, channel select, then a padding byte to
/// clock the sample out.
pub fn channel_command(channel: u8) -> [u8; 3] {
    [1, (8 + channel) << 4, 0]
}

pub fn assemble_sample(high: u8, low: u8) -> u16 {
    (((high & 3) as u16) << 8) | low as u16
}

pub enum MoistureStrategy {
    Digital(DigitalProbe),
    Analog(Mcp3008Probe),
}

impl Strategy for MoistureStrategy {
    type Reading = MoistureReading;

    fn label(&self) -> &'static str {
        match self {
            MoistureStrategy::Digital(_) => "gpio-digital",
            MoistureStrategy::Analog(_) => "mcp3008",
        }
    }

    async fn sample(&mut self) -> Outcome<MoistureReading> {
        match self {
            MoistureStrategy::Digital(probe) => probe.sample(),
            MoistureStrategy::Analog(probe) => probe.sample(),
        }
    }
}

pub struct DigitalProbe {
    line: Line,
    handle: LazyInit<LineHandle>,
}

impl DigitalProbe {
    pub fn open(chip_path: &str, pin: u32) -> Result<Self, gpio_cdev::Error> {
        let mut chip = Chip::new(chip_path)?;
        let line = chip.get_line(pin)?;

        Ok(DigitalProbe {
            line,
            handle: LazyInit::new(),
        })
    }

    fn sample(&mut self) -> Outcome<MoistureReading> {
        let line = &self.line;
        let handle = match self
            .handle
            .get_or_try_init(|| line.request(LineRequestFlags::INPUT, 0, "soil-moisture"))
        {
            Ok(handle) => handle,
            Err(e) => return Outcome::Unavailable(format!("{:?}", e)),
        };

        match handle.get_value() {
            Ok(level) => Outcome::Reading(MoistureReading {
                percent: level_to_percent(level),
                raw: RawMoisture::Digital(level),
            }),
            Err(e) => Outcome::Transient(format!("{:?}", e)),
        }
    }
}

pub struct Mcp3008Probe {
    spi: Spidev,
    channel: u8,
}

impl Mcp3008Probe {
    pub fn open(spi_path: &str, channel: u8) -> io::Result<Self> {
        if channel > 7 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "MCP3008 has channels 0-7",
            ));
        }

        let mut spi = Spidev::open(spi_path)?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(SPI_CLOCK_HZ)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options)?;

        Ok(Mcp3008Probe { spi, channel })
    }

    fn sample(&mut self) -> Outcome<MoistureReading> {
        match self.acquire_raw() {
            Ok(raw) => Outcome::Reading(MoistureReading {
                percent: scale_adc(raw),
                raw: RawMoisture::Analog(raw),
            }),
            Err(e) => Outcome::Transient(e.to_string()),
        }
    }

    fn acquire_raw(&mut self) -> io::Result<u16> {
        let tx = channel_command(self.channel);
        let mut rx = [0_u8; 3];

        {
            let mut transfer = SpidevTransfer::read_write(&tx, &mut rx);
            self.spi.transfer(&mut transfer)?;
        }

        Ok(assemble_sample(rx[1], rx[2]))
    }
}
