//! DHT22 acquisition strategies.
//!
//! Two backends are tried: kernel edge timestamps over the GPIO character
//! device, then the memory-mapped driver behind /dev/gpiomem. There is no
//! userspace busy-wait decoder; the 26-70us pulse discrimination cannot be
//! held from a preemptible process, so when both backends fail the chain
//! falls through to simulated data.

use std::path::Path;
use std::time::Duration;

use futures::stream::StreamExt;
use gpio_cdev::{
    AsyncLineEventHandle, Chip, EventRequestFlags, EventType, Line, LineEvent, LineRequestFlags,
};

use crate::acquire::{Outcome, Strategy};
use crate::util::bits_to_byte;

const READ_ATTEMPTS: u32 = 3;
// The sensor needs 2s between conversions; retrying faster just re-reads
// the previous frame.
const RESAMPLE_DELAY: Duration = Duration::from_secs(2);
const FRAME_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub humidity: f32,
    pub temperature: f32,
}

#[derive(Debug, PartialEq)]
pub enum DecodeError {
    TruncatedFrame,
    BadChecksum,
}

#[derive(Debug)]
pub enum DhtError {
    InvalidAck,
    ShortRead,
    Gpio(gpio_cdev::Error),
}

impl ClimateReading {
    /// Decode a 40-bit frame: 16 bits humidity, 16 bits temperature
    /// (high bit is the sign), 8 bits checksum.
    pub fn from_frame(bits: &[u8]) -> Result<Self, DecodeError> {
        if bits.len() != 40 {
            return Err(DecodeError::TruncatedFrame);
        }

        let bytes: Vec<u8> = bits.chunks(8).map(bits_to_byte).collect();

        let checksum = bytes[4];
        let sum = bytes[0..4]
            .iter()
            .fold(0_u8, |sum, &byte| sum.wrapping_add(byte));
        if checksum != sum {
            return Err(DecodeError::BadChecksum);
        }

        let humidity = (((bytes[0] as u16) << 8) | bytes[1] as u16) as f32 / 10.0;
        let magnitude = (((bytes[2] & 0x7f) as u16) << 8) | bytes[3] as u16;
        let temperature = if bytes[2] & 0x80 != 0 {
            -(magnitude as f32) / 10.0
        } else {
            magnitude as f32 / 10.0
        };

        Ok(ClimateReading {
            humidity,
            temperature,
        })
    }

    pub fn into_fahrenheit(self) -> Self {
        ClimateReading {
            temperature: (self.temperature * 1.8) + 32.0,
            humidity: self.humidity,
        }
    }
}

pub enum ClimateStrategy {
    EdgeTimed(EdgeTimedDht),
    MappedGpio(MappedGpioDht),
}

impl Strategy for ClimateStrategy {
    type Reading = ClimateReading;

    fn label(&self) -> &'static str {
        match self {
            ClimateStrategy::EdgeTimed(_) => "dht22-cdev",
            ClimateStrategy::MappedGpio(_) => "dht22-gpiomem",
        }
    }

    fn ready(&self) -> bool {
        match self {
            ClimateStrategy::EdgeTimed(_) => true,
            ClimateStrategy::MappedGpio(sensor) => sensor.ready(),
        }
    }

    async fn sample(&mut self) -> Outcome<ClimateReading> {
        match self {
            ClimateStrategy::EdgeTimed(sensor) => sensor.sample().await,
            ClimateStrategy::MappedGpio(sensor) => sensor.sample().await,
        }
    }
}

/// Reads the sensor by timing line edges with kernel timestamps instead
/// of polling the pin from userspace.
pub struct EdgeTimedDht {
    line: Line,
}

impl EdgeTimedDht {
    pub fn open(chip_path: &str, pin: u32) -> Result<Self, gpio_cdev::Error> {
        let mut chip = Chip::new(chip_path)?;
        let line = chip.get_line(pin)?;

        Ok(EdgeTimedDht { line })
    }

    async fn sample(&mut self) -> Outcome<ClimateReading> {
        let mut last = String::new();

        for attempt in 0..READ_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(RESAMPLE_DELAY).await;
            }

            match tokio::time::timeout(FRAME_TIMEOUT, self.read_frame()).await {
                Err(_) => last = "timed out waiting for edge events".to_string(),
                Ok(Err(e)) => last = format!("{:?}", e),
                Ok(Ok(frame)) => match ClimateReading::from_frame(&frame) {
                    Ok(reading) => return Outcome::Reading(reading),
                    Err(e) => last = format!("{:?}", e),
                },
            }
        }

        Outcome::Transient(last)
    }

    async fn read_frame(&self) -> Result<Vec<u8>, DhtError> {
        Self::send_start_signal(&self.line)
            .await
            .map_err(DhtError::Gpio)?;

        let line_evt_handle = self
            .line
            .events(
                LineRequestFlags::INPUT,
                EventRequestFlags::BOTH_EDGES,
                "read-sensor-data",
            )
            .map_err(DhtError::Gpio)?;

        let mut async_events =
            AsyncLineEventHandle::new(line_evt_handle).map_err(DhtError::Gpio)?;

        match async_events.next().await.ok_or(DhtError::ShortRead)? {
            Err(e) => Err(DhtError::Gpio(e)),
            // The sensor acks the start pulse by pulling the line down.
            // If the first event is not that falling edge we have joined
            // the transfer mid-frame; eject instead of consuming the rest
            // of the stream.
            Ok(e) if e.event_type() != EventType::FallingEdge => Err(DhtError::InvalidAck),
            Ok(_) => {
                let mut frame: Vec<u8> = Vec::new();

                for _ in 0..40 {
                    let edge_one = async_events
                        .next()
                        .await
                        .ok_or(DhtError::ShortRead)?
                        .map_err(DhtError::Gpio)?;
                    let edge_two = async_events
                        .next()
                        .await
                        .ok_or(DhtError::ShortRead)?
                        .map_err(DhtError::Gpio)?;

                    frame.push(Self::edge_pair_to_bit((edge_one, edge_two)));
                }

                Ok(frame)
            }
        }
    }

    async fn send_start_signal(line: &Line) -> Result<(), gpio_cdev::Error> {
        // The sensor expects a pull-down of at least 1 ms before it
        // starts clocking out data. 2 ms leaves some padding.
        let handle = line.request(LineRequestFlags::OUTPUT, 1, "init-sequence")?;

        handle.set_value(0)?;
        tokio::time::sleep(Duration::from_millis(2)).await;
        Ok(())
    }

    fn edge_pair_to_bit((edge_one, edge_two): (LineEvent, LineEvent)) -> u8 {
        // timestamps in nanoseconds; a high period under 40us is a zero
        match edge_two.timestamp() - edge_one.timestamp() {
            x if x < 40000 => 0,
            _ => 1,
        }
    }
}

/// Alternative backend: the dht22_pi driver over memory-mapped GPIO.
pub struct MappedGpioDht {
    pin: u8,
}

impl MappedGpioDht {
    pub fn new(pin: u8) -> Self {
        MappedGpioDht { pin }
    }

    pub fn ready(&self) -> bool {
        Path::new("/dev/gpiomem").exists()
    }

    async fn sample(&mut self) -> Outcome<ClimateReading> {
        let mut last = String::new();

        for attempt in 0..READ_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(RESAMPLE_DELAY).await;
            }

            match dht22_pi::read(self.pin) {
                Ok(reading) => {
                    return Outcome::Reading(ClimateReading {
                        humidity: reading.humidity,
                        temperature: reading.temperature,
                    })
                }
                Err(e) => last = format!("{:?}", e),
            }
        }

        Outcome::Transient(last)
    }
}
