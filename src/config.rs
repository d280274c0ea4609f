use envconfig::Envconfig;

/** Immutable config needed for app startup */
#[derive(Envconfig)]
pub struct AppConfig {
    #[envconfig(from = "DHT22_PIN", default = "4")]
    pub dht22_pin: u32,
    #[envconfig(from = "MOISTURE_PIN", default = "21")]
    pub moisture_pin: u32,
    #[envconfig(from = "GPIO_CHIP", default = "/dev/gpiochip0")]
    pub gpio_chip: String,
    #[envconfig(from = "SPI_DEVICE", default = "/dev/spidev0.0")]
    pub spi_device: String,
    #[envconfig(from = "ADC_CHANNEL", default = "0")]
    pub adc_channel: u8,
    #[envconfig(from = "READ_INTERVAL_SECS", default = "2")]
    pub read_interval_secs: u64,
}
