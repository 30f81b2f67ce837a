//! Samples an ADC on a Raspberry Pi and publishes changes over MQTT.
//!
//! ```text
//! adc-mqtt [CONFIG]    (default: adc.toml)
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use adc_change_detector::{
    config::{Config, ConverterConfig, Credentials},
    monitor::Monitor,
    mqtt::MqttPublisher,
    payload::Units,
    Ads1115, ChannelReader, EdgeDetector, Engine, Mcp3008, StdClock,
};
use linux_embedded_hal::{
    spidev::{SpiModeFlags, SpidevOptions},
    sysfs_gpio::Direction,
    I2cdev, Spidev, SysfsPin,
};
use std::{error::Error, fmt::Debug};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_CONFIG: &str = "adc.toml";
const SPI_SPEED_HZ: u32 = 1_000_000;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = Config::load(&path)?;
    info!("loaded {}", path);

    match &config.converter {
        ConverterConfig::Ads1115 { i2c, address, gain } => {
            let i2c = I2cdev::new(i2c)?;
            serve(Ads1115::new(i2c, *address, *gain), &config)
        }
        ConverterConfig::Mcp3008 {
            spi, chip_select, ..
        } => {
            let mut spi = Spidev::open(spi)?;
            let options = SpidevOptions::new()
                .bits_per_word(8)
                .max_speed_hz(SPI_SPEED_HZ)
                .mode(SpiModeFlags::SPI_MODE_0)
                .build();
            spi.configure(&options)?;

            let cs = SysfsPin::new(*chip_select);
            cs.export()?;
            cs.set_direction(Direction::High)?;

            serve(Mcp3008::new(spi, cs)?, &config)
        }
    }
}

fn serve<R>(reader: R, config: &Config) -> Result<(), Box<dyn Error>>
where
    R: ChannelReader,
    R::Error: Debug + 'static,
{
    let engine_config = config.engine();
    if engine_config.channels > config.converter.inputs() {
        return Err(format!(
            "{} channels requested, the converter has {}",
            engine_config.channels,
            config.converter.inputs()
        )
        .into());
    }

    let engine = Engine::new(reader, StdClock::new(), engine_config)?;

    let credentials = Credentials::load(&config.mqtt.credentials)?;
    let publisher = MqttPublisher::connect(&config.mqtt, &credentials)?;

    let units = config.thermistor.map(Units::Celsius).unwrap_or_default();
    let mut monitor =
        Monitor::new(engine, publisher, &config.mqtt.publish_topic).with_units(units);

    let mut button = match config.button {
        Some(settings) => {
            let pin = SysfsPin::new(settings.pin);
            pin.export()?;
            pin.set_direction(Direction::In)?;

            let button = EdgeDetector::new(pin)?;
            monitor = monitor.with_button(button.level());
            info!("watching button on GPIO {}", settings.pin);
            Some(button)
        }
        None => None,
    };

    monitor.run(
        || {
            let button = button.as_mut()?;
            button
                .poll()
                .map_err(|error| warn!("failed to read button: {}", error))
                .ok()
                .flatten()
        },
        config.sampling.pacing(),
    )?;

    Ok(())
}
