//! Configuration file and broker credentials.
//!
//! ```toml
//! [converter]
//! kind = "mcp3008"
//! spi = "/dev/spidev0.0"
//! chip_select = 8
//! vref = 5.0
//!
//! [sampling]
//! channels = 2
//! noise_threshold = 6.0
//! max_interval_ms = 5000
//!
//! [mqtt]
//! host = "10.0.0.115"
//! client_id = "RPi4"
//! publish_topic = "RPi/mcp3008"
//! subscribe_topic = "RPi/adc/all"
//!
//! [button]
//! pin = 15
//! ```

use crate::{ads1115, mcp3008, monitor::Pacing, thermistor::Thermistor, EngineConfig, Gain, Rescale};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("credentials file {} needs a user and a password line", .0.display())]
    MissingCredentials(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub converter: ConverterConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    pub mqtt: MqttConfig,
    pub button: Option<ButtonConfig>,
    pub thermistor: Option<Thermistor>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        content.parse()
    }

    /// Engine settings for the configured converter.
    pub fn engine(&self) -> EngineConfig {
        self.sampling.engine(self.converter.rescale())
    }
}

impl FromStr for Config {
    type Err = ConfigFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

/// Which converter to sample and how it is wired.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ConverterConfig {
    /// Reports volts; noise threshold is in volts.
    Ads1115 {
        #[serde(default = "default_i2c")]
        i2c: String,
        #[serde(default = "default_ads1115_address")]
        address: u8,
        #[serde(default)]
        gain: Gain,
    },
    /// Reports raw counts; noise threshold is in counts.
    Mcp3008 {
        #[serde(default = "default_spi")]
        spi: String,
        /// GPIO driving CS, 8 (CE0) or 7 (CE1)
        chip_select: u64,
        vref: f32,
    },
}

impl ConverterConfig {
    pub fn rescale(&self) -> Rescale {
        match self {
            ConverterConfig::Ads1115 { .. } => Rescale::identity(),
            ConverterConfig::Mcp3008 { vref, .. } => Rescale::adc(mcp3008::PRECISION, *vref),
        }
    }

    /// Number of inputs the converter has.
    pub fn inputs(&self) -> usize {
        match self {
            ConverterConfig::Ads1115 { .. } => ads1115::CHANNELS,
            ConverterConfig::Mcp3008 { .. } => mcp3008::CHANNELS,
        }
    }
}

fn default_i2c() -> String {
    "/dev/i2c-1".to_string()
}

fn default_spi() -> String {
    "/dev/spidev0.0".to_string()
}

fn default_ads1115_address() -> u8 {
    ads1115::DEFAULT_ADDRESS
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplingConfig {
    pub channels: usize,
    pub samples: usize,
    pub noise_threshold: f32,
    /// 0 disables the time trigger
    pub max_interval_ms: u64,
    pub precision: u8,
    /// Pause after a failed read before sampling again
    pub retry_delay_ms: u64,
    /// Pause between polls
    pub poll_interval_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();

        Self {
            channels: engine.channels,
            samples: engine.samples,
            noise_threshold: engine.noise_threshold,
            max_interval_ms: 1000,
            precision: engine.precision,
            retry_delay_ms: 1000,
            poll_interval_ms: 50,
        }
    }
}

impl SamplingConfig {
    pub fn engine(&self, rescale: Rescale) -> EngineConfig {
        EngineConfig {
            channels: self.channels,
            samples: self.samples,
            noise_threshold: self.noise_threshold,
            max_interval: Some(self.max_interval_ms).filter(|&interval| interval > 0),
            rescale,
            precision: self.precision,
        }
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MqttConfig {
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    pub client_id: String,
    pub publish_topic: String,
    pub subscribe_topic: Option<String>,
    /// Credentials file, relative to `$HOME` unless absolute
    #[serde(default = "default_credentials")]
    pub credentials: PathBuf,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_credentials() -> PathBuf {
    PathBuf::from("stem")
}

fn default_keep_alive() -> u64 {
    60
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ButtonConfig {
    /// GPIO of an active-low button with pull-up
    pub pin: u64,
}

/// Broker (and optionally WiFi) login, one value per line.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
    pub wifi: Option<(String, String)>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    /// Loads `path`, resolved against `$HOME` when relative.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let path = resolve_home(path.as_ref());
        let content = fs::read_to_string(&path).map_err(|source| ConfigFileError::Io {
            path: path.clone(),
            source,
        })?;

        Self::parse(&content).ok_or(ConfigFileError::MissingCredentials(path))
    }

    pub fn parse(content: &str) -> Option<Self> {
        let mut lines = content.lines().map(str::trim_end);
        let user = lines.next()?.to_string();
        let password = lines.next()?.to_string();
        let wifi = lines
            .next()
            .zip(lines.next())
            .map(|(ssid, password)| (ssid.to_string(), password.to_string()));

        Some(Self {
            user,
            password,
            wifi,
        })
    }
}

fn resolve_home(path: &Path) -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) if path.is_relative() => Path::new(&home).join(path),
        _ => path.to_path_buf(),
    }
}
