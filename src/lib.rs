//! Change-detecting sampler for multi-channel ADCs.
//!
//! An [`Engine`] reads every channel of a [`ChannelReader`] several times,
//! averages the samples, and reports a [`Snapshot`] of all channels when any
//! average moved by more than a noise threshold since the previous report,
//! or when a maximum interval elapsed without one.
//!
//! Readers are provided for the [`Ads1115`] (I2C, volts), the [`Mcp3008`]
//! (SPI, raw counts) and any `embedded-hal` [`OneShot`](embedded_hal::adc::OneShot)
//! ADC through [`OneShotChannels`].
//!
//! With the `std` feature (default) the crate also formats snapshots as
//! JSON, publishes them over MQTT and loads a TOML configuration; the
//! `linux` feature builds the `adc-mqtt` binary on top of
//! `linux-embedded-hal`. Without `std` the crate is `no_std` and allocation
//! free.
#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod ads1115;
mod button;
mod clock;
mod engine;
mod error;
pub mod mcp3008;
mod reader;
mod rescale;
mod snapshot;

#[cfg(feature = "std")]
pub mod config;
#[cfg(feature = "std")]
pub mod monitor;
#[cfg(feature = "std")]
pub mod mqtt;
#[cfg(feature = "std")]
pub mod payload;
#[cfg(feature = "std")]
pub mod thermistor;

pub use ads1115::{Ads1115, Ads1115Error, Gain};
pub use button::{EdgeDetector, EdgeFlag};
#[cfg(feature = "std")]
pub use clock::StdClock;
pub use clock::Clock;
pub use engine::{Engine, EngineConfig, MAX_PRECISION};
pub use error::{ConfigError, Error};
pub use mcp3008::{Mcp3008, Mcp3008Error};
pub use reader::{ChannelReader, OneShotChannels, OneShotError};
pub use rescale::Rescale;
pub use snapshot::{Reading, Snapshot};

/// Most channels an [`Engine`] can sample.
pub const MAX_CHANNELS: usize = 8;

/// Most samples an [`Engine`] can average per channel and poll.
pub const MAX_SAMPLES: usize = 32;
