//! TI ADS1115 16-bit converter over I2C.
//!
//! Each read starts a single-shot conversion on one single-ended input
//! (AIN0..AIN3 against GND) and returns the result in volts.

use crate::ChannelReader;
use embedded_hal::blocking::i2c::{Write, WriteRead};

/// Default address, ADDR pin tied to GND. 0x49 (VDD), 0x4A (SDA) and 0x4B
/// (SCL) are also available.
pub const DEFAULT_ADDRESS: u8 = 0x48;

/// Number of single-ended inputs.
pub const CHANNELS: usize = 4;

/// Conversion-ready checks before a read gives up. At 128 SPS a
/// conversion takes about 8 ms.
pub const DEFAULT_MAX_POLLS: u32 = 1000;

const REG_CONVERSION: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;

const OS_SINGLE: u16 = 0x8000;
const MUX_SINGLE_ENDED: u16 = 0x4000;
const MODE_SINGLE_SHOT: u16 = 0x0100;
const DATA_RATE_128SPS: u16 = 0x0080;
const COMPARATOR_DISABLE: u16 = 0x0003;

/// Programmable gain, selecting the full-scale input range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Deserialize))]
pub enum Gain {
    /// ±6.144 V
    #[cfg_attr(feature = "std", serde(rename = "2/3"))]
    TwoThirds,
    /// ±4.096 V
    #[default]
    #[cfg_attr(feature = "std", serde(rename = "1"))]
    One,
    /// ±2.048 V
    #[cfg_attr(feature = "std", serde(rename = "2"))]
    Two,
    /// ±1.024 V
    #[cfg_attr(feature = "std", serde(rename = "4"))]
    Four,
    /// ±0.512 V
    #[cfg_attr(feature = "std", serde(rename = "8"))]
    Eight,
    /// ±0.256 V
    #[cfg_attr(feature = "std", serde(rename = "16"))]
    Sixteen,
}

impl Gain {
    /// Full-scale voltage.
    pub fn full_scale(self) -> f32 {
        match self {
            Gain::TwoThirds => 6.144,
            Gain::One => 4.096,
            Gain::Two => 2.048,
            Gain::Four => 1.024,
            Gain::Eight => 0.512,
            Gain::Sixteen => 0.256,
        }
    }

    fn bits(self) -> u16 {
        let pga = match self {
            Gain::TwoThirds => 0b000,
            Gain::One => 0b001,
            Gain::Two => 0b010,
            Gain::Four => 0b011,
            Gain::Eight => 0b100,
            Gain::Sixteen => 0b101,
        };

        pga << 9
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Ads1115Error<E> {
    #[error("I2C transfer failed: {0:?}")]
    I2c(E),
    #[error("ADS1115 has no input {0}")]
    InvalidChannel(usize),
    #[error("conversion did not complete")]
    Timeout,
}

#[derive(Debug)]
pub struct Ads1115<I2C> {
    i2c: I2C,
    address: u8,
    gain: Gain,
    max_polls: u32,
}

impl<I2C, E> Ads1115<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
{
    pub fn new(i2c: I2C, address: u8, gain: Gain) -> Self {
        Self {
            i2c,
            address,
            gain,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    /// Sets how many conversion-ready checks a read makes before failing
    /// with [`Ads1115Error::Timeout`].
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls.max(1);
        self
    }

    pub fn gain(&self) -> Gain {
        self.gain
    }

    pub fn set_gain(&mut self, gain: Gain) {
        self.gain = gain;
    }

    /// Destroys the driver and returns the I2C bus.
    pub fn free(self) -> I2C {
        self.i2c
    }

    /// Starts a single-shot conversion and returns the signed result in
    /// counts.
    pub fn read_raw(&mut self, channel: usize) -> Result<i16, Ads1115Error<E>> {
        if channel >= CHANNELS {
            return Err(Ads1115Error::InvalidChannel(channel));
        }

        let config = OS_SINGLE
            | MUX_SINGLE_ENDED
            | ((channel as u16) << 12)
            | self.gain.bits()
            | MODE_SINGLE_SHOT
            | DATA_RATE_128SPS
            | COMPARATOR_DISABLE;
        let [high, low] = config.to_be_bytes();
        self.i2c
            .write(self.address, &[REG_CONFIG, high, low])
            .map_err(Ads1115Error::I2c)?;

        let mut polls = 0;
        nb::block!(self.conversion_ready(&mut polls))?;

        self.read_register(REG_CONVERSION).map(|raw| raw as i16)
    }

    /// Converts a raw result to volts for the current gain.
    pub fn to_volts(&self, raw: i16) -> f32 {
        f32::from(raw) * self.gain.full_scale() / 32768.0
    }

    fn conversion_ready(&mut self, polls: &mut u32) -> nb::Result<(), Ads1115Error<E>> {
        if *polls >= self.max_polls {
            return Err(nb::Error::Other(Ads1115Error::Timeout));
        }
        *polls += 1;

        // OS reads back as 1 once the device is idle
        if self.read_register(REG_CONFIG)? & OS_SINGLE == 0 {
            return Err(nb::Error::WouldBlock);
        }

        Ok(())
    }

    fn read_register(&mut self, register: u8) -> Result<u16, Ads1115Error<E>> {
        let mut buffer = [0; 2];
        self.i2c
            .write_read(self.address, &[register], &mut buffer)
            .map_err(Ads1115Error::I2c)?;

        Ok(u16::from_be_bytes(buffer))
    }
}

impl<I2C, E> ChannelReader for Ads1115<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
{
    type Error = Ads1115Error<E>;

    fn read(&mut self, channel: usize) -> Result<f32, Self::Error> {
        let raw = self.read_raw(channel)?;

        Ok(self.to_volts(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh0::{
        i2c::{Mock, Transaction},
        MockError,
    };
    use std::io::ErrorKind;

    const ADDRESS: u8 = DEFAULT_ADDRESS;

    fn start(config: [u8; 2]) -> Transaction {
        Transaction::write(ADDRESS, vec![REG_CONFIG, config[0], config[1]])
    }

    fn status(value: u16) -> Transaction {
        Transaction::write_read(ADDRESS, vec![REG_CONFIG], value.to_be_bytes().to_vec())
    }

    fn conversion(raw: i16) -> Transaction {
        Transaction::write_read(ADDRESS, vec![REG_CONVERSION], raw.to_be_bytes().to_vec())
    }

    #[test]
    fn single_shot_on_ain0() {
        let expectations = [start([0xC3, 0x83]), status(0x8383), conversion(16384)];
        let mut adc = Ads1115::new(Mock::new(&expectations), ADDRESS, Gain::One);

        assert_eq!(adc.read(0), Ok(2.048));

        adc.free().done();
    }

    #[test]
    fn selects_input_and_gain() {
        // AIN3, ±2.048 V
        let expectations = [start([0xF5, 0x83]), status(0x8000), conversion(-8192)];
        let mut adc = Ads1115::new(Mock::new(&expectations), ADDRESS, Gain::Two);

        assert_eq!(adc.read(3), Ok(-0.512));

        adc.free().done();
    }

    #[test]
    fn waits_for_conversion() {
        let expectations = [
            start([0xD1, 0x83]),
            status(0x5183),
            status(0x5183),
            status(0xD183),
            conversion(1000),
        ];
        let mut adc = Ads1115::new(Mock::new(&expectations), ADDRESS, Gain::TwoThirds);

        assert_eq!(adc.read_raw(1), Ok(1000));

        adc.free().done();
    }

    #[test]
    fn gives_up_after_max_polls() {
        let expectations = [start([0xE3, 0x83]), status(0x6383), status(0x6383)];
        let mut adc =
            Ads1115::new(Mock::new(&expectations), ADDRESS, Gain::One).with_max_polls(2);

        assert_eq!(adc.read(2), Err(Ads1115Error::Timeout));

        adc.free().done();
    }

    #[test]
    fn invalid_channel() {
        let mut adc = Ads1115::new(Mock::new(&[]), ADDRESS, Gain::One);

        assert_eq!(adc.read(4), Err(Ads1115Error::InvalidChannel(4)));

        adc.free().done();
    }

    #[test]
    fn bus_error() {
        let expectations =
            [start([0xC3, 0x83]).with_error(MockError::Io(ErrorKind::Other))];
        let mut adc = Ads1115::new(Mock::new(&expectations), ADDRESS, Gain::One);

        assert!(matches!(adc.read(0), Err(Ads1115Error::I2c(_))));

        adc.free().done();
    }

    #[test]
    fn full_scale() {
        let adc = Ads1115::new(Mock::new(&[]), ADDRESS, Gain::Sixteen);

        assert_eq!(adc.to_volts(i16::MIN), -0.256);
        assert_eq!(Gain::default(), Gain::One);

        adc.free().done();
    }
}
