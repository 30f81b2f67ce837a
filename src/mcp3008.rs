//! Microchip MCP3008 8-channel 10-bit converter over SPI.
//!
//! Reads return raw counts (0..=1023); scale them with
//! [`Rescale::adc(10, vref)`](crate::Rescale::adc).

use crate::ChannelReader;
use embedded_hal::{blocking::spi::Transfer, digital::v2::OutputPin};

/// Number of single-ended inputs.
pub const CHANNELS: usize = 8;

/// Bits per conversion.
pub const PRECISION: u32 = 10;

const START: u8 = 0x01;
const SINGLE_ENDED: u8 = 0x08;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Mcp3008Error<S, P> {
    #[error("SPI transfer failed: {0:?}")]
    Spi(S),
    #[error("chip select failed: {0:?}")]
    ChipSelect(P),
    #[error("MCP3008 has no input {0}")]
    InvalidChannel(usize),
}

#[derive(Debug)]
pub struct Mcp3008<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI, CS, S, P> Mcp3008<SPI, CS>
where
    SPI: Transfer<u8, Error = S>,
    CS: OutputPin<Error = P>,
{
    /// Returns a driver using `cs` as active-low chip select. The pin is
    /// driven high (deselected) immediately.
    pub fn new(spi: SPI, mut cs: CS) -> Result<Self, Mcp3008Error<S, P>> {
        cs.set_high().map_err(Mcp3008Error::ChipSelect)?;

        Ok(Self { spi, cs })
    }

    /// Destroys the driver and returns the SPI bus and chip-select pin.
    pub fn free(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }

    /// Returns the raw 10-bit conversion result of `channel`.
    pub fn read_raw(&mut self, channel: usize) -> Result<u16, Mcp3008Error<S, P>> {
        if channel >= CHANNELS {
            return Err(Mcp3008Error::InvalidChannel(channel));
        }

        let mut buffer = [START, (SINGLE_ENDED | channel as u8) << 4, 0x00];

        self.cs.set_low().map_err(Mcp3008Error::ChipSelect)?;
        let result = self
            .spi
            .transfer(&mut buffer)
            .map(|response| (u16::from(response[1] & 0x03) << 8) | u16::from(response[2]))
            .map_err(Mcp3008Error::Spi);
        // release the bus even when the transfer failed
        let released = self.cs.set_high().map_err(Mcp3008Error::ChipSelect);

        let value = result?;
        released?;

        Ok(value)
    }
}

impl<SPI, CS, S, P> ChannelReader for Mcp3008<SPI, CS>
where
    SPI: Transfer<u8, Error = S>,
    CS: OutputPin<Error = P>,
{
    type Error = Mcp3008Error<S, P>;

    fn read(&mut self, channel: usize) -> Result<f32, Self::Error> {
        self.read_raw(channel).map(f32::from)
    }
}
