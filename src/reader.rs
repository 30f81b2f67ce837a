use crate::MAX_CHANNELS;
use core::{fmt, marker::PhantomData};
use embedded_hal::adc::{Channel, OneShot};
use heapless::Vec;

/// Reads one raw sample from an analog input.
///
/// Implemented once per converter: [`Ads1115`](crate::Ads1115) over I2C,
/// [`Mcp3008`](crate::Mcp3008) over SPI, and [`OneShotChannels`] for any
/// `embedded-hal` ADC such as a microcontroller's internal converter.
pub trait ChannelReader {
    type Error;

    /// Returns one sample from `channel`, in the reader's native units
    /// (raw counts or volts).
    fn read(&mut self, channel: usize) -> Result<f32, Self::Error>;
}

impl<R: ChannelReader + ?Sized> ChannelReader for &mut R {
    type Error = R::Error;

    fn read(&mut self, channel: usize) -> Result<f32, Self::Error> {
        (**self).read(channel)
    }
}

/// Error from [`OneShotChannels`].
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum OneShotError<E> {
    #[error("ADC read failed: {0:?}")]
    Adc(E),
    #[error("no pin configured for channel {0}")]
    InvalidChannel(usize),
}

/// [`ChannelReader`] over an `embedded-hal` [`OneShot`] ADC and a list of
/// pins, where channel `i` is the `i`th pin.
///
/// Reads block until the ADC completes the conversion.
pub struct OneShotChannels<Adc, ADC, Word, Pin> {
    adc: Adc,
    pins: Vec<Pin, MAX_CHANNELS>,
    _marker: PhantomData<(ADC, Word)>,
}

impl<Adc, ADC, Word, Pin> OneShotChannels<Adc, ADC, Word, Pin>
where
    Pin: Channel<ADC>,
{
    /// Returns a reader over `pins`. Pins beyond
    /// [`MAX_CHANNELS`](crate::MAX_CHANNELS) are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use adc_change_detector::{ChannelReader, OneShotChannels};
    /// # use embedded_hal_mock::eh0::adc::{Mock, MockChan0, Transaction};
    /// #
    /// # let expectations: [Transaction<u16>; 1] = [Transaction::read(0, 2048)];
    /// # let adc = Mock::new(&expectations);
    /// # let mut adc_handle = adc.clone();
    ///
    /// let mut reader = OneShotChannels::new(adc, [MockChan0 {}]);
    ///
    /// assert_eq!(reader.read(0), Ok(2048.0));
    /// # adc_handle.done();
    /// ```
    pub fn new(adc: Adc, pins: impl IntoIterator<Item = Pin>) -> Self {
        Self {
            adc,
            pins: pins.into_iter().take(MAX_CHANNELS).collect(),
            _marker: PhantomData,
        }
    }

    pub fn channels(&self) -> usize {
        self.pins.len()
    }

    /// Destroys the reader and returns the ADC and its pins.
    pub fn free(self) -> (Adc, Vec<Pin, MAX_CHANNELS>) {
        (self.adc, self.pins)
    }
}

impl<Adc, ADC, Word, Pin> fmt::Debug for OneShotChannels<Adc, ADC, Word, Pin> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneShotChannels")
            .field("channels", &self.pins.len())
            .finish_non_exhaustive()
    }
}

impl<Adc, ADC, Word, Pin> ChannelReader for OneShotChannels<Adc, ADC, Word, Pin>
where
    Word: Into<f32>,
    Pin: Channel<ADC>,
    Adc: OneShot<ADC, Word, Pin>,
{
    type Error = OneShotError<Adc::Error>;

    fn read(&mut self, channel: usize) -> Result<f32, Self::Error> {
        let pin = self
            .pins
            .get_mut(channel)
            .ok_or(OneShotError::InvalidChannel(channel))?;
        let adc_value = nb::block!(self.adc.read(pin)).map_err(OneShotError::Adc)?;

        Ok(adc_value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::{
        common::Generic,
        eh0::{
            adc::{Mock, MockChan0, MockChan1, Transaction},
            MockError,
        },
    };
    use std::io::ErrorKind;

    fn adc(expectations: &[Transaction<u16>]) -> Generic<Transaction<u16>> {
        Mock::new(expectations)
    }

    #[test]
    fn reads_each_pin() {
        let mut reader = OneShotChannels::new(
            adc(&[
                Transaction::read(1, 100),
                Transaction::read(1, 4095),
                Transaction::read(1, 0),
            ]),
            [MockChan1 {}],
        );

        assert_eq!(reader.read(0), Ok(100.0));
        assert_eq!(reader.read(0), Ok(4095.0));
        assert_eq!(reader.read(0), Ok(0.0));

        let (mut adc, _) = reader.free();
        adc.done();
    }

    #[test]
    fn channel_without_pin() {
        let mut reader = OneShotChannels::new(adc(&[]), [MockChan0 {}, MockChan0 {}]);

        assert_eq!(reader.channels(), 2);
        assert_eq!(reader.read(2), Err(OneShotError::InvalidChannel(2)));

        let (mut adc, _) = reader.free();
        adc.done();
    }

    #[test]
    fn error() {
        let mut reader = OneShotChannels::new(
            adc(&[Transaction::read(0, 0).with_error(MockError::Io(ErrorKind::InvalidData))]),
            [MockChan0 {}],
        );

        assert!(matches!(reader.read(0), Err(OneShotError::Adc(_))));

        let (mut adc, _) = reader.free();
        adc.done();
    }

    #[test]
    fn through_mutable_reference() {
        let mut reader = OneShotChannels::new(adc(&[Transaction::read(0, 7)]), [MockChan0 {}]);

        fn read_first<R: ChannelReader>(mut reader: R) -> Result<f32, R::Error> {
            reader.read(0)
        }

        assert_eq!(read_first(&mut reader), Ok(7.0));

        let (mut adc, _) = reader.free();
        adc.done();
    }
}
