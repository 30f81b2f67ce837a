//! Push-button input, kept apart from ADC sampling.
//!
//! [`EdgeFlag`] is set from an interrupt handler and taken by the main
//! loop; [`EdgeDetector`] polls a pin when no interrupt is available.

use core::sync::atomic::{AtomicBool, Ordering};
use embedded_hal::digital::v2::InputPin;

/// Edge latch shared between an interrupt handler and the main loop.
///
/// # Examples
///
/// ```
/// use adc_change_detector::EdgeFlag;
///
/// static BUTTON: EdgeFlag = EdgeFlag::new();
///
/// // in the GPIO interrupt handler
/// BUTTON.set();
///
/// // in the main loop
/// assert!(BUTTON.take());
/// assert!(!BUTTON.take());
/// ```
#[derive(Debug, Default)]
pub struct EdgeFlag {
    pending: AtomicBool,
}

impl EdgeFlag {
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
        }
    }

    pub fn set(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Returns whether an edge happened since the last call, and clears it.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}

/// Reports level changes of a polled input pin.
#[derive(Debug)]
pub struct EdgeDetector<P> {
    pin: P,
    last: bool,
}

impl<P, E> EdgeDetector<P>
where
    P: InputPin<Error = E>,
{
    /// Reads the pin once to establish its current level.
    pub fn new(pin: P) -> Result<Self, E> {
        let last = pin.is_high()?;

        Ok(Self { pin, last })
    }

    /// Returns the new level if it changed since the previous call.
    pub fn poll(&mut self) -> Result<Option<bool>, E> {
        let level = self.pin.is_high()?;
        if level == self.last {
            return Ok(None);
        }

        self.last = level;
        Ok(Some(level))
    }

    /// Level seen by the most recent read.
    pub fn level(&self) -> bool {
        self.last
    }

    /// Destroys the detector and returns the pin.
    pub fn free(self) -> P {
        self.pin
    }
}
