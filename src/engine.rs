use crate::{
    error::{ConfigError, Error},
    snapshot::{Reading, Snapshot},
    ChannelReader, Clock, Rescale, MAX_CHANNELS, MAX_SAMPLES,
};
use heapless::Vec;
use log::{debug, info, trace};

/// Largest supported number of decimal places in a [`Reading`].
pub const MAX_PRECISION: u8 = 6;

/// Configuration for an [`Engine`].
///
/// - `channels`: number of channels, read as indices `0..channels`
/// - `samples`: raw reads averaged per channel on every poll
/// - `noise_threshold`: smallest change of a channel's average, in the
///   reader's units, that triggers an emission
/// - `max_interval`: longest time in milliseconds between emissions;
///   `None` disables the time trigger
/// - `rescale`: mapping from averaged reads to reported values
/// - `precision`: decimal places of reported values
///
/// # Examples
///
/// ```
/// use adc_change_detector::{EngineConfig, Rescale};
///
/// let config = EngineConfig {
///     channels: 2,
///     noise_threshold: 35.0,      // raw counts
///     max_interval: Some(5000),   // 5 s
///     rescale: Rescale::adc(12, 3.3),
///     precision: 3,
///     ..EngineConfig::default()
/// };
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub channels: usize,
    pub samples: usize,
    pub noise_threshold: f32,
    pub max_interval: Option<u64>,
    pub rescale: Rescale,
    pub precision: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channels: 1,
            samples: 10,
            noise_threshold: 0.0,
            max_interval: None,
            rescale: Rescale::identity(),
            precision: 2,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels == 0 {
            return Err(ConfigError::NoChannels);
        }
        if self.channels > MAX_CHANNELS {
            return Err(ConfigError::TooManyChannels {
                requested: self.channels,
                max: MAX_CHANNELS,
            });
        }
        if self.samples == 0 {
            return Err(ConfigError::NoSamples);
        }
        if self.samples > MAX_SAMPLES {
            return Err(ConfigError::TooManySamples {
                requested: self.samples,
                max: MAX_SAMPLES,
            });
        }
        if !(self.noise_threshold.is_finite() && self.noise_threshold >= 0.0) {
            return Err(ConfigError::InvalidThreshold);
        }
        if !self.rescale.is_valid() {
            return Err(ConfigError::DegenerateRescale);
        }
        if self.precision > MAX_PRECISION {
            return Err(ConfigError::InvalidPrecision(self.precision));
        }

        Ok(())
    }
}

#[derive(Debug)]
struct ChannelState {
    index: usize,
    // scratch for the current averaging pass only
    samples: [f32; MAX_SAMPLES],
    baseline: f32,
    average: f32,
}

impl ChannelState {
    fn new(index: usize, first_read: f32) -> Self {
        Self {
            index,
            samples: [0.0; MAX_SAMPLES],
            baseline: first_read,
            average: first_read,
        }
    }
}

/// Samples every channel, averages, and reports a [`Snapshot`] of all
/// channels when any average moved by more than the noise threshold since
/// the last emission, or when the max interval elapsed.
///
/// # Examples
///
/// ```
/// use adc_change_detector::{Engine, EngineConfig, OneShotChannels, Rescale, StdClock};
/// # use embedded_hal_mock::eh0::adc::{Mock, MockChan0, Transaction};
/// #
/// # let expectations: [Transaction<u16>; 3] = [
/// #     Transaction::read(0, 1000),
/// #     Transaction::read(0, 1010),
/// #     Transaction::read(0, 2000),
/// # ];
/// # let adc = Mock::new(&expectations);
/// # let mut adc_handle = adc.clone();
///
/// let reader = OneShotChannels::new(adc, [MockChan0 {}]);
/// let config = EngineConfig {
///     samples: 1,
///     noise_threshold: 50.0,
///     rescale: Rescale::adc(12, 3.3),
///     ..EngineConfig::default()
/// };
///
/// // Seeds the baseline with one read (1000)
/// let mut engine = Engine::new(reader, StdClock::new(), config).unwrap();
///
/// // 1010 is within the noise threshold
/// assert_eq!(engine.poll(), Ok(None));
///
/// // 2000 is not
/// let snapshot = engine.poll().unwrap().unwrap();
/// assert_eq!(snapshot.to_strings(), ["1.61"]);
/// # adc_handle.done();
/// ```
#[derive(Debug)]
pub struct Engine<R, C> {
    reader: R,
    clock: C,
    channels: Vec<ChannelState, MAX_CHANNELS>,
    samples: usize,
    noise_threshold: f32,
    max_interval: Option<u64>,
    rescale: Rescale,
    precision: u8,
    last_emission: u64,
}

impl<R, C> Engine<R, C>
where
    R: ChannelReader,
    C: Clock,
{
    /// Validates `config` and seeds every channel's baseline with one raw
    /// read, so the first [`poll`](Engine::poll) only reports real change.
    pub fn new(mut reader: R, clock: C, config: EngineConfig) -> Result<Self, Error<R::Error>> {
        config.validate()?;

        let mut channels = Vec::new();
        for index in 0..config.channels {
            let first_read = reader.read(index).map_err(Error::read(index))?;
            trace!("channel {} seeded with {}", index, first_read);

            channels
                .push(ChannelState::new(index, first_read))
                .map_err(|_| ConfigError::TooManyChannels {
                    requested: config.channels,
                    max: MAX_CHANNELS,
                })?;
        }

        info!(
            "sampling {} channel(s), {} sample(s) per average, noise threshold {}, max interval {:?} ms",
            config.channels, config.samples, config.noise_threshold, config.max_interval
        );

        let last_emission = clock.now();

        Ok(Self {
            reader,
            clock,
            channels,
            samples: config.samples,
            noise_threshold: config.noise_threshold,
            max_interval: config.max_interval.filter(|&interval| interval > 0),
            rescale: config.rescale,
            precision: config.precision,
            last_emission,
        })
    }

    /// Samples every channel and returns a snapshot of all of them if any
    /// changed beyond the noise threshold or the max interval elapsed.
    ///
    /// Blocks for `samples * channels` hardware reads. A failed read aborts
    /// the poll and leaves averages, baselines and the emission time as
    /// they were.
    pub fn poll(&mut self) -> Result<Option<Snapshot>, Error<R::Error>> {
        let averages = self
            .channels
            .iter_mut()
            .map(|channel| -> Result<f32, Error<R::Error>> {
                let samples = &mut channel.samples[..self.samples];
                for sample in samples.iter_mut() {
                    *sample = self
                        .reader
                        .read(channel.index)
                        .map_err(Error::read(channel.index))?;
                }
                trace!("channel {} samples {:?}", channel.index, samples);

                Ok(mean(samples))
            })
            .collect::<Result<Vec<f32, MAX_CHANNELS>, _>>()?;

        let now = self.clock.now();
        let mut changed = false;

        for (channel, &average) in self.channels.iter_mut().zip(averages.iter()) {
            if difference(average, channel.baseline) > self.noise_threshold {
                debug!(
                    "channel {} changed: {} (previously {})",
                    channel.index, average, channel.baseline
                );
                changed = true;
            }
            channel.average = average;
        }

        let elapsed = now.saturating_sub(self.last_emission);
        let time_limit_hit = self
            .max_interval
            .map_or(false, |max_interval| elapsed > max_interval);

        if !(changed || time_limit_hit) {
            return Ok(None);
        }

        if time_limit_hit && !changed {
            debug!("no change for {} ms, emitting", elapsed);
        }

        let readings = self
            .channels
            .iter_mut()
            .map(|channel| {
                channel.baseline = channel.average;

                Reading {
                    value: self.rescale.apply(channel.average),
                    precision: self.precision,
                }
            })
            .collect();
        self.last_emission = now;

        Ok(Some(Snapshot::new(readings)))
    }

    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    /// The average `channel` was last compared against.
    pub fn baseline(&self, channel: usize) -> Option<f32> {
        self.channels.get(channel).map(|state| state.baseline)
    }

    /// The average from the latest successful poll.
    pub fn average(&self, channel: usize) -> Option<f32> {
        self.channels.get(channel).map(|state| state.average)
    }

    /// Time of the latest emission, or of construction if nothing was
    /// emitted yet.
    pub fn last_emission(&self) -> u64 {
        self.last_emission
    }

    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Destroys the engine and returns the reader and clock.
    pub fn free(self) -> (R, C) {
        (self.reader, self.clock)
    }
}

fn mean(samples: &[f32]) -> f32 {
    samples.iter().sum::<f32>() / samples.len() as f32
}

fn difference(a: f32, b: f32) -> f32 {
    if a > b {
        a - b
    } else {
        b - a
    }
}
