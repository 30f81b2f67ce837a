//! Main loop tying the engine, the button and a publisher together.

use crate::{
    mqtt::Publisher,
    payload::{Payload, Units},
    ChannelReader, Clock, Engine, Error,
};
use core::fmt::{Debug, Display};
use log::{debug, warn};
use std::{thread, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError<R, P> {
    #[error("sampling failed: {0}")]
    Sample(Error<R>),
    #[error("failed to encode payload: {0}")]
    Encode(serde_json::Error),
    #[error("publish failed: {0}")]
    Publish(P),
}

/// Loop timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Pause between polls
    pub poll_interval: Duration,
    /// Pause after a failed read
    pub retry_delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Publishes a payload whenever the engine emits a snapshot or the button
/// changes level.
///
/// A button change without a new snapshot republishes the previous values
/// with the new button level.
pub struct Monitor<R, C, P> {
    engine: Engine<R, C>,
    publisher: P,
    topic: String,
    units: Units,
    last: Payload,
    button_pending: bool,
}

impl<R, C, P> Monitor<R, C, P>
where
    R: ChannelReader,
    R::Error: Debug,
    C: Clock,
    P: Publisher,
    P::Error: Display,
{
    pub fn new(engine: Engine<R, C>, publisher: P, topic: impl Into<String>) -> Self {
        Self {
            engine,
            publisher,
            topic: topic.into(),
            units: Units::default(),
            last: Payload::default(),
            button_pending: false,
        }
    }

    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    /// Includes the button level in every payload, starting with `level`.
    pub fn with_button(mut self, level: bool) -> Self {
        self.last.set_button(Some(level));
        self
    }

    /// Polls the engine once. `button` is the new level if the button
    /// changed since the previous step.
    ///
    /// Returns whether a payload was published. A button change seen in a
    /// step whose poll fails is published by the next successful step.
    pub fn step(&mut self, button: Option<bool>) -> Result<bool, MonitorError<R::Error, P::Error>> {
        if let Some(level) = button {
            debug!("button {}", if level { "released" } else { "pressed" });
            self.last.set_button(Some(level));
            self.button_pending = true;
        }

        let snapshot = self.engine.poll().map_err(MonitorError::Sample)?;

        match snapshot {
            Some(snapshot) => {
                let level = self.last.button();
                self.last = Payload::from_snapshot(&snapshot, &self.units);
                self.last.set_button(level);
            }
            None if self.button_pending => {}
            None => return Ok(false),
        }

        let json = self.last.to_json().map_err(MonitorError::Encode)?;
        self.publisher
            .publish(&self.topic, &json)
            .map_err(MonitorError::Publish)?;
        self.button_pending = false;
        debug!("published to {}: {}", self.topic, json);

        Ok(true)
    }

    /// Steps until publishing or encoding fails. Read failures are logged
    /// and retried after `pacing.retry_delay`.
    pub fn run(
        &mut self,
        mut button: impl FnMut() -> Option<bool>,
        pacing: Pacing,
    ) -> Result<(), MonitorError<R::Error, P::Error>> {
        loop {
            match self.step(button()) {
                Ok(_) => thread::sleep(pacing.poll_interval),
                Err(MonitorError::Sample(error)) => {
                    warn!("{}, retrying in {:?}", error, pacing.retry_delay);
                    thread::sleep(pacing.retry_delay);
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// The most recently published payload.
    pub fn last_payload(&self) -> &Payload {
        &self.last
    }

    pub fn engine_mut(&mut self) -> &mut Engine<R, C> {
        &mut self.engine
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Destroys the monitor and returns the engine and publisher.
    pub fn free(self) -> (Engine<R, C>, P) {
        (self.engine, self.publisher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::tests::ManualClock, mqtt::tests::Recorder, EngineConfig, Rescale};
    use std::fmt;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Unplugged;

    /// Every channel reads its current level.
    #[derive(Debug)]
    struct Levels {
        levels: Vec<f32>,
        unplugged: bool,
    }

    impl ChannelReader for Levels {
        type Error = Unplugged;

        fn read(&mut self, channel: usize) -> Result<f32, Unplugged> {
            if self.unplugged {
                return Err(Unplugged);
            }

            self.levels.get(channel).copied().ok_or(Unplugged)
        }
    }

    fn monitor<'a>(
        levels: &[f32],
        clock: &'a ManualClock,
    ) -> Monitor<Levels, &'a ManualClock, Recorder> {
        let reader = Levels {
            levels: levels.to_vec(),
            unplugged: false,
        };
        let config = EngineConfig {
            channels: levels.len(),
            samples: 2,
            noise_threshold: 35.0,
            rescale: Rescale::adc(12, 3.3),
            ..EngineConfig::default()
        };
        let engine = Engine::new(reader, clock, config).unwrap();

        Monitor::new(engine, Recorder::default(), "RPi/esp32")
    }

    fn set(monitor: &mut Monitor<Levels, &ManualClock, Recorder>, channel: usize, level: f32) {
        monitor.engine_mut().reader_mut().levels[channel] = level;
    }

    fn published<'a>(monitor: &'a Monitor<Levels, &ManualClock, Recorder>) -> Vec<&'a str> {
        monitor
            .publisher()
            .messages
            .iter()
            .map(|(_, payload)| payload.as_str())
            .collect()
    }

    #[test]
    fn publishes_changes_only() {
        let clock = ManualClock::default();
        let mut monitor = monitor(&[0.0, 4095.0], &clock);

        assert!(!monitor.step(None).unwrap());

        set(&mut monitor, 0, 2048.0);
        assert!(monitor.step(None).unwrap());
        assert!(!monitor.step(None).unwrap());

        assert_eq!(published(&monitor), [r#"{"a0f":"1.65","a1f":"3.30"}"#]);
        assert_eq!(monitor.publisher().messages[0].0, "RPi/esp32");
    }

    #[test]
    fn button_republishes_last_values() {
        let clock = ManualClock::default();
        let mut monitor = monitor(&[0.0], &clock).with_button(true);

        set(&mut monitor, 0, 4095.0);
        assert!(monitor.step(None).unwrap());
        assert!(monitor.step(Some(false)).unwrap());
        assert!(!monitor.step(None).unwrap());
        assert!(monitor.step(Some(true)).unwrap());

        assert_eq!(
            published(&monitor),
            [
                r#"{"a0f":"3.30","buttoni":"1"}"#,
                r#"{"a0f":"3.30","buttoni":"0"}"#,
                r#"{"a0f":"3.30","buttoni":"1"}"#,
            ]
        );
    }

    #[test]
    fn button_before_first_snapshot() {
        let clock = ManualClock::default();
        let mut monitor = monitor(&[100.0], &clock).with_button(true);

        assert!(monitor.step(Some(false)).unwrap());
        assert_eq!(published(&monitor), [r#"{"buttoni":"0"}"#]);
    }

    #[test]
    fn button_change_survives_read_failure() {
        let clock = ManualClock::default();
        let mut monitor = monitor(&[100.0], &clock).with_button(true);

        monitor.engine_mut().reader_mut().unplugged = true;
        assert!(matches!(
            monitor.step(Some(false)),
            Err(MonitorError::Sample(Error::Read { channel: 0, .. }))
        ));
        assert!(published(&monitor).is_empty());

        monitor.engine_mut().reader_mut().unplugged = false;
        assert!(monitor.step(None).unwrap());
        assert_eq!(published(&monitor), [r#"{"buttoni":"0"}"#]);
    }

    #[test]
    fn publishes_temperatures() {
        let clock = ManualClock::default();
        let reader = Levels {
            levels: vec![3.0],
            unplugged: false,
        };
        let config = EngineConfig {
            noise_threshold: 0.01,
            precision: 3,
            ..EngineConfig::default()
        };
        let engine = Engine::new(reader, &clock, config).unwrap();
        let mut monitor = Monitor::new(engine, Recorder::default(), "RPi4A1/ads1115/ntc")
            .with_units(Units::Celsius(Default::default()));

        monitor.engine_mut().reader_mut().levels[0] = 1.67;
        assert!(monitor.step(None).unwrap());

        assert_eq!(published(&monitor), [r#"{"a0f":"21.8"}"#]);
    }

    #[derive(Debug)]
    struct BrokerGone;

    impl fmt::Display for BrokerGone {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("broker gone")
        }
    }

    struct Offline;

    impl Publisher for Offline {
        type Error = BrokerGone;

        fn publish(&mut self, _topic: &str, _payload: &str) -> Result<(), BrokerGone> {
            Err(BrokerGone)
        }
    }

    #[test]
    fn run_stops_on_publish_failure() {
        let clock = ManualClock::default();
        let reader = Levels {
            levels: vec![0.0],
            unplugged: false,
        };
        let engine = Engine::new(reader, &clock, EngineConfig::default()).unwrap();
        let mut monitor = Monitor::new(engine, Offline, "RPi/adc");

        let pacing = Pacing {
            poll_interval: Duration::ZERO,
            retry_delay: Duration::ZERO,
        };
        let mut presses = [None, None, Some(false)].into_iter();
        let error = monitor
            .run(|| presses.next().flatten(), pacing)
            .unwrap_err();

        assert_eq!(error.to_string(), "publish failed: broker gone");
    }
}
