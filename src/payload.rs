//! JSON message body for a snapshot.
//!
//! Channel `i` is published under the key `a{i}f` as a string, the button
//! level under `buttoni` as `"0"` or `"1"`:
//!
//! ```json
//! {"a0f":"1.65","a1f":"0.02","buttoni":"1"}
//! ```

use crate::{thermistor::Thermistor, Snapshot};
use serde::ser::{Serialize, SerializeMap, Serializer};

pub const BUTTON_KEY: &str = "buttoni";

pub fn channel_key(channel: usize) -> String {
    format!("a{channel}f")
}

/// What a published channel value represents.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Units {
    /// The snapshot's values, formatted with its precision.
    #[default]
    Reported,
    /// Thermistor temperature in °C with one decimal, computed from a
    /// reported voltage.
    Celsius(Thermistor),
}

impl Units {
    /// Formats every reading of `snapshot`. Channels without a defined
    /// value (a thermistor reading outside the divider's range) are
    /// `None`.
    pub fn format(&self, snapshot: &Snapshot) -> Vec<Option<String>> {
        snapshot
            .iter()
            .map(|reading| match self {
                Units::Reported => Some(reading.to_string()),
                Units::Celsius(thermistor) => thermistor
                    .celsius(f64::from(reading.value))
                    .map(|celsius| format!("{celsius:.1}")),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    values: Vec<Option<String>>,
    button: Option<bool>,
}

impl Payload {
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self {
            values,
            button: None,
        }
    }

    pub fn from_snapshot(snapshot: &Snapshot, units: &Units) -> Self {
        Self::new(units.format(snapshot))
    }

    pub fn with_button(mut self, level: bool) -> Self {
        self.button = Some(level);
        self
    }

    pub fn set_button(&mut self, level: Option<bool>) {
        self.button = level;
    }

    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    pub fn button(&self) -> Option<bool> {
        self.button
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.values.len() + usize::from(self.button.is_some());
        let mut map = serializer.serialize_map(Some(len))?;

        for (channel, value) in self.values.iter().enumerate() {
            map.serialize_entry(&channel_key(channel), value)?;
        }
        if let Some(level) = self.button {
            map.serialize_entry(BUTTON_KEY, if level { "1" } else { "0" })?;
        }

        map.end()
    }
}
