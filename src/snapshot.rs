use crate::MAX_CHANNELS;
use core::fmt;
use heapless::Vec;

/// One channel's reportable value, displayed with a fixed number of
/// decimal places.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub value: f32,
    pub precision: u8,
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.*}", usize::from(self.precision), self.value)
    }
}

/// The values of every configured channel at one emission, in channel
/// index order.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    readings: Vec<Reading, MAX_CHANNELS>,
}

impl Snapshot {
    pub(crate) fn new(readings: Vec<Reading, MAX_CHANNELS>) -> Self {
        Self { readings }
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn get(&self, channel: usize) -> Option<Reading> {
        self.readings.get(channel).copied()
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn iter(&self) -> impl Iterator<Item = Reading> + '_ {
        self.readings.iter().copied()
    }

    /// Unformatted values, in channel index order.
    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.readings.iter().map(|reading| reading.value)
    }

    /// Formatted values, in channel index order.
    #[cfg(feature = "std")]
    pub fn to_strings(&self) -> std::vec::Vec<String> {
        self.readings.iter().map(ToString::to_string).collect()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Reading;
    type IntoIter = core::slice::Iter<'a, Reading>;

    fn into_iter(self) -> Self::IntoIter {
        self.readings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(values: &[f32], precision: u8) -> Snapshot {
        Snapshot::new(
            values
                .iter()
                .map(|&value| Reading { value, precision })
                .collect(),
        )
    }

    #[test]
    fn formats_fixed_precision() {
        assert_eq!(
            Reading {
                value: 1.650_4,
                precision: 2
            }
            .to_string(),
            "1.65"
        );
        assert_eq!(
            Reading {
                value: 0.5,
                precision: 3
            }
            .to_string(),
            "0.500"
        );
        assert_eq!(
            Reading {
                value: 1023.0,
                precision: 0
            }
            .to_string(),
            "1023"
        );
    }

    #[test]
    fn keeps_channel_order() {
        let snapshot = snapshot(&[0.1, 2.25, 3.0], 2);

        assert_eq!(snapshot.len(), 3);
        assert_eq!(
            snapshot.iter().map(|r| r.to_string()).collect::<std::vec::Vec<_>>(),
            ["0.10", "2.25", "3.00"]
        );
        assert_eq!(snapshot.get(1).map(|r| r.value), Some(2.25));
        assert_eq!(snapshot.get(3), None);
    }
}
