use thiserror::Error;

/// Rejected engine configuration, detected before the first hardware read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("at least one channel is required")]
    NoChannels,
    #[error("{requested} channels requested, at most {max} are supported")]
    TooManyChannels { requested: usize, max: usize },
    #[error("at least one sample per average is required")]
    NoSamples,
    #[error("{requested} samples per average requested, at most {max} are supported")]
    TooManySamples { requested: usize, max: usize },
    #[error("noise threshold must be a finite, non-negative number")]
    InvalidThreshold,
    #[error("rescale bounds are degenerate (in_min == in_max) or not finite")]
    DegenerateRescale,
    #[error("precision of {0} decimal places is not supported")]
    InvalidPrecision(u8),
}

/// Failure of an engine operation.
///
/// `E` is the error type of the [`ChannelReader`](crate::ChannelReader).
#[derive(Debug, PartialEq, Error)]
pub enum Error<E> {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to read channel {channel}: {error:?}")]
    Read { channel: usize, error: E },
}

impl<E> Error<E> {
    pub(crate) fn read(channel: usize) -> impl FnOnce(E) -> Self {
        move |error| Error::Read { channel, error }
    }

    /// Returns the index of the channel whose read failed, if any.
    pub fn channel(&self) -> Option<usize> {
        match self {
            Error::Read { channel, .. } => Some(*channel),
            Error::Config(_) => None,
        }
    }
}
