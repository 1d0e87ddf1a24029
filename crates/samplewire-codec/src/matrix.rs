/// Channel-ordered numeric samples.
///
/// Each channel is one column of `f64` values. Channels may be ragged: a
/// channel with fewer values simply received fewer samples this cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleMatrix {
    channels: Vec<Vec<f64>>,
}

impl SampleMatrix {
    /// Create a matrix with no channels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a matrix with `count` empty channels.
    pub fn with_channels(count: usize) -> Self {
        Self {
            channels: vec![Vec::new(); count],
        }
    }

    /// Number of channels, including empty ones.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples of one channel, if it exists.
    pub fn channel(&self, index: usize) -> Option<&[f64]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// All channels in order.
    pub fn channels(&self) -> &[Vec<f64>] {
        &self.channels
    }

    /// Length of the longest channel.
    pub fn row_count(&self) -> usize {
        self.channels.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Total number of samples across all channels.
    pub fn sample_count(&self) -> usize {
        self.channels.iter().map(Vec::len).sum()
    }

    /// True when no channel holds a sample.
    pub fn is_empty(&self) -> bool {
        self.channels.iter().all(Vec::is_empty)
    }

    /// Append a sample to `index`, creating empty channels up to it as needed.
    pub fn push(&mut self, index: usize, value: f64) {
        self.ensure_channel(index).push(value);
    }

    /// Mutable access to channel `index`, creating empty channels up to it.
    pub(crate) fn ensure_channel(&mut self, index: usize) -> &mut Vec<f64> {
        if self.channels.len() <= index {
            self.channels.resize_with(index + 1, Vec::new);
        }
        &mut self.channels[index]
    }

    /// Consume the matrix and return its channels.
    pub fn into_channels(self) -> Vec<Vec<f64>> {
        self.channels
    }
}

impl From<Vec<Vec<f64>>> for SampleMatrix {
    fn from(channels: Vec<Vec<f64>>) -> Self {
        Self { channels }
    }
}
