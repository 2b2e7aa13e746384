//! Rational media timestamps.

/// A media timestamp expressed as `value / timescale` seconds.
///
/// Samples from different sources may carry different timescales, so
/// comparisons and arithmetic go through `seconds` or `micros` rather
/// than the raw fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MediaTime {
    pub value: i64,
    pub timescale: u32,
}

impl MediaTime {
    pub const fn new(value: i64, timescale: u32) -> Self {
        Self { value, timescale }
    }

    pub fn from_seconds(seconds: f64, timescale: u32) -> Self {
        Self {
            value: (seconds * timescale as f64).round() as i64,
            timescale,
        }
    }

    pub fn from_micros(micros: i64) -> Self {
        Self::new(micros, 1_000_000)
    }

    pub fn seconds(&self) -> f64 {
        if self.timescale == 0 {
            return 0.0;
        }
        self.value as f64 / self.timescale as f64
    }

    pub fn micros(&self) -> i64 {
        if self.timescale == 0 {
            return 0;
        }
        ((self.value as i128 * 1_000_000) / self.timescale as i128) as i64
    }

    /// Elapsed seconds from `earlier` to `self`.
    pub fn seconds_since(&self, earlier: MediaTime) -> f64 {
        self.seconds() - earlier.seconds()
    }
}
