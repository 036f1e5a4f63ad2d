//! DC offset removal filter
//!
//! Summing unipolar channel levels leaves a DC offset that follows the
//! music. A running average over a short window is subtracted from each
//! sample.

/// History buffer size (2048 samples = ~46ms at 44.1kHz)
const HISTORY_SIZE_BITS: usize = 11;
const HISTORY_SIZE: usize = 1 << HISTORY_SIZE_BITS;

/// DC offset removal filter using a running average
#[derive(Clone)]
pub struct DcFilter {
    buffer: Box<[f32; HISTORY_SIZE]>,
    position: usize,
    running_sum: f64,
}

impl DcFilter {
    /// Create a new DC filter
    pub fn new() -> Self {
        Self {
            buffer: Box::new([0.0; HISTORY_SIZE]),
            position: 0,
            running_sum: 0.0,
        }
    }

    /// Process a sample and return the DC-adjusted value
    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        self.running_sum -= f64::from(self.buffer[self.position]);
        self.running_sum += f64::from(sample);
        self.buffer[self.position] = sample;
        self.position = (self.position + 1) & (HISTORY_SIZE - 1);

        let dc_offset = self.running_sum / HISTORY_SIZE as f64;
        (f64::from(sample) - dc_offset) as f32
    }

    /// Reset the filter state
    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.position = 0;
        self.running_sum = 0.0;
    }
}

impl Default for DcFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DcFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DcFilter")
            .field("position", &self.position)
            .field("running_sum", &self.running_sum)
            .finish_non_exhaustive()
    }
}
