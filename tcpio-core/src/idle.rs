//! Adaptive idle detection for the Request/Response Engine's unpatterned
//! receive loop (§4.4).
//!
//! Tracks the last few inter-arrival gaps between successful reads and
//! derives an idle threshold from their median, so bursty peers don't get
//! cut off early and quiet ones don't make every call wait the full
//! deadline.

use std::time::Duration;

const MAX_SAMPLES: usize = 5;
const MIN_THRESHOLD: Duration = Duration::from_millis(50);
const MAX_THRESHOLD: Duration = Duration::from_millis(200);
const MULTIPLIER: f64 = 1.75;

/// A bounded ring of the last `MAX_SAMPLES` inter-arrival gaps.
#[derive(Debug, Default, Clone)]
pub struct IdleSamples {
    gaps: Vec<Duration>,
}

impl IdleSamples {
    pub fn new() -> Self {
        Self { gaps: Vec::with_capacity(MAX_SAMPLES) }
    }

    /// Record a newly observed inter-arrival gap, evicting the oldest
    /// sample once the ring is full.
    pub fn push(&mut self, gap: Duration) {
        if self.gaps.len() == MAX_SAMPLES {
            self.gaps.remove(0);
        }
        self.gaps.push(gap);
    }

    /// `clamp(median(last ≤5 gaps) * 1.75, 50ms, 200ms)`, or the 50ms floor
    /// when no samples have been observed yet.
    pub fn threshold(&self) -> Duration {
        if self.gaps.is_empty() {
            return MIN_THRESHOLD;
        }
        let mut sorted = self.gaps.clone();
        sorted.sort();
        let median = sorted[sorted.len() / 2];
        let scaled = median.mul_f64(MULTIPLIER);
        scaled.clamp(MIN_THRESHOLD, MAX_THRESHOLD)
    }

    pub fn is_empty(&self) -> bool {
        self.gaps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_samples_default_to_floor() {
        let samples = IdleSamples::new();
        assert_eq!(samples.threshold(), MIN_THRESHOLD);
    }

    #[test]
    fn threshold_scales_with_median() {
        let mut samples = IdleSamples::new();
        samples.push(Duration::from_millis(40));
        samples.push(Duration::from_millis(40));
        samples.push(Duration::from_millis(40));
        // median 40ms * 1.75 = 70ms, within [50, 200]
        assert_eq!(samples.threshold(), Duration::from_millis(70));
    }

    #[test]
    fn threshold_clamps_to_floor() {
        let mut samples = IdleSamples::new();
        samples.push(Duration::from_millis(1));
        assert_eq!(samples.threshold(), MIN_THRESHOLD);
    }

    #[test]
    fn threshold_clamps_to_ceiling() {
        let mut samples = IdleSamples::new();
        samples.push(Duration::from_secs(10));
        assert_eq!(samples.threshold(), MAX_THRESHOLD);
    }

    #[test]
    fn ring_evicts_oldest_sample() {
        let mut samples = IdleSamples::new();
        for ms in [10, 20, 30, 40, 50, 9999] {
            samples.push(Duration::from_millis(ms));
        }
        assert_eq!(samples.gaps.len(), MAX_SAMPLES);
        assert_eq!(samples.gaps[0], Duration::from_millis(20));
    }
}
