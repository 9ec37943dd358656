//! Latency tracking for completion round-trips

use std::collections::VecDeque;
use std::time::Duration;

/// Tracks durations over a sliding window
#[derive(Debug, Clone)]
pub struct LatencyTracker {
    samples: VecDeque<Duration>,
    max_samples: usize,
}

impl LatencyTracker {
    /// Create a tracker keeping the last `max_samples` durations
    pub fn new(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    pub fn record(&mut self, duration: Duration) {
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(duration);
    }

    /// Average over the window, `None` before the first sample
    pub fn average(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        Some(total / self.samples.len() as u32)
    }

    pub fn max(&self) -> Option<Duration> {
        self.samples.iter().max().copied()
    }

    /// 95th percentile over the window
    pub fn percentile_95(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let mut sorted: Vec<_> = self.samples.iter().copied().collect();
        sorted.sort();
        let idx = (sorted.len() as f32 * 0.95) as usize;
        sorted.get(idx.min(sorted.len() - 1)).copied()
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new(20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tracker() {
        let tracker = LatencyTracker::new(5);
        assert_eq!(tracker.count(), 0);
        assert_eq!(tracker.average(), None);
        assert_eq!(tracker.percentile_95(), None);
    }

    #[test]
    fn test_window_drops_oldest() {
        let mut tracker = LatencyTracker::new(3);
        for ms in [1000, 100, 200, 300] {
            tracker.record(Duration::from_millis(ms));
        }

        assert_eq!(tracker.count(), 3);
        assert_eq!(tracker.max(), Some(Duration::from_millis(300)));
        assert_eq!(tracker.average(), Some(Duration::from_millis(200)));
    }

    #[test]
    fn test_percentile() {
        let mut tracker = LatencyTracker::new(100);
        for ms in 1..=100 {
            tracker.record(Duration::from_millis(ms));
        }
        let p95 = tracker.percentile_95().unwrap();
        assert!(p95 >= Duration::from_millis(94) && p95 <= Duration::from_millis(97));
    }
}
