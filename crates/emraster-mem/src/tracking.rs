//! Peak usage tracking for a budget.
//!
//! Cheap enough to call once per block. Wire to a metrics backend in the binary.

use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct PeakTracker {
    peak_bytes: AtomicUsize,
    samples: AtomicUsize,
}

impl PeakTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a "used bytes" sample; raises the peak if higher.
    pub fn record_used(&self, used_bytes: usize) {
        self.peak_bytes.fetch_max(used_bytes, Ordering::AcqRel);
        self.samples.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "tracing")]
        tracing::trace!(
            used_bytes,
            peak = self.peak_bytes.load(Ordering::Relaxed),
            "block memory"
        );
    }

    pub fn peak(&self) -> usize {
        self.peak_bytes.load(Ordering::Relaxed)
    }

    pub fn samples(&self) -> usize {
        self.samples.load(Ordering::Relaxed)
    }

    /// Start a fresh measurement window.
    pub fn reset(&self) {
        self.peak_bytes.store(0, Ordering::Relaxed);
        self.samples.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_the_maximum() {
        let t = PeakTracker::new();
        t.record_used(10);
        t.record_used(30);
        t.record_used(20);
        assert_eq!(t.peak(), 30);
        assert_eq!(t.samples(), 3);
        t.reset();
        assert_eq!(t.peak(), 0);
    }
}
