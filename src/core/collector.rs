//! Measurement Collector: noise gate in front of the MeasurementSet

use crate::types::{AmplitudeSample, MeasurementSet};

/// Accumulates gated samples for the current run
#[derive(Debug, Clone)]
pub struct MeasurementCollector {
    threshold: u8,
    set: MeasurementSet,
    open: bool,
    discarded: usize,
}

impl MeasurementCollector {
    pub fn new(silence_threshold: u8) -> Self {
        Self {
            threshold: silence_threshold,
            set: MeasurementSet::new(),
            open: false,
            discarded: 0,
        }
    }

    /// Start a run: clear the set and accept samples
    pub fn begin(&mut self) {
        self.set.clear();
        self.discarded = 0;
        self.open = true;
    }

    /// Stop accepting samples. The set stays readable until the next `begin` or `clear`.
    pub fn close(&mut self) {
        self.open = false;
    }

    /// Drop everything collected
    pub fn clear(&mut self) {
        self.set.clear();
        self.discarded = 0;
        self.open = false;
    }

    /// Gate one sample. Returns whether it was kept.
    pub fn offer(&mut self, sample: AmplitudeSample) -> bool {
        if !self.open {
            return false;
        }
        if sample < self.threshold {
            self.discarded += 1;
            return false;
        }
        self.set.push(sample);
        true
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn measurements(&self) -> &MeasurementSet {
        &self.set
    }

    pub fn mean(&self) -> Option<f64> {
        self.set.mean()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Samples rejected as silence this run
    pub fn discarded(&self) -> usize {
        self.discarded
    }
}
