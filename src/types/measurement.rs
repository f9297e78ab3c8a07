//! Loudness samples, per-run measurement sets and the calibrated baseline

use serde::{Deserialize, Serialize};

/// Aggregate loudness over one sampling tick, 0-255
pub type AmplitudeSample = u8;

/// Ordered samples collected during one Analyzing or Calibrating run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasurementSet {
    samples: Vec<AmplitudeSample>,
}

impl MeasurementSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: AmplitudeSample) {
        self.samples.push(sample);
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[AmplitudeSample] {
        &self.samples
    }

    /// Arithmetic mean, `None` for an empty set
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: u64 = self.samples.iter().map(|&s| s as u64).sum();
        Some(sum as f64 / self.samples.len() as f64)
    }
}

impl From<Vec<AmplitudeSample>> for MeasurementSet {
    fn from(samples: Vec<AmplitudeSample>) -> Self {
        Self { samples }
    }
}

/// Where the current baseline came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineSource {
    /// Mean of a calibration capture
    Calibrated,
    /// Calibration heard nothing
    Fallback,
}

/// Reference loudness the Decision Engine compares against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub volume: f64,
    pub source: BaselineSource,
}

impl Baseline {
    pub fn calibrated(volume: f64) -> Self {
        Self {
            volume,
            source: BaselineSource::Calibrated,
        }
    }

    pub fn fallback(volume: f64) -> Self {
        Self {
            volume,
            source: BaselineSource::Fallback,
        }
    }
}
