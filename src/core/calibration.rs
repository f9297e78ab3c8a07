//! Calibration Manager: owns the baseline for the life of the process
//!
//! A calibration run is a short capture. Its mean replaces the baseline
//! outright; an empty capture installs the fallback volume and is reported
//! as a failure so the user can be told to speak up.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use crate::types::{Baseline, MeasurementSet, ReasonCode};

/// Phrase shown while calibrating
pub const CALIBRATION_PROMPT: &str = "SAY: \"MY NAME IS ... AND I ALWAYS TELL THE TRUTH\"";

/// Notice shown after a silent calibration
pub const CALIBRATION_FAILED_NOTICE: &str = "CALIBRATION FAILED: VOLUME TOO LOW. DEFAULT BASELINE APPLIED.";

/// Result of one calibration run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOutcome {
    pub baseline: Baseline,
    pub reason: ReasonCode,
    /// Samples that passed the gate
    pub samples: usize,
}

impl CalibrationOutcome {
    pub fn is_success(&self) -> bool {
        self.reason == ReasonCode::R201_CALIBRATED
    }
}

#[derive(Debug, Clone)]
pub struct CalibrationManager {
    baseline: Option<Baseline>,
    fallback_volume: f64,
    runs: u64,
}

impl CalibrationManager {
    pub fn new(fallback_volume: f64) -> Self {
        Self {
            baseline: None,
            fallback_volume,
            runs: 0,
        }
    }

    /// Close a calibration run and install the new baseline
    pub fn complete(&mut self, measurements: &MeasurementSet) -> CalibrationOutcome {
        self.runs += 1;
        let outcome = match measurements.mean() {
            Some(mean) => {
                info!(volume = mean, samples = measurements.len(), "baseline calibrated");
                CalibrationOutcome {
                    baseline: Baseline::calibrated(mean),
                    reason: ReasonCode::R201_CALIBRATED,
                    samples: measurements.len(),
                }
            }
            None => {
                warn!(fallback = self.fallback_volume, "calibration heard nothing, using fallback baseline");
                CalibrationOutcome {
                    baseline: Baseline::fallback(self.fallback_volume),
                    reason: ReasonCode::R202_CALIBRATION_TOO_QUIET,
                    samples: 0,
                }
            }
        };
        self.baseline = Some(outcome.baseline);
        outcome
    }

    /// Baseline from the latest run, `None` before the first one
    pub fn baseline(&self) -> Option<Baseline> {
        self.baseline
    }

    /// Completed runs, successful or not
    pub fn runs(&self) -> u64 {
        self.runs
    }
}
