//! Engine configuration
//!
//! Every constant that shapes the heuristic lives here with the documented
//! default from the crate root. A TOML file may override any subset:
//!
//! ```toml
//! analysis_ms = 5000
//! silence_threshold = 8
//! reduction = "sum"
//! middle_band = "random"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::{
    PolygraphError, Result,
    ANALYSIS_DURATION_MS, CALIBRATION_DURATION_MS, FALLBACK_BASELINE, FFT_SIZE,
    FRAME_INTERVAL_MS, LIE_BAND_START, LOUDER_RATIO, MAX_DECIBELS, MIN_DECIBELS,
    SILENCE_THRESHOLD, STATUS_INTERVAL_MS, TRUTH_BAND_END,
};

/// How a spectrum frame collapses into one loudness value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    /// Mean of all bins
    #[default]
    Mean,
    /// Sum of all bins, saturating at 255
    Sum,
}

/// What a gesture in the middle band of the control does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MiddleBandPolicy {
    /// No forced outcome; the Decision Engine decides at the deadline
    #[default]
    Defer,
    /// Coin flip at gesture time, fixed like the outer bands
    Random,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub analysis_ms: u64,
    pub calibration_ms: u64,
    pub status_interval_ms: u64,
    pub frame_interval_ms: u64,
    pub silence_threshold: u8,
    pub fallback_baseline: f64,
    pub louder_ratio: f64,
    /// Upper edge of the TRUE band (exclusive)
    pub truth_band: f64,
    /// Lower edge of the LIE band (exclusive)
    pub lie_band: f64,
    pub middle_band: MiddleBandPolicy,
    pub reduction: Reduction,
    pub fft_size: usize,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            analysis_ms: ANALYSIS_DURATION_MS,
            calibration_ms: CALIBRATION_DURATION_MS,
            status_interval_ms: STATUS_INTERVAL_MS,
            frame_interval_ms: FRAME_INTERVAL_MS,
            silence_threshold: SILENCE_THRESHOLD,
            fallback_baseline: FALLBACK_BASELINE,
            louder_ratio: LOUDER_RATIO,
            truth_band: TRUTH_BAND_END,
            lie_band: LIE_BAND_START,
            middle_band: MiddleBandPolicy::Defer,
            reduction: Reduction::Mean,
            fft_size: FFT_SIZE,
            min_decibels: MIN_DECIBELS,
            max_decibels: MAX_DECIBELS,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(PolygraphError::InvalidConfig(msg.to_string()));

        if self.analysis_ms == 0 || self.calibration_ms == 0 {
            return invalid("phase durations must be positive");
        }
        if self.status_interval_ms == 0 || self.frame_interval_ms == 0 {
            return invalid("tick intervals must be positive");
        }
        if !(0.0..=1.0).contains(&self.truth_band) || !(0.0..=1.0).contains(&self.lie_band) {
            return invalid("gesture bands must lie within 0.0..=1.0");
        }
        if self.truth_band > self.lie_band {
            return invalid("truth_band must not exceed lie_band");
        }
        if !self.louder_ratio.is_finite() || self.louder_ratio <= 0.0 {
            return invalid("louder_ratio must be a positive number");
        }
        if !self.fallback_baseline.is_finite() || self.fallback_baseline < 0.0 {
            return invalid("fallback_baseline must be non-negative");
        }
        if self.fft_size < 2 || !self.fft_size.is_power_of_two() {
            return invalid("fft_size must be a power of two");
        }
        if self.min_decibels >= self.max_decibels {
            return invalid("min_decibels must be below max_decibels");
        }
        Ok(())
    }
}
