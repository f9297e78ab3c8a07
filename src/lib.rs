//! Polygraph: deception session engine for the kiosk
//!
//! Gesture → SessionController → (sampler + collector) → DecisionEngine → verdict

pub mod core;
pub mod error;
pub mod types;

pub use error::{PolygraphError, Result};

// =============================================================================
// GESTURE BANDS
// =============================================================================

/// Pointer positions below this ratio force TRUE
pub const TRUTH_BAND_END: f64 = 0.4;

/// Pointer positions above this ratio force LIE
pub const LIE_BAND_START: f64 = 0.6;

// =============================================================================
// TIMING (milliseconds)
// =============================================================================

/// Length of the Analyzing phase
pub const ANALYSIS_DURATION_MS: u64 = 4000;

/// Length of a calibration capture
pub const CALIBRATION_DURATION_MS: u64 = 3000;

/// Status text rotation period while Analyzing
pub const STATUS_INTERVAL_MS: u64 = 500;

/// Host frame period (~60 Hz), one sample per frame
pub const FRAME_INTERVAL_MS: u64 = 16;

/// Minimum gap between broadcasts that only move the level meter
pub const METER_INTERVAL_MS: u64 = 100;

// =============================================================================
// HEURISTIC
// =============================================================================

/// Samples below this level (0-255) are treated as silence
pub const SILENCE_THRESHOLD: u8 = 5;

/// Baseline used when calibration hears nothing
pub const FALLBACK_BASELINE: f64 = 50.0;

/// A session louder than baseline × this ratio reads as LIE
pub const LOUDER_RATIO: f64 = 1.2;

// =============================================================================
// ANALYSIS RESOLUTION
// =============================================================================

/// FFT window length; the sampler sees FFT_SIZE / 2 bins
pub const FFT_SIZE: usize = 256;

/// Decibel floor mapped to byte 0
pub const MIN_DECIBELS: f32 = -100.0;

/// Decibel ceiling mapped to byte 255
pub const MAX_DECIBELS: f32 = -30.0;

/// Number of bars handed to the visualizer
pub const VISUALIZER_BARS: usize = 30;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
