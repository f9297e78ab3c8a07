//! Reason codes for decisions and session transitions

use serde::{Deserialize, Serialize};

/// Reason codes for every verdict, calibration result and transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // R1xx: Decision rules (priority order)
    // =========================================================================
    /// Verdict fixed by gesture position
    R101_FORCED,
    /// No baseline yet, coin flip
    R102_NO_BASELINE,
    /// Nothing above the silence threshold during the whole window
    R103_SILENCE,
    /// Mean loudness exceeded baseline × louder ratio
    R104_ABOVE_BASELINE,
    /// Mean loudness within baseline × louder ratio
    R104_WITHIN_BASELINE,

    // =========================================================================
    // R2xx: Calibration
    // =========================================================================
    /// Baseline replaced by the mean of the capture
    R201_CALIBRATED,
    /// Capture heard nothing, fallback baseline applied
    R202_CALIBRATION_TOO_QUIET,

    // =========================================================================
    // R3xx: Transitions
    // =========================================================================
    /// Idle → Analyzing or Idle → Calibrating
    R301_SESSION_STARTED,
    /// Transition ignored, a session is already in flight
    R302_SESSION_BUSY,
    /// Result → Idle
    R303_SESSION_RESET,
    /// Running phase cancelled before its deadline
    R304_SESSION_CANCELLED,
}

impl ReasonCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::R101_FORCED => "R101_FORCED",
            Self::R102_NO_BASELINE => "R102_NO_BASELINE",
            Self::R103_SILENCE => "R103_SILENCE",
            Self::R104_ABOVE_BASELINE => "R104_ABOVE_BASELINE",
            Self::R104_WITHIN_BASELINE => "R104_WITHIN_BASELINE",
            Self::R201_CALIBRATED => "R201_CALIBRATED",
            Self::R202_CALIBRATION_TOO_QUIET => "R202_CALIBRATION_TOO_QUIET",
            Self::R301_SESSION_STARTED => "R301_SESSION_STARTED",
            Self::R302_SESSION_BUSY => "R302_SESSION_BUSY",
            Self::R303_SESSION_RESET => "R303_SESSION_RESET",
            Self::R304_SESSION_CANCELLED => "R304_SESSION_CANCELLED",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::R101_FORCED => "Outcome fixed by gesture",
            Self::R102_NO_BASELINE => "No baseline, random outcome",
            Self::R103_SILENCE => "Silence is suspicious",
            Self::R104_ABOVE_BASELINE => "Voice stress above baseline",
            Self::R104_WITHIN_BASELINE => "Voice within baseline",
            Self::R201_CALIBRATED => "Baseline calibrated",
            Self::R202_CALIBRATION_TOO_QUIET => "Calibration failed, volume too low",
            Self::R301_SESSION_STARTED => "Session started",
            Self::R302_SESSION_BUSY => "Session already in flight",
            Self::R303_SESSION_RESET => "Session reset",
            Self::R304_SESSION_CANCELLED => "Session cancelled",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
