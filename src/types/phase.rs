//! Session phase definitions

use serde::{Deserialize, Serialize};

/// The five phases of the kiosk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    /// Waiting for a gesture
    Idle,
    /// Capturing the baseline voice level
    Calibrating,
    /// Session running, sampling audio
    Analyzing,
    /// Verdict: the statement was true
    ResultTrue,
    /// Verdict: deception detected
    ResultLie,
}

impl SessionPhase {
    /// Phases during which the microphone is open and samples are collected
    pub fn is_sampling(&self) -> bool {
        matches!(self, SessionPhase::Analyzing | SessionPhase::Calibrating)
    }

    /// Terminal phases, left only through reset
    pub fn is_result(&self) -> bool {
        matches!(self, SessionPhase::ResultTrue | SessionPhase::ResultLie)
    }

    /// Get ANSI color code for terminal display
    pub fn color_code(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "\x1b[90m",        // Gray
            SessionPhase::Calibrating => "\x1b[36m", // Cyan
            SessionPhase::Analyzing => "\x1b[33m",   // Yellow
            SessionPhase::ResultTrue => "\x1b[32m",  // Green
            SessionPhase::ResultLie => "\x1b[31m",   // Red
        }
    }

    /// Reset ANSI color
    pub fn color_reset() -> &'static str {
        "\x1b[0m"
    }

    /// Get emoji for phase
    pub fn emoji(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "👆",
            SessionPhase::Calibrating => "🎙",
            SessionPhase::Analyzing => "📈",
            SessionPhase::ResultTrue => "✅",
            SessionPhase::ResultLie => "🚨",
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionPhase::Idle => "IDLE",
            SessionPhase::Calibrating => "CALIBRATING",
            SessionPhase::Analyzing => "ANALYZING",
            SessionPhase::ResultTrue => "RESULT_TRUE",
            SessionPhase::ResultLie => "RESULT_LIE",
        };
        write!(f, "{}", name)
    }
}
