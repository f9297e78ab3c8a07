//! Feedback-tone collaborator
//!
//! The controller calls `cue` at fixed transition points and never looks at
//! the result. Sinks must not panic; anything that goes wrong stays inside
//! the sink.

use std::io::Write;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Symbolic feedback events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackCue {
    Start,
    Analyzing,
    True,
    Lie,
    Beep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
}

/// What a tone generator should play for a cue
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToneSpec {
    pub waveform: Waveform,
    /// Frequencies the tone steps or ramps through (Hz)
    pub frequencies: &'static [f32],
    /// Peak gain, 0.0-1.0
    pub gain: f32,
    pub duration_ms: u32,
}

impl FeedbackCue {
    pub fn name(&self) -> &'static str {
        match self {
            FeedbackCue::Start => "start",
            FeedbackCue::Analyzing => "analyzing",
            FeedbackCue::True => "true",
            FeedbackCue::Lie => "lie",
            FeedbackCue::Beep => "beep",
        }
    }

    pub fn tone(&self) -> ToneSpec {
        match self {
            FeedbackCue::Beep => ToneSpec {
                waveform: Waveform::Sine,
                frequencies: &[800.0, 400.0],
                gain: 0.5,
                duration_ms: 100,
            },
            FeedbackCue::Start => ToneSpec {
                waveform: Waveform::Square,
                frequencies: &[200.0, 800.0],
                gain: 0.2,
                duration_ms: 500,
            },
            FeedbackCue::Analyzing => ToneSpec {
                waveform: Waveform::Sawtooth,
                frequencies: &[100.0, 200.0, 150.0],
                gain: 0.03,
                duration_ms: 100,
            },
            FeedbackCue::Lie => ToneSpec {
                waveform: Waveform::Sawtooth,
                frequencies: &[150.0, 100.0],
                gain: 0.5,
                duration_ms: 1000,
            },
            // A major arpeggio
            FeedbackCue::True => ToneSpec {
                waveform: Waveform::Sine,
                frequencies: &[440.0, 554.0, 659.0],
                gain: 0.3,
                duration_ms: 1000,
            },
        }
    }
}

impl std::fmt::Display for FeedbackCue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub trait FeedbackSink: Send {
    /// Fire and forget
    fn cue(&mut self, cue: FeedbackCue);
}

/// Discards every cue
#[derive(Debug, Default)]
pub struct NullFeedback;

impl FeedbackSink for NullFeedback {
    fn cue(&mut self, _cue: FeedbackCue) {}
}

/// Logs each cue with its tone
#[derive(Debug, Default)]
pub struct LogFeedback;

impl FeedbackSink for LogFeedback {
    fn cue(&mut self, cue: FeedbackCue) {
        let tone = cue.tone();
        debug!(
            cue = cue.name(),
            waveform = ?tone.waveform,
            frequencies = ?tone.frequencies,
            duration_ms = tone.duration_ms,
            "feedback tone"
        );
    }
}

/// Logs, and rings the terminal bell for attention cues
#[derive(Debug, Default)]
pub struct TerminalFeedback {
    log: LogFeedback,
}

impl FeedbackSink for TerminalFeedback {
    fn cue(&mut self, cue: FeedbackCue) {
        self.log.cue(cue);
        if matches!(cue, FeedbackCue::Lie | FeedbackCue::Beep) {
            let mut stdout = std::io::stdout();
            // Bell is best effort
            let _ = stdout.write_all(b"\x07");
            let _ = stdout.flush();
        }
    }
}
