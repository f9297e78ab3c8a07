//! Read-only view handed to the presentation layer

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::types::{Baseline, ReasonCode, SessionPhase, Verdict};

/// Snapshot of the session for rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Current phase
    pub phase: SessionPhase,
    /// Status line (flavor text, prompt or headline)
    pub status: String,
    /// Latest reduced sample, if the sampler produced one this run
    pub level: Option<u8>,
    /// Latest spectrum squeezed into visualizer bars
    pub bars: Vec<u8>,
    /// Final verdict, only in result phases
    pub verdict: Option<Verdict>,
    /// Reason for the last decision or calibration
    pub reason: Option<ReasonCode>,
    /// Current baseline, if any calibration has run
    pub baseline: Option<Baseline>,
    /// Samples kept by the noise gate this run
    pub measurement_count: usize,
    /// Fraction of the running phase elapsed (0.0-1.0)
    pub progress: f64,
    /// One-off message for the user (e.g. failed calibration)
    pub notice: Option<String>,
}

impl SessionView {
    /// Same content, ignoring the timestamp
    pub fn same_content(&self, other: &SessionView) -> bool {
        self.phase == other.phase
            && self.status == other.status
            && self.level == other.level
            && self.bars == other.bars
            && self.verdict == other.verdict
            && self.reason == other.reason
            && self.baseline == other.baseline
            && self.measurement_count == other.measurement_count
            && self.progress == other.progress
            && self.notice == other.notice
    }

    /// Same session state: everything except the live meter (level, bars,
    /// progress, sample count) and the timestamp
    pub fn same_state(&self, other: &SessionView) -> bool {
        self.phase == other.phase
            && self.status == other.status
            && self.verdict == other.verdict
            && self.reason == other.reason
            && self.baseline == other.baseline
            && self.notice == other.notice
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let color = self.phase.color_code();
        let reset = SessionPhase::color_reset();
        let emoji = self.phase.emoji();

        format!("{}{} {}{}", color, emoji, self.to_parseable_string(), reset)
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        let mut line = format!(
            "phase={} | status={} | samples={} | progress={:.0}%",
            self.phase,
            self.status,
            self.measurement_count,
            self.progress * 100.0
        );
        if let Some(baseline) = &self.baseline {
            line.push_str(&format!(" | baseline={:.1}", baseline.volume));
        }
        if let Some(verdict) = self.verdict {
            line.push_str(&format!(" | verdict={}", verdict));
        }
        if let Some(reason) = self.reason {
            line.push_str(&format!(" | reason={}", reason.code()));
        }
        line
    }
}
