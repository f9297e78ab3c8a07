//! Verdicts and the decision record

use serde::{Deserialize, Serialize};
use crate::types::{ReasonCode, SessionPhase};

/// Binary outcome of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    True,
    Lie,
}

impl Verdict {
    /// Terminal phase reached with this verdict
    pub fn phase(&self) -> SessionPhase {
        match self {
            Verdict::True => SessionPhase::ResultTrue,
            Verdict::Lie => SessionPhase::ResultLie,
        }
    }

    /// Headline text shown under the verdict
    pub fn headline(&self) -> &'static str {
        match self {
            Verdict::True => "VERIFIED",
            Verdict::Lie => "DECEPTION DETECTED",
        }
    }

    /// Coin flip helper
    pub fn from_coin(heads: bool) -> Self {
        if heads {
            Verdict::True
        } else {
            Verdict::Lie
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::True => write!(f, "TRUE"),
            Verdict::Lie => write!(f, "LIE"),
        }
    }
}

/// Verdict fixed by the gesture at session start. `None` defers to analysis.
pub type ForcedOutcome = Option<Verdict>;

/// Output of one Decision Engine invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub verdict: Verdict,
    /// Which rule fired
    pub reason: ReasonCode,
    /// Mean of the session's measurements, when the loudness rule ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_avg: Option<f64>,
    /// baseline × louder ratio, when the loudness rule ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

impl Decision {
    /// Decision that did not look at loudness
    pub fn new(verdict: Verdict, reason: ReasonCode) -> Self {
        Self {
            verdict,
            reason,
            current_avg: None,
            threshold: None,
        }
    }

    /// Decision from the loudness comparison
    pub fn measured(verdict: Verdict, reason: ReasonCode, current_avg: f64, threshold: f64) -> Self {
        Self {
            verdict,
            reason,
            current_avg: Some(current_avg),
            threshold: Some(threshold),
        }
    }
}
