//! Decision Engine: forced outcome, or measurements against baseline
//!
//! Rules in priority order:
//! 1. Forced outcome from the gesture wins unconditionally
//! 2. No baseline yet → coin flip
//! 3. Nothing above the silence gate → LIE
//! 4. mean > baseline × louder_ratio → LIE, otherwise TRUE

use rand::Rng;
use crate::types::{Baseline, Decision, ForcedOutcome, MeasurementSet, ReasonCode, Verdict};

#[derive(Debug, Clone, Copy)]
pub struct DecisionEngine {
    louder_ratio: f64,
}

impl DecisionEngine {
    pub fn new(louder_ratio: f64) -> Self {
        Self { louder_ratio }
    }

    pub fn louder_ratio(&self) -> f64 {
        self.louder_ratio
    }

    pub fn decide<R: Rng + ?Sized>(
        &self,
        forced: ForcedOutcome,
        baseline: Option<Baseline>,
        measurements: &MeasurementSet,
        rng: &mut R,
    ) -> Decision {
        if let Some(verdict) = forced {
            return Decision::new(verdict, ReasonCode::R101_FORCED);
        }

        let Some(baseline) = baseline else {
            return Decision::new(Verdict::from_coin(rng.gen_bool(0.5)), ReasonCode::R102_NO_BASELINE);
        };

        let Some(current_avg) = measurements.mean() else {
            return Decision::new(Verdict::Lie, ReasonCode::R103_SILENCE);
        };

        let threshold = baseline.volume * self.louder_ratio;
        if current_avg > threshold {
            Decision::measured(Verdict::Lie, ReasonCode::R104_ABOVE_BASELINE, current_avg, threshold)
        } else {
            Decision::measured(Verdict::True, ReasonCode::R104_WITHIN_BASELINE, current_avg, threshold)
        }
    }
}
