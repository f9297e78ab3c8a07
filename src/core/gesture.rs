//! Start gesture: pointer position → forced outcome
//!
//! The control is split into three bands by horizontal position:
//! - [0, truth_band)         → TRUE
//! - (lie_band, 1]           → LIE
//! - [truth_band, lie_band]  → per `MiddleBandPolicy`

use rand::Rng;
use crate::types::{ForcedOutcome, MiddleBandPolicy, Verdict};

/// Horizontal pointer position relative to the control
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GesturePosition {
    ratio: f64,
}

impl GesturePosition {
    /// From a ratio; clamped into 0.0-1.0. `None` if not finite.
    pub fn from_ratio(ratio: f64) -> Option<Self> {
        if !ratio.is_finite() {
            return None;
        }
        Some(Self {
            ratio: ratio.clamp(0.0, 1.0),
        })
    }

    /// From a pointer x offset and the control width. `None` for a
    /// non-positive width or non-finite input.
    pub fn from_offset(x: f64, width: f64) -> Option<Self> {
        if !width.is_finite() || width <= 0.0 {
            return None;
        }
        Self::from_ratio(x / width)
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GestureBands {
    pub truth_band: f64,
    pub lie_band: f64,
    pub middle: MiddleBandPolicy,
}

impl GestureBands {
    /// Sample the forced outcome once, at gesture time
    pub fn resolve<R: Rng + ?Sized>(&self, position: GesturePosition, rng: &mut R) -> ForcedOutcome {
        let ratio = position.ratio();
        if ratio < self.truth_band {
            Some(Verdict::True)
        } else if ratio > self.lie_band {
            Some(Verdict::Lie)
        } else {
            match self.middle {
                MiddleBandPolicy::Defer => None,
                MiddleBandPolicy::Random => Some(Verdict::from_coin(rng.gen_bool(0.5))),
            }
        }
    }
}
