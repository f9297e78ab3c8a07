//! Core types for the Polygraph session engine

mod phase;
mod verdict;
mod reason;
mod measurement;
mod output;
mod config;

pub use phase::SessionPhase;
pub use verdict::{Verdict, ForcedOutcome, Decision};
pub use reason::ReasonCode;
pub use measurement::{AmplitudeSample, MeasurementSet, Baseline, BaselineSource};
pub use output::SessionView;
pub use config::{EngineConfig, Reduction, MiddleBandPolicy};
