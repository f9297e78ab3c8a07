//! Core modules for the Polygraph session engine

pub mod clock;
pub mod spectrum;
pub mod sampler;
#[cfg(feature = "microphone")]
pub mod microphone;
pub mod collector;
pub mod calibration;
pub mod decision;
pub mod gesture;
pub mod status;
pub mod feedback;
pub mod controller;
pub mod api;

pub use clock::{Clock, SystemClock, ManualClock};
pub use spectrum::{SpectrumAnalyzer, downsample_bars};
pub use sampler::{
    AmplitudeSampler, AudioSource, CaptureStatus, ScriptedSource, SilentSource, SourceProbe,
    SyntheticSource, reduce,
};
#[cfg(feature = "microphone")]
pub use microphone::MicrophoneSource;
pub use collector::MeasurementCollector;
pub use calibration::{CalibrationManager, CalibrationOutcome, CALIBRATION_PROMPT, CALIBRATION_FAILED_NOTICE};
pub use decision::DecisionEngine;
pub use gesture::{GestureBands, GesturePosition};
pub use status::{StatusTicker, STATUS_MESSAGES, STATUS_IDLE, STATUS_INITIALIZING};
pub use feedback::{FeedbackCue, FeedbackSink, LogFeedback, NullFeedback, TerminalFeedback, ToneSpec, Waveform};
pub use controller::SessionController;
pub use api::{AppState, ViewGate, create_router, run_server, spawn_frame_driver};
