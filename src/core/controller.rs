//! Session State Machine
//!
//! Phases:
//! - IDLE → ANALYZING: start gesture (ignored unless IDLE)
//! - ANALYZING → RESULT_TRUE | RESULT_LIE: first poll at or after the deadline
//! - RESULT_* → IDLE: reset
//! - IDLE → CALIBRATING → IDLE: calibrate, then deadline
//! - ANALYZING | CALIBRATING → IDLE: reset cancels without a verdict
//!
//! The controller owns no threads or timers. The host calls `poll()` once
//! per frame; each poll takes at most one sample, advances the status ticker
//! and fires the phase deadline when due. Deadlines live in the active run,
//! so leaving a phase drops them and nothing can fire late.

use std::time::Duration;
use rand::rngs::StdRng;
use rand::SeedableRng;
use chrono::Utc;
use tracing::{debug, info};

use crate::core::calibration::{CalibrationManager, CALIBRATION_FAILED_NOTICE, CALIBRATION_PROMPT};
use crate::core::clock::{Clock, SystemClock};
use crate::core::collector::MeasurementCollector;
use crate::core::decision::DecisionEngine;
use crate::core::feedback::{FeedbackCue, FeedbackSink, NullFeedback};
use crate::core::gesture::{GestureBands, GesturePosition};
use crate::core::sampler::{AmplitudeSampler, AudioSource, CaptureStatus};
use crate::core::spectrum::downsample_bars;
use crate::core::status::{StatusTicker, STATUS_IDLE, STATUS_INITIALIZING};
use crate::types::{
    Baseline, Decision, EngineConfig, ForcedOutcome, MeasurementSet, ReasonCode,
    SessionPhase, SessionView, Verdict,
};
use crate::{Result, VISUALIZER_BARS};

/// Timers of the phase in flight
#[derive(Debug, Clone, Copy)]
struct ActiveRun {
    started_at: Duration,
    deadline: Duration,
    forced: ForcedOutcome,
}

pub struct SessionController {
    config: EngineConfig,
    clock: Box<dyn Clock>,
    sampler: AmplitudeSampler,
    collector: MeasurementCollector,
    calibration: CalibrationManager,
    decision_engine: DecisionEngine,
    bands: GestureBands,
    ticker: StatusTicker,
    feedback: Box<dyn FeedbackSink>,
    rng: StdRng,

    phase: SessionPhase,
    run: Option<ActiveRun>,
    status: String,
    verdict: Option<Verdict>,
    reason: Option<ReasonCode>,
    notice: Option<String>,
    last_decision: Option<Decision>,
    decisions: u64,
    sessions: u64,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("phase", &self.phase)
            .field("status", &self.status)
            .field("baseline", &self.calibration.baseline())
            .field("measurements", &self.collector.len())
            .field("decisions", &self.decisions)
            .finish()
    }
}

impl SessionController {
    /// Controller on the system clock, silent feedback and an entropy-seeded RNG.
    ///
    /// Fails with `InvalidConfig` for settings the engine cannot run with.
    pub fn new(config: EngineConfig, source: Box<dyn AudioSource>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            sampler: AmplitudeSampler::new(source, config.reduction),
            collector: MeasurementCollector::new(config.silence_threshold),
            calibration: CalibrationManager::new(config.fallback_baseline),
            decision_engine: DecisionEngine::new(config.louder_ratio),
            bands: GestureBands {
                truth_band: config.truth_band,
                lie_band: config.lie_band,
                middle: config.middle_band,
            },
            ticker: StatusTicker::new(Duration::from_millis(config.status_interval_ms)),
            clock: Box::new(SystemClock::new()),
            feedback: Box::new(NullFeedback),
            rng: StdRng::from_entropy(),
            phase: SessionPhase::Idle,
            run: None,
            status: STATUS_IDLE.to_string(),
            verdict: None,
            reason: None,
            notice: None,
            last_decision: None,
            decisions: 0,
            sessions: 0,
            config,
        })
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_feedback(mut self, feedback: Box<dyn FeedbackSink>) -> Self {
        self.feedback = feedback;
        self
    }

    /// Deterministic gesture bands, status text and coin flips
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    // =========================================================================
    // USER TRANSITIONS
    // =========================================================================

    /// Pointer-down on the primary control. Returns false if ignored.
    pub fn start(&mut self, position: GesturePosition) -> bool {
        if self.phase != SessionPhase::Idle {
            debug!(
                phase = %self.phase,
                reason = ReasonCode::R302_SESSION_BUSY.code(),
                "start ignored"
            );
            return false;
        }

        let forced = self.bands.resolve(position, &mut self.rng);
        let duration = Duration::from_millis(self.config.analysis_ms);
        let capture = self.begin_run(SessionPhase::Analyzing, duration, forced);

        self.status = STATUS_INITIALIZING.to_string();
        self.ticker.start(self.clock.now());
        self.sessions += 1;
        self.feedback.cue(FeedbackCue::Start);

        info!(
            session = self.sessions,
            ratio = position.ratio(),
            forced = forced.is_some(),
            capture = ?capture,
            "session started"
        );
        true
    }

    /// Begin a calibration capture. Returns false if ignored.
    pub fn calibrate(&mut self) -> bool {
        if self.phase != SessionPhase::Idle {
            debug!(
                phase = %self.phase,
                reason = ReasonCode::R302_SESSION_BUSY.code(),
                "calibration ignored"
            );
            return false;
        }

        let duration = Duration::from_millis(self.config.calibration_ms);
        let capture = self.begin_run(SessionPhase::Calibrating, duration, None);
        self.status = CALIBRATION_PROMPT.to_string();
        self.feedback.cue(FeedbackCue::Beep);

        info!(capture = ?capture, "calibration started");
        true
    }

    /// Back to IDLE. From a running phase this cancels without a verdict.
    pub fn reset(&mut self) -> bool {
        match self.phase {
            SessionPhase::Idle => false,
            SessionPhase::ResultTrue | SessionPhase::ResultLie => {
                self.collector.clear();
                self.enter_idle(ReasonCode::R303_SESSION_RESET);
                info!("session reset");
                true
            }
            SessionPhase::Analyzing | SessionPhase::Calibrating => {
                let cancelled = self.phase;
                self.end_run();
                self.collector.clear();
                self.enter_idle(ReasonCode::R304_SESSION_CANCELLED);
                info!(phase = %cancelled, "run cancelled");
                true
            }
        }
    }

    // =========================================================================
    // FRAME POLL
    // =========================================================================

    /// One host frame. Returns true when the phase changed.
    pub fn poll(&mut self) -> bool {
        let Some(run) = self.run else {
            return false;
        };
        let now = self.clock.now();

        if now >= run.deadline {
            self.finish_run(run);
            return true;
        }

        if let Some(sample) = self.sampler.next_sample() {
            self.collector.offer(sample);
        }

        if self.phase == SessionPhase::Analyzing {
            if let Some(text) = self.ticker.poll(now, &mut self.rng) {
                self.status = text.to_string();
                self.feedback.cue(FeedbackCue::Analyzing);
            }
        }
        false
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn begin_run(&mut self, phase: SessionPhase, duration: Duration, forced: ForcedOutcome) -> CaptureStatus {
        let now = self.clock.now();
        self.collector.begin();
        let capture = self.sampler.activate();
        self.run = Some(ActiveRun {
            started_at: now,
            deadline: now + duration,
            forced,
        });
        self.phase = phase;
        self.verdict = None;
        self.notice = None;
        self.reason = Some(ReasonCode::R301_SESSION_STARTED);
        capture
    }

    /// Cancel every timer and release the microphone
    fn end_run(&mut self) {
        self.run = None;
        self.ticker.cancel();
        self.sampler.deactivate();
        self.collector.close();
    }

    fn finish_run(&mut self, run: ActiveRun) {
        let phase = self.phase;
        self.end_run();

        match phase {
            SessionPhase::Analyzing => {
                let decision = self.decision_engine.decide(
                    run.forced,
                    self.calibration.baseline(),
                    self.collector.measurements(),
                    &mut self.rng,
                );
                self.decisions += 1;
                info!(
                    verdict = %decision.verdict,
                    reason = decision.reason.code(),
                    samples = self.collector.len(),
                    discarded = self.collector.discarded(),
                    current_avg = ?decision.current_avg,
                    threshold = ?decision.threshold,
                    "verdict"
                );

                self.phase = decision.verdict.phase();
                self.status = decision.verdict.headline().to_string();
                self.verdict = Some(decision.verdict);
                self.reason = Some(decision.reason);
                self.feedback.cue(match decision.verdict {
                    Verdict::True => FeedbackCue::True,
                    Verdict::Lie => FeedbackCue::Lie,
                });
                self.last_decision = Some(decision);
            }
            SessionPhase::Calibrating => {
                let outcome = self.calibration.complete(self.collector.measurements());
                self.collector.clear();
                self.enter_idle(outcome.reason);
                if !outcome.is_success() {
                    self.notice = Some(CALIBRATION_FAILED_NOTICE.to_string());
                }
                self.feedback.cue(FeedbackCue::Beep);
            }
            // A run only exists in sampling phases
            SessionPhase::Idle | SessionPhase::ResultTrue | SessionPhase::ResultLie => {}
        }
    }

    fn enter_idle(&mut self, reason: ReasonCode) {
        self.phase = SessionPhase::Idle;
        self.status = STATUS_IDLE.to_string();
        self.verdict = None;
        self.notice = None;
        self.reason = Some(reason);
    }

    // =========================================================================
    // READ-ONLY STATE
    // =========================================================================

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn baseline(&self) -> Option<Baseline> {
        self.calibration.baseline()
    }

    pub fn measurements(&self) -> &MeasurementSet {
        self.collector.measurements()
    }

    pub fn last_decision(&self) -> Option<&Decision> {
        self.last_decision.as_ref()
    }

    /// Decision Engine invocations so far
    pub fn decisions_made(&self) -> u64 {
        self.decisions
    }

    /// True while a phase deadline or the status ticker is armed
    pub fn has_pending_timers(&self) -> bool {
        self.run.is_some() || self.ticker.is_running()
    }

    /// Microphone currently held
    pub fn is_capturing(&self) -> bool {
        self.sampler.status() == Some(CaptureStatus::Granted)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.config.frame_interval_ms)
    }

    /// Fraction of the running phase elapsed
    pub fn progress(&self) -> f64 {
        match self.run {
            Some(run) => {
                let total = run.deadline.saturating_sub(run.started_at).as_secs_f64();
                let elapsed = self.clock.now().saturating_sub(run.started_at).as_secs_f64();
                if total > 0.0 {
                    (elapsed / total).clamp(0.0, 1.0)
                } else {
                    1.0
                }
            }
            None if self.phase.is_result() => 1.0,
            None => 0.0,
        }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            timestamp: Utc::now(),
            phase: self.phase,
            status: self.status.clone(),
            level: self.sampler.latest_sample(),
            bars: downsample_bars(self.sampler.latest_bins(), VISUALIZER_BARS),
            verdict: self.verdict,
            reason: self.reason,
            baseline: self.calibration.baseline(),
            measurement_count: self.collector.len(),
            progress: self.progress(),
            notice: self.notice.clone(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
