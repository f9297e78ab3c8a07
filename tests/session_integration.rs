//! Integration tests for the session state machine
//!
//! Drives full sessions through the public controller API with a manual
//! clock and scripted audio.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use polygraph::core::{
    AudioSource, CaptureStatus, GesturePosition, ManualClock, ScriptedSource, SessionController,
    SilentSource,
};
use polygraph::types::{EngineConfig, MiddleBandPolicy, ReasonCode, SessionPhase, Verdict};
use polygraph::PolygraphError;
use pretty_assertions::assert_eq;

/// Source whose level the test turns up and down between phases
#[derive(Clone, Default)]
struct Dial(Arc<AtomicU8>);

impl Dial {
    fn set(&self, level: u8) {
        self.0.store(level, Ordering::SeqCst);
    }
}

impl AudioSource for Dial {
    fn activate(&mut self) -> CaptureStatus {
        CaptureStatus::Granted
    }

    fn read_bins(&mut self, bins: &mut Vec<u8>) -> bool {
        bins.clear();
        bins.resize(16, self.0.load(Ordering::SeqCst));
        true
    }

    fn deactivate(&mut self) {}

    fn name(&self) -> &str {
        "dial"
    }
}

fn make_controller(config: EngineConfig, source: Box<dyn AudioSource>, seed: u64) -> (SessionController, ManualClock) {
    let clock = ManualClock::new();
    let ctl = SessionController::new(config, source)
        .unwrap()
        .with_clock(Box::new(clock.clone()))
        .with_seed(seed);
    (ctl, clock)
}

fn at(ratio: f64) -> GesturePosition {
    GesturePosition::from_ratio(ratio).unwrap()
}

/// Poll at the default frame rate until the phase stops sampling
fn run_to_end(ctl: &mut SessionController, clock: &ManualClock) {
    for _ in 0..10_000 {
        if !ctl.phase().is_sampling() {
            return;
        }
        clock.advance_ms(16);
        ctl.poll();
    }
    panic!("run never finished");
}

fn session(ctl: &mut SessionController, clock: &ManualClock, ratio: f64) -> Verdict {
    assert!(ctl.start(at(ratio)));
    run_to_end(ctl, clock);
    let verdict = ctl.view().verdict.expect("result phase carries a verdict");
    assert!(ctl.reset());
    verdict
}

fn calibrated_with(dial: &Dial, level: u8, ctl: &mut SessionController, clock: &ManualClock) {
    dial.set(level);
    assert!(ctl.calibrate());
    run_to_end(ctl, clock);
    assert_eq!(ctl.view().reason, Some(ReasonCode::R201_CALIBRATED));
}

#[test]
fn test_left_touch_always_true() {
    for level in [0u8, 30, 120, 255] {
        let (mut ctl, clock) = make_controller(
            EngineConfig::default(),
            Box::new(ScriptedSource::constant(level)),
            1,
        );
        for ratio in [0.0, 0.1, 0.25, 0.39] {
            assert_eq!(session(&mut ctl, &clock, ratio), Verdict::True);
        }
        assert_eq!(ctl.last_decision().unwrap().reason, ReasonCode::R101_FORCED);
    }
}

#[test]
fn test_right_touch_always_lie() {
    for level in [0u8, 30, 120, 255] {
        let (mut ctl, clock) = make_controller(
            EngineConfig::default(),
            Box::new(ScriptedSource::constant(level)),
            2,
        );
        for ratio in [0.61, 0.75, 0.9, 1.0] {
            assert_eq!(session(&mut ctl, &clock, ratio), Verdict::Lie);
        }
    }
}

#[test]
fn test_pointer_offset_maps_to_bands() {
    let (mut ctl, clock) = make_controller(EngineConfig::default(), Box::new(SilentSource), 3);
    let left = GesturePosition::from_offset(20.0, 400.0).unwrap();
    assert!(ctl.start(left));
    run_to_end(&mut ctl, &clock);
    assert_eq!(ctl.phase(), SessionPhase::ResultTrue);
}

#[test]
fn test_middle_without_baseline_is_a_coin_flip() {
    let trials = 400;
    let mut lies = 0;
    for seed in 0..trials {
        let (mut ctl, clock) =
            make_controller(EngineConfig::default(), Box::new(ScriptedSource::constant(90)), seed);
        if session(&mut ctl, &clock, 0.5) == Verdict::Lie {
            lies += 1;
        }
        assert_eq!(ctl.last_decision().unwrap().reason, ReasonCode::R102_NO_BASELINE);
    }
    assert!((140..=260).contains(&lies), "lies = {}", lies);
}

#[test]
fn test_random_middle_band_is_forced() {
    let config = EngineConfig {
        middle_band: MiddleBandPolicy::Random,
        ..EngineConfig::default()
    };
    let (mut ctl, clock) = make_controller(config, Box::new(SilentSource), 4);
    session(&mut ctl, &clock, 0.5);
    assert_eq!(ctl.last_decision().unwrap().reason, ReasonCode::R101_FORCED);
}

#[test]
fn test_silence_after_baseline_is_lie() {
    let dial = Dial::default();
    let (mut ctl, clock) = make_controller(EngineConfig::default(), Box::new(dial.clone()), 5);
    calibrated_with(&dial, 40, &mut ctl, &clock);

    // Below the silence threshold nothing is kept
    dial.set(3);
    assert_eq!(session(&mut ctl, &clock, 0.5), Verdict::Lie);
    let decision = ctl.last_decision().unwrap();
    assert_eq!(decision.reason, ReasonCode::R103_SILENCE);
    assert_eq!(decision.current_avg, None);
}

#[test]
fn test_louder_than_baseline_threshold() {
    let dial = Dial::default();
    let (mut ctl, clock) = make_controller(EngineConfig::default(), Box::new(dial.clone()), 6);
    calibrated_with(&dial, 50, &mut ctl, &clock);

    dial.set(60);
    assert_eq!(session(&mut ctl, &clock, 0.5), Verdict::True);
    assert_eq!(ctl.last_decision().unwrap().reason, ReasonCode::R104_WITHIN_BASELINE);
    assert_eq!(ctl.last_decision().unwrap().threshold, Some(60.0));

    dial.set(61);
    assert_eq!(session(&mut ctl, &clock, 0.5), Verdict::Lie);
    assert_eq!(ctl.last_decision().unwrap().reason, ReasonCode::R104_ABOVE_BASELINE);

    dial.set(45);
    assert_eq!(session(&mut ctl, &clock, 0.5), Verdict::True);
}

#[test]
fn test_forced_band_beats_baseline() {
    let dial = Dial::default();
    let (mut ctl, clock) = make_controller(EngineConfig::default(), Box::new(dial.clone()), 7);
    calibrated_with(&dial, 50, &mut ctl, &clock);

    dial.set(200);
    assert_eq!(session(&mut ctl, &clock, 0.1), Verdict::True);
    dial.set(0);
    assert_eq!(session(&mut ctl, &clock, 0.9), Verdict::Lie);
}

#[test]
fn test_start_while_analyzing_is_ignored() {
    let (mut ctl, clock) = make_controller(EngineConfig::default(), Box::new(SilentSource), 8);
    assert!(ctl.start(at(0.9)));
    clock.advance_ms(500);
    ctl.poll();

    assert!(!ctl.start(at(0.1)));
    assert!(!ctl.calibrate());
    assert_eq!(ctl.phase(), SessionPhase::Analyzing);

    run_to_end(&mut ctl, &clock);
    assert_eq!(ctl.phase(), SessionPhase::ResultLie);
    assert_eq!(ctl.decisions_made(), 1);
}

#[test]
fn test_start_ignored_in_result_phase() {
    let (mut ctl, clock) = make_controller(EngineConfig::default(), Box::new(SilentSource), 9);
    ctl.start(at(0.1));
    run_to_end(&mut ctl, &clock);
    assert!(!ctl.start(at(0.9)));
    assert_eq!(ctl.phase(), SessionPhase::ResultTrue);
}

#[test]
fn test_reset_leaves_no_timers() {
    let (mut ctl, clock) =
        make_controller(EngineConfig::default(), Box::new(ScriptedSource::constant(70)), 10);
    ctl.start(at(0.2));
    run_to_end(&mut ctl, &clock);
    assert!(!ctl.measurements().is_empty());

    assert!(ctl.reset());
    assert_eq!(ctl.phase(), SessionPhase::Idle);
    assert_eq!(ctl.status(), "READY");
    assert!(ctl.measurements().is_empty());
    assert!(!ctl.has_pending_timers());

    for _ in 0..1000 {
        clock.advance_ms(16);
        assert!(!ctl.poll());
    }
    assert_eq!(ctl.decisions_made(), 1);
}

#[test]
fn test_cancel_mid_analysis_skips_decision() {
    let source = ScriptedSource::constant(70);
    let probe = source.probe();
    let (mut ctl, clock) = make_controller(EngineConfig::default(), Box::new(source), 11);

    ctl.start(at(0.5));
    for _ in 0..50 {
        clock.advance_ms(16);
        ctl.poll();
    }
    assert!(probe.is_active());

    assert!(ctl.reset());
    assert_eq!(ctl.view().reason, Some(ReasonCode::R304_SESSION_CANCELLED));
    assert!(!probe.is_active());

    clock.advance_ms(10_000);
    ctl.poll();
    assert_eq!(ctl.decisions_made(), 0);
    assert_eq!(ctl.phase(), SessionPhase::Idle);
}

#[test]
fn test_denied_capture_yields_silence() {
    let (mut denied, clock) = make_controller(
        EngineConfig::default(),
        Box::new(ScriptedSource::refusing(CaptureStatus::Denied)),
        12,
    );
    denied.calibrate();
    run_to_end(&mut denied, &clock);
    assert_eq!(denied.view().reason, Some(ReasonCode::R202_CALIBRATION_TOO_QUIET));
    assert!(denied.measurements().is_empty());
    assert_eq!(session(&mut denied, &clock, 0.5), Verdict::Lie);
    assert_eq!(denied.last_decision().unwrap().reason, ReasonCode::R103_SILENCE);
}

#[test]
fn test_sampler_released_on_every_exit() {
    let source = ScriptedSource::constant(70);
    let probe = source.probe();
    let (mut ctl, clock) = make_controller(EngineConfig::default(), Box::new(source), 13);

    ctl.calibrate();
    assert!(probe.is_active());
    run_to_end(&mut ctl, &clock);
    assert!(!probe.is_active());

    ctl.start(at(0.5));
    assert!(probe.is_active());
    run_to_end(&mut ctl, &clock);
    assert!(!probe.is_active());

    ctl.reset();
    ctl.start(at(0.5));
    assert!(probe.is_active());
    drop(ctl);
    assert!(!probe.is_active());
    assert_eq!(probe.activations(), 3);
}

#[test]
fn test_custom_analysis_duration() {
    let config = EngineConfig {
        analysis_ms: 1000,
        ..EngineConfig::default()
    };
    let (mut ctl, clock) = make_controller(config, Box::new(SilentSource), 14);
    ctl.start(at(0.1));
    clock.advance_ms(999);
    ctl.poll();
    assert_eq!(ctl.phase(), SessionPhase::Analyzing);
    clock.advance_ms(1);
    assert!(ctl.poll());
    assert_eq!(ctl.phase(), SessionPhase::ResultTrue);
}

#[test]
fn test_view_json_shape() {
    let (mut ctl, clock) = make_controller(EngineConfig::default(), Box::new(SilentSource), 15);
    ctl.start(at(0.9));
    run_to_end(&mut ctl, &clock);

    let json = serde_json::to_value(ctl.view()).unwrap();
    assert_eq!(json["phase"], "RESULT_LIE");
    assert_eq!(json["verdict"], "LIE");
    assert_eq!(json["status"], "DECEPTION DETECTED");
    assert_eq!(json["reason"], "R101_FORCED");
    assert!(json["timestamp"].is_string());
}

#[test]
fn test_unrunnable_config_is_rejected() {
    for config in [
        EngineConfig {
            status_interval_ms: 0,
            ..EngineConfig::default()
        },
        EngineConfig {
            frame_interval_ms: 0,
            ..EngineConfig::default()
        },
        EngineConfig {
            analysis_ms: 0,
            ..EngineConfig::default()
        },
    ] {
        let result = SessionController::new(config, Box::new(SilentSource));
        assert!(matches!(result, Err(PolygraphError::InvalidConfig(_))));
    }
}
