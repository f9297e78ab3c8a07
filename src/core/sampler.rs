//! Audio Sampler: frequency snapshots → one loudness sample per frame
//!
//! The sampler wraps an `AudioSource` (the capture collaborator). It is
//! activated when Analyzing or Calibrating begins, read once per frame poll,
//! and deactivated on every exit path. A source that refuses to open simply
//! yields no samples for that activation.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::spectrum::SpectrumAnalyzer;
use crate::types::{AmplitudeSample, Reduction};

/// Outcome of asking for the microphone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStatus {
    Granted,
    /// Permission refused or no device
    Denied,
    /// Device exists but could not be opened
    Busy,
}

/// Capture collaborator producing byte frequency bins (0-255)
pub trait AudioSource: Send {
    /// Open the device. Must not panic on failure.
    fn activate(&mut self) -> CaptureStatus;

    /// Fill `bins` with the current spectrum. False when nothing is available.
    fn read_bins(&mut self, bins: &mut Vec<u8>) -> bool;

    /// Release the device
    fn deactivate(&mut self);

    fn name(&self) -> &str;
}

/// Collapse a spectrum frame into one sample
pub fn reduce(bins: &[u8], reduction: Reduction) -> AmplitudeSample {
    if bins.is_empty() {
        return 0;
    }
    let sum: u64 = bins.iter().map(|&b| b as u64).sum();
    match reduction {
        Reduction::Mean => (sum / bins.len() as u64) as u8,
        Reduction::Sum => sum.min(255) as u8,
    }
}

/// Wait for a device thread to report how opening went.
///
/// No answer within `timeout`, or a thread that exits without answering,
/// counts as `Busy`.
pub fn await_capture(ready: &mpsc::Receiver<CaptureStatus>, timeout: Duration) -> CaptureStatus {
    match ready.recv_timeout(timeout) {
        Ok(status) => status,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "capture device did not answer in time");
            CaptureStatus::Busy
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            warn!("capture device thread exited without answering");
            CaptureStatus::Busy
        }
    }
}

/// Sampler state around one source
pub struct AmplitudeSampler {
    source: Box<dyn AudioSource>,
    reduction: Reduction,
    /// `None` while inactive
    status: Option<CaptureStatus>,
    bins: Vec<u8>,
    latest: Option<AmplitudeSample>,
}

impl AmplitudeSampler {
    pub fn new(source: Box<dyn AudioSource>, reduction: Reduction) -> Self {
        Self {
            source,
            reduction,
            status: None,
            bins: Vec::new(),
            latest: None,
        }
    }

    /// Open the source for a new run. Restarts if already active.
    pub fn activate(&mut self) -> CaptureStatus {
        if self.status.is_some() {
            self.deactivate();
        }
        let status = self.source.activate();
        match status {
            CaptureStatus::Granted => debug!(source = self.source.name(), "capture granted"),
            CaptureStatus::Denied => {
                warn!(source = self.source.name(), "capture denied, sampling silence")
            }
            CaptureStatus::Busy => {
                warn!(source = self.source.name(), "capture device busy, sampling silence")
            }
        }
        self.status = Some(status);
        status
    }

    /// One frame's sample, or `None` if inactive, refused, or no data yet
    pub fn next_sample(&mut self) -> Option<AmplitudeSample> {
        if self.status != Some(CaptureStatus::Granted) {
            return None;
        }
        if !self.source.read_bins(&mut self.bins) {
            return None;
        }
        let sample = reduce(&self.bins, self.reduction);
        self.latest = Some(sample);
        Some(sample)
    }

    /// Release the source. Safe to call when inactive.
    pub fn deactivate(&mut self) {
        if let Some(status) = self.status.take() {
            if status == CaptureStatus::Granted {
                self.source.deactivate();
            }
            debug!(source = self.source.name(), "capture released");
        }
        self.bins.clear();
        self.latest = None;
    }

    pub fn is_active(&self) -> bool {
        self.status.is_some()
    }

    pub fn status(&self) -> Option<CaptureStatus> {
        self.status
    }

    pub fn latest_sample(&self) -> Option<AmplitudeSample> {
        self.latest
    }

    /// Spectrum behind the latest sample
    pub fn latest_bins(&self) -> &[u8] {
        &self.bins
    }
}

impl Drop for AmplitudeSampler {
    fn drop(&mut self) {
        self.deactivate();
    }
}

// =============================================================================
// SOURCES
// =============================================================================

/// No microphone: every activation is denied
#[derive(Debug, Default)]
pub struct SilentSource;

impl AudioSource for SilentSource {
    fn activate(&mut self) -> CaptureStatus {
        CaptureStatus::Denied
    }

    fn read_bins(&mut self, _bins: &mut Vec<u8>) -> bool {
        false
    }

    fn deactivate(&mut self) {}

    fn name(&self) -> &str {
        "silent"
    }
}

/// Simulated speaker: a jittered harmonic voice run through the analyzer
#[derive(Debug)]
pub struct SyntheticSource {
    analyzer: SpectrumAnalyzer,
    rng: StdRng,
    /// Peak amplitude of the voice, 0.0-1.0
    amplitude: f32,
    /// Fundamental in cycles per FFT window
    fundamental: f32,
    pcm: Vec<f32>,
    active: bool,
}

impl SyntheticSource {
    pub fn new(analyzer: SpectrumAnalyzer, amplitude: f32, seed: u64) -> Self {
        Self {
            analyzer,
            rng: StdRng::seed_from_u64(seed),
            amplitude: amplitude.clamp(0.0, 1.0),
            fundamental: 6.0,
            pcm: Vec::new(),
            active: false,
        }
    }

    pub fn set_amplitude(&mut self, amplitude: f32) {
        self.amplitude = amplitude.clamp(0.0, 1.0);
    }

    fn synthesize(&mut self) {
        let size = self.analyzer.fft_size();
        // Syllable-like envelope: each frame is voiced or a short pause
        let voiced = self.rng.gen_bool(0.8);
        let gain = if voiced {
            self.amplitude * self.rng.gen_range(0.6..1.0)
        } else {
            0.0
        };
        let fundamental = self.fundamental * self.rng.gen_range(0.9..1.1);

        self.pcm.clear();
        self.pcm.extend((0..size).map(|i| {
            let t = i as f32 / size as f32;
            (1..=4)
                .map(|h| {
                    let phase = 2.0 * std::f32::consts::PI * fundamental * h as f32 * t;
                    phase.sin() / h as f32
                })
                .sum::<f32>()
                * gain
                * 0.5
        }));
    }
}

impl AudioSource for SyntheticSource {
    fn activate(&mut self) -> CaptureStatus {
        self.active = true;
        CaptureStatus::Granted
    }

    fn read_bins(&mut self, bins: &mut Vec<u8>) -> bool {
        if !self.active {
            return false;
        }
        self.synthesize();
        self.analyzer.analyze(&self.pcm, bins)
    }

    fn deactivate(&mut self) {
        self.active = false;
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

/// Shared view of a `ScriptedSource`'s device state
#[derive(Debug, Clone, Default)]
pub struct SourceProbe {
    active: Arc<AtomicBool>,
    activations: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
}

impl SourceProbe {
    /// Device currently open
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    /// Successful reads so far
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

/// Plays back a fixed list of loudness levels, one per read.
///
/// Each level becomes a flat spectrum, so `Mean` reduction returns the
/// level unchanged. When the script runs out the source goes quiet.
#[derive(Debug)]
pub struct ScriptedSource {
    levels: VecDeque<u8>,
    bin_count: usize,
    status: CaptureStatus,
    repeat_last: bool,
    probe: SourceProbe,
}

impl ScriptedSource {
    pub fn new(levels: impl IntoIterator<Item = u8>) -> Self {
        Self {
            levels: levels.into_iter().collect(),
            bin_count: 16,
            status: CaptureStatus::Granted,
            repeat_last: false,
            probe: SourceProbe::default(),
        }
    }

    /// Source that keeps producing `level` forever
    pub fn constant(level: u8) -> Self {
        let mut source = Self::new([level]);
        source.repeat_last = true;
        source
    }

    /// Source whose activation fails with `status`
    pub fn refusing(status: CaptureStatus) -> Self {
        let mut source = Self::new([]);
        source.status = status;
        source
    }

    pub fn with_bin_count(mut self, bin_count: usize) -> Self {
        self.bin_count = bin_count.max(1);
        self
    }

    pub fn probe(&self) -> SourceProbe {
        self.probe.clone()
    }
}

impl AudioSource for ScriptedSource {
    fn activate(&mut self) -> CaptureStatus {
        if self.status == CaptureStatus::Granted {
            self.probe.active.store(true, Ordering::SeqCst);
            self.probe.activations.fetch_add(1, Ordering::SeqCst);
        }
        self.status
    }

    fn read_bins(&mut self, bins: &mut Vec<u8>) -> bool {
        let level = if self.repeat_last && self.levels.len() == 1 {
            self.levels.front().copied()
        } else {
            self.levels.pop_front()
        };
        let Some(level) = level else {
            return false;
        };
        bins.clear();
        bins.resize(self.bin_count, level);
        self.probe.reads.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn deactivate(&mut self) {
        self.probe.active.store(false, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce_mean_and_sum() {
        assert_eq!(reduce(&[10, 20, 30], Reduction::Mean), 20);
        assert_eq!(reduce(&[10, 20, 30], Reduction::Sum), 60);
        assert_eq!(reduce(&[200, 200], Reduction::Sum), 255);
        assert_eq!(reduce(&[], Reduction::Mean), 0);
    }

    #[test]
    fn test_await_capture_passes_answer_through() {
        let (tx, rx) = mpsc::channel();
        tx.send(CaptureStatus::Granted).unwrap();
        assert_eq!(await_capture(&rx, Duration::from_secs(1)), CaptureStatus::Granted);
    }

    #[test]
    fn test_await_capture_gives_up_on_silent_device() {
        let (tx, rx) = mpsc::channel::<CaptureStatus>();
        let started = std::time::Instant::now();
        assert_eq!(await_capture(&rx, Duration::from_millis(20)), CaptureStatus::Busy);
        assert!(started.elapsed() < Duration::from_secs(2));
        drop(tx);
    }

    #[test]
    fn test_await_capture_dead_thread_is_busy() {
        let (tx, rx) = mpsc::channel::<CaptureStatus>();
        drop(tx);
        assert_eq!(await_capture(&rx, Duration::from_secs(5)), CaptureStatus::Busy);
    }

    #[test]
    fn test_inactive_sampler_yields_nothing() {
        let mut sampler = AmplitudeSampler::new(Box::new(ScriptedSource::constant(40)), Reduction::Mean);
        assert_eq!(sampler.next_sample(), None);
        sampler.activate();
        assert_eq!(sampler.next_sample(), Some(40));
    }

    #[test]
    fn test_denied_capture_is_silent() {
        for status in [CaptureStatus::Denied, CaptureStatus::Busy] {
            let mut sampler = AmplitudeSampler::new(Box::new(ScriptedSource::refusing(status)), Reduction::Mean);
            assert_eq!(sampler.activate(), status);
            assert!(sampler.is_active());
            assert_eq!(sampler.next_sample(), None);
        }
    }

    #[test]
    fn test_deactivate_releases_device() {
        let source = ScriptedSource::constant(40);
        let probe = source.probe();
        let mut sampler = AmplitudeSampler::new(Box::new(source), Reduction::Mean);

        sampler.activate();
        assert!(probe.is_active());
        sampler.deactivate();
        assert!(!probe.is_active());
        assert_eq!(sampler.next_sample(), None);
    }

    #[test]
    fn test_drop_releases_device() {
        let source = ScriptedSource::constant(40);
        let probe = source.probe();
        {
            let mut sampler = AmplitudeSampler::new(Box::new(source), Reduction::Mean);
            sampler.activate();
        }
        assert!(!probe.is_active());
    }

    #[test]
    fn test_reactivation_restarts() {
        let source = ScriptedSource::constant(40);
        let probe = source.probe();
        let mut sampler = AmplitudeSampler::new(Box::new(source), Reduction::Mean);
        sampler.activate();
        sampler.activate();
        assert_eq!(probe.activations(), 2);
        assert!(probe.is_active());
    }

    #[test]
    fn test_scripted_source_runs_out() {
        let mut sampler = AmplitudeSampler::new(Box::new(ScriptedSource::new([1, 2])), Reduction::Mean);
        sampler.activate();
        assert_eq!(sampler.next_sample(), Some(1));
        assert_eq!(sampler.next_sample(), Some(2));
        assert_eq!(sampler.next_sample(), None);
    }

    #[test]
    fn test_synthetic_source_is_audible() {
        let analyzer = SpectrumAnalyzer::new(256, -100.0, -30.0);
        let mut sampler = AmplitudeSampler::new(
            Box::new(SyntheticSource::new(analyzer, 0.8, 7)),
            Reduction::Mean,
        );
        sampler.activate();
        let samples: Vec<u8> = (0..50).filter_map(|_| sampler.next_sample()).collect();
        assert_eq!(samples.len(), 50);
        assert!(samples.iter().any(|&s| s > 5), "voice should clear the gate: {:?}", samples);
        assert_eq!(sampler.latest_bins().len(), 128);
    }

    #[test]
    fn test_synthetic_source_muted() {
        let analyzer = SpectrumAnalyzer::new(256, -100.0, -30.0);
        let mut source = SyntheticSource::new(analyzer, 0.8, 7);
        source.set_amplitude(0.0);
        let mut sampler = AmplitudeSampler::new(Box::new(source), Reduction::Mean);
        sampler.activate();
        assert!((0..20).filter_map(|_| sampler.next_sample()).all(|s| s == 0));
    }
}
