//! Live microphone source (cpal)
//!
//! cpal streams are not `Send` on every platform, so each activation opens the
//! default input device on a dedicated device thread that owns the stream
//! until deactivation. The input callback appends mono PCM to a bounded ring;
//! `read_bins` analyzes the most recent window on the caller's thread.
//!
//! Activation and deactivation run under the session lock, so both wait on
//! the device thread for a bounded time only. A device that does not answer
//! is reported `Busy` and its thread is left to close on its own.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{info, warn};

use crate::core::sampler::{await_capture, AudioSource, CaptureStatus};
use crate::core::spectrum::SpectrumAnalyzer;

/// Longest wait for the device thread to open the stream
const DEVICE_OPEN_TIMEOUT: Duration = Duration::from_secs(2);

/// Longest wait for the device thread to drop the stream
const DEVICE_CLOSE_TIMEOUT: Duration = Duration::from_millis(500);

type PcmRing = Arc<Mutex<VecDeque<f32>>>;

/// Handles to a device thread holding an open stream
struct DeviceThread {
    stop_tx: mpsc::Sender<()>,
    closed_rx: mpsc::Receiver<()>,
    handle: JoinHandle<()>,
}

pub struct MicrophoneSource {
    analyzer: SpectrumAnalyzer,
    ring: PcmRing,
    capacity: usize,
    window: Vec<f32>,
    device: Option<DeviceThread>,
}

impl std::fmt::Debug for MicrophoneSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MicrophoneSource")
            .field("analyzer", &self.analyzer)
            .field("open", &self.device.is_some())
            .finish()
    }
}

impl MicrophoneSource {
    pub fn new(analyzer: SpectrumAnalyzer) -> Self {
        let capacity = analyzer.fft_size() * 4;
        Self {
            analyzer,
            ring: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
            window: Vec::with_capacity(capacity),
            device: None,
        }
    }

    fn push_mono(ring: &PcmRing, capacity: usize, data: &[f32], channels: usize) {
        let Ok(mut ring) = ring.lock() else {
            return;
        };
        for frame in data.chunks(channels.max(1)) {
            let mono = frame.iter().sum::<f32>() / frame.len() as f32;
            if ring.len() == capacity {
                ring.pop_front();
            }
            ring.push_back(mono);
        }
    }

    /// Runs on the device thread: open, report, hold until stopped
    fn run_device(
        ring: PcmRing,
        capacity: usize,
        ready_tx: mpsc::Sender<CaptureStatus>,
        stop_rx: mpsc::Receiver<()>,
        closed_tx: mpsc::Sender<()>,
    ) {
        let host = cpal::default_host();
        let Some(device) = host.default_input_device() else {
            warn!("no default input device");
            let _ = ready_tx.send(CaptureStatus::Denied);
            return;
        };

        let config = match device.default_input_config() {
            Ok(config) => config,
            Err(e) => {
                warn!("input config unavailable: {}", e);
                let _ = ready_tx.send(CaptureStatus::Busy);
                return;
            }
        };
        let channels = config.channels() as usize;
        let stream_config: cpal::StreamConfig = config.clone().into();
        let on_error = |err: cpal::StreamError| warn!("input stream error: {}", err);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                let ring = ring.clone();
                device.build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        Self::push_mono(&ring, capacity, data, channels);
                    },
                    on_error,
                    None,
                )
            }
            cpal::SampleFormat::I16 => {
                let ring = ring.clone();
                device.build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        let pcm: Vec<f32> = data.iter().map(|&s| s as f32 / i16::MAX as f32).collect();
                        Self::push_mono(&ring, capacity, &pcm, channels);
                    },
                    on_error,
                    None,
                )
            }
            cpal::SampleFormat::U16 => {
                let ring = ring.clone();
                device.build_input_stream(
                    &stream_config,
                    move |data: &[u16], _: &cpal::InputCallbackInfo| {
                        let pcm: Vec<f32> = data
                            .iter()
                            .map(|&s| (s as f32 - 32768.0) / 32768.0)
                            .collect();
                        Self::push_mono(&ring, capacity, &pcm, channels);
                    },
                    on_error,
                    None,
                )
            }
            other => {
                warn!("unsupported input sample format: {:?}", other);
                let _ = ready_tx.send(CaptureStatus::Busy);
                return;
            }
        };

        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!("failed to build input stream: {}", e);
                let _ = ready_tx.send(CaptureStatus::Busy);
                return;
            }
        };
        if let Err(e) = stream.play() {
            warn!("failed to start input stream: {}", e);
            let _ = ready_tx.send(CaptureStatus::Busy);
            return;
        }

        info!(
            device = device.name().unwrap_or_default(),
            sample_rate = stream_config.sample_rate.0,
            channels,
            "microphone open"
        );
        let _ = ready_tx.send(CaptureStatus::Granted);

        // Block until deactivate sends or drops the sender
        let _ = stop_rx.recv();
        drop(stream);
        let _ = closed_tx.send(());
    }
}

impl AudioSource for MicrophoneSource {
    fn activate(&mut self) -> CaptureStatus {
        self.deactivate();
        if let Ok(mut ring) = self.ring.lock() {
            ring.clear();
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel();
        let (closed_tx, closed_rx) = mpsc::channel();
        let ring = self.ring.clone();
        let capacity = self.capacity;

        let spawned = std::thread::Builder::new()
            .name("polygraph-mic".to_string())
            .spawn(move || Self::run_device(ring, capacity, ready_tx, stop_rx, closed_tx));
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                warn!("failed to spawn device thread: {}", e);
                return CaptureStatus::Busy;
            }
        };

        // On anything but Granted, dropping stop_tx lets a late-opening
        // thread close its stream and exit unjoined
        let status = await_capture(&ready_rx, DEVICE_OPEN_TIMEOUT);
        if status == CaptureStatus::Granted {
            self.device = Some(DeviceThread {
                stop_tx,
                closed_rx,
                handle,
            });
        }
        status
    }

    fn read_bins(&mut self, bins: &mut Vec<u8>) -> bool {
        self.window.clear();
        match self.ring.lock() {
            Ok(ring) => self.window.extend(ring.iter().copied()),
            Err(_) => return false,
        }
        self.analyzer.analyze(&self.window, bins)
    }

    fn deactivate(&mut self) {
        let Some(device) = self.device.take() else {
            return;
        };
        let _ = device.stop_tx.send(());
        match device.closed_rx.recv_timeout(DEVICE_CLOSE_TIMEOUT) {
            // Thread is past the stream drop; joining is immediate
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                let _ = device.handle.join();
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!("microphone did not close in time, detaching device thread");
            }
        }
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

impl Drop for MicrophoneSource {
    fn drop(&mut self) {
        self.deactivate();
    }
}
