//! Spectrum analyzer: PCM → byte frequency bins
//!
//! Hann window + FFT over the latest `fft_size` samples, magnitude in dB
//! mapped linearly from [min_db, max_db] onto 0-255. Bins below the floor
//! read 0, above the ceiling 255.

use std::sync::Arc;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    window: Vec<f32>,
    min_db: f32,
    max_db: f32,
    scratch: Vec<Complex<f32>>,
}

impl std::fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("fft_size", &self.fft_size)
            .field("min_db", &self.min_db)
            .field("max_db", &self.max_db)
            .finish()
    }
}

impl SpectrumAnalyzer {
    pub fn new(fft_size: usize, min_db: f32, max_db: f32) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let window = (0..fft_size)
            .map(|i| {
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / fft_size as f32).cos())
            })
            .collect();
        Self {
            fft,
            fft_size,
            window,
            min_db,
            max_db,
            scratch: Vec::with_capacity(fft_size),
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of bins produced per frame
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Analyze the most recent `fft_size` samples into `bins`.
    ///
    /// Shorter input is zero-padded at the front. Returns false when
    /// `samples` is empty.
    pub fn analyze(&mut self, samples: &[f32], bins: &mut Vec<u8>) -> bool {
        if samples.is_empty() {
            return false;
        }

        let tail = &samples[samples.len().saturating_sub(self.fft_size)..];
        let pad = self.fft_size - tail.len();

        self.scratch.clear();
        self.scratch.extend((0..pad).map(|_| Complex::new(0.0, 0.0)));
        self.scratch.extend(
            tail.iter()
                .zip(&self.window[pad..])
                .map(|(&s, &w)| Complex::new(s * w, 0.0)),
        );

        self.fft.process(&mut self.scratch);

        let norm = 1.0 / self.fft_size as f32;
        let range = self.max_db - self.min_db;
        bins.clear();
        bins.extend(self.scratch.iter().take(self.bin_count()).map(|c| {
            let magnitude = c.norm() * norm;
            let db = 20.0 * magnitude.max(1e-12).log10();
            let scaled = (db - self.min_db) / range * 255.0;
            scaled.clamp(0.0, 255.0) as u8
        }));
        true
    }
}

/// Squeeze bins into `bars` buckets, each the max of its span
pub fn downsample_bars(bins: &[u8], bars: usize) -> Vec<u8> {
    if bins.is_empty() || bars == 0 {
        return Vec::new();
    }
    (0..bars)
        .map(|bar| {
            let start = bar * bins.len() / bars;
            let end = ((bar + 1) * bins.len() / bars).max(start + 1).min(bins.len());
            bins[start.min(bins.len() - 1)..end].iter().copied().max().unwrap_or(0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq_bin: usize, size: usize, amplitude: f32) -> Vec<f32> {
        (0..size)
            .map(|i| {
                amplitude
                    * (2.0 * std::f32::consts::PI * freq_bin as f32 * i as f32 / size as f32).sin()
            })
            .collect()
    }

    #[test]
    fn test_silence_is_all_zero() {
        let mut analyzer = SpectrumAnalyzer::new(256, -100.0, -30.0);
        let mut bins = Vec::new();
        assert!(analyzer.analyze(&vec![0.0; 256], &mut bins));
        assert_eq!(bins.len(), 128);
        assert!(bins.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let mut analyzer = SpectrumAnalyzer::new(256, -100.0, -30.0);
        let mut bins = Vec::new();
        analyzer.analyze(&sine(20, 256, 0.5), &mut bins);

        let peak = bins
            .iter()
            .enumerate()
            .max_by_key(|(_, &b)| b)
            .map(|(i, _)| i)
            .unwrap();
        assert!((19..=21).contains(&peak), "peak at {}", peak);
        assert_eq!(bins[peak], 255, "loud tone saturates");
    }

    #[test]
    fn test_empty_input() {
        let mut analyzer = SpectrumAnalyzer::new(256, -100.0, -30.0);
        let mut bins = vec![7];
        assert!(!analyzer.analyze(&[], &mut bins));
    }

    #[test]
    fn test_short_input_is_padded() {
        let mut analyzer = SpectrumAnalyzer::new(256, -100.0, -30.0);
        let mut bins = Vec::new();
        assert!(analyzer.analyze(&sine(10, 64, 0.5), &mut bins));
        assert_eq!(bins.len(), 128);
    }

    #[test]
    fn test_downsample_bars() {
        let bins: Vec<u8> = (0..128).map(|i| i as u8).collect();
        let bars = downsample_bars(&bins, 30);
        assert_eq!(bars.len(), 30);
        assert_eq!(*bars.last().unwrap(), 127);
        assert!(bars.windows(2).all(|w| w[0] <= w[1]));
        assert!(downsample_bars(&[], 30).is_empty());
    }

    #[test]
    fn test_downsample_more_bars_than_bins() {
        let bars = downsample_bars(&[9, 3], 5);
        assert_eq!(bars.len(), 5);
        assert!(bars.iter().all(|&b| b == 9 || b == 3));
    }
}
