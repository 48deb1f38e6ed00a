use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;
use std::sync::Arc;

use crate::error::AnalysisError;

/// Hann-windowed real FFT over frames of a fixed size.
///
/// The plan, window and bin-frequency table are built once and shared by
/// every frame; `analyze` only takes `&self`, so one analyzer can serve
/// several worker threads.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn RealToComplex<f64>>,
    window: Vec<f64>,
    bin_freqs: Vec<f64>,
}

impl SpectrumAnalyzer {
    pub fn new(window_size: usize, sample_rate: u32) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(window_size);

        Self {
            fft,
            window: hann_window(window_size),
            bin_freqs: bin_frequencies(window_size, sample_rate),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window.len()
    }

    /// Centre frequency in Hz of every bin `analyze` returns.
    pub fn bin_freqs(&self) -> &[f64] {
        &self.bin_freqs
    }

    /// Magnitude spectrum (`window_size / 2 + 1` bins) of one windowed frame.
    pub fn analyze(&self, frame_number: usize, frame: &[f64]) -> Result<Vec<f64>, AnalysisError> {
        if frame.len() != self.window.len() {
            return Err(AnalysisError::malformed(
                frame_number,
                format!("expected {} samples, got {}", self.window.len(), frame.len()),
            ));
        }

        let mut input: Vec<f64> = frame
            .iter()
            .zip(self.window.iter())
            .map(|(sample, w)| sample * w)
            .collect();
        let mut output: Vec<Complex<f64>> = self.fft.make_output_vec();
        let mut scratch = self.fft.make_scratch_vec();

        self.fft
            .process_with_scratch(&mut input, &mut output, &mut scratch)
            .map_err(|e| AnalysisError::malformed(frame_number, e.to_string()))?;

        Ok(output.iter().map(|c| c.norm()).collect())
    }
}

/// Periodic Hann window: `0.5 * (1 - cos(2*pi*i / size))` for `i in 0..size`.
pub fn hann_window(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / size as f64).cos()))
        .collect()
}

/// `k * sample_rate / size` for `k in 0..=size/2`.
pub fn bin_frequencies(size: usize, sample_rate: u32) -> Vec<f64> {
    (0..=size / 2)
        .map(|k| k as f64 * sample_rate as f64 / size as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_periodic_hann() {
        let w = hann_window(4);
        let expected = [0.0, 0.5, 1.0, 0.5];
        for (got, want) in w.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{got} != {want}");
        }
    }

    #[test]
    fn bin_table_matches_rfft_layout() {
        assert_eq!(bin_frequencies(8, 800), vec![0.0, 100.0, 200.0, 300.0, 400.0]);
        assert_eq!(bin_frequencies(5, 1000), vec![0.0, 200.0, 400.0]);
    }

    #[test]
    fn spectrum_has_half_plus_one_bins() {
        for size in [8, 9, 4410] {
            let analyzer = SpectrumAnalyzer::new(size, 44_100);
            let spectrum = analyzer.analyze(0, &vec![1.0; size]).unwrap();
            assert_eq!(spectrum.len(), size / 2 + 1);
            assert_eq!(analyzer.bin_freqs().len(), size / 2 + 1);
            assert!(spectrum.iter().all(|m| *m >= 0.0));
        }
    }

    #[test]
    fn constant_frame_lands_in_dc_and_first_bin() {
        // Hann of a constant: DC = N/2, bin 1 = N/4, the rest vanish.
        let analyzer = SpectrumAnalyzer::new(16, 16);
        let spectrum = analyzer.analyze(0, &[1.0; 16]).unwrap();
        assert!((spectrum[0] - 8.0).abs() < 1e-9);
        assert!((spectrum[1] - 4.0).abs() < 1e-9);
        assert!(spectrum[2..].iter().all(|m| m.abs() < 1e-9));
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let size = 64;
        let sample_rate = 6400;
        let analyzer = SpectrumAnalyzer::new(size, sample_rate);
        let frame: Vec<f64> = (0..size)
            .map(|i| (2.0 * std::f64::consts::PI * 1000.0 * i as f64 / sample_rate as f64).sin())
            .collect();
        let spectrum = analyzer.analyze(0, &frame).unwrap();
        let peak = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(analyzer.bin_freqs()[peak], 1000.0);
    }

    #[test]
    fn wrong_length_is_malformed() {
        let analyzer = SpectrumAnalyzer::new(8, 800);
        let err = analyzer.analyze(3, &[0.0; 7]).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedFrame { frame: 3, .. }));
    }
}
