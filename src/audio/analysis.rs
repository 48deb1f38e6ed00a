use rayon::prelude::*;

use super::features::{AnalysisParams, FrameNotes, NoteTimeline};
use super::frame::extract_frame;
use super::peaks::find_top_notes;
use super::spectrum::SpectrumAnalyzer;
use crate::error::AnalysisError;

/// Frame layout derived from the buffer length and the analysis parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameGeometry {
    pub window_size: usize,
    pub frame_count: usize,
    pub frame_offset: usize,
}

impl FrameGeometry {
    pub fn derive(
        total_samples: usize,
        sample_rate: u32,
        params: &AnalysisParams,
    ) -> Result<Self, AnalysisError> {
        if total_samples == 0 {
            return Err(AnalysisError::invalid("buffer", "no samples to analyze"));
        }
        if sample_rate == 0 {
            return Err(AnalysisError::invalid("sample rate", "must be positive"));
        }
        if !(params.frames_per_second > 0.0 && params.frames_per_second.is_finite()) {
            return Err(AnalysisError::invalid(
                "frames per second",
                format!("{} is not a positive number", params.frames_per_second),
            ));
        }
        if !(params.window_seconds > 0.0 && params.window_seconds.is_finite()) {
            return Err(AnalysisError::invalid(
                "window duration",
                format!("{} s is not a positive number", params.window_seconds),
            ));
        }
        if params.top_n == 0 {
            return Err(AnalysisError::invalid("top notes", "must ask for at least one note"));
        }

        let window_size = (sample_rate as f64 * params.window_seconds).floor() as usize;
        if window_size == 0 {
            return Err(AnalysisError::invalid(
                "window size",
                format!(
                    "{} s at {} Hz is shorter than one sample",
                    params.window_seconds, sample_rate
                ),
            ));
        }

        let duration = total_samples as f64 / sample_rate as f64;
        let frame_count = (duration * params.frames_per_second).floor() as usize;
        if frame_count == 0 {
            return Err(AnalysisError::invalid(
                "frame count",
                format!(
                    "{:.3} s of audio at {} frames per second yields no frames",
                    duration, params.frames_per_second
                ),
            ));
        }

        Ok(Self {
            window_size,
            frame_count,
            frame_offset: total_samples / frame_count,
        })
    }
}

/// Receives frame progress from [`analyze_with_progress`].
pub trait Progress: Sync {
    /// Called once the frame layout is known, with the number of ticks to expect.
    fn start(&self, _total_ticks: u64) {}

    fn tick(&self);
}

impl Progress for () {
    fn tick(&self) {}
}

pub fn analyze<T>(
    samples: &[T],
    sample_rate: u32,
    params: &AnalysisParams,
) -> Result<NoteTimeline, AnalysisError>
where
    T: Copy + Into<f64> + Sync,
{
    analyze_with_progress(samples, sample_rate, params, &())
}

/// Two-pass note detection over a whole buffer.
///
/// Pass 1 finds the loudest bin magnitude across every frame; pass 2
/// recomputes each spectrum, normalizes it by that peak and picks the top
/// notes. `progress` is ticked once per frame in each pass.
pub fn analyze_with_progress<T>(
    samples: &[T],
    sample_rate: u32,
    params: &AnalysisParams,
    progress: &dyn Progress,
) -> Result<NoteTimeline, AnalysisError>
where
    T: Copy + Into<f64> + Sync,
{
    let geometry = FrameGeometry::derive(samples.len(), sample_rate, params)?;
    log::info!(
        "Frames: {} x {} samples, offset {} samples",
        geometry.frame_count,
        geometry.window_size,
        geometry.frame_offset
    );

    progress.start(2 * geometry.frame_count as u64);

    let analyzer = SpectrumAnalyzer::new(geometry.window_size, sample_rate);

    log::info!("Pass 1: Normalization peak ({} frames)...", geometry.frame_count);
    let peak = pass1_normalization_peak(samples, &geometry, &analyzer, progress)?;
    if !(peak > 0.0 && peak.is_finite()) {
        return Err(AnalysisError::invalid(
            "normalization peak",
            format!("loudest bin is {peak}, the input is silent or not finite"),
        ));
    }
    log::info!("Normalization peak: {:.4}", peak);

    log::info!("Pass 2: Note detection (top {})...", params.top_n);
    let frames = pass2_detect(samples, &geometry, &analyzer, peak, params.top_n, progress)?;

    for frame in &frames {
        for event in &frame.notes {
            log::debug!(
                "frame {}: {} (midi {}) at {:.2} Hz, amplitude {:.3}, {:.2} cents",
                frame.index,
                event.note,
                event.note.midi_number(),
                event.frequency,
                event.amplitude,
                event.cents()
            );
        }
    }

    Ok(NoteTimeline {
        sample_rate,
        window_size: geometry.window_size,
        frame_offset: geometry.frame_offset,
        frame_count: geometry.frame_count,
        normalization_peak: peak,
        frames,
    })
}

fn frame_spectrum<T>(
    samples: &[T],
    geometry: &FrameGeometry,
    analyzer: &SpectrumAnalyzer,
    frame_number: usize,
) -> Result<Vec<f64>, AnalysisError>
where
    T: Copy + Into<f64>,
{
    let frame = extract_frame(
        samples,
        frame_number,
        geometry.frame_offset,
        geometry.window_size,
    )?;
    analyzer.analyze(frame_number, &frame)
}

fn pass1_normalization_peak<T>(
    samples: &[T],
    geometry: &FrameGeometry,
    analyzer: &SpectrumAnalyzer,
    progress: &dyn Progress,
) -> Result<f64, AnalysisError>
where
    T: Copy + Into<f64> + Sync,
{
    (0..geometry.frame_count)
        .into_par_iter()
        .map(|frame_number| -> Result<f64, AnalysisError> {
            let spectrum = frame_spectrum(samples, geometry, analyzer, frame_number)?;
            progress.tick();
            Ok(spectrum.into_iter().fold(0.0f64, f64::max))
        })
        .try_reduce(|| 0.0, |a, b| Ok(a.max(b)))
}

fn pass2_detect<T>(
    samples: &[T],
    geometry: &FrameGeometry,
    analyzer: &SpectrumAnalyzer,
    peak: f64,
    top_n: usize,
    progress: &dyn Progress,
) -> Result<Vec<FrameNotes>, AnalysisError>
where
    T: Copy + Into<f64> + Sync,
{
    (0..geometry.frame_count)
        .into_par_iter()
        .map(|frame_number| -> Result<FrameNotes, AnalysisError> {
            let mut spectrum = frame_spectrum(samples, geometry, analyzer, frame_number)?;
            for magnitude in spectrum.iter_mut() {
                *magnitude /= peak;
            }
            let notes = find_top_notes(&spectrum, analyzer.bin_freqs(), top_n);
            progress.tick();
            Ok(FrameNotes {
                index: frame_number,
                notes,
            })
        })
        .collect()
}
