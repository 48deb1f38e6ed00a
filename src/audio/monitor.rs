//! Chunk-by-chunk analysis for live input.
//!
//! Live audio has no "whole recording" to normalize against, so each chunk is
//! normalized by the loudest bin seen so far. All loop state lives in
//! [`LevelMonitor`] and is owned by the caller.

use std::fmt::Display;

use super::features::NoteEvent;
use super::peaks::find_top_notes;
use super::spectrum::SpectrumAnalyzer;
use crate::error::AnalysisError;

pub const CHUNK_SIZE: usize = 1024;
pub const LEVEL_GROUP: usize = 10;
const MIN_LEVEL_DB: f64 = -120.0;

#[derive(Clone, Debug, PartialEq)]
pub struct ChunkReport {
    pub index: usize,
    /// Loudest bin of this chunk, `10 * log10(magnitude)`
    pub peak_db: f64,
    pub notes: Vec<NoteEvent>,
    /// Mean `peak_db` of the last `LEVEL_GROUP` chunks, set on every group boundary
    pub group_average_db: Option<f64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MonitorSummary {
    pub processed: usize,
    pub skipped: usize,
}

pub struct LevelMonitor {
    analyzer: SpectrumAnalyzer,
    top_n: usize,
    group_size: usize,
    chunks_seen: usize,
    levels: Vec<f64>,
    running_peak: f64,
}

impl LevelMonitor {
    pub fn new(chunk_size: usize, sample_rate: u32, top_n: usize, group_size: usize) -> Self {
        Self {
            analyzer: SpectrumAnalyzer::new(chunk_size, sample_rate),
            top_n,
            group_size: group_size.max(1),
            chunks_seen: 0,
            levels: Vec::with_capacity(group_size),
            running_peak: 0.0,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.analyzer.window_size()
    }

    pub fn push_chunk(&mut self, chunk: &[f32]) -> Result<ChunkReport, AnalysisError> {
        let index = self.chunks_seen;
        let frame: Vec<f64> = chunk.iter().map(|&s| s as f64).collect();
        let mut spectrum = self.analyzer.analyze(index, &frame)?;

        let loudest = spectrum.iter().copied().fold(0.0f64, f64::max);
        let peak_db = if loudest > 0.0 {
            (10.0 * loudest.log10()).max(MIN_LEVEL_DB)
        } else {
            MIN_LEVEL_DB
        };

        self.running_peak = self.running_peak.max(loudest);
        let notes = if self.running_peak > 0.0 {
            for magnitude in spectrum.iter_mut() {
                *magnitude /= self.running_peak;
            }
            find_top_notes(&spectrum, self.analyzer.bin_freqs(), self.top_n)
        } else {
            Vec::new()
        };

        self.chunks_seen += 1;
        self.levels.push(peak_db);
        let group_average_db = if self.levels.len() >= self.group_size {
            let average = self.levels.iter().sum::<f64>() / self.levels.len() as f64;
            self.levels.clear();
            Some(average)
        } else {
            None
        };

        Ok(ChunkReport {
            index,
            peak_db,
            notes,
            group_average_db,
        })
    }
}

/// Splits a finished recording into `chunk_size` chunks, zero-padding the
/// last one so the end of the buffer is analyzed rather than dropped.
pub fn padded_chunks(samples: &[f32], chunk_size: usize) -> impl Iterator<Item = Vec<f32>> + '_ {
    samples.chunks(chunk_size.max(1)).map(move |chunk| {
        let mut chunk = chunk.to_vec();
        chunk.resize(chunk_size, 0.0);
        chunk
    })
}

/// Feeds every chunk through `monitor`, reporting each one in order.
///
/// Chunks that failed to arrive, or arrive at the wrong size, are logged and
/// skipped; the loop only ends when `chunks` does.
pub fn run_monitor<I, E, F>(monitor: &mut LevelMonitor, chunks: I, mut on_report: F) -> MonitorSummary
where
    I: IntoIterator<Item = Result<Vec<f32>, E>>,
    E: Display,
    F: FnMut(&ChunkReport),
{
    let mut summary = MonitorSummary::default();

    for chunk in chunks {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                log::warn!("Skipping chunk: {}", err);
                summary.skipped += 1;
                continue;
            }
        };

        match monitor.push_chunk(&chunk) {
            Ok(report) => {
                on_report(&report);
                summary.processed += 1;
            }
            Err(err) => {
                log::warn!("Skipping chunk: {}", err);
                summary.skipped += 1;
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const RATE: u32 = 44_100;

    fn tone(frequency: f32, amplitude: f32) -> Vec<f32> {
        (0..CHUNK_SIZE)
            .map(|n| amplitude * (2.0 * PI * frequency * n as f32 / RATE as f32).sin())
            .collect()
    }

    #[test]
    fn reports_notes_per_chunk() {
        let mut monitor = LevelMonitor::new(CHUNK_SIZE, RATE, 3, LEVEL_GROUP);
        let report = monitor.push_chunk(&tone(440.0, 0.8)).unwrap();
        assert_eq!(report.index, 0);
        assert_eq!(report.notes[0].note.to_string(), "A4");
        assert!(report.peak_db > MIN_LEVEL_DB);
        assert_eq!(report.group_average_db, None);
    }

    #[test]
    fn silence_reports_floor_level_and_no_notes() {
        let mut monitor = LevelMonitor::new(CHUNK_SIZE, RATE, 3, LEVEL_GROUP);
        let report = monitor.push_chunk(&[0.0; CHUNK_SIZE]).unwrap();
        assert_eq!(report.peak_db, MIN_LEVEL_DB);
        assert!(report.notes.is_empty());
    }

    #[test]
    fn quiet_chunk_is_normalized_against_earlier_loud_one() {
        let mut monitor = LevelMonitor::new(CHUNK_SIZE, RATE, 1, LEVEL_GROUP);
        let loud = monitor.push_chunk(&tone(440.0, 1.0)).unwrap();
        let quiet = monitor.push_chunk(&tone(440.0, 0.25)).unwrap();
        assert!((loud.notes[0].amplitude - 1.0).abs() < 1e-9);
        assert!((quiet.notes[0].amplitude - 0.25).abs() < 1e-3);
    }

    #[test]
    fn averages_levels_every_group() {
        let mut monitor = LevelMonitor::new(CHUNK_SIZE, RATE, 3, 3);
        let chunks = (0..7).map(|_| Ok::<_, String>(tone(440.0, 0.5)));
        let mut averages = Vec::new();
        let mut levels = Vec::new();

        let summary = run_monitor(&mut monitor, chunks, |report| {
            levels.push(report.peak_db);
            if let Some(avg) = report.group_average_db {
                averages.push((report.index, avg));
            }
        });

        assert_eq!(summary, MonitorSummary { processed: 7, skipped: 0 });
        assert_eq!(averages.len(), 2);
        assert_eq!(averages[0].0, 2);
        assert_eq!(averages[1].0, 5);
        assert!((averages[0].1 - levels[0]).abs() < 1e-6);
    }

    #[test]
    fn recording_tail_is_padded_not_skipped() {
        let samples: Vec<f32> = (0..3)
            .flat_map(|_| tone(440.0, 0.5))
            .chain(std::iter::repeat(0.1).take(68))
            .collect();
        let chunks: Vec<Vec<f32>> = padded_chunks(&samples, CHUNK_SIZE).collect();
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.len() == CHUNK_SIZE));
        assert_eq!(chunks[3][67], 0.1);
        assert_eq!(chunks[3][68], 0.0);

        let mut monitor = LevelMonitor::new(CHUNK_SIZE, RATE, 3, LEVEL_GROUP);
        let summary = run_monitor(
            &mut monitor,
            padded_chunks(&samples, CHUNK_SIZE).map(Ok::<_, String>),
            |_| {},
        );
        assert_eq!(summary, MonitorSummary { processed: 4, skipped: 0 });
    }

    #[test]
    fn failed_and_short_chunks_are_skipped() {
        let mut monitor = LevelMonitor::new(CHUNK_SIZE, RATE, 3, LEVEL_GROUP);
        let chunks = vec![
            Ok(tone(440.0, 0.5)),
            Err("input overflow".to_string()),
            Ok(vec![0.1; CHUNK_SIZE / 2]),
            Ok(tone(880.0, 0.5)),
        ];
        let mut indices = Vec::new();

        let summary = run_monitor(&mut monitor, chunks, |report| indices.push(report.index));

        assert_eq!(summary, MonitorSummary { processed: 2, skipped: 2 });
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(monitor.chunk_size(), CHUNK_SIZE);
    }
}
