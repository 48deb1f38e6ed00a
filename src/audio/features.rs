use serde::Serialize;

use super::note::{cents_from_reference, Note};

/// Tunables for a batch analysis run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnalysisParams {
    pub frames_per_second: f64,
    pub window_seconds: f64,
    pub top_n: usize,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            frames_per_second: 10.0,
            window_seconds: 0.1,
            top_n: 3,
        }
    }
}

/// One detected note in one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct NoteEvent {
    /// Bin-centre frequency in Hz
    pub frequency: f64,
    pub note: Note,
    /// Magnitude divided by the loudest bin of the whole recording (0.0-1.0)
    pub amplitude: f64,
}

impl NoteEvent {
    /// Deviation of `frequency` from A4, in cents.
    pub fn cents(&self) -> f64 {
        cents_from_reference(self.frequency)
    }
}

/// Notes found in a single analysis frame, loudest first.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameNotes {
    pub index: usize,
    pub notes: Vec<NoteEvent>,
}

/// Frame-ordered detection result for a whole buffer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NoteTimeline {
    pub sample_rate: u32,
    pub window_size: usize,
    pub frame_offset: usize,
    pub frame_count: usize,
    /// Loudest bin magnitude over all frames, used for normalization
    pub normalization_peak: f64,
    pub frames: Vec<FrameNotes>,
}

impl NoteTimeline {
    /// Every detected note name in frame order, for plotting note over time.
    pub fn note_names(&self) -> Vec<String> {
        self.events().map(|e| e.note.to_string()).collect()
    }

    pub fn events(&self) -> impl Iterator<Item = &NoteEvent> {
        self.frames.iter().flat_map(|f| f.notes.iter())
    }
}
