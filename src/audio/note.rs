//! Frequency to note-name mapping in twelve-tone equal temperament, A4 = 440 Hz.

use serde::{Serialize, Serializer};
use std::fmt;

pub const REFERENCE_FREQUENCY: f64 = 440.0;

const SEMITONES_PER_OCTAVE: i32 = 12;
const REFERENCE_OCTAVE: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }

    /// Position within the octave, C = 0.
    pub fn index(self) -> i32 {
        self as i32
    }
}

/// A pitch class in a specific octave, e.g. `C#4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Note {
    pub pitch: PitchClass,
    pub octave: i32,
}

impl Note {
    fn from_absolute(absolute: i32) -> Self {
        let octave = absolute.div_euclid(SEMITONES_PER_OCTAVE);
        let index = absolute.rem_euclid(SEMITONES_PER_OCTAVE);
        Self {
            pitch: PitchClass::ALL[index as usize],
            octave,
        }
    }

    /// Semitones counted from C0.
    pub fn absolute(self) -> i32 {
        self.octave * SEMITONES_PER_OCTAVE + self.pitch.index()
    }

    /// MIDI note number (C-1 = 0, A4 = 69).
    pub fn midi_number(self) -> i32 {
        self.absolute() + SEMITONES_PER_OCTAVE
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch.name(), self.octave)
    }
}

impl Serialize for Note {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Maps a frequency to the nearest equal-tempered note.
///
/// Returns `None` for frequencies that are not strictly positive and finite
/// (DC bins and silence map to nothing).
///
/// The semitone distance from A4 is rounded half to even, so a frequency
/// exactly between two notes resolves to the note with the even distance.
pub fn frequency_to_note(frequency: f64) -> Option<Note> {
    if !(frequency > 0.0) || !frequency.is_finite() {
        return None;
    }

    let distance = nearest_semitone(semitones_from_reference(frequency));
    let reference = REFERENCE_OCTAVE * SEMITONES_PER_OCTAVE + PitchClass::A.index();

    Some(Note::from_absolute(reference + distance))
}

/// Pitch offset from A4 in cents (1200 per octave).
pub fn cents_from_reference(frequency: f64) -> f64 {
    1200.0 * (frequency / REFERENCE_FREQUENCY).log2()
}

fn semitones_from_reference(frequency: f64) -> f64 {
    let semitone_ratio = 2f64.powf(1.0 / SEMITONES_PER_OCTAVE as f64);
    (frequency / REFERENCE_FREQUENCY).ln() / semitone_ratio.ln()
}

fn nearest_semitone(distance: f64) -> i32 {
    distance.round_ties_even() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(frequency: f64) -> Option<String> {
        frequency_to_note(frequency).map(|n| n.to_string())
    }

    #[test]
    fn maps_reference_pitches() {
        let cases = [
            (440.0, "A4"),
            (880.0, "A5"),
            (220.0, "A3"),
            (261.63, "C4"),
            (277.18, "C#4"),
            (493.88, "B4"),
            (523.25, "C5"),
        ];
        for (freq, expected) in cases {
            assert_eq!(name(freq).as_deref(), Some(expected), "{freq} Hz");
        }
    }

    #[test]
    fn non_positive_is_unknown() {
        assert_eq!(frequency_to_note(0.0), None);
        assert_eq!(frequency_to_note(-5.0), None);
        assert_eq!(frequency_to_note(f64::NAN), None);
        assert_eq!(frequency_to_note(f64::INFINITY), None);
    }

    #[test]
    fn low_frequencies_floor_into_negative_octaves() {
        // 57 semitones below A4 is C0, twelve more is C-1.
        assert_eq!(name(16.35).as_deref(), Some("C0"));
        assert_eq!(name(8.18).as_deref(), Some("C-1"));
        assert_eq!(name(7.72).as_deref(), Some("B-2"));
    }

    #[test]
    fn rounds_half_to_even() {
        assert_eq!(nearest_semitone(0.5), 0);
        assert_eq!(nearest_semitone(1.5), 2);
        assert_eq!(nearest_semitone(2.5), 2);
        assert_eq!(nearest_semitone(-0.5), 0);
        assert_eq!(nearest_semitone(-1.5), -2);
        assert_eq!(nearest_semitone(0.51), 1);
    }

    #[test]
    fn midi_numbers_line_up() {
        let a4 = frequency_to_note(440.0).unwrap();
        assert_eq!(a4.midi_number(), 69);
        let c4 = frequency_to_note(261.63).unwrap();
        assert_eq!(c4.midi_number(), 60);
    }

    #[test]
    fn cents_are_zero_at_reference() {
        assert!(cents_from_reference(440.0).abs() < 1e-9);
        assert!((cents_from_reference(880.0) - 1200.0).abs() < 1e-9);
        assert!((cents_from_reference(220.0) + 1200.0).abs() < 1e-9);
    }

    #[test]
    fn serializes_as_name() {
        let note = frequency_to_note(277.18).unwrap();
        assert_eq!(serde_json::to_string(&note).unwrap(), "\"C#4\"");
    }
}
