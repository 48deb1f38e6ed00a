use std::collections::HashSet;

use super::features::NoteEvent;
use super::note::frequency_to_note;

/// Frames whose loudest normalized bin stays below this are treated as silence.
pub const SILENCE_THRESHOLD: f64 = 0.001;

/// Picks up to `num` distinct notes from a normalized magnitude spectrum,
/// loudest first.
///
/// Bins are visited in descending magnitude; equal magnitudes keep ascending
/// bin order. A note already taken by a louder bin is skipped, as is any bin
/// without a note (DC).
pub fn find_top_notes(spectrum: &[f64], bin_freqs: &[f64], num: usize) -> Vec<NoteEvent> {
    let loudest = spectrum.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if num == 0 || !(loudest >= SILENCE_THRESHOLD) {
        return Vec::new();
    }

    let mut ranked: Vec<(usize, f64)> = spectrum.iter().copied().enumerate().collect();
    // sort_by is stable
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut seen = HashSet::new();
    let mut found = Vec::with_capacity(num);

    for (bin, amplitude) in ranked {
        if found.len() >= num {
            break;
        }
        let Some(&frequency) = bin_freqs.get(bin) else {
            continue;
        };
        let Some(note) = frequency_to_note(frequency) else {
            continue;
        };
        if seen.insert(note) {
            found.push(NoteEvent {
                frequency,
                note,
                amplitude,
            });
        }
    }

    found
}
