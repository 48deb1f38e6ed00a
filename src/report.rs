use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::audio::features::{FrameNotes, NoteTimeline};
use crate::audio::monitor::ChunkReport;

/// Prints the per-frame note listing.
pub fn write_report<W: Write>(out: &mut W, timeline: &NoteTimeline) -> std::io::Result<()> {
    for frame in &timeline.frames {
        write_frame(out, frame)?;
    }
    Ok(())
}

fn write_frame<W: Write>(out: &mut W, frame: &FrameNotes) -> std::io::Result<()> {
    writeln!(out, "Frame {} - Top Notes:", frame.index)?;
    for event in &frame.notes {
        writeln!(
            out,
            "Note: {}, Flatness/Sharpness (cents): {:.2}",
            event.note,
            event.cents()
        )?;
    }
    Ok(())
}

pub fn write_chunk<W: Write>(out: &mut W, report: &ChunkReport) -> std::io::Result<()> {
    let notes: Vec<String> = report.notes.iter().map(|e| e.note.to_string()).collect();
    writeln!(
        out,
        "Chunk {} - peak {:.1} dB - {}",
        report.index,
        report.peak_db,
        if notes.is_empty() { "-".to_string() } else { notes.join(" ") }
    )?;
    if let Some(average) = report.group_average_db {
        writeln!(out, "Average peak: {:.2} dB", average)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct TimelineExport<'a> {
    #[serde(flatten)]
    timeline: &'a NoteTimeline,
    notes: Vec<String>,
}

pub fn timeline_json(timeline: &NoteTimeline) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&TimelineExport {
        timeline,
        notes: timeline.note_names(),
    })
}

pub fn save_json(path: &Path, timeline: &NoteTimeline) -> Result<()> {
    let json = timeline_json(timeline).context("Failed to serialize note timeline")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write timeline: {}", path.display()))?;
    log::info!("Wrote timeline to {}", path.display());
    Ok(())
}
