use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "notescan", about = "Finds the dominant musical notes in an audio recording")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: Option<PathBuf>,

    /// Analysis frames per second
    #[arg(long, default_value_t = 10.0)]
    pub fps: f64,

    /// FFT window length in seconds
    #[arg(long, default_value_t = 0.1)]
    pub window_seconds: f64,

    /// Number of distinct notes reported per frame
    #[arg(short = 'n', long, default_value_t = 3)]
    pub top_n: usize,

    /// Parameter file (defaults to ./notescan.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the note timeline as JSON
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Suppress the per-frame report and progress bar
    #[arg(short, long)]
    pub quiet: bool,

    /// Feed the input through the chunked live monitor instead of the two-pass analysis
    #[arg(long)]
    pub stream: bool,

    /// Capture from the default input device instead of reading a file
    #[cfg(feature = "live")]
    #[arg(long)]
    pub live: bool,

    /// Stop live capture after this many seconds
    #[cfg(feature = "live")]
    #[arg(long)]
    pub seconds: Option<f64>,
}
