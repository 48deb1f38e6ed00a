mod audio;
mod cli;
mod config;
mod error;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::PathBuf;

use audio::analysis::{analyze, analyze_with_progress, Progress};
use audio::decode::AudioData;
use audio::features::AnalysisParams;
use audio::monitor::{padded_chunks, run_monitor, LevelMonitor, CHUNK_SIZE, LEVEL_GROUP};
use cli::Cli;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect notescan.toml
    let config_path = cli.config.clone().or_else(|| {
        let local = PathBuf::from("notescan.toml");
        local.exists().then_some(local)
    });
    if let Some(ref path) = config_path {
        if let Some(cfg) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            // Merge: config values apply only when CLI is at its default
            if cli.fps == config::default_fps() { cli.fps = cfg.analysis.fps; }
            if cli.window_seconds == config::default_window_seconds() {
                cli.window_seconds = cfg.analysis.window_seconds;
            }
            if cli.top_n == config::default_top_n() { cli.top_n = cfg.analysis.top_n; }
            if !cli.quiet { cli.quiet = cfg.report.quiet; }
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    #[cfg(feature = "live")]
    if cli.live {
        return run_live(&cli);
    }

    let input = cli.input.as_ref().context("Input audio file is required")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    log::info!("notescan - note detection");
    log::info!("Input: {}", input.display());

    log::info!("Decoding audio...");
    let audio_data = audio::decode::decode_audio(input)?;

    if cli.stream {
        return run_stream(&cli, &audio_data);
    }

    let params = AnalysisParams {
        frames_per_second: cli.fps,
        window_seconds: cli.window_seconds,
        top_n: cli.top_n,
    };
    log::info!(
        "Analysis: {} fps, {:.3}s window, top {} notes",
        params.frames_per_second,
        params.window_seconds,
        params.top_n
    );

    let result = if cli.quiet {
        analyze(&audio_data.samples, audio_data.sample_rate, &params)
    } else {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")?
                .progress_chars("=>-"),
        );
        let timeline = analyze_with_progress(
            &audio_data.samples,
            audio_data.sample_rate,
            &params,
            &pb,
        );
        pb.finish_and_clear();
        timeline
    };
    let timeline = result.with_context(|| format!("Failed to analyze {}", input.display()))?;

    if !cli.quiet {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        report::write_report(&mut out, &timeline)?;
        out.flush()?;
    }

    if let Some(ref path) = cli.json {
        report::save_json(path, &timeline)?;
    }

    log::info!(
        "Done! {} notes over {} frames",
        timeline.events().count(),
        timeline.frame_count
    );
    Ok(())
}

impl Progress for ProgressBar {
    fn start(&self, total_ticks: u64) {
        self.set_length(total_ticks);
    }

    fn tick(&self) {
        self.inc(1);
    }
}

/// Pushes a decoded file through the live monitor one chunk at a time.
fn run_stream(cli: &Cli, audio_data: &AudioData) -> Result<()> {
    log::info!("Streaming {} samples in chunks of {}", audio_data.samples.len(), CHUNK_SIZE);

    let mut monitor = LevelMonitor::new(CHUNK_SIZE, audio_data.sample_rate, cli.top_n, LEVEL_GROUP);
    let chunk_size = monitor.chunk_size();
    let chunks = padded_chunks(&audio_data.samples, chunk_size).map(Ok::<_, std::convert::Infallible>);

    let summary = run_monitor(&mut monitor, chunks, |chunk_report| print_chunk(cli, chunk_report));

    log::info!("Done! {} chunks, {} skipped", summary.processed, summary.skipped);
    Ok(())
}

#[cfg(feature = "live")]
fn run_live(cli: &Cli) -> Result<()> {
    let live = audio::capture::start_capture(CHUNK_SIZE)?;
    log::info!("Listening at {} Hz, Ctrl-C to stop", live.sample_rate);

    let mut monitor = LevelMonitor::new(CHUNK_SIZE, live.sample_rate, cli.top_n, LEVEL_GROUP);
    let limit = match cli.seconds {
        Some(seconds) => (seconds * live.sample_rate as f64 / CHUNK_SIZE as f64).ceil() as usize,
        None => usize::MAX,
    };

    let summary = run_monitor(&mut monitor, live.chunks.iter().take(limit), |chunk_report| {
        print_chunk(cli, chunk_report)
    });

    log::info!("Stopped after {} chunks, {} skipped", summary.processed, summary.skipped);
    Ok(())
}

fn print_chunk(cli: &Cli, chunk_report: &audio::monitor::ChunkReport) {
    if cli.quiet {
        return;
    }
    let stdout = std::io::stdout();
    if let Err(err) = report::write_chunk(&mut stdout.lock(), chunk_report) {
        log::warn!("Failed to print chunk {}: {}", chunk_report.index, err);
    }
}
