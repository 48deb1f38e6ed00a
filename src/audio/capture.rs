//! Microphone capture via CPAL, delivering fixed-size mono chunks over a channel.

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Sample, SampleFormat, Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender};

/// Chunks waiting to be analyzed before the callback starts dropping them.
const CHANNEL_CAPACITY: usize = 64;

/// Either a chunk of channel-0 samples or a stream error message.
pub type ChunkResult = std::result::Result<Vec<f32>, String>;

pub struct LiveInput {
    _stream: Stream,
    pub sample_rate: u32,
    pub chunks: Receiver<ChunkResult>,
}

/// Opens the default input device and starts streaming `chunk_size` chunks.
pub fn start_capture(chunk_size: usize) -> Result<LiveInput> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    let config = device.default_input_config()?;
    let sample_rate = config.sample_rate().0;

    log::info!("Using audio input device: {}", device.name()?);
    log::info!("Input config: {:?}", config);

    let (sender, receiver) = crossbeam_channel::bounded(CHANNEL_CAPACITY);

    let stream = match config.sample_format() {
        SampleFormat::I16 => build_stream::<i16>(&device, &config.into(), chunk_size, sender)?,
        SampleFormat::I32 => build_stream::<i32>(&device, &config.into(), chunk_size, sender)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config.into(), chunk_size, sender)?,
        SampleFormat::F32 => build_stream::<f32>(&device, &config.into(), chunk_size, sender)?,
        SampleFormat::F64 => build_stream::<f64>(&device, &config.into(), chunk_size, sender)?,
        other => return Err(anyhow!("Unsupported sample format: {:?}", other)),
    };

    stream.play()?;

    Ok(LiveInput {
        _stream: stream,
        sample_rate,
        chunks: receiver,
    })
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    chunk_size: usize,
    sender: Sender<ChunkResult>,
) -> Result<Stream>
where
    T: Sample + cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    let channels = (config.channels as usize).max(1);
    let error_sender = sender.clone();
    let mut pending: Vec<f32> = Vec::with_capacity(chunk_size * 2);

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            pending.extend(data.iter().step_by(channels).map(|&s| f32::from_sample(s)));

            while pending.len() >= chunk_size {
                let chunk = pending[..chunk_size].to_vec();
                // A full channel means analysis is behind; drop the chunk.
                let _ = sender.try_send(Ok(chunk));
                pending.drain(..chunk_size);
            }
        },
        move |err| {
            let _ = error_sender.try_send(Err(err.to_string()));
        },
        None,
    )?;

    Ok(stream)
}
