use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Mono sample buffer and its rate.
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioData {
    pub fn duration(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Decodes the first audio track of `path`. Multi-channel audio keeps only
/// channel 0; the other channels are dropped, not mixed in.
pub fn decode_audio(path: &Path) -> Result<AudioData> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Failed to probe audio format")?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .context("No audio tracks found")?;

    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.context("Unknown sample rate")?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    let mut first_channel: Vec<f32> = Vec::new();
    let mut channels = 1;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(err)) => {
                log::warn!("Skipping undecodable packet: {}", err);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();
        channels = spec.channels.count().max(1);

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        push_first_channel(&mut first_channel, sample_buf.samples(), channels);
    }

    if channels > 1 {
        log::info!("Using channel 0 of {}", channels);
    }

    let audio = AudioData {
        samples: first_channel,
        sample_rate,
    };

    log::info!(
        "Decoded audio: {} samples, {}Hz, {:.1}s",
        audio.samples.len(),
        sample_rate,
        audio.duration()
    );

    Ok(audio)
}

/// Appends channel 0 of an interleaved block.
fn push_first_channel(out: &mut Vec<f32>, interleaved: &[f32], channels: usize) {
    out.extend(interleaved.iter().step_by(channels.max(1)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("notescan-{}-{}.wav", std::process::id(), name))
    }

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, frames: &[Vec<i16>]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for frame in frames {
            for &sample in frame {
                writer.write_sample(sample).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn stereo_keeps_only_the_first_channel() {
        let path = fixture_path("stereo");
        let frames: Vec<Vec<i16>> = (0..64).map(|i| vec![i * 256, -16_384]).collect();
        write_wav(&path, 2, 8000, &frames);

        let audio = decode_audio(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(audio.sample_rate, 8000);
        assert_eq!(audio.samples.len(), 64);
        for (i, sample) in audio.samples.iter().enumerate() {
            let expected = (i as f32 * 256.0) / 32768.0;
            assert!((sample - expected).abs() < 1e-4, "sample {i}: {sample} != {expected}");
        }
    }

    #[test]
    fn mono_is_passed_through() {
        let path = fixture_path("mono");
        let frames: Vec<Vec<i16>> = (0..32).map(|i| vec![if i % 2 == 0 { 8192 } else { -8192 }]).collect();
        write_wav(&path, 1, 44_100, &frames);

        let audio = decode_audio(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(audio.sample_rate, 44_100);
        assert_eq!(audio.samples.len(), 32);
        assert!((audio.samples[0] - 0.25).abs() < 1e-4);
        assert!((audio.samples[1] + 0.25).abs() < 1e-4);
    }

    #[test]
    fn interleaved_blocks_keep_channel_zero() {
        let mut out = Vec::new();
        push_first_channel(&mut out, &[1.0, 9.0, 9.0, 2.0, 9.0, 9.0], 3);
        push_first_channel(&mut out, &[3.0, 9.0], 2);
        push_first_channel(&mut out, &[4.0, 5.0], 1);
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = decode_audio(Path::new("/definitely/not/here.wav")).err().unwrap();
        assert!(err.to_string().contains("/definitely/not/here.wav"));
    }
}
