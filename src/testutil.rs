//! Test fixtures: short WAV stems written with hound.

use std::path::{Path, PathBuf};

use crate::library::StemPaths;

pub const TEST_RATE: u32 = 8000;

/// Write a mono 16-bit sine wave
pub fn write_sine_wav(dir: &Path, name: &str, freq: f32, secs: f32, rate: u32) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    let frames = (secs * rate as f32).round() as usize;
    for i in 0..frames {
        let t = i as f32 / rate as f32;
        let s = (t * freq * std::f32::consts::TAU).sin() * 0.5;
        writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
    path
}

/// Write a float WAV with an arbitrary channel count
pub fn write_wav_with_channels(
    dir: &Path,
    name: &str,
    channels: u16,
    frames: usize,
    rate: u32,
) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels,
        sample_rate: rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for i in 0..frames {
        for ch in 0..channels {
            writer.write_sample((i as f32 * 0.001) * (ch as f32 + 1.0) * 0.1).unwrap();
        }
    }
    writer.finalize().unwrap();
    path
}

/// Four sine stems named the way the separation backend names them
pub fn write_song(dir: &Path, secs: f32) -> StemPaths {
    StemPaths {
        vocals: write_sine_wav(dir, "vocals.wav", 440.0, secs, TEST_RATE),
        other: write_sine_wav(dir, "other.wav", 330.0, secs, TEST_RATE),
        drums: write_sine_wav(dir, "drums.wav", 110.0, secs, TEST_RATE),
        bass: write_sine_wav(dir, "bass.wav", 55.0, secs, TEST_RATE),
    }
}
