//! Stem decoding: WAV through hound, everything else through symphonia.
//!
//! Output is always interleaved stereo f32 at the requested sample rate.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AudioLoadError;

/// Extensions accepted when resolving stems in a song folder
pub const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "ogg", "m4a", "aac"];

/// Decoded stem: interleaved stereo samples at `sample_rate`
#[derive(Clone, Debug, Default)]
pub struct StemBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl StemBuffer {
    pub fn from_interleaved(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of stereo frames
    pub fn frames(&self) -> u64 {
        (self.samples.len() / 2) as u64
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Left/right pair at `frame`, silence past the end
    #[inline]
    pub fn frame(&self, frame: u64) -> (f32, f32) {
        let idx = frame as usize * 2;
        match self.samples.get(idx..idx + 2) {
            Some(pair) => (pair[0], pair[1]),
            None => (0.0, 0.0),
        }
    }
}

/// Decode a stem file to stereo at `target_rate`
pub fn decode_file(path: &Path, target_rate: u32) -> Result<StemBuffer, AudioLoadError> {
    if !path.is_file() {
        return Err(AudioLoadError::Missing {
            path: path.to_path_buf(),
        });
    }

    let is_wav = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);

    let (interleaved, channels, source_rate) = if is_wav {
        read_wav(path)?
    } else {
        read_compressed(path)?
    };

    if interleaved.is_empty() || channels == 0 {
        return Err(AudioLoadError::Empty {
            path: path.to_path_buf(),
        });
    }

    let stereo = to_stereo(&interleaved, channels);
    let samples = resample_stereo(stereo, source_rate, target_rate);
    log::debug!(
        "Decoded {} ({} ch @ {} Hz -> stereo @ {} Hz, {} frames)",
        path.display(),
        channels,
        source_rate,
        target_rate,
        samples.len() / 2
    );

    Ok(StemBuffer::from_interleaved(samples, target_rate))
}

fn read_wav(path: &Path) -> Result<(Vec<f32>, usize, u32), AudioLoadError> {
    let reader = hound::WavReader::open(path).map_err(|e| match e {
        hound::Error::IoError(io) => AudioLoadError::Unreadable {
            path: path.to_path_buf(),
            reason: io.to_string(),
        },
        other => AudioLoadError::Unsupported {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    })?;

    // A data chunk cut short surfaces as a sample error, not a short buffer
    let truncated = |e: hound::Error| AudioLoadError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1u64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_val))
                .collect::<Result<_, _>>()
                .map_err(truncated)?
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(truncated)?,
    };

    Ok((samples, spec.channels as usize, spec.sample_rate))
}

fn read_compressed(path: &Path) -> Result<(Vec<f32>, usize, u32), AudioLoadError> {
    let unreadable = |reason: String| AudioLoadError::Unreadable {
        path: path.to_path_buf(),
        reason,
    };
    let unsupported = |reason: String| AudioLoadError::Unsupported {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| unreadable(e.to_string()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| match e {
            SymphoniaError::IoError(io) => unreadable(io.to_string()),
            other => unsupported(other.to_string()),
        })?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| unsupported("no audio track".to_string()))?;

    let track_id = track.id;
    let source_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| unsupported("unknown sample rate".to_string()))?;
    let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| unsupported(e.to_string()))?;

    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(unreadable(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channels = spec.channels.count();
                let needed = decoded.capacity() * channels;
                if sample_buf.as_ref().map_or(true, |b| b.capacity() < needed) {
                    sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                }
                if let Some(buf) = sample_buf.as_mut() {
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
            }
            // Corrupt packets are skipped
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("Skipping bad packet in {}: {}", path.display(), e);
            }
            Err(e) => return Err(unreadable(e.to_string())),
        }
    }

    Ok((samples, channels, source_rate))
}

/// Duplicate mono, fold extra channels into left/right
fn to_stereo(interleaved: &[f32], channels: usize) -> Vec<f32> {
    match channels {
        1 => interleaved.iter().flat_map(|&s| [s, s]).collect(),
        2 => interleaved.to_vec(),
        n => interleaved
            .chunks_exact(n)
            .flat_map(|frame| {
                let left = frame.iter().step_by(2).sum::<f32>() / frame.len().div_ceil(2) as f32;
                let right = frame.iter().skip(1).step_by(2).sum::<f32>() / (frame.len() / 2) as f32;
                [left, right]
            })
            .collect(),
    }
}

/// Linear interpolation resampling (stereo interleaved)
fn resample_stereo(stereo: Vec<f32>, source_rate: u32, target_rate: u32) -> Vec<f32> {
    if target_rate == 0 || source_rate == 0 || source_rate.abs_diff(target_rate) <= 1 {
        return stereo;
    }

    let frames = stereo.len() / 2;
    let ratio = source_rate as f64 / target_rate as f64;
    let new_len = (frames as f64 / ratio) as usize;
    let mut out = Vec::with_capacity(new_len * 2);
    for i in 0..new_len {
        let pos = i as f64 * ratio;
        let idx = pos as usize;
        let frac = (pos - idx as f64) as f32;
        for ch in 0..2 {
            let s0 = stereo.get(idx * 2 + ch).copied().unwrap_or(0.0);
            let s1 = stereo.get((idx + 1) * 2 + ch).copied().unwrap_or(s0);
            out.push(s0 + (s1 - s0) * frac);
        }
    }
    out
}
