use std::sync::Arc;

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};

use super::bus::{channel_value, MixBus, Renderer};

/// Audio engine owning the output stream that drives the mix bus
pub struct AudioEngine {
    _stream: Stream,
    bus: Arc<MixBus>,
}

impl AudioEngine {
    /// Open the default output device and start rendering a fresh bus
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("No output device available")?;

        let config = device.default_output_config()?;
        let bus = Arc::new(MixBus::new(config.sample_rate().0));

        let stream = match config.sample_format() {
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &config.into(), bus.clone())?,
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &config.into(), bus.clone())?,
            SampleFormat::U16 => Self::build_stream::<u16>(&device, &config.into(), bus.clone())?,
            format => anyhow::bail!("Unsupported sample format: {:?}", format),
        };

        stream.play()?;
        log::info!(
            "Audio output started on '{}' at {} Hz",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            bus.sample_rate()
        );

        Ok(Self {
            _stream: stream,
            bus,
        })
    }

    /// The bus this engine renders; stems must be decoded at its rate
    pub fn bus(&self) -> Arc<MixBus> {
        self.bus.clone()
    }

    /// Build the audio stream for a specific sample format
    fn build_stream<T>(device: &Device, config: &StreamConfig, bus: Arc<MixBus>) -> Result<Stream>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        let channels = config.channels as usize;
        let mut renderer = Renderer::new(bus.clone());
        let error_bus = bus;

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels.max(1);
                let mixed = renderer.mix(frames);
                for (frame, pair) in data.chunks_mut(channels).zip(mixed.chunks_exact(2)) {
                    for (ch, sample) in frame.iter_mut().enumerate() {
                        *sample = T::from_sample(channel_value(ch, pair[0], pair[1]));
                    }
                }
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
                error_bus.report_fault(format!("Audio stream error: {}", err));
            },
            None,
        )?;

        Ok(stream)
    }
}
