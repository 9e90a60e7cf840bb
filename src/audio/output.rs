// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio output via cpal.
//!
//! The output stream renders a shared [`CueMixer`]; the mixer's frame
//! counter doubles as the audio clock.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use tracing::{info, warn};

use super::{AudioError, CueHandle, CueMixer, CueSink, Sample};

/// Audio output configuration
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Buffer size in frames
    pub buffer_size: u32,
    /// Number of output channels
    pub channels: u16,
    /// Click volume (0.0 - 1.0)
    pub gain: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            buffer_size: 512,
            channels: 2,
            gain: 1.0,
        }
    }
}

impl AudioConfig {
    /// Latency of one buffer in milliseconds
    pub fn latency_ms(&self) -> f64 {
        (self.buffer_size as f64 / self.sample_rate.max(1) as f64) * 1000.0
    }
}

/// Cue sink backed by a cpal output stream
pub struct CpalCueSink {
    /// cpal stream
    _stream: Stream,
    /// Output device
    _device: Device,
    /// Mixer shared with the audio callback
    mixer: Arc<Mutex<CueMixer>>,
    /// Current configuration
    config: AudioConfig,
}

impl CpalCueSink {
    /// Open the default output device and start rendering
    pub fn new(config: AudioConfig) -> Result<Self, AudioError> {
        let host = cpal::default_host();

        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        device
            .default_output_config()
            .map_err(|e| AudioError::InitFailed(format!("Failed to get default config: {}", e)))?;

        let stream_config = StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(config.buffer_size),
        };

        let channels = config.channels as usize;
        let mut mixer = CueMixer::new(config.sample_rate);
        mixer.set_gain(config.gain);
        let mixer = Arc::new(Mutex::new(mixer));
        let render_mixer = Arc::clone(&mixer);

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| match render_mixer.lock() {
                    Ok(mut mixer) => mixer.render(data, channels),
                    Err(_) => data.fill(0.0),
                },
                move |err| {
                    warn!(error = %err, "audio stream error");
                },
                None,
            )
            .map_err(|e| AudioError::StreamFailed(format!("Failed to build stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamFailed(format!("Failed to start stream: {}", e)))?;

        info!(
            device = %device.name().unwrap_or_default(),
            sample_rate = config.sample_rate,
            latency_ms = config.latency_ms(),
            gain = config.gain,
            "audio output started"
        );

        Ok(Self {
            _stream: stream,
            _device: device,
            mixer,
            config,
        })
    }

    /// Get current configuration
    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Shared mixer
    pub fn mixer(&self) -> Arc<Mutex<CueMixer>> {
        Arc::clone(&self.mixer)
    }
}

impl CueSink for CpalCueSink {
    fn now(&self) -> f64 {
        self.mixer.lock().map(|mixer| mixer.now()).unwrap_or(0.0)
    }

    fn schedule(&mut self, sample: &Sample, at: f64) -> CueHandle {
        match self.mixer.lock() {
            Ok(mut mixer) => mixer.schedule(sample, at),
            Err(_) => CueHandle::NONE,
        }
    }

    fn cancel(&mut self, handle: CueHandle) {
        if let Ok(mut mixer) = self.mixer.lock() {
            mixer.cancel(handle);
        }
    }

    fn cancel_all(&mut self) {
        if let Ok(mut mixer) = self.mixer.lock() {
            mixer.cancel_all();
        }
    }
}

/// List available audio output devices
pub fn list_devices() -> Vec<String> {
    let host = cpal::default_host();
    host.output_devices()
        .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
        .unwrap_or_default()
}
