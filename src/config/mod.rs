// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Player configuration.
//!
//! Settings for the playback host: frame rate, audio output and metronome
//! samples. Files are YAML or TOML, chosen by extension; every field has a
//! default so a partial file is fine.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::audio::AudioConfig;

/// Lowest accepted frame rate
pub const MIN_FRAME_RATE: u32 = 10;
/// Highest accepted frame rate
pub const MAX_FRAME_RATE: u32 = 240;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read or written
    #[error("Failed to access config file {path:?}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// YAML parse or serialize failure
    #[error("Failed to parse YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// TOML parse failure
    #[error("Failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),
    /// TOML serialize failure
    #[error("Failed to serialize TOML configuration: {0}")]
    TomlSer(#[from] toml::ser::Error),
    /// Extension is not .yaml, .yml or .toml
    #[error("Unknown config format for {0:?}, expected .yaml, .yml or .toml")]
    UnknownFormat(PathBuf),
    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Config file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML
    Yaml,
    /// TOML
    Toml,
}

impl ConfigFormat {
    /// Format for a path, by extension
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            _ => Err(ConfigError::UnknownFormat(path.to_path_buf())),
        }
    }
}

/// Playback host settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    /// Play metronome clicks
    pub sound_enabled: bool,
    /// Directory holding tock.wav, tick.wav and the short variants
    pub samples_dir: PathBuf,
    /// Frame loop rate in Hz
    pub frame_rate: u32,
    /// Delay between play() and the first beat, in milliseconds
    pub start_delay_ms: u64,
    /// Tempo at or above which the short click variants are used
    pub short_sample_tempo: u32,
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Output buffer size in frames
    pub buffer_size: u32,
    /// Count in one measure before the first block
    pub lead_in: bool,
    /// Click volume from 0.0 (silent) to 1.0 (full)
    pub volume: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            samples_dir: PathBuf::from("samples"),
            frame_rate: 60,
            start_delay_ms: 50,
            short_sample_tempo: 160,
            sample_rate: 44100,
            buffer_size: 512,
            lead_in: true,
            volume: 1.0,
        }
    }
}

impl PlayerConfig {
    /// Load from a YAML or TOML file and validate
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = match format {
            ConfigFormat::Yaml => Self::from_yaml(&contents)?,
            ConfigFormat::Toml => Self::from_toml(&contents)?,
        };
        debug!(path = ?path, ?config, "player config loaded");
        Ok(config)
    }

    /// Parse from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validated()
    }

    /// Parse from a TOML string
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validated()
    }

    /// Serialize to a YAML string
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save in the format matching the file extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match ConfigFormat::from_path(path)? {
            ConfigFormat::Yaml => self.to_yaml()?,
            ConfigFormat::Toml => self.to_toml()?,
        };
        fs::write(path, contents).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check every value is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_rate == 0 {
            return Err(ConfigError::Invalid("frame_rate must be positive".to_string()));
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be positive".to_string()));
        }
        if self.buffer_size == 0 {
            return Err(ConfigError::Invalid("buffer_size must be positive".to_string()));
        }
        if self.short_sample_tempo == 0 {
            return Err(ConfigError::Invalid(
                "short_sample_tempo must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(ConfigError::Invalid(format!(
                "volume must be between 0.0 and 1.0, got {}",
                self.volume
            )));
        }
        Ok(())
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        self.validate()?;
        self.frame_rate = self.frame_rate.clamp(MIN_FRAME_RATE, MAX_FRAME_RATE);
        Ok(self)
    }

    /// Frame rate after clamping
    pub fn effective_frame_rate(&self) -> u32 {
        self.frame_rate.clamp(MIN_FRAME_RATE, MAX_FRAME_RATE)
    }

    /// Time between frames
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.effective_frame_rate() as f64)
    }

    /// Delay before the first beat
    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    /// Highest tempo at which every beat lands on its own frame
    pub fn max_safe_tempo(&self) -> u32 {
        60 * self.effective_frame_rate()
    }

    /// Audio output settings
    pub fn audio_config(&self) -> AudioConfig {
        AudioConfig {
            sample_rate: self.sample_rate,
            buffer_size: self.buffer_size,
            channels: 2,
            gain: self.volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::default();
        assert!(config.sound_enabled);
        assert!(config.lead_in);
        assert_eq!(config.frame_rate, 60);
        assert_eq!(config.short_sample_tempo, 160);
        assert_eq!(config.max_safe_tempo(), 3600);
        assert_eq!(config.start_delay(), Duration::from_millis(50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
frame_rate: 30
lead_in: false
"#;
        let config = PlayerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.frame_rate, 30);
        assert!(!config.lead_in);
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.samples_dir, PathBuf::from("samples"));
    }

    #[test]
    fn test_toml() {
        let source = r#"
sound_enabled = false
short_sample_tempo = 140
samples_dir = "clicks"
"#;
        let config = PlayerConfig::from_toml(source).unwrap();
        assert!(!config.sound_enabled);
        assert_eq!(config.short_sample_tempo, 140);
        assert_eq!(config.samples_dir, PathBuf::from("clicks"));
    }

    #[test]
    fn test_frame_rate_clamped() {
        let config = PlayerConfig::from_yaml("frame_rate: 1000").unwrap();
        assert_eq!(config.frame_rate, MAX_FRAME_RATE);
        let config = PlayerConfig::from_yaml("frame_rate: 2").unwrap();
        assert_eq!(config.frame_rate, MIN_FRAME_RATE);
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(matches!(
            PlayerConfig::from_yaml("frame_rate: 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PlayerConfig::from_toml("buffer_size = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_save_and_load_both_formats() {
        let dir = tempdir().unwrap();
        let config = PlayerConfig {
            frame_rate: 120,
            sound_enabled: false,
            ..PlayerConfig::default()
        };

        for name in ["player.yaml", "player.toml"] {
            let path = dir.path().join(name);
            config.save(&path).unwrap();
            assert_eq!(PlayerConfig::load(&path).unwrap(), config);
        }
    }

    #[test]
    fn test_unknown_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("player.ini");
        assert!(matches!(
            PlayerConfig::load(&path),
            Err(ConfigError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_volume_reaches_audio_config() {
        let config = PlayerConfig::from_yaml("volume: 0.25").unwrap();
        assert_eq!(config.audio_config().gain, 0.25);
        assert_eq!(PlayerConfig::default().audio_config().gain, 1.0);

        assert!(matches!(
            PlayerConfig::from_toml("volume = 1.5"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            PlayerConfig::from_yaml("volume: -0.1"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            PlayerConfig::from_yaml("frame_rate: [1, 2"),
            Err(ConfigError::Yaml(_))
        ));
    }
}
