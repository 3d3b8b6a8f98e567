//! # vascii - Video to ASCII Converter Library
//!
//! `vascii` converts video files into colored ASCII animations: every
//! sampled frame becomes a coarse grid of characters chosen by luminance,
//! each carrying the average color of the source pixels it covers.
//!
//! ## Features
//!
//! - Frame-by-frame conversion driven through a seekable decode cursor
//! - Configurable character sets (darkest to lightest) and target width
//! - Progress reporting with periodic low-fidelity preview images
//! - Cooperative cancellation that discards partial work cleanly
//! - Audio track pass-through from the source video
//!
//! Decoding itself is delegated to the `ffmpeg`/`ffprobe` binaries; any
//! type implementing [`VideoSource`] can stand in for them.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use vascii::{AsciiConverter, CancelToken, ConversionOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let converter = AsciiConverter::new();
//! let options = ConversionOptions::default().with_target_width(120);
//! let token = CancelToken::new();
//!
//! let video = converter.convert_file(
//!     Path::new("input.mp4"),
//!     &options,
//!     |progress| println!("{}", progress.message),
//!     &token,
//! )?;
//! println!("{} frames at {} fps", video.frames.len(), video.fps);
//! # Ok(())
//! # }
//! ```
//!
//! ## Cancellation
//!
//! Pass a [`CancelToken`] clone to the UI or a Ctrl-C handler; the driver
//! polls it once per frame. A cancelled conversion returns an
//! [`AsciiVideo`] with an empty frame list: partial work is discarded by
//! design, and cancellation is distinguishable from both completion and
//! failure.

pub mod convert;
pub mod driver;
pub mod error;
pub mod frame;
pub mod output;
pub mod ramp;
pub mod sampler;
pub mod source;

pub use convert::{derive_target_height, frame_to_ascii};
pub use driver::{convert_video, CancelToken, Progress, ProgressPhase};
pub use error::ConvertError;
pub use frame::{AsciiFrame, AsciiVideo, AudioHandle, Raster, Rgb};
pub use output::{copy_audio, write_cframe, write_frames, OutputMode};
pub use ramp::{
    resolve_charset, CharacterRamp, CHARSET_EXTENDED, CHARSET_SIMPLE, CHARSET_STANDARD,
};
pub use source::{FfmpegSource, SourceMetadata, VideoSource, FALLBACK_FRAME_RATE};

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;

/// Quality settings bundled under a name.
#[derive(Debug, Deserialize, Clone)]
pub struct Preset {
    /// Target width in characters.
    pub width: u32,
    /// Native frames advanced between two sampled instants.
    pub frame_skip: u32,
}

fn default_charset() -> String {
    CHARSET_SIMPLE.to_string()
}

/// Application configuration with presets and the default character set.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub presets: HashMap<String, Preset>,
    pub default_preset: String,
    #[serde(default = "default_charset")]
    pub charset: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let default_json = r#"{
            "presets": {
                "default": {"width": 100, "frame_skip": 2},
                "small":   {"width": 60,  "frame_skip": 3},
                "large":   {"width": 200, "frame_skip": 1}
            },
            "default_preset": "default",
            "charset": " .,:;=+*#@"
        }"#;
        serde_json::from_str(default_json).unwrap()
    }
}

/// Options for one conversion job.
#[derive(Debug, Clone)]
pub struct ConversionOptions {
    /// Target width in characters; the row count is derived from the
    /// source's aspect ratio.
    pub target_width: u32,
    /// Native frames advanced between two sampled instants. Values of 0
    /// are treated as 1.
    pub frame_skip: u32,
    /// Ordered darkest-to-lightest character set.
    pub charset: String,
    /// Whether to derive an audio track from the source.
    pub extract_audio: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            target_width: 100,
            frame_skip: 2,
            charset: default_charset(),
            extract_audio: true,
        }
    }
}

impl ConversionOptions {
    /// Set the target width in characters.
    ///
    /// ```
    /// use vascii::ConversionOptions;
    /// let options = ConversionOptions::default().with_target_width(80);
    /// assert_eq!(options.target_width, 80);
    /// ```
    pub fn with_target_width(mut self, target_width: u32) -> Self {
        self.target_width = target_width;
        self
    }

    /// Set the frame-skip stride. Zero normalizes to one.
    pub fn with_frame_skip(mut self, frame_skip: u32) -> Self {
        self.frame_skip = frame_skip.max(1);
        self
    }

    /// Set the character set, darkest to lightest.
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Enable or disable audio extraction.
    pub fn with_audio(mut self, extract_audio: bool) -> Self {
        self.extract_audio = extract_audio;
        self
    }

    /// Build options from a named preset and a character set.
    pub fn from_preset(preset: &Preset, charset: String) -> Self {
        Self {
            target_width: preset.width,
            frame_skip: preset.frame_skip.max(1),
            charset,
            extract_audio: true,
        }
    }
}

/// Main entry point for video-to-ASCII conversion.
///
/// Holds the application configuration (presets and the default character
/// set) and runs one conversion job at a time over a [`VideoSource`].
pub struct AsciiConverter {
    config: AppConfig,
}

impl AsciiConverter {
    /// Create a converter with the built-in configuration.
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    /// Create a converter with a custom configuration.
    ///
    /// The configured character set must be pure ASCII: the `.txt` and
    /// `.cframe` outputs store one byte per cell, so wider characters would
    /// corrupt them.
    pub fn with_config(config: AppConfig) -> Result<Self> {
        if config.charset.is_empty() {
            return Err(ConvertError::EmptyRamp);
        }
        if !config.charset.is_ascii() {
            return Err(ConvertError::InvalidCharset(
                "configured charset contains non-ASCII characters, which would corrupt \
                 frame files; use only ASCII characters"
                    .to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// The active configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get a preset by name.
    pub fn get_preset(&self, name: &str) -> Option<&Preset> {
        self.config.presets.get(name)
    }

    /// Conversion options from a named preset, using the configured
    /// character set.
    pub fn options_from_preset(&self, preset_name: &str) -> Result<ConversionOptions> {
        let preset = self
            .get_preset(preset_name)
            .ok_or_else(|| ConvertError::UnknownPreset(preset_name.to_string()))?;
        Ok(ConversionOptions::from_preset(
            preset,
            self.config.charset.clone(),
        ))
    }

    /// Convert a video file through the `ffmpeg` decoder.
    ///
    /// `on_progress` is invoked once per processed frame, with a preview
    /// image attached on every tenth; `cancel` is polled once per frame.
    /// See [`convert_video`] for the exact contract.
    pub fn convert_file<F>(
        &self,
        input: &Path,
        options: &ConversionOptions,
        on_progress: F,
        cancel: &CancelToken,
    ) -> Result<AsciiVideo>
    where
        F: FnMut(Progress),
    {
        let mut source = FfmpegSource::open(input)?;
        driver::convert_video(&mut source, options, on_progress, cancel)
    }

    /// Convert through a caller-supplied source: a fake for tests, or any
    /// other decoder integration.
    pub fn convert_source<S, F>(
        &self,
        source: &mut S,
        options: &ConversionOptions,
        on_progress: F,
        cancel: &CancelToken,
    ) -> Result<AsciiVideo>
    where
        S: VideoSource + ?Sized,
        F: FnMut(Progress),
    {
        driver::convert_video(source, options, on_progress, cancel)
    }
}

impl Default for AsciiConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_the_three_presets() {
        let config = AppConfig::default();
        for name in ["default", "small", "large"] {
            assert!(config.presets.contains_key(name), "missing preset {name}");
        }
        assert_eq!(config.default_preset, "default");
        assert_eq!(config.charset, CHARSET_SIMPLE);
    }

    #[test]
    fn options_from_preset_uses_configured_charset() {
        let converter = AsciiConverter::new();
        let options = converter.options_from_preset("small").unwrap();
        assert_eq!(options.target_width, 60);
        assert_eq!(options.frame_skip, 3);
        assert_eq!(options.charset, CHARSET_SIMPLE);
    }

    #[test]
    fn unknown_preset_is_an_error() {
        let converter = AsciiConverter::new();
        assert!(matches!(
            converter.options_from_preset("cinematic"),
            Err(ConvertError::UnknownPreset(name)) if name == "cinematic"
        ));
    }

    #[test]
    fn builder_normalizes_zero_frame_skip() {
        let options = ConversionOptions::default().with_frame_skip(0);
        assert_eq!(options.frame_skip, 1);
    }

    #[test]
    fn non_ascii_config_charset_is_rejected() {
        let config = AppConfig {
            charset: " ░▒▓█".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            AsciiConverter::with_config(config),
            Err(ConvertError::InvalidCharset(_))
        ));
    }

    #[test]
    fn empty_config_charset_is_rejected() {
        let config = AppConfig {
            charset: String::new(),
            ..AppConfig::default()
        };
        assert!(matches!(
            AsciiConverter::with_config(config),
            Err(ConvertError::EmptyRamp)
        ));
    }
}
