use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Kind of media file an asset holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A media file picked from a directory listing
///
/// The duration is unknown until the file is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaAsset {
    /// Path to the media file
    pub path: PathBuf,

    pub kind: MediaKind,

    /// Duration in seconds (if known)
    pub duration: Option<f64>,
}

impl MediaAsset {
    pub fn new<P: Into<PathBuf>>(path: P, kind: MediaKind) -> Self {
        Self {
            path: path.into(),
            kind,
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// File name as used for rotation ordering
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name()?.to_str()
    }

    /// Get the file extension
    pub fn extension(&self) -> Option<&str> {
        self.path.extension()?.to_str()
    }

    /// Whether the extension is one of `extensions` (case-insensitive)
    pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

/// What probing an opened file reveals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration: f64,

    /// Video stream resolution (width, height), absent for audio
    pub resolution: Option<(u32, u32)>,
}

/// Encoder parameters for the final container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingParams {
    /// Output frame rate
    pub frame_rate: u32,

    /// Video codec to use for output
    pub codec: String,

    /// Encoder thread count
    pub threads: u32,

    /// Encoder speed preset
    pub preset: String,

    pub audio_codec: String,

    pub pixel_format: String,

    /// ffmpeg executable name or path
    pub ffmpeg_bin: String,

    /// ffprobe executable name or path
    pub ffprobe_bin: String,
}

impl Default for EncodingParams {
    fn default() -> Self {
        Self {
            frame_rate: 24,
            codec: "libx264".to_string(),
            threads: 2,
            preset: "ultrafast".to_string(),
            audio_codec: "aac".to_string(),
            pixel_format: "yuv420p".to_string(),
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
        }
    }
}

impl EncodingParams {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.frame_rate == 0 {
            return Err(ConfigError::InvalidValue {
                key: "encoding.frame_rate".to_string(),
                value: self.frame_rate.to_string(),
            }
            .into());
        }

        if self.threads == 0 {
            return Err(ConfigError::InvalidValue {
                key: "encoding.threads".to_string(),
                value: self.threads.to_string(),
            }
            .into());
        }

        if self.codec.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "encoding.codec".to_string(),
                value: self.codec.clone(),
            }
            .into());
        }

        Ok(())
    }
}
