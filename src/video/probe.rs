//! Duration and resolution discovery.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Deserialize;
use tracing::debug;

use crate::error::{RenderError, Result};
use crate::video::types::{MediaInfo, MediaKind};

/// Discovers the duration (and, for video, the resolution) of a media file
pub trait MediaProbe: Send + Sync {
    fn probe(&self, path: &Path, kind: MediaKind) -> Result<MediaInfo>;
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg(bin: &str) -> Result<PathBuf> {
    which::which(bin).map_err(|_| RenderError::EncoderUnavailable { tool: bin.to_string() }.into())
}

/// Check if FFprobe is available.
pub fn check_ffprobe(bin: &str) -> Result<PathBuf> {
    which::which(bin).map_err(|_| RenderError::EncoderUnavailable { tool: bin.to_string() }.into())
}

/// Prober backed by the `ffprobe` executable
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    bin: String,
}

impl FfprobeProbe {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    #[serde(default)]
    side_data_list: Vec<FfprobeSideData>,
    #[serde(default)]
    tags: Option<FfprobeTags>,
}

#[derive(Debug, Deserialize)]
struct FfprobeSideData {
    rotation: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FfprobeTags {
    rotate: Option<String>,
}

impl FfprobeStream {
    /// Display rotation in degrees, normalized to 0..360
    ///
    /// The display matrix wins over the legacy `rotate` tag.
    fn rotation(&self) -> i64 {
        let matrix = self.side_data_list.iter().find_map(|d| d.rotation);
        let tag = self
            .tags
            .as_ref()
            .and_then(|t| t.rotate.as_deref())
            .and_then(|r| r.trim().parse::<f64>().ok());

        matrix
            .or(tag)
            .filter(|r| r.is_finite())
            .map(|r| (r.round() as i64).rem_euclid(360))
            .unwrap_or(0)
    }
}

impl MediaProbe for FfprobeProbe {
    fn probe(&self, path: &Path, kind: MediaKind) -> Result<MediaInfo> {
        if !path.is_file() {
            return Err(unreadable(path, "file not found"));
        }

        check_ffprobe(&self.bin)?;

        let output = Command::new(&self.bin)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| unreadable(path, format!("ffprobe failed to start: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(unreadable(path, format!("ffprobe failed: {}", stderr.trim())));
        }

        let info = parse_probe_output(&output.stdout, kind)
            .map_err(|reason| unreadable(path, reason))?;

        debug!(
            "Probed {:?}: {:.2}s {:?}",
            path, info.duration, info.resolution
        );
        Ok(info)
    }
}

fn unreadable(path: &Path, reason: impl Into<String>) -> crate::error::ShortsError {
    RenderError::SourceUnreadable {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
    .into()
}

/// Extract a [`MediaInfo`] from ffprobe's JSON
fn parse_probe_output(json: &[u8], kind: MediaKind) -> std::result::Result<MediaInfo, String> {
    let probe: FfprobeOutput =
        serde_json::from_slice(json).map_err(|e| format!("invalid ffprobe output: {}", e))?;

    let stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == kind.as_str())
        .ok_or_else(|| format!("no {} stream", kind))?;

    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(stream.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| "no usable duration".to_string())?;

    // ffmpeg applies the rotation on decode, so report the displayed size
    let resolution = match (kind, stream.width, stream.height) {
        (MediaKind::Video, Some(w), Some(h)) if w > 0 && h > 0 => match stream.rotation() {
            90 | 270 => Some((h, w)),
            _ => Some((w, h)),
        },
        _ => None,
    };

    Ok(MediaInfo { duration, resolution })
}

/// Fixed answers keyed by path, for tests
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub(crate) struct StaticProbe {
    entries: std::collections::HashMap<PathBuf, MediaInfo>,
}

#[cfg(test)]
impl StaticProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(mut self, path: impl Into<PathBuf>, duration: f64, resolution: (u32, u32)) -> Self {
        self.entries.insert(
            path.into(),
            MediaInfo { duration, resolution: Some(resolution) },
        );
        self
    }

    pub fn with_audio(mut self, path: impl Into<PathBuf>, duration: f64) -> Self {
        self.entries.insert(path.into(), MediaInfo { duration, resolution: None });
        self
    }
}

#[cfg(test)]
impl MediaProbe for StaticProbe {
    fn probe(&self, path: &Path, _kind: MediaKind) -> Result<MediaInfo> {
        self.entries
            .get(path)
            .copied()
            .ok_or_else(|| unreadable(path, "not in static probe"))
    }
}
