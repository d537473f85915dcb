//! Final encode of a composed timeline.
//!
//! The encoder writes to a `.partial` file next to the destination which
//! is renamed into place only after a successful, non-empty encode. The
//! render job owns every media handle of the run; all of them are
//! released when the job is dropped, whatever the outcome.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use tokio::task;
use tracing::{debug, info, warn};

use crate::audio::AudioTrack;
use crate::composition::Timeline;
use crate::error::{RenderError, Result};
use crate::video::command::FfmpegCommand;
use crate::video::filtergraph::build_filter_graph;
use crate::video::probe::check_ffmpeg;
use crate::video::progress::{parse_progress_line, RenderProgress};
use crate::video::types::EncodingParams;

const STDERR_TAIL_LINES: usize = 20;

const PROGRESS_KEYS: &[&str] = &[
    "frame", "fps", "stream_0_0_q", "bitrate", "total_size", "out_time_us", "out_time_ms",
    "out_time", "dup_frames", "drop_frames", "speed", "progress",
];

/// Runs one blocking encode
pub trait Encoder: Send + Sync {
    fn encode(&self, command: &FfmpegCommand, total_duration: f64) -> Result<()>;
}

/// Encoder backed by the ffmpeg executable
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    bin: String,
}

impl FfmpegEncoder {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    pub fn from_params(params: &EncodingParams) -> Self {
        Self::new(params.ffmpeg_bin.clone())
    }
}

impl Encoder for FfmpegEncoder {
    fn encode(&self, command: &FfmpegCommand, total_duration: f64) -> Result<()> {
        let bin = check_ffmpeg(&self.bin)?;
        let args = command.build_args();
        debug!("Running {:?} {}", bin, args.join(" "));

        let mut child = Command::new(&bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RenderError::encoding_failed(format!("failed to spawn ffmpeg: {}", e), None, None))?;

        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        if let Some(stderr) = child.stderr.take() {
            let mut current = RenderProgress::default();
            let mut next_report = 10.0;

            for line in BufReader::new(stderr).lines().map_while(std::result::Result::ok) {
                if let Some(snapshot) = parse_progress_line(&line, &mut current) {
                    let percent = snapshot.percentage(total_duration);
                    if percent >= next_report || snapshot.is_complete {
                        info!("   Encoding {:.0}% ({:.2}x)", percent, snapshot.speed);
                        next_report = (percent / 10.0).floor() * 10.0 + 10.0;
                    }
                    continue;
                }
                if is_progress_line(&line) || line.trim().is_empty() {
                    continue;
                }
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        }

        let status = child
            .wait()
            .map_err(|e| RenderError::encoding_failed(format!("failed to wait for ffmpeg: {}", e), None, None))?;

        if !status.success() {
            let stderr: Vec<String> = tail.into_iter().collect();
            return Err(RenderError::encoding_failed(
                format!("ffmpeg exited with {}", status),
                Some(stderr.join("\n")),
                status.code(),
            )
            .into());
        }
        Ok(())
    }
}

fn is_progress_line(line: &str) -> bool {
    line.split_once('=')
        .map(|(key, _)| PROGRESS_KEYS.contains(&key.trim()))
        .unwrap_or(false)
}

/// Everything one encode needs
///
/// Owns the timeline and so every media handle of the run.
#[derive(Debug)]
pub struct RenderJob {
    pub timeline: Timeline,
    pub output_path: PathBuf,
    pub params: EncodingParams,
}

impl RenderJob {
    pub fn new(timeline: Timeline, output_path: impl Into<PathBuf>, params: EncodingParams) -> Self {
        Self {
            timeline,
            output_path: output_path.into(),
            params,
        }
    }

    pub fn audio_track(&self) -> Option<&AudioTrack> {
        self.timeline.audio()
    }
}

/// A finished short
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedVideo {
    pub path: PathBuf,
    pub duration: f64,
    pub file_size: u64,
}

/// Encoder output that is removed unless committed
struct PartialOutput {
    path: PathBuf,
    committed: bool,
}

impl PartialOutput {
    fn for_output(output: &Path) -> Self {
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "render".to_string());
        let name = match output.extension() {
            Some(ext) => format!("{}.partial.{}", stem, ext.to_string_lossy()),
            None => format!("{}.partial", stem),
        };
        Self {
            path: output.with_file_name(name),
            committed: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Move into place, returning the final size
    fn commit(mut self, output: &Path) -> Result<u64> {
        let size = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(RenderError::EmptyOutput {
                path: output.to_path_buf(),
            }
            .into());
        }

        std::fs::rename(&self.path, output).map_err(|e| RenderError::FinalizeFailed {
            path: output.to_path_buf(),
            reason: e.to_string(),
        })?;
        self.committed = true;
        Ok(size)
    }
}

impl Drop for PartialOutput {
    fn drop(&mut self) {
        if self.committed || !self.path.exists() {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed partial output {:?}", self.path),
            Err(e) => warn!("Failed to remove partial output {:?}: {}", self.path, e),
        }
    }
}

/// Turns render jobs into finished files
#[derive(Clone)]
pub struct Renderer {
    encoder: Arc<dyn Encoder>,
}

impl Renderer {
    pub fn new(encoder: Arc<dyn Encoder>) -> Self {
        Self { encoder }
    }

    /// Renderer using the ffmpeg executable named in `params`
    pub fn ffmpeg(params: &EncodingParams) -> Self {
        Self::new(Arc::new(FfmpegEncoder::from_params(params)))
    }

    /// Encode `job`, blocking a worker thread until the file is complete
    ///
    /// On success the output exists and is non-empty. On failure no file
    /// is left at the output path. Either way every handle the job owns has
    /// been released when this returns.
    pub async fn render(&self, job: RenderJob) -> Result<RenderedVideo> {
        let RenderJob {
            timeline,
            output_path,
            params,
        } = job;

        info!(
            "🎞️  Rendering {:.2}s ({} segments) to {:?}",
            timeline.duration(),
            timeline.segments().len(),
            output_path
        );

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| RenderError::FinalizeFailed {
                path: output_path.clone(),
                reason: format!("cannot create output directory: {}", e),
            })?;
        }

        let scratch = tempfile::Builder::new()
            .prefix("shorts-render-")
            .tempdir()
            .map_err(|e| RenderError::encoding_failed(format!("failed to create scratch directory: {}", e), None, None))?;

        let partial = PartialOutput::for_output(&output_path);
        let graph = build_filter_graph(&timeline, &params, scratch.path())?;
        let duration = graph.duration;
        let command = graph.into_command(partial.path(), &params);

        let encoder = Arc::clone(&self.encoder);
        let outcome = task::spawn_blocking(move || encoder.encode(&command, duration)).await;

        // Sources and scratch files are no longer needed past this point
        drop(timeline);
        drop(scratch);

        outcome.map_err(|e| RenderError::TaskFailed { reason: e.to_string() })??;
        let file_size = partial.commit(&output_path)?;

        info!("   ✅ Rendered {:?} ({:.1} MB)", output_path, file_size as f64 / (1024.0 * 1024.0));
        Ok(RenderedVideo {
            path: output_path,
            duration,
            file_size,
        })
    }
}
