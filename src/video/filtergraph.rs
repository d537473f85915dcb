//! Translates a [`Timeline`] into an ffmpeg filter graph.
//!
//! Every segment becomes one chain: the base clip is trimmed, scaled,
//! cropped and resampled to the output rate, then each overlay layer is
//! drawn on top. Segments are concatenated and the bound audio track is
//! trimmed to the exact timeline duration.

use std::path::Path;

use tracing::debug;

use crate::audio::AudioFit;
use crate::composition::{LayerContent, NormalizedClip, Position, Segment, TextBlock, TimedLayer, Timeline};
use crate::error::{RenderError, Result};
use crate::video::command::{FfmpegCommand, InputSpec};
use crate::video::types::EncodingParams;

/// Inputs and filter graph for one render
#[derive(Debug, Clone)]
pub struct FilterGraph {
    pub inputs: Vec<InputSpec>,
    pub filter: String,
    pub video_label: String,
    pub audio_label: Option<String>,

    /// Output duration in seconds
    pub duration: f64,
}

impl FilterGraph {
    /// Full encoder command writing to `output`
    pub fn into_command(self, output: &Path, params: &EncodingParams) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(output);
        for input in self.inputs {
            cmd = cmd.input(input);
        }

        cmd = cmd
            .filter_complex(self.filter)
            .map(format!("[{}]", self.video_label));

        cmd = match self.audio_label {
            Some(label) => cmd.map(format!("[{}]", label)).audio_codec(params.audio_codec.clone()),
            None => cmd.output_arg("-an"),
        };

        cmd.video_codec(params.codec.clone())
            .preset(params.preset.clone())
            .threads(params.threads)
            .frame_rate(params.frame_rate)
            .output_args(["-pix_fmt", params.pixel_format.as_str()])
            .duration(self.duration)
            .output_args(["-movflags", "+faststart"])
    }
}

/// Build the graph, writing text layers into `scratch`
pub fn build_filter_graph(timeline: &Timeline, params: &EncodingParams, scratch: &Path) -> Result<FilterGraph> {
    let mut inputs: Vec<InputSpec> = Vec::new();
    let mut chains: Vec<String> = Vec::new();
    let mut segment_labels: Vec<String> = Vec::new();

    for (index, segment) in timeline.segments().iter().enumerate() {
        let label = format!("seg{}", index);
        let chain = segment_chain(index, segment, timeline, params, scratch, &mut inputs, &label)?;
        chains.push(chain);
        segment_labels.push(label);
    }

    let video_label = match segment_labels.len() {
        0 => {
            return Err(RenderError::encoding_failed("timeline has no segments", None, None).into());
        }
        1 => segment_labels.remove(0),
        n => {
            let joined: String = segment_labels.iter().map(|l| format!("[{}]", l)).collect();
            chains.push(format!("{}concat=n={}:v=1:a=0[vout]", joined, n));
            "vout".to_string()
        }
    };

    let duration = timeline.duration();
    let audio_label = match timeline.audio() {
        Some(track) => {
            let index = inputs.len();
            inputs.push(InputSpec::new(track.handle().path()).looped(track.fit == AudioFit::Loop));
            chains.push(format!(
                "[{}:a]atrim=duration={},asetpts=PTS-STARTPTS[aout]",
                index,
                secs(track.duration)
            ));
            Some("aout".to_string())
        }
        None => None,
    };

    let filter = chains.join(";");
    debug!("Filter graph ({} inputs): {}", inputs.len(), filter);

    Ok(FilterGraph {
        inputs,
        filter,
        video_label,
        audio_label,
        duration,
    })
}

fn segment_chain(
    index: usize,
    segment: &Segment,
    timeline: &Timeline,
    params: &EncodingParams,
    scratch: &Path,
    inputs: &mut Vec<InputSpec>,
    out_label: &str,
) -> Result<String> {
    let mut filters: Vec<String> = Vec::new();
    let mut base_seen = false;

    let head = match segment.base_clip() {
        Some(clip) => {
            let input = inputs.len();
            inputs.push(clip_input(clip));
            base_seen = true;
            format!("[{}:v]{}", input, clip_filters(clip, segment.duration, params))
        }
        None => format!(
            "color=c=black:s={}x{}:d={}:r={},format={}",
            timeline.width,
            timeline.height,
            secs(segment.duration),
            params.frame_rate,
            params.pixel_format
        ),
    };

    for (layer_index, layer) in segment.layers.iter().enumerate() {
        match &layer.content {
            LayerContent::Clip(_) if base_seen => {
                // The first clip is the base; it is already in `head`
                base_seen = false;
            }
            LayerContent::Clip(clip) => {
                return Err(RenderError::encoding_failed(
                    format!(
                        "segment {} stacks more than one clip ({:?})",
                        index,
                        clip.handle().path()
                    ),
                    None,
                    None,
                )
                .into());
            }
            LayerContent::Color(color) => {
                filters.push(drawbox(layer, &color.color, segment.duration));
            }
            LayerContent::Text(block) => {
                for (line_index, line) in block.lines.iter().enumerate() {
                    let file = scratch.join(format!("seg{}_layer{}_line{}.txt", index, layer_index, line_index));
                    std::fs::write(&file, line).map_err(|e| {
                        RenderError::encoding_failed(
                            format!("failed to write text layer {:?}: {}", file, e),
                            None,
                            None,
                        )
                    })?;
                    filters.push(drawtext(layer, block, line_index, &file, timeline.height, segment.duration));
                }
            }
        }
    }

    let mut chain = head;
    for filter in filters {
        chain.push(',');
        chain.push_str(&filter);
    }
    chain.push_str(&format!("[{}]", out_label));
    Ok(chain)
}

fn clip_input(clip: &NormalizedClip) -> InputSpec {
    let input = InputSpec::new(clip.handle().path()).looped(clip.looped);
    if clip.looped {
        input.limit(clip.duration)
    } else {
        input
    }
}

fn clip_filters(clip: &NormalizedClip, duration: f64, params: &EncodingParams) -> String {
    let g = clip.geometry;
    format!(
        "trim=duration={},setpts=PTS-STARTPTS,scale={}:{},crop={}:{}:{}:{},setsar=1,fps={},format={}",
        secs(duration),
        g.scaled_width,
        g.scaled_height,
        g.width,
        g.height,
        g.crop_x,
        g.crop_y,
        params.frame_rate,
        params.pixel_format
    )
}

fn drawbox(layer: &TimedLayer, color: &str, segment_duration: f64) -> String {
    let (x, y, w, h) = match layer.position {
        Position::Rect { x, y, width, height } => {
            (x.to_string(), y.to_string(), width.to_string(), height.to_string())
        }
        Position::Fill | Position::Center => {
            ("0".to_string(), "0".to_string(), "iw".to_string(), "ih".to_string())
        }
    };

    let mut filter = format!("drawbox=x={}:y={}:w={}:h={}:color={}:t=fill", x, y, w, h, color);
    if let Some(enable) = enable_expr(layer, segment_duration) {
        filter.push_str(&format!(":enable='{}'", enable));
    }
    filter
}

fn drawtext(
    layer: &TimedLayer,
    block: &TextBlock,
    line_index: usize,
    textfile: &Path,
    frame_height: u32,
    segment_duration: f64,
) -> String {
    let line_height = block.line_height() as i64;
    let block_height = block.block_height() as i64;

    let (x, top) = match layer.position {
        Position::Rect { x, y, width, height } => (
            format!("{}+({}-text_w)/2", x, width),
            y as i64 + (height as i64 - block_height) / 2,
        ),
        Position::Fill | Position::Center => (
            "(w-text_w)/2".to_string(),
            (frame_height as i64 - block_height) / 2,
        ),
    };
    let y = top + line_index as i64 * line_height;

    let mut filter = format!(
        "drawtext=textfile={}:font={}:expansion=none:fontsize={}:fontcolor={}:x={}:y={}",
        quote_filter_value(&textfile.to_string_lossy()),
        quote_filter_value(&block.font),
        block.font_size,
        block.color,
        x,
        y
    );

    if let Some(stroke) = &block.stroke_color {
        if block.stroke_width > 0 {
            filter.push_str(&format!(":borderw={}:bordercolor={}", block.stroke_width, stroke));
        }
    }
    if let Some(enable) = enable_expr(layer, segment_duration) {
        filter.push_str(&format!(":enable='{}'", enable));
    }
    if let Some(alpha) = alpha_expr(layer) {
        filter.push_str(&format!(":alpha='{}'", alpha));
    }
    filter
}

/// Half-open activity window, or `None` when the layer spans the whole segment
fn enable_expr(layer: &TimedLayer, segment_duration: f64) -> Option<String> {
    if layer.start_offset <= 0.0 && layer.end() >= segment_duration {
        return None;
    }
    Some(format!("gte(t,{})*lt(t,{})", secs(layer.start_offset), secs(layer.end())))
}

/// Linear fade ramps, or `None` for a layer without fades
fn alpha_expr(layer: &TimedLayer) -> Option<String> {
    if layer.fade_in <= 0.0 && layer.fade_out <= 0.0 {
        return None;
    }

    let start = layer.start_offset;
    let end = layer.end();
    let mut expr = "1".to_string();

    if layer.fade_out > 0.0 {
        expr = format!(
            "if(gt(t,{}),({}-t)/{},{})",
            secs(end - layer.fade_out),
            secs(end),
            secs(layer.fade_out),
            expr
        );
    }
    if layer.fade_in > 0.0 {
        expr = format!(
            "if(lt(t,{}),(t-{})/{},{})",
            secs(start + layer.fade_in),
            secs(start),
            secs(layer.fade_in),
            expr
        );
    }
    Some(expr)
}

/// Single-quote `value` for a filter option
///
/// Everything inside quotes is literal, so an embedded quote closes the
/// quoted run, is escaped on its own and reopens it.
fn quote_filter_value(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

fn secs(value: f64) -> String {
    format!("{:.3}", value)
}
