//! # Video Module
//!
//! Asset discovery, media handles, probing and the final ffmpeg encode.

pub mod command;
pub mod filtergraph;
pub mod handle;
pub mod probe;
pub mod progress;
pub mod renderer;
pub mod selector;
pub mod types;

pub use command::{FfmpegCommand, InputSpec};
pub use filtergraph::{build_filter_graph, FilterGraph};
pub use handle::{HandleTracker, MediaHandle, MediaLibrary};
pub use probe::{check_ffmpeg, check_ffprobe, FfprobeProbe, MediaProbe};
pub use progress::RenderProgress;
pub use renderer::{Encoder, FfmpegEncoder, RenderJob, RenderedVideo, Renderer};
pub use selector::AssetSelector;
pub use types::{EncodingParams, MediaAsset, MediaInfo, MediaKind};
