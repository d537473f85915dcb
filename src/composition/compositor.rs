use std::path::Path;

use tracing::{debug, info};

use crate::composition::text::{chars_per_line, wrap_text};
use crate::composition::timeline::{
    ColorBox, CropGeometry, LayerContent, NormalizedClip, Position, Segment, TextBlock,
    TimedLayer, Timeline,
};
use crate::config::LayoutConfig;
use crate::error::{AssetError, RenderError, Result};
use crate::video::{MediaAsset, MediaHandle, MediaKind, MediaLibrary};

/// Builds the layered visual timeline for one short
pub struct Compositor {
    library: MediaLibrary,
    layout: LayoutConfig,
}

impl Compositor {
    pub fn new(library: MediaLibrary, layout: LayoutConfig) -> Self {
        Self { library, layout }
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Open the outro and discover its duration
    ///
    /// There is no fallback branding: a missing or unreadable outro is fatal.
    pub fn load_outro(&self, path: &Path) -> Result<MediaHandle> {
        if !path.is_file() {
            return Err(AssetError::MissingOutro {
                path: path.to_path_buf(),
                reason: "file not found".to_string(),
            }
            .into());
        }

        let handle = self
            .library
            .open(MediaAsset::new(path, MediaKind::Video))
            .map_err(|e| AssetError::MissingOutro {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        info!("   Outro: {:?} ({:.2}s)", path, handle.duration());
        Ok(handle)
    }

    /// Open a selected background clip
    pub fn open_background(&self, asset: MediaAsset) -> Result<MediaHandle> {
        self.library.open(asset)
    }

    /// Scale to the target height, centre-crop to the target width, loop if short
    pub fn normalize(
        &self,
        handle: MediaHandle,
        target_width: u32,
        target_height: u32,
        segment_duration: f64,
    ) -> Result<NormalizedClip> {
        let source = handle.resolution().ok_or_else(|| RenderError::SourceUnreadable {
            path: handle.path().to_path_buf(),
            reason: "unknown video resolution".to_string(),
        })?;

        let geometry = CropGeometry::cover(source, (target_width, target_height));
        let clip = NormalizedClip::new(handle, geometry, segment_duration);

        debug!(
            "Normalized {:?}: {}x{} -> {}x{} crop@({}, {}), {:.2}s{}",
            clip.handle().path(),
            source.0,
            source.1,
            geometry.scaled_width,
            geometry.scaled_height,
            geometry.crop_x,
            geometry.crop_y,
            segment_duration,
            if clip.looped { " (looped)" } else { "" }
        );
        Ok(clip)
    }

    /// Background, heading banner and the two captions over `main_duration`
    pub fn build_main_timeline(
        &self,
        background: NormalizedClip,
        caption_part1: &str,
        caption_part2: &str,
        heading_text: &str,
        main_duration: f64,
    ) -> Timeline {
        let layout = &self.layout;
        let half = main_duration / 2.0;
        let caps = &layout.captions;

        let mut layers = vec![TimedLayer::new(
            LayerContent::Clip(background),
            Position::Fill,
            0.0,
            main_duration,
        )];

        let banner = self.heading_rect();
        layers.push(TimedLayer::new(
            LayerContent::Color(ColorBox {
                color: layout.heading.box_color.clone(),
            }),
            banner,
            0.0,
            main_duration,
        ));
        layers.push(TimedLayer::new(
            LayerContent::Text(self.heading_block(heading_text)),
            banner,
            0.0,
            main_duration,
        ));

        layers.push(
            TimedLayer::new(
                LayerContent::Text(self.caption_block(caption_part1)),
                Position::Center,
                0.0,
                half,
            )
            .with_fades(caps.first_fade_in, caps.first_fade_out),
        );
        layers.push(
            TimedLayer::new(
                LayerContent::Text(self.caption_block(caption_part2)),
                Position::Center,
                half,
                main_duration - half,
            )
            .with_fades(caps.second_fade_in, 0.0),
        );

        let mut timeline = Timeline::new(layout.width, layout.height);
        timeline.push_segment(Segment {
            layers,
            duration: main_duration,
        });
        timeline
    }

    /// Play the outro straight after the main segment
    pub fn append_outro(&self, mut timeline: Timeline, outro: NormalizedClip) -> Timeline {
        let duration = outro.duration;
        timeline.push_segment(Segment {
            layers: vec![TimedLayer::new(
                LayerContent::Clip(outro),
                Position::Fill,
                0.0,
                duration,
            )],
            duration,
        });
        debug!("Outro appended, total duration {:.2}s", timeline.duration());
        timeline
    }

    fn heading_rect(&self) -> Position {
        let layout = &self.layout;
        let width = (layout.width as f64 * layout.heading.box_width_fraction).round() as u32;
        Position::Rect {
            x: (layout.width - width.min(layout.width)) / 2,
            y: (layout.height as f64 * layout.heading.vertical_fraction).round() as u32,
            width,
            height: layout.heading.box_height,
        }
    }

    fn heading_block(&self, text: &str) -> TextBlock {
        let layout = &self.layout;
        let heading = &layout.heading;
        let width = chars_per_line(
            layout.width,
            heading.box_width_fraction,
            heading.font_size,
            layout.char_width_ratio,
        );
        TextBlock {
            lines: wrap_text(text, width),
            font: layout.font.clone(),
            font_size: heading.font_size,
            color: heading.text_color.clone(),
            stroke_color: None,
            stroke_width: 0,
        }
    }

    fn caption_block(&self, text: &str) -> TextBlock {
        let layout = &self.layout;
        let caps = &layout.captions;
        let width = chars_per_line(layout.width, caps.wrap_fraction, caps.font_size, layout.char_width_ratio);
        TextBlock {
            lines: wrap_text(text, width),
            font: layout.font.clone(),
            font_size: caps.font_size,
            color: caps.text_color.clone(),
            stroke_color: Some(caps.stroke_color.clone()),
            stroke_width: caps.stroke_width,
        }
    }
}
