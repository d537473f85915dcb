use crate::audio::AudioTrack;
use crate::video::MediaHandle;

/// Placement of a layer within the frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    /// Covers the whole frame
    Fill,

    /// Centred on the frame
    Center,

    /// Fills (or is centred within) a rectangle
    Rect { x: u32, y: u32, width: u32, height: u32 },
}

/// A clip scaled and cropped to the output frame
#[derive(Debug)]
pub struct NormalizedClip {
    handle: MediaHandle,
    pub geometry: CropGeometry,

    /// Length this clip has to fill (seconds)
    pub duration: f64,

    /// Whether the source repeats to reach `duration`
    pub looped: bool,
}

impl NormalizedClip {
    pub fn new(handle: MediaHandle, geometry: CropGeometry, duration: f64) -> Self {
        let looped = handle.duration() < duration;
        Self {
            handle,
            geometry,
            duration,
            looped,
        }
    }

    pub fn handle(&self) -> &MediaHandle {
        &self.handle
    }
}

/// Scale-then-centre-crop parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropGeometry {
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub crop_x: u32,
    pub crop_y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropGeometry {
    /// Scale `source` to the target height and crop the centre to the target width.
    ///
    /// Sources narrower than the target aspect ratio are scaled by width
    /// instead and cropped vertically, so the frame is always covered.
    pub fn cover(source: (u32, u32), target: (u32, u32)) -> Self {
        let (sw, sh) = (source.0.max(1) as u64, source.1.max(1) as u64);
        let (tw, th) = target;

        let by_height = round_even(sw * th as u64, sh);
        if by_height >= tw {
            return Self {
                scaled_width: by_height,
                scaled_height: th,
                crop_x: (by_height - tw) / 2,
                crop_y: 0,
                width: tw,
                height: th,
            };
        }

        let by_width = round_even(sh * tw as u64, sw).max(th);
        Self {
            scaled_width: tw,
            scaled_height: by_width,
            crop_x: 0,
            crop_y: (by_width - th) / 2,
            width: tw,
            height: th,
        }
    }
}

/// `num / den` rounded, then bumped to an even number (yuv420p needs even sizes)
fn round_even(num: u64, den: u64) -> u32 {
    let value = (num + den / 2) / den;
    (value + (value % 2)) as u32
}

/// Text rendered line by line, centred horizontally
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub font: String,
    pub font_size: u32,
    pub color: String,
    pub stroke_color: Option<String>,
    pub stroke_width: u32,
}

impl TextBlock {
    pub fn line_height(&self) -> u32 {
        (self.font_size as f64 * 1.2).round() as u32
    }

    pub fn block_height(&self) -> u32 {
        self.line_height() * self.lines.len() as u32
    }
}

/// Solid colour rectangle
#[derive(Debug, Clone, PartialEq)]
pub struct ColorBox {
    pub color: String,
}

#[derive(Debug)]
pub enum LayerContent {
    Clip(NormalizedClip),
    Color(ColorBox),
    Text(TextBlock),
}

/// A single visual element with its own time window
#[derive(Debug)]
pub struct TimedLayer {
    pub content: LayerContent,
    pub position: Position,

    /// Offset from the start of the segment (seconds)
    pub start_offset: f64,
    pub duration: f64,
    pub fade_in: f64,
    pub fade_out: f64,
}

impl TimedLayer {
    pub fn new(content: LayerContent, position: Position, start_offset: f64, duration: f64) -> Self {
        Self {
            content,
            position,
            start_offset,
            duration,
            fade_in: 0.0,
            fade_out: 0.0,
        }
    }

    pub fn with_fades(mut self, fade_in: f64, fade_out: f64) -> Self {
        self.fade_in = fade_in;
        self.fade_out = fade_out;
        self
    }

    pub fn end(&self) -> f64 {
        self.start_offset + self.duration
    }

    /// Active over the half-open window `[start, end)`
    pub fn is_active_at(&self, t: f64) -> bool {
        t >= self.start_offset && t < self.end()
    }

    /// Opacity at segment time `t`, following the fade ramps
    pub fn opacity_at(&self, t: f64) -> f64 {
        if !self.is_active_at(t) {
            return 0.0;
        }
        let since_start = t - self.start_offset;
        let until_end = self.end() - t;

        let mut alpha: f64 = 1.0;
        if self.fade_in > 0.0 && since_start < self.fade_in {
            alpha = alpha.min(since_start / self.fade_in);
        }
        if self.fade_out > 0.0 && until_end < self.fade_out {
            alpha = alpha.min(until_end / self.fade_out);
        }
        alpha.clamp(0.0, 1.0)
    }
}

/// A stack of layers played for `duration` seconds
#[derive(Debug)]
pub struct Segment {
    pub layers: Vec<TimedLayer>,
    pub duration: f64,
}

impl Segment {
    /// The clip every other layer is drawn on
    pub fn base_clip(&self) -> Option<&NormalizedClip> {
        self.layers.iter().find_map(|layer| match &layer.content {
            LayerContent::Clip(clip) => Some(clip),
            _ => None,
        })
    }
}

/// Segments played back to back, plus the bound audio track
#[derive(Debug)]
pub struct Timeline {
    pub width: u32,
    pub height: u32,
    segments: Vec<Segment>,
    audio: Option<AudioTrack>,
}

impl Timeline {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            segments: Vec::new(),
            audio: None,
        }
    }

    pub fn push_segment(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Total duration in seconds
    pub fn duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    pub fn audio(&self) -> Option<&AudioTrack> {
        self.audio.as_ref()
    }

    /// Replace the audio source, returning the previous one
    pub fn set_audio(&mut self, track: AudioTrack) -> Option<AudioTrack> {
        self.audio.replace(track)
    }

    /// Number of media handles this timeline keeps open
    pub fn handle_count(&self) -> usize {
        let clips = self
            .segments
            .iter()
            .flat_map(|s| s.layers.iter())
            .filter(|l| matches!(l.content, LayerContent::Clip(_)))
            .count();
        clips + usize::from(self.audio.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landscape_source_scales_by_height() {
        let geometry = CropGeometry::cover((1920, 1080), (1080, 1920));
        assert_eq!(geometry.scaled_height, 1920);
        assert_eq!(geometry.scaled_width, 3414);
        assert_eq!(geometry.crop_x, (3414 - 1080) / 2);
        assert_eq!(geometry.crop_y, 0);
    }

    #[test]
    fn test_matching_aspect_needs_no_crop() {
        let geometry = CropGeometry::cover((720, 1280), (1080, 1920));
        assert_eq!((geometry.scaled_width, geometry.scaled_height), (1080, 1920));
        assert_eq!((geometry.crop_x, geometry.crop_y), (0, 0));
    }

    #[test]
    fn test_narrow_source_scales_by_width() {
        let geometry = CropGeometry::cover((500, 2000), (1080, 1920));
        assert_eq!(geometry.scaled_width, 1080);
        assert_eq!(geometry.scaled_height, 4320);
        assert_eq!(geometry.crop_y, (4320 - 1920) / 2);
    }

    fn text_layer(start: f64, duration: f64) -> TimedLayer {
        TimedLayer::new(
            LayerContent::Color(ColorBox { color: "white".to_string() }),
            Position::Center,
            start,
            duration,
        )
    }

    #[test]
    fn test_half_open_activity() {
        let layer = text_layer(6.0, 6.0);
        assert!(!layer.is_active_at(5.99));
        assert!(layer.is_active_at(6.0));
        assert!(!layer.is_active_at(12.0));
    }

    #[test]
    fn test_fade_ramps() {
        let layer = text_layer(0.0, 6.0).with_fades(1.0, 0.5);
        assert!((layer.opacity_at(0.0)).abs() < 1e-9);
        assert!((layer.opacity_at(0.5) - 0.5).abs() < 1e-9);
        assert!((layer.opacity_at(3.0) - 1.0).abs() < 1e-9);
        assert!((layer.opacity_at(5.75) - 0.5).abs() < 1e-9);
        assert_eq!(layer.opacity_at(6.0), 0.0);
    }

    #[test]
    fn test_empty_timeline() {
        let timeline = Timeline::new(1080, 1920);
        assert_eq!(timeline.duration(), 0.0);
        assert_eq!(timeline.handle_count(), 0);
        assert!(timeline.audio().is_none());
    }
}
