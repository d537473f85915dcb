use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    content::Visibility,
    error::{ConfigError, Result},
    video::EncodingParams,
};

/// Main configuration for the Shorts-Factory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where backgrounds, music, the outro and the rotation cursor live
    pub assets: AssetsConfig,

    /// Frame geometry, timing and text styling
    pub layout: LayoutConfig,

    /// Encoder settings
    pub encoding: EncodingParams,

    /// Channel-specific wording and metadata
    pub branding: BrandingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.assets.validate()?;
        self.layout.validate()?;
        self.encoding.validate()?;
        Ok(())
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Asset locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Directory of background clips; also holds the outro and the cursor file
    pub background_dir: PathBuf,

    /// Directory of music tracks
    pub music_dir: PathBuf,

    /// File name of the outro inside `background_dir`
    pub outro_filename: String,

    /// File name of the rotation cursor inside `background_dir`
    pub state_filename: String,

    /// Accepted background extensions (lowercase, without the dot)
    pub video_extensions: Vec<String>,

    /// Accepted music extensions (lowercase, without the dot)
    pub audio_extensions: Vec<String>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            background_dir: PathBuf::from("dogs_temp"),
            music_dir: PathBuf::from("pets_music"),
            outro_filename: "like_subscribe.mp4".to_string(),
            state_filename: "last_video_index.txt".to_string(),
            video_extensions: vec!["mp4".to_string(), "mov".to_string()],
            audio_extensions: vec!["mp3".to_string()],
        }
    }
}

impl AssetsConfig {
    pub fn outro_path(&self) -> PathBuf {
        self.background_dir.join(&self.outro_filename)
    }

    pub fn state_path(&self) -> PathBuf {
        self.background_dir.join(&self.state_filename)
    }

    fn validate(&self) -> Result<()> {
        if self.outro_filename.trim().is_empty() {
            return Err(invalid("assets.outro_filename", &self.outro_filename).into());
        }
        if self.state_filename.trim().is_empty() {
            return Err(invalid("assets.state_filename", &self.state_filename).into());
        }
        if self.video_extensions.is_empty() {
            return Err(invalid("assets.video_extensions", "[]").into());
        }
        if self.audio_extensions.is_empty() {
            return Err(invalid("assets.audio_extensions", "[]").into());
        }
        Ok(())
    }
}

/// Frame geometry and layer styling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Output frame width in pixels
    pub width: u32,

    /// Output frame height in pixels
    pub height: u32,

    /// Length of the captioned segment before the outro (seconds)
    pub main_duration: f64,

    /// Font used for every text layer (fontconfig name)
    pub font: String,

    /// Average glyph width as a fraction of the font size, used for wrapping
    pub char_width_ratio: f64,

    pub heading: HeadingLayout,

    pub captions: CaptionLayout,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            main_duration: 12.0,
            font: "Arial-Rounded-MT-Bold".to_string(),
            char_width_ratio: 0.55,
            heading: HeadingLayout::default(),
            captions: CaptionLayout::default(),
        }
    }
}

impl LayoutConfig {
    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(invalid("layout.frame_size", format!("{}x{}", self.width, self.height)).into());
        }

        if !(self.main_duration.is_finite() && self.main_duration > 0.0) {
            return Err(invalid("layout.main_duration", self.main_duration).into());
        }

        if self.char_width_ratio <= 0.0 {
            return Err(invalid("layout.char_width_ratio", self.char_width_ratio).into());
        }

        let fraction_ok = |f: f64| f > 0.0 && f <= 1.0;
        if !fraction_ok(self.heading.box_width_fraction) {
            return Err(invalid("layout.heading.box_width_fraction", self.heading.box_width_fraction).into());
        }
        if !(0.0..1.0).contains(&self.heading.vertical_fraction) {
            return Err(invalid("layout.heading.vertical_fraction", self.heading.vertical_fraction).into());
        }
        if !fraction_ok(self.captions.wrap_fraction) {
            return Err(invalid("layout.captions.wrap_fraction", self.captions.wrap_fraction).into());
        }

        let half = self.main_duration / 2.0;
        let caps = &self.captions;
        if caps.first_fade_in + caps.first_fade_out > half {
            return Err(invalid(
                "layout.captions.first_fades",
                format!("{}+{} > {}", caps.first_fade_in, caps.first_fade_out, half),
            )
            .into());
        }
        if caps.second_fade_in > half {
            return Err(invalid("layout.captions.second_fade_in", caps.second_fade_in).into());
        }
        if caps.first_fade_in < 0.0 || caps.first_fade_out < 0.0 || caps.second_fade_in < 0.0 {
            return Err(invalid("layout.captions.fades", "negative").into());
        }

        Ok(())
    }
}

/// Heading banner: a solid box with a centred label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadingLayout {
    /// Top edge of the banner as a fraction of frame height
    pub vertical_fraction: f64,

    /// Banner width as a fraction of frame width
    pub box_width_fraction: f64,

    /// Banner height in pixels
    pub box_height: u32,

    pub box_color: String,
    pub text_color: String,
    pub font_size: u32,
}

impl Default for HeadingLayout {
    fn default() -> Self {
        Self {
            vertical_fraction: 0.20,
            box_width_fraction: 0.7,
            box_height: 110,
            box_color: "white".to_string(),
            text_color: "black".to_string(),
            font_size: 75,
        }
    }
}

/// Styling and fades for the two caption halves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionLayout {
    pub font_size: u32,
    pub text_color: String,
    pub stroke_color: String,
    pub stroke_width: u32,

    /// Wrap width as a fraction of frame width
    pub wrap_fraction: f64,

    pub first_fade_in: f64,
    pub first_fade_out: f64,
    pub second_fade_in: f64,
}

impl Default for CaptionLayout {
    fn default() -> Self {
        Self {
            font_size: 80,
            text_color: "white".to_string(),
            stroke_color: "black".to_string(),
            stroke_width: 3,
            wrap_fraction: 0.9,
            first_fade_in: 1.0,
            first_fade_out: 0.5,
            second_fade_in: 0.5,
        }
    }
}

/// Channel-specific wording. Each channel variant is just a different instance of this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandingConfig {
    /// Text shown in the heading banner
    pub heading_text: String,

    /// Appended to the title and the description
    pub hashtags: String,

    /// Tags always sent with an upload
    pub base_tags: Vec<String>,

    pub visibility: Visibility,

    /// Output file names are `{prefix}_{unix_timestamp}.mp4`
    pub output_prefix: String,

    /// Attempts the content generator gets to produce something unused
    pub max_content_attempts: usize,
}

impl Default for BrandingConfig {
    fn default() -> Self {
        Self {
            heading_text: "Dog Facts".to_string(),
            hashtags: "#shorts #dogfacts #pets #dog #cuteanimals".to_string(),
            base_tags: [
                "dog facts",
                "pet care",
                "dog training",
                "puppy tips",
                "happy dog",
                "dog health",
                "animal facts",
                "cute dogs",
                "shorts",
            ]
            .iter()
            .map(|t| t.to_string())
            .collect(),
            visibility: Visibility::Public,
            output_prefix: "quote".to_string(),
            max_content_attempts: 5,
        }
    }
}
