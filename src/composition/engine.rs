use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    audio::AudioMixer,
    composition::Compositor,
    config::Config,
    error::Result,
    video::{
        AssetSelector, FfprobeProbe, HandleTracker, MediaLibrary, MediaProbe, RenderJob, RenderedVideo,
        Renderer,
    },
};

/// Turns two captions into one finished short
///
/// The pipeline runs strictly in order:
/// 1. Fixed assets - open the outro and pick the music (fatal if missing)
/// 2. Background - advance the rotation and persist the cursor
/// 3. Composition - normalize clips, lay out text, append the outro
/// 4. Audio - loop or trim the music to the exact total duration
/// 5. Render - encode to the output path
///
/// Outro and music are checked before the rotation advances, so a
/// misconfigured asset directory never consumes a background slot.
pub struct ShortsEngine {
    config: Config,
    selector: AssetSelector,
    compositor: Compositor,
    library: MediaLibrary,
    mixer: AudioMixer,
    renderer: Renderer,
}

impl ShortsEngine {
    /// Engine backed by the ffprobe and ffmpeg executables
    pub fn new(config: Config) -> Self {
        let probe = Arc::new(FfprobeProbe::new(config.encoding.ffprobe_bin.clone()));
        let renderer = Renderer::ffmpeg(&config.encoding);
        Self::with_parts(config, probe, renderer, HandleTracker::new())
    }

    /// Engine with explicit probe, renderer and handle tracker
    pub fn with_parts(
        config: Config,
        probe: Arc<dyn MediaProbe>,
        renderer: Renderer,
        tracker: Arc<HandleTracker>,
    ) -> Self {
        let library = MediaLibrary::new(probe, tracker);
        Self {
            selector: AssetSelector::from_config(&config.assets),
            compositor: Compositor::new(library.clone(), config.layout.clone()),
            library,
            mixer: AudioMixer::new(),
            renderer,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tracker(&self) -> &Arc<HandleTracker> {
        self.library.tracker()
    }

    /// Compose and render one short to `output_path`
    pub async fn run(&self, part1: &str, part2: &str, output_path: &Path) -> Result<RenderedVideo> {
        let assets = &self.config.assets;
        let layout = &self.config.layout;

        info!("🎬 Starting short");
        info!("   Backgrounds: {:?}", assets.background_dir);
        info!("   Music: {:?}", assets.music_dir);
        info!("   Output: {:?}", output_path);

        // Step 1: fixed assets
        info!("📦 Step 1: Checking outro and music...");
        let outro = self.compositor.load_outro(&assets.outro_path())?;
        let music_asset = self.selector.select_music(&assets.music_dir)?;
        let music = self.library.open(music_asset)?;

        // Step 2: background rotation
        info!("📹 Step 2: Selecting background...");
        let (background_asset, cursor) = self
            .selector
            .select_background(&assets.background_dir, &assets.outro_filename)?;
        debug!("Cursor now {}", cursor);
        let background = self.compositor.open_background(background_asset)?;

        // Step 3: composition
        info!("🎨 Step 3: Composing timeline...");
        let background = self
            .compositor
            .normalize(background, layout.width, layout.height, layout.main_duration)?;
        if background.looped {
            info!(
                "   Background is {:.2}s, looping to {:.2}s",
                background.handle().duration(),
                layout.main_duration
            );
        }
        let main = self.compositor.build_main_timeline(
            background,
            part1,
            part2,
            &self.config.branding.heading_text,
            layout.main_duration,
        );

        let outro_duration = outro.duration();
        let outro = self
            .compositor
            .normalize(outro, layout.width, layout.height, outro_duration)?;
        let timeline = self.compositor.append_outro(main, outro);
        info!("   ✅ Timeline: {:.2}s in {} segments", timeline.duration(), timeline.segments().len());

        // Step 4: audio
        info!("🎵 Step 4: Fitting music...");
        let track = self.mixer.prepare_track(music, timeline.duration());
        let timeline = self.mixer.attach_audio(timeline, track);

        // Step 5: render
        info!("🎞️  Step 5: Rendering...");
        let job = RenderJob::new(timeline, output_path, self.config.encoding.clone());
        let rendered = self.renderer.render(job).await;

        let leaked = self.tracker().outstanding();
        if !leaked.is_empty() {
            warn!("{} media handle(s) still open after render: {:?}", leaked.len(), leaked);
        }

        let rendered = rendered?;
        info!("🎉 Short complete! Saved to: {:?}", rendered.path);
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::state::read_cursor;
    use crate::video::probe::StaticProbe;
    use crate::video::{Encoder, FfmpegCommand};
    use crate::ShortsError;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::{tempdir, TempDir};

    /// Records the first input of each encode
    #[derive(Default)]
    struct RecordingEncoder {
        fail: bool,
        backgrounds: Mutex<Vec<PathBuf>>,
    }

    impl Encoder for RecordingEncoder {
        fn encode(&self, command: &FfmpegCommand, _total: f64) -> Result<()> {
            if let Some(first) = command.inputs().first() {
                self.backgrounds.lock().unwrap().push(first.path.clone());
            }
            std::fs::write(command.output(), b"rendered")?;
            if self.fail {
                return Err(RenderError::encoding_failed("codec exploded", None, Some(1)).into());
            }
            Ok(())
        }
    }

    struct Fixture {
        dir: TempDir,
        config: Config,
        probe: StaticProbe,
    }

    fn fixture(backgrounds: &[&str], with_outro: bool, with_music: bool) -> Fixture {
        let dir = tempdir().unwrap();
        let bg_dir = dir.path().join("dogs_temp");
        let music_dir = dir.path().join("pets_music");
        std::fs::create_dir_all(&bg_dir).unwrap();
        std::fs::create_dir_all(&music_dir).unwrap();

        let mut probe = StaticProbe::new();
        for name in backgrounds {
            let path = bg_dir.join(name);
            std::fs::write(&path, b"x").unwrap();
            probe = probe.with_video(path, 20.0, (1920, 1080));
        }
        if with_outro {
            let path = bg_dir.join("like_subscribe.mp4");
            std::fs::write(&path, b"x").unwrap();
            probe = probe.with_video(path, 3.0, (1080, 1920));
        }
        if with_music {
            let path = music_dir.join("song.mp3");
            std::fs::write(&path, b"x").unwrap();
            probe = probe.with_audio(path, 40.0);
        }

        let mut config = Config::default();
        config.assets.background_dir = bg_dir;
        config.assets.music_dir = music_dir;
        Fixture { dir, config, probe }
    }

    fn engine(fixture: &Fixture, encoder: Arc<RecordingEncoder>) -> ShortsEngine {
        ShortsEngine::with_parts(
            fixture.config.clone(),
            Arc::new(fixture.probe.clone()),
            Renderer::new(encoder),
            HandleTracker::new(),
        )
    }

    #[tokio::test]
    async fn test_rotation_across_runs() {
        let fx = fixture(&["c.mp4", "a.mp4", "b.mp4"], true, true);
        let encoder = Arc::new(RecordingEncoder::default());
        let engine = engine(&fx, encoder.clone());
        let state = fx.config.assets.state_path();

        let first = engine.run("Hook", "Reveal", &fx.dir.path().join("quote_1.mp4")).await.unwrap();
        assert!((first.duration - 15.0).abs() < 1e-9);
        assert!(first.path.exists());
        assert_eq!(read_cursor(&state), 0);

        engine.run("Hook", "Reveal", &fx.dir.path().join("quote_2.mp4")).await.unwrap();
        assert_eq!(read_cursor(&state), 1);

        let picked: Vec<String> = encoder
            .backgrounds
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(picked, vec!["a.mp4", "b.mp4"]);
        assert_eq!(engine.tracker().open_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_outro_aborts_before_rotation() {
        let fx = fixture(&["a.mp4", "b.mp4"], false, true);
        let engine = engine(&fx, Arc::new(RecordingEncoder::default()));
        let output = fx.dir.path().join("quote.mp4");

        let err = engine.run("Hook", "Reveal", &output).await.unwrap_err();
        assert!(err.is_configuration_fatal());
        assert!(!output.exists());
        assert!(!fx.config.assets.state_path().exists());
    }

    #[tokio::test]
    async fn test_empty_music_dir_aborts_before_rotation() {
        let fx = fixture(&["a.mp4"], true, false);
        let engine = engine(&fx, Arc::new(RecordingEncoder::default()));

        let err = engine
            .run("Hook", "Reveal", &fx.dir.path().join("quote.mp4"))
            .await
            .unwrap_err();
        assert!(err.is_configuration_fatal());
        assert!(!fx.config.assets.state_path().exists());
        assert_eq!(engine.tracker().open_count(), 0);
    }

    #[tokio::test]
    async fn test_encode_failure_cleans_up() {
        let fx = fixture(&["a.mp4"], true, true);
        let encoder = Arc::new(RecordingEncoder {
            fail: true,
            ..Default::default()
        });
        let engine = engine(&fx, encoder);
        let output = fx.dir.path().join("quote.mp4");

        let err = engine.run("Hook", "Reveal", &output).await.unwrap_err();
        assert!(matches!(err, ShortsError::Render(RenderError::EncodingFailed { .. })));
        assert!(!output.exists());
        assert!(!fx.dir.path().join("quote.partial.mp4").exists());

        let tracker = engine.tracker();
        assert_eq!(tracker.open_count(), 0);
        assert_eq!(tracker.released(), tracker.opened());
        assert_eq!(tracker.double_releases(), 0);

        // The slot was consumed before rendering
        assert_eq!(read_cursor(fx.config.assets.state_path()), 0);
    }
}
