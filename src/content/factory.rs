use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::composition::ShortsEngine;
use crate::content::facts::{FactRecord, FactStore};
use crate::content::generator::{generate_unique, CaptionPair, ContentGenerator};
use crate::content::publish::{build_publish_request, PublishedVideo, Publisher};
use crate::error::Result;
use crate::video::RenderedVideo;

/// Outcome recorded in the fact log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    GeneratedLocally,
    Uploaded { target: String },
    UploadFailed { target: String, reason: String },
    RenderFailed(String),
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::GeneratedLocally => write!(f, "Generated Locally"),
            RunStatus::Uploaded { target } => write!(f, "Uploaded to {}", target),
            RunStatus::UploadFailed { target, reason } => write!(f, "{} Upload Failed: {}", target, reason),
            RunStatus::RenderFailed(e) => write!(f, "Render Failed: {}", e),
        }
    }
}

/// Result of one successful run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub captions: CaptionPair,
    pub video: RenderedVideo,
    pub status: RunStatus,
    pub published: Option<PublishedVideo>,
}

/// Content, render, publish and record: one short per call
pub struct ShortsFactory {
    engine: ShortsEngine,
    generator: Arc<dyn ContentGenerator>,
    facts: Arc<dyn FactStore>,
    publisher: Option<Arc<dyn Publisher>>,
    output_dir: PathBuf,
}

impl ShortsFactory {
    pub fn new(
        engine: ShortsEngine,
        generator: Arc<dyn ContentGenerator>,
        facts: Arc<dyn FactStore>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            engine,
            generator,
            facts,
            publisher: None,
            output_dir: output_dir.into(),
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn engine(&self) -> &ShortsEngine {
        &self.engine
    }

    pub async fn run_once(&self) -> Result<RunReport> {
        let branding = &self.engine.config().branding;

        let history = self.facts.history();
        info!("📚 {} fact(s) already used", history.len());

        let captions = generate_unique(self.generator.as_ref(), &history, branding.max_content_attempts).await?;
        info!("   Title: {}", captions.title);

        let filename = output_file_name(&branding.output_prefix, Utc::now().timestamp());
        let output = self.output_dir.join(&filename);

        let video = match self.engine.run(&captions.part1, &captions.part2, &output).await {
            Ok(video) => video,
            // Configuration aborts happen before any render; the captions stay unused
            Err(e) if e.is_configuration_fatal() => {
                warn!("Run aborted before rendering, captions not recorded: {}", e);
                return Err(e);
            }
            Err(e) => {
                self.record(&captions, &filename, &RunStatus::RenderFailed(e.to_string()));
                return Err(e);
            }
        };

        let (status, published) = match &self.publisher {
            None => (RunStatus::GeneratedLocally, None),
            Some(publisher) => {
                let target = publisher.name().to_string();
                info!("📤 Uploading {:?} to {}...", video.path, target);
                let request = build_publish_request(&video.path, &captions, branding);
                match publisher.publish(&request).await {
                    Ok(published) => {
                        info!("   ✅ Uploaded as {}", published.id);
                        (RunStatus::Uploaded { target }, Some(published))
                    }
                    Err(e) => {
                        warn!("Upload failed, keeping local file: {}", e);
                        let reason = e.to_string();
                        (RunStatus::UploadFailed { target, reason }, None)
                    }
                }
            }
        };

        self.record(&captions, &filename, &status);
        Ok(RunReport {
            captions,
            video,
            status,
            published,
        })
    }

    fn record(&self, captions: &CaptionPair, filename: &str, status: &RunStatus) {
        let record = FactRecord::new(
            captions.part1.clone(),
            captions.part2.clone(),
            captions.title.clone(),
            filename,
            status.to_string(),
        );
        if let Err(e) = self.facts.append(&record) {
            warn!("Could not record run in fact log: {}", e);
        }
    }
}

/// `{prefix}_{unix_timestamp}.mp4`
pub fn output_file_name(prefix: &str, timestamp: i64) -> String {
    format!("{}_{}.mp4", prefix, timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::content::facts::JsonlFactStore;
    use crate::content::generator::FixedContent;
    use crate::content::publish::PublishRequest;
    use crate::error::{ContentError, PublishError, RenderError};
    use crate::video::probe::StaticProbe;
    use crate::video::{Encoder, FfmpegCommand, HandleTracker, Renderer};
    use crate::ShortsError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::{tempdir, TempDir};

    struct StubEncoder {
        fail: bool,
    }

    impl Encoder for StubEncoder {
        fn encode(&self, command: &FfmpegCommand, _total: f64) -> Result<()> {
            if self.fail {
                return Err(RenderError::encoding_failed("boom", None, None).into());
            }
            std::fs::write(command.output(), b"video")?;
            Ok(())
        }
    }

    struct StubPublisher {
        fail: bool,
        requests: Mutex<Vec<PublishRequest>>,
    }

    #[async_trait]
    impl Publisher for StubPublisher {
        fn name(&self) -> &str {
            "YouTube"
        }

        async fn publish(&self, request: &PublishRequest) -> Result<PublishedVideo> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(PublishError::UploadFailed { reason: "quota".into() }.into());
            }
            Ok(PublishedVideo { id: "abc123".into() })
        }
    }

    fn factory(dir: &TempDir, fail_render: bool, part1: &str) -> (ShortsFactory, Arc<JsonlFactStore>) {
        let bg = dir.path().join("bg");
        let music = dir.path().join("music");
        std::fs::create_dir_all(&bg).unwrap();
        std::fs::create_dir_all(&music).unwrap();
        for name in ["a.mp4", "like_subscribe.mp4"] {
            std::fs::write(bg.join(name), b"x").unwrap();
        }
        std::fs::write(music.join("song.mp3"), b"x").unwrap();

        let probe = StaticProbe::new()
            .with_video(bg.join("a.mp4"), 8.0, (1920, 1080))
            .with_video(bg.join("like_subscribe.mp4"), 3.0, (1080, 1920))
            .with_audio(music.join("song.mp3"), 30.0);

        let mut config = Config::default();
        config.assets.background_dir = bg;
        config.assets.music_dir = music;

        let engine = ShortsEngine::with_parts(
            config,
            Arc::new(probe),
            Renderer::new(Arc::new(StubEncoder { fail: fail_render })),
            HandleTracker::new(),
        );
        let facts = Arc::new(JsonlFactStore::new(dir.path().join("facts.jsonl")));
        let generator = Arc::new(FixedContent::new(CaptionPair::new(part1, "Reveal", "Title").with_tags(["sleep"])));
        let factory = ShortsFactory::new(engine, generator, facts.clone(), dir.path().join("out"));
        (factory, facts)
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("quote", 1700000000), "quote_1700000000.mp4");
    }

    #[tokio::test]
    async fn test_local_run_is_recorded() {
        let dir = tempdir().unwrap();
        let (factory, facts) = factory(&dir, false, "Hook");

        let report = factory.run_once().await.unwrap();
        assert_eq!(report.status, RunStatus::GeneratedLocally);
        assert!(report.video.path.exists());
        assert!(report.published.is_none());

        let records = facts.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, "Generated Locally");
        assert!(records[0].filename.starts_with("quote_"));
        assert_eq!(facts.history(), vec!["Hook"]);
    }

    #[tokio::test]
    async fn test_used_fact_is_exhausted_before_render() {
        let dir = tempdir().unwrap();
        let (factory, facts) = factory(&dir, false, "Hook");
        facts
            .append(&FactRecord::new("Hook", "x", "t", "old.mp4", "Uploaded"))
            .unwrap();

        let err = factory.run_once().await.unwrap_err();
        assert!(matches!(err, ShortsError::Content(ContentError::Exhausted { .. })));
        assert_eq!(facts.records().len(), 1);
        assert!(!factory.engine().config().assets.state_path().exists());
    }

    #[tokio::test]
    async fn test_upload_failure_does_not_fail_run() {
        let dir = tempdir().unwrap();
        let (factory, facts) = factory(&dir, false, "Hook");
        let publisher = Arc::new(StubPublisher {
            fail: true,
            requests: Mutex::new(Vec::new()),
        });
        let factory = factory.with_publisher(publisher.clone());

        let report = factory.run_once().await.unwrap();
        assert!(matches!(report.status, RunStatus::UploadFailed { .. }));
        assert!(facts.records()[0].status.starts_with("YouTube Upload Failed: "));
        assert_eq!(publisher.requests.lock().unwrap()[0].file_path, report.video.path);
    }

    #[tokio::test]
    async fn test_successful_upload() {
        let dir = tempdir().unwrap();
        let (factory, facts) = factory(&dir, false, "Hook");
        let publisher = Arc::new(StubPublisher {
            fail: false,
            requests: Mutex::new(Vec::new()),
        });
        let report = factory.with_publisher(publisher.clone()).run_once().await.unwrap();

        assert_eq!(report.status, RunStatus::Uploaded { target: "YouTube".into() });
        assert_eq!(report.published.unwrap().id, "abc123");
        assert_eq!(facts.records()[0].status, "Uploaded to YouTube");

        // Generated tags are appended after the channel's base tags
        let requests = publisher.requests.lock().unwrap();
        assert_eq!(requests[0].tags.last().map(String::as_str), Some("sleep"));
        assert!(requests[0].tags.len() > 1);
    }

    #[tokio::test]
    async fn test_configuration_abort_leaves_captions_unused() {
        let dir = tempdir().unwrap();
        let (factory, facts) = factory(&dir, false, "Hook");
        let outro = factory.engine().config().assets.outro_path();
        std::fs::remove_file(&outro).unwrap();

        let err = factory.run_once().await.unwrap_err();
        assert!(err.is_configuration_fatal());
        assert!(facts.records().is_empty());

        // Same captions succeed once the outro is back
        std::fs::write(&outro, b"x").unwrap();
        let report = factory.run_once().await.unwrap();
        assert_eq!(report.captions.part1, "Hook");
        assert_eq!(facts.history(), vec!["Hook"]);
    }

    #[tokio::test]
    async fn test_render_failure_is_recorded_and_propagated() {
        let dir = tempdir().unwrap();
        let (factory, facts) = factory(&dir, true, "Hook");

        let err = factory.run_once().await.unwrap_err();
        assert!(matches!(err, ShortsError::Render(_)));
        assert!(facts.records()[0].status.starts_with("Render Failed: "));
        assert_eq!(factory.engine().tracker().open_count(), 0);
    }
}
