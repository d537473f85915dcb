use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ContentError, Result};

/// The two captions of a short plus its upload title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionPair {
    /// Hook shown during the first half
    pub part1: String,
    /// Reveal shown during the second half
    pub part2: String,
    pub title: String,

    /// Extra upload tags proposed alongside the captions
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CaptionPair {
    pub fn new(part1: impl Into<String>, part2: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            part1: part1.into(),
            part2: part2.into(),
            title: title.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    fn check_usable(&self) -> std::result::Result<(), ContentError> {
        for (name, value) in [("part1", &self.part1), ("part2", &self.part2), ("title", &self.title)] {
            if value.trim().is_empty() {
                return Err(ContentError::Unusable {
                    reason: format!("{} is empty", name),
                });
            }
        }
        Ok(())
    }
}

/// Source of caption content
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Propose captions; `history` holds every `part1` already used
    async fn propose(&self, history: &[String]) -> Result<CaptionPair>;
}

/// Captions supplied up front, e.g. on the command line
#[derive(Debug, Clone)]
pub struct FixedContent {
    pair: CaptionPair,
}

impl FixedContent {
    pub fn new(pair: CaptionPair) -> Self {
        Self { pair }
    }
}

#[async_trait]
impl ContentGenerator for FixedContent {
    async fn propose(&self, _history: &[String]) -> Result<CaptionPair> {
        Ok(self.pair.clone())
    }
}

/// Ask `generator` until it proposes a `part1` not found in `history`
///
/// Generator failures and unusable proposals count as attempts. After
/// `max_attempts` the result is [`ContentError::Exhausted`].
pub async fn generate_unique<G>(generator: &G, history: &[String], max_attempts: usize) -> Result<CaptionPair>
where
    G: ContentGenerator + ?Sized,
{
    for attempt in 1..=max_attempts {
        info!("🧠 Generating content (attempt {}/{})", attempt, max_attempts);

        let pair = match generator.propose(history).await {
            Ok(pair) => pair,
            Err(e) => {
                warn!("Content request failed: {}", e);
                continue;
            }
        };

        if let Err(e) = pair.check_usable() {
            warn!("{}", e);
            continue;
        }

        let candidate = pair.part1.trim();
        if history.iter().any(|used| used.trim() == candidate) {
            warn!("⚠️  Duplicate fact, retrying: {:?}", candidate);
            continue;
        }

        debug!("Accepted content: {:?}", pair.title);
        return Ok(pair);
    }

    Err(ContentError::Exhausted {
        attempts: max_attempts,
    }
    .into())
}
