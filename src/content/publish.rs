use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::BrandingConfig;
use crate::content::generator::CaptionPair;
use crate::error::Result;

/// Who can see an uploaded short
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Unlisted,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
            Visibility::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything an upload needs
#[derive(Debug, Clone, PartialEq)]
pub struct PublishRequest {
    pub file_path: PathBuf,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedVideo {
    pub id: String,
}

/// Upload target for finished shorts
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Platform name used in recorded statuses, e.g. `YouTube`
    fn name(&self) -> &str;

    async fn publish(&self, request: &PublishRequest) -> Result<PublishedVideo>;
}

/// Upload metadata for a rendered short
pub fn build_publish_request(
    video: &Path,
    captions: &CaptionPair,
    branding: &BrandingConfig,
) -> PublishRequest {
    let hashtags = branding.hashtags.trim();
    PublishRequest {
        file_path: video.to_path_buf(),
        title: format!("{} {}", captions.title.trim(), hashtags),
        description: format!("{} {}\n\n{}", captions.part1.trim(), captions.part2.trim(), hashtags),
        tags: merge_tags(&branding.base_tags, &captions.tags),
        visibility: branding.visibility,
    }
}

/// Base tags followed by new extras, ignoring case when de-duplicating
pub fn merge_tags(base: &[String], extra: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    base.iter()
        .chain(extra)
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wording() {
        let branding = BrandingConfig::default();
        let captions = CaptionPair::new("Dogs dream.", "Just like us!", "Do dogs dream?");
        let req = build_publish_request(Path::new("out/quote_1.mp4"), &captions, &branding);

        assert_eq!(req.title, "Do dogs dream? #shorts #dogfacts #pets #dog #cuteanimals");
        assert_eq!(
            req.description,
            "Dogs dream. Just like us!\n\n#shorts #dogfacts #pets #dog #cuteanimals"
        );
        assert_eq!(req.tags, branding.base_tags);
        assert_eq!(req.visibility, Visibility::Public);
        assert_eq!(req.file_path, PathBuf::from("out/quote_1.mp4"));
    }

    #[test]
    fn test_generated_tags_follow_base_tags() {
        let branding = BrandingConfig::default();
        let captions = CaptionPair::new("a", "b", "t").with_tags(["Sleep", "SHORTS", "naps"]);
        let req = build_publish_request(Path::new("v.mp4"), &captions, &branding);

        assert_eq!(req.tags.len(), branding.base_tags.len() + 2);
        assert_eq!(&req.tags[..branding.base_tags.len()], &branding.base_tags[..]);
        assert_eq!(&req.tags[branding.base_tags.len()..], &["Sleep", "naps"]);
    }

    #[test]
    fn test_merge_tags_keeps_first_seen_order() {
        let base = vec!["Dog Facts".to_string(), "shorts".to_string()];
        let extra = vec!["SHORTS".to_string(), "sleep".to_string(), "dog facts".to_string(), " ".to_string()];
        assert_eq!(merge_tags(&base, &extra), vec!["Dog Facts", "shorts", "sleep"]);
    }

    #[test]
    fn test_visibility_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            visibility: Visibility,
        }
        let w: Wrapper = toml::from_str("visibility = \"unlisted\"").unwrap();
        assert_eq!(w.visibility, Visibility::Unlisted);
        assert_eq!(Visibility::Private.to_string(), "private");
    }
}
