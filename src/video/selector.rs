use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use crate::config::AssetsConfig;
use crate::error::{AssetError, Result};
use crate::state::StateStore;
use crate::video::types::{MediaAsset, MediaKind};

/// Picks the background clip and the music track for a run
///
/// Backgrounds rotate deterministically: the listing is sorted by file name
/// and the persisted cursor advances one slot per run. Music is drawn at
/// random and leaves no state behind.
#[derive(Debug, Clone)]
pub struct AssetSelector {
    video_extensions: Vec<String>,
    audio_extensions: Vec<String>,
    state: StateStore,
}

impl AssetSelector {
    pub fn new(video_extensions: Vec<String>, audio_extensions: Vec<String>, state: StateStore) -> Self {
        Self {
            video_extensions,
            audio_extensions,
            state,
        }
    }

    pub fn from_config(assets: &AssetsConfig) -> Self {
        Self::new(
            assets.video_extensions.clone(),
            assets.audio_extensions.clone(),
            StateStore::new(assets.state_path()),
        )
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Candidate backgrounds in rotation order
    pub fn list_backgrounds(&self, folder: &Path, excluded_name: &str) -> Result<Vec<MediaAsset>> {
        list_media(folder, &self.video_extensions, MediaKind::Video, Some(excluded_name))
    }

    /// Candidate music tracks
    pub fn list_music(&self, folder: &Path) -> Result<Vec<MediaAsset>> {
        list_media(folder, &self.audio_extensions, MediaKind::Audio, None)
    }

    /// Pick the next background in rotation and persist the new cursor
    ///
    /// The cursor is written before this returns, so a later failure in the
    /// run still consumes the slot.
    pub fn select_background(&self, folder: &Path, excluded_name: &str) -> Result<(MediaAsset, i64)> {
        let backgrounds = self.list_backgrounds(folder, excluded_name)?;

        let previous = self.state.load(backgrounds.len());
        let next = previous.advance().ok_or_else(|| AssetError::NoAssets {
            kind: MediaKind::Video.to_string(),
            path: folder.to_path_buf(),
        })?;

        self.state.save(&next)?;

        let index = next.cursor as usize;
        let chosen = backgrounds[index].clone();
        info!(
            "🔄 Sequentially selected video #{} of {}: {:?}",
            index + 1,
            next.count,
            chosen.path
        );
        debug!("Rotation cursor {} -> {}", previous.cursor, next.cursor);

        Ok((chosen, next.cursor))
    }

    /// Pick a music track uniformly at random
    pub fn select_music(&self, folder: &Path) -> Result<MediaAsset> {
        self.select_music_with(folder, &mut rand::thread_rng())
    }

    pub fn select_music_with<R: Rng + ?Sized>(&self, folder: &Path, rng: &mut R) -> Result<MediaAsset> {
        let tracks = self.list_music(folder)?;
        let chosen = tracks
            .choose(rng)
            .cloned()
            .ok_or_else(|| AssetError::NoAssets {
                kind: MediaKind::Audio.to_string(),
                path: folder.to_path_buf(),
            })?;

        info!("🎵 Using music: {:?}", chosen.path);
        Ok(chosen)
    }
}

/// List matching files in `folder`, sorted by file name
fn list_media(
    folder: &Path,
    extensions: &[String],
    kind: MediaKind,
    excluded_name: Option<&str>,
) -> Result<Vec<MediaAsset>> {
    let entries = std::fs::read_dir(folder).map_err(|_| AssetError::DirectoryUnreadable {
        path: folder.to_path_buf(),
    })?;

    let mut assets = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || is_hidden_file(&path) {
            continue;
        }

        let name = path.file_name().and_then(|n| n.to_str());
        if excluded_name.is_some() && name == excluded_name {
            continue;
        }

        if MediaAsset::has_extension(&path, extensions) {
            assets.push(MediaAsset::new(path, kind));
        }
    }

    if assets.is_empty() {
        return Err(AssetError::NoAssets {
            kind: kind.to_string(),
            path: folder.to_path_buf(),
        }
        .into());
    }

    assets.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    debug!("Found {} {} assets in {:?}", assets.len(), kind, folder);
    Ok(assets)
}

fn is_hidden_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::NO_CURSOR;
    use crate::ShortsError;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use tempfile::{tempdir, TempDir};

    const OUTRO: &str = "like_subscribe.mp4";

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    fn setup(names: &[&str]) -> (TempDir, AssetSelector) {
        let dir = tempdir().unwrap();
        for name in names {
            touch(dir.path(), name);
        }
        let selector = AssetSelector::new(
            vec!["mp4".to_string(), "mov".to_string()],
            vec!["mp3".to_string()],
            StateStore::new(dir.path().join("last_video_index.txt")),
        );
        (dir, selector)
    }

    fn picked(selector: &AssetSelector, dir: &Path) -> String {
        let (asset, _) = selector.select_background(dir, OUTRO).unwrap();
        asset.file_name().unwrap().to_string()
    }

    #[test]
    fn test_listing_is_sorted_and_excludes_outro() {
        let (dir, selector) = setup(&["c.mp4", "a.mp4", OUTRO, "b.mov", "notes.txt", ".hidden.mp4"]);
        let names: Vec<String> = selector
            .list_backgrounds(dir.path(), OUTRO)
            .unwrap()
            .iter()
            .map(|a| a.file_name().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.mp4", "b.mov", "c.mp4"]);
    }

    #[test]
    fn test_cyclic_rotation_from_absent_state() {
        let (dir, selector) = setup(&["a.mp4", "b.mp4", "c.mp4", OUTRO]);
        let expected = ["a.mp4", "b.mp4", "c.mp4"];

        for n in 0..7 {
            assert_eq!(picked(&selector, dir.path()), expected[n % 3]);
            assert_eq!(selector.state().read_cursor(), (n % 3) as i64);
        }
    }

    #[test]
    fn test_cursor_persisted_before_return() {
        let (dir, selector) = setup(&["a.mp4", "b.mp4", "c.mp4"]);
        let (asset, cursor) = selector.select_background(dir.path(), OUTRO).unwrap();
        assert_eq!(asset.file_name(), Some("a.mp4"));
        assert_eq!(cursor, 0);
        assert_eq!(std::fs::read_to_string(dir.path().join("last_video_index.txt")).unwrap(), "0");

        let (asset, cursor) = selector.select_background(dir.path(), OUTRO).unwrap();
        assert_eq!(asset.file_name(), Some("b.mp4"));
        assert_eq!(cursor, 1);
    }

    #[test]
    fn test_garbled_state_starts_from_first() {
        let (dir, selector) = setup(&["a.mp4", "b.mp4"]);
        std::fs::write(dir.path().join("last_video_index.txt"), "oops").unwrap();
        assert_eq!(picked(&selector, dir.path()), "a.mp4");
    }

    #[test]
    fn test_out_of_range_state_starts_from_first() {
        let (dir, selector) = setup(&["a.mp4", "b.mp4"]);
        std::fs::write(dir.path().join("last_video_index.txt"), "9").unwrap();
        assert_eq!(picked(&selector, dir.path()), "a.mp4");
    }

    #[test]
    fn test_empty_background_dir_leaves_state_untouched() {
        let (dir, selector) = setup(&[OUTRO, "song.mp3"]);
        let err = selector.select_background(dir.path(), OUTRO).unwrap_err();
        assert!(matches!(err, ShortsError::Asset(AssetError::NoAssets { .. })));
        assert!(err.is_configuration_fatal());
        assert_eq!(selector.state().read_cursor(), NO_CURSOR);
        assert!(!dir.path().join("last_video_index.txt").exists());
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let (dir, selector) = setup(&[]);
        let err = selector
            .select_background(&dir.path().join("nope"), OUTRO)
            .unwrap_err();
        assert!(err.is_configuration_fatal());
    }

    #[test]
    fn test_music_selection_is_random_but_valid() {
        let (dir, selector) = setup(&["one.mp3", "two.mp3", "three.MP3", "clip.mp4"]);
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..20 {
            let track = selector.select_music_with(dir.path(), &mut rng).unwrap();
            assert_eq!(track.kind, MediaKind::Audio);
            assert!(track.extension().unwrap().eq_ignore_ascii_case("mp3"));
        }
        // No rotation state for music
        assert!(!dir.path().join("last_video_index.txt").exists());
    }

    #[test]
    fn test_empty_music_dir() {
        let (dir, selector) = setup(&["a.mp4"]);
        let err = selector.select_music(dir.path()).unwrap_err();
        assert!(matches!(err, ShortsError::Asset(AssetError::NoAssets { .. })));
    }
}
