//! Scoped media handles.
//!
//! Every file a run opens is represented by a [`MediaHandle`]. Dropping the
//! handle releases it, so whatever owns the handles (ultimately the render
//! job) releases them on every exit path. The shared [`HandleTracker`] keeps
//! the books so batch callers can assert nothing is left open between runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::error::Result;
use crate::video::probe::MediaProbe;
use crate::video::types::{MediaAsset, MediaInfo};

#[derive(Debug, Default)]
struct TrackerState {
    next_id: u64,
    open: HashMap<u64, PathBuf>,
    opened: usize,
    released: usize,
    double_releases: usize,
}

/// Counts handle acquisitions and releases
#[derive(Debug, Default)]
pub struct HandleTracker {
    state: Mutex<TrackerState>,
}

impl HandleTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn acquire(&self, path: &Path) -> u64 {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.opened += 1;
        state.open.insert(id, path.to_path_buf());
        id
    }

    fn release(&self, id: u64) {
        let mut state = self.lock();
        match state.open.remove(&id) {
            Some(path) => {
                state.released += 1;
                debug!("Released media handle #{} ({:?})", id, path);
            }
            None => {
                state.double_releases += 1;
                warn!("Media handle #{} released twice", id);
            }
        }
    }

    /// Handles acquired so far
    pub fn opened(&self) -> usize {
        self.lock().opened
    }

    /// Handles released so far
    pub fn released(&self) -> usize {
        self.lock().released
    }

    /// Handles currently open
    pub fn open_count(&self) -> usize {
        self.lock().open.len()
    }

    pub fn double_releases(&self) -> usize {
        self.lock().double_releases
    }

    /// Paths of the handles still open
    pub fn outstanding(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.lock().open.values().cloned().collect();
        paths.sort();
        paths
    }
}

/// An opened media file. Released when dropped.
#[derive(Debug)]
pub struct MediaHandle {
    id: u64,
    asset: MediaAsset,
    info: MediaInfo,
    tracker: Arc<HandleTracker>,
}

impl MediaHandle {
    pub fn asset(&self) -> &MediaAsset {
        &self.asset
    }

    pub fn path(&self) -> &Path {
        &self.asset.path
    }

    /// Probed duration in seconds
    pub fn duration(&self) -> f64 {
        self.info.duration
    }

    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.info.resolution
    }

    pub fn info(&self) -> &MediaInfo {
        &self.info
    }
}

impl Drop for MediaHandle {
    fn drop(&mut self) {
        self.tracker.release(self.id);
    }
}

/// Opens assets through a prober and hands out tracked handles
#[derive(Clone)]
pub struct MediaLibrary {
    probe: Arc<dyn MediaProbe>,
    tracker: Arc<HandleTracker>,
}

impl MediaLibrary {
    pub fn new(probe: Arc<dyn MediaProbe>, tracker: Arc<HandleTracker>) -> Self {
        Self { probe, tracker }
    }

    pub fn tracker(&self) -> &Arc<HandleTracker> {
        &self.tracker
    }

    /// Probe `asset` and return a handle carrying its discovered duration
    pub fn open(&self, asset: MediaAsset) -> Result<MediaHandle> {
        let info = self.probe.probe(&asset.path, asset.kind)?;
        let id = self.tracker.acquire(&asset.path);
        debug!(
            "Opened media handle #{} for {:?} ({:.2}s)",
            id, asset.path, info.duration
        );

        Ok(MediaHandle {
            id,
            asset: asset.with_duration(info.duration),
            info,
            tracker: Arc::clone(&self.tracker),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::probe::StaticProbe;
    use crate::video::types::MediaKind;

    fn library() -> MediaLibrary {
        let probe = StaticProbe::new()
            .with_video("bg/a.mp4", 5.0, (1920, 1080))
            .with_audio("music/song.mp3", 30.0);
        MediaLibrary::new(Arc::new(probe), HandleTracker::new())
    }

    #[test]
    fn test_open_fills_duration() {
        let lib = library();
        let handle = lib.open(MediaAsset::new("bg/a.mp4", MediaKind::Video)).unwrap();
        assert_eq!(handle.duration(), 5.0);
        assert_eq!(handle.asset().duration, Some(5.0));
        assert_eq!(handle.resolution(), Some((1920, 1080)));
        assert_eq!(lib.tracker().open_count(), 1);
    }

    #[test]
    fn test_drop_releases_exactly_once() {
        let lib = library();
        {
            let _video = lib.open(MediaAsset::new("bg/a.mp4", MediaKind::Video)).unwrap();
            let _audio = lib.open(MediaAsset::new("music/song.mp3", MediaKind::Audio)).unwrap();
            assert_eq!(lib.tracker().open_count(), 2);
        }
        let tracker = lib.tracker();
        assert_eq!(tracker.opened(), 2);
        assert_eq!(tracker.released(), 2);
        assert_eq!(tracker.open_count(), 0);
        assert_eq!(tracker.double_releases(), 0);
    }

    #[test]
    fn test_failed_open_acquires_nothing() {
        let lib = library();
        let result = lib.open(MediaAsset::new("bg/missing.mp4", MediaKind::Video));
        assert!(result.is_err());
        assert_eq!(lib.tracker().opened(), 0);
    }

    #[test]
    fn test_outstanding_lists_open_paths() {
        let lib = library();
        let handle = lib.open(MediaAsset::new("bg/a.mp4", MediaKind::Video)).unwrap();
        assert_eq!(lib.tracker().outstanding(), vec![PathBuf::from("bg/a.mp4")]);
        drop(handle);
        assert!(lib.tracker().outstanding().is_empty());
    }
}
