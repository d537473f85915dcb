//! # Rotation State
//!
//! The background rotation cursor is a single decimal integer in a text file
//! next to the background clips. It is read once per run and overwritten
//! before rendering starts.
//!
//! There is no locking: two runs sharing the same file can read the same
//! cursor and pick the same clip. Runs are expected to be serialized by
//! whatever schedules them.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

/// Cursor value meaning "nothing selected yet"
pub const NO_CURSOR: i64 = -1;

/// Reads and writes the persisted rotation cursor
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persisted cursor, or [`NO_CURSOR`] when the file is absent, empty or garbled
    pub fn read_cursor(&self) -> i64 {
        read_cursor(&self.path)
    }

    /// Overwrite the file with the decimal form of `value`
    pub fn write_cursor(&self, value: i64) -> Result<()> {
        write_cursor(&self.path, value)
    }

    /// Load the rotation state for a listing of `count` assets
    pub fn load(&self, count: usize) -> RotationState {
        RotationState::new(self.read_cursor(), count)
    }

    pub fn save(&self, state: &RotationState) -> Result<()> {
        self.write_cursor(state.cursor)
    }
}

/// Read a cursor file. Never fails: anything unusable reads as [`NO_CURSOR`].
pub fn read_cursor<P: AsRef<Path>>(path: P) -> i64 {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(content) => match content.trim().parse::<i64>() {
            Ok(value) => value,
            Err(_) => {
                debug!("Cursor file {:?} holds {:?}, treating as unset", path, content);
                NO_CURSOR
            }
        },
        Err(e) => {
            debug!("Cursor file {:?} not readable ({}), treating as unset", path, e);
            NO_CURSOR
        }
    }
}

/// Write a cursor file, replacing its entire content
pub fn write_cursor<P: AsRef<Path>>(path: P, value: i64) -> Result<()> {
    std::fs::write(path, value.to_string())?;
    Ok(())
}

/// Position in the sorted background listing.
///
/// `count` comes from the current directory listing and is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationState {
    pub cursor: i64,
    pub count: usize,
}

impl RotationState {
    /// Build a state, discarding a cursor that does not fit the current listing
    pub fn new(cursor: i64, count: usize) -> Self {
        let in_range = cursor >= 0 && (cursor as u64) < count as u64;
        Self {
            cursor: if in_range { cursor } else { NO_CURSOR },
            count,
        }
    }

    /// Index selected after advancing, or `None` for an empty listing
    pub fn next_index(&self) -> Option<usize> {
        if self.count == 0 {
            return None;
        }
        let next = (self.cursor + 1).rem_euclid(self.count as i64);
        Some(next as usize)
    }

    /// Advance the cursor by one slot
    pub fn advance(self) -> Option<Self> {
        self.next_index().map(|index| Self {
            cursor: index as i64,
            count: self.count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_reads_as_unset() {
        let dir = tempdir().unwrap();
        assert_eq!(read_cursor(dir.path().join("last_video_index.txt")), NO_CURSOR);
    }

    #[test]
    fn test_garbage_and_empty_read_as_unset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cursor.txt");

        std::fs::write(&path, "not a number").unwrap();
        assert_eq!(read_cursor(&path), NO_CURSOR);

        std::fs::write(&path, "").unwrap();
        assert_eq!(read_cursor(&path), NO_CURSOR);
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("cursor.txt"));

        store.write_cursor(2).unwrap();
        assert_eq!(store.read_cursor(), 2);
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "2");

        // Overwrite, not append
        store.write_cursor(0).unwrap();
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "0");
    }

    #[test]
    fn test_surrounding_whitespace_is_tolerated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cursor.txt");
        std::fs::write(&path, " 4\n").unwrap();
        assert_eq!(read_cursor(&path), 4);
    }

    #[test]
    fn test_out_of_range_cursor_is_discarded() {
        // Listing shrank from 10 to 3 clips
        let state = RotationState::new(7, 3);
        assert_eq!(state.cursor, NO_CURSOR);
        assert_eq!(state.next_index(), Some(0));

        let state = RotationState::new(-5, 3);
        assert_eq!(state.next_index(), Some(0));
    }

    #[test]
    fn test_advance_wraps() {
        let state = RotationState::new(2, 3).advance().unwrap();
        assert_eq!(state.cursor, 0);

        let state = RotationState::new(0, 3).advance().unwrap();
        assert_eq!(state.cursor, 1);
    }

    #[test]
    fn test_empty_listing_has_no_next() {
        assert_eq!(RotationState::new(NO_CURSOR, 0).next_index(), None);
    }
}
