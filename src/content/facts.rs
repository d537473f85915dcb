//! Record of produced shorts, one JSON object per line.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// One produced short
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRecord {
    pub part1: String,
    pub part2: String,
    pub title: String,
    pub filename: String,
    pub status: String,

    /// RFC 3339 timestamp
    #[serde(default)]
    pub recorded_at: String,
}

impl FactRecord {
    pub fn new(
        part1: impl Into<String>,
        part2: impl Into<String>,
        title: impl Into<String>,
        filename: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            part1: part1.into(),
            part2: part2.into(),
            title: title.into(),
            filename: filename.into(),
            status: status.into(),
            recorded_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Append-only store of produced shorts
pub trait FactStore: Send + Sync {
    /// Every `part1` recorded so far. Never fails; an unreadable store is empty.
    fn history(&self) -> Vec<String>;

    fn append(&self, record: &FactRecord) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct JsonlFactStore {
    path: PathBuf,
}

impl JsonlFactStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All readable rows, skipping malformed lines
    pub fn records(&self) -> Vec<FactRecord> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No fact log at {:?} yet", self.path);
                return Vec::new();
            }
            Err(e) => {
                warn!("Could not read fact log {:?}: {}", self.path, e);
                return Vec::new();
            }
        };

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(number, line)| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping malformed fact log line {}: {}", number + 1, e);
                    None
                }
            })
            .collect()
    }
}

impl FactStore for JsonlFactStore {
    fn history(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.part1).collect()
    }

    fn append(&self, record: &FactRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let line = serde_json::to_string(record).map_err(std::io::Error::from)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", line)?;
        debug!("Recorded {:?} as {:?}", record.filename, record.status);
        Ok(())
    }
}
