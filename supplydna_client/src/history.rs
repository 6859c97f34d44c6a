//! Recent lookup history
//!
//! A bounded, most-recent-first list of successful lookups. Persistence goes
//! through [`HistoryRepository`] so the workflow never touches storage
//! directly.

use chrono::{DateTime, FixedOffset, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::errors::HistoryError;
use crate::types::ComponentRecord;

/// Maximum number of entries kept
pub const MAX_RECENT: usize = 4;

/// Bangkok has no DST, so a fixed +07:00 offset is exact.
const DISPLAY_OFFSET_SECS: i32 = 7 * 3600;

/// Display class of a history row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusClass {
    #[default]
    #[serde(alias = "")]
    Normal,
    Warn,
    Bad,
}

/// One row of the recent-lookup table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentLookup {
    pub id: String,
    /// Free-text status label
    pub status: String,
    #[serde(default)]
    pub status_class: StatusClass,
    /// Localized timestamp, `DD/MM/YYYY HH:MM`
    pub updated: String,
}

impl RecentLookup {
    /// Entry for a record found at `at`
    pub fn for_record(record: &ComponentRecord, at: DateTime<Utc>) -> Self {
        Self {
            id: record.id.clone(),
            status: record.name.clone(),
            status_class: StatusClass::Normal,
            updated: format_updated(at),
        }
    }
}

/// Format a timestamp the way the dashboard displays it (UTC+07:00)
pub fn format_updated(at: DateTime<Utc>) -> String {
    const FORMAT: &str = "%d/%m/%Y %H:%M";
    match FixedOffset::east_opt(DISPLAY_OFFSET_SECS) {
        Some(offset) => at.with_timezone(&offset).format(FORMAT).to_string(),
        None => at.format(FORMAT).to_string(),
    }
}

/// Bounded most-recent-first history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentHistory {
    entries: Vec<RecentLookup>,
}

impl RecentHistory {
    pub fn new(mut entries: Vec<RecentLookup>) -> Self {
        entries.truncate(MAX_RECENT);
        Self { entries }
    }

    /// Prepend `entry`, dropping the oldest beyond the bound
    pub fn record(&mut self, entry: RecentLookup) {
        self.entries.insert(0, entry);
        self.entries.truncate(MAX_RECENT);
    }

    pub fn entries(&self) -> &[RecentLookup] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Storage for the recent-lookup history
pub trait HistoryRepository: Send + Sync {
    fn load(&self) -> Result<Vec<RecentLookup>, HistoryError>;
    fn save(&self, entries: &[RecentLookup]) -> Result<(), HistoryError>;
}

/// JSON file store, the client-local equivalent of a browser storage key
pub struct FileHistoryRepository {
    path: PathBuf,
}

impl FileHistoryRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryRepository for FileHistoryRepository {
    fn load(&self) -> Result<Vec<RecentLookup>, HistoryError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No history at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<Vec<RecentLookup>>(&raw) {
            Ok(mut entries) => {
                entries.truncate(MAX_RECENT);
                Ok(entries)
            }
            Err(e) => {
                warn!(
                    "Ignoring unreadable history at {}: {}",
                    self.path.display(),
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, entries: &[RecentLookup]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// In-process store
#[derive(Default)]
pub struct MemoryHistoryRepository {
    entries: Mutex<Vec<RecentLookup>>,
}

impl MemoryHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<RecentLookup>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    pub fn snapshot(&self) -> Vec<RecentLookup> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl HistoryRepository for MemoryHistoryRepository {
    fn load(&self) -> Result<Vec<RecentLookup>, HistoryError> {
        Ok(self.snapshot())
    }

    fn save(&self, entries: &[RecentLookup]) -> Result<(), HistoryError> {
        *self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = entries.to_vec();
        Ok(())
    }
}
