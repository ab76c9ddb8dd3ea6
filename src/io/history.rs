//! Persisted record of scenes consumed by earlier runs

use crate::types::{BurnError, BurnResult, HistoryEntry, SceneRecord};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Machine-readable history file, relative to the output directory
pub const HISTORY_FILE: &str = "imagelist.json";

/// Plain-text mirror, one file name per line
pub const HISTORY_MIRROR_FILE: &str = "imagelist.txt";

/// Append-only set of history entries keyed by scene file name.
///
/// Insertion order is preserved so the persisted files are stable between runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingHistory {
    entries: Vec<HistoryEntry>,
    keys: HashSet<String>,
}

impl ProcessingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I: IntoIterator<Item = HistoryEntry>>(entries: I) -> Self {
        let mut history = Self::new();
        for entry in entries {
            history.insert(entry);
        }
        history
    }

    /// Add an entry; returns false if the scene was already recorded
    pub fn insert(&mut self, entry: HistoryEntry) -> bool {
        if self.keys.contains(&entry.file_name) {
            return false;
        }
        self.keys.insert(entry.file_name.clone());
        self.entries.push(entry);
        true
    }

    /// Record every scene in `records`; returns the number newly added
    pub fn extend_from_records<'a, I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = &'a SceneRecord>,
    {
        records
            .into_iter()
            .filter(|record| self.insert(HistoryEntry::from(*record)))
            .count()
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.keys.contains(file_name)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Storage backend for the processing history
pub trait HistoryStore {
    /// Load the history; an absent store yields an empty history
    fn load(&self) -> BurnResult<ProcessingHistory>;

    /// Replace the persisted history with `history`
    fn save(&self, history: &ProcessingHistory) -> BurnResult<()>;
}

/// History kept as JSON in the output directory, with a text mirror
#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    dir: PathBuf,
}

impl FileHistoryStore {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    pub fn mirror_path(&self) -> PathBuf {
        self.dir.join(HISTORY_MIRROR_FILE)
    }
}

impl HistoryStore for FileHistoryStore {
    fn load(&self) -> BurnResult<ProcessingHistory> {
        let path = self.history_path();
        if !path.is_file() {
            log::info!("No processing history at {}, starting fresh", path.display());
            return Ok(ProcessingHistory::new());
        }

        let text = std::fs::read_to_string(&path)?;
        let entries: Vec<HistoryEntry> = serde_json::from_str(&text)
            .map_err(|e| BurnError::History(format!("failed to parse {}: {}", path.display(), e)))?;

        let history = ProcessingHistory::from_entries(entries);
        log::info!("Loaded {} previously processed scene(s)", history.len());
        Ok(history)
    }

    fn save(&self, history: &ProcessingHistory) -> BurnResult<()> {
        let path = self.history_path();
        log::debug!("Writing processing history to {}", path.display());

        let json = serde_json::to_string_pretty(history.entries())
            .map_err(|e| BurnError::History(format!("failed to serialise history: {}", e)))?;
        // Replaced via a temporary file and rename
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;

        let mut mirror = std::io::BufWriter::new(std::fs::File::create(self.mirror_path())?);
        for entry in history.entries() {
            writeln!(mirror, "{}", entry.file_name)?;
        }
        mirror.flush()?;

        log::info!("Saved {} history entr(ies)", history.len());
        Ok(())
    }
}
