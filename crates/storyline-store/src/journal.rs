//! Write-ahead journals backing the event store.
//!
//! Every store mutation is described by a [`JournalRecord`] and handed to a
//! [`Journal`] before memory is touched. Reopening a store replays the
//! records in order, which rebuilds the exact same in-memory state.
//!
//! Two journals ship with the crate:
//!
//! - [`MemoryJournal`] keeps records in a `Vec` (tests, hosts that persist
//!   the store some other way).
//! - [`FileJournal`] appends one JSON record per line and syncs after every
//!   write. A torn final line left by a crash is cut off on replay.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use storyline_types::{BranchPosition, Event, Snapshot};
use tracing::{debug, warn};

use crate::error::StoreError;

/// One durable store mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JournalRecord {
    /// A swipe became the active one for its message.
    Activated {
        /// The newly active position.
        position: BranchPosition,
    },
    /// A turn's events were committed.
    Appended {
        /// Position the events belong to.
        position: BranchPosition,
        /// The events, in commit order.
        events: Vec<Event>,
    },
    /// A replay checkpoint was stored.
    Snapshot {
        /// The checkpoint.
        snapshot: Box<Snapshot>,
    },
    /// Events and snapshots from a message onward were dropped.
    Truncated {
        /// First dropped message.
        from_message: u32,
    },
}

/// Durable, ordered storage for journal records.
pub trait Journal {
    /// Persist one record. Must not return before the record is durable.
    fn append(&mut self, record: &JournalRecord) -> Result<(), StoreError>;

    /// Read back every persisted record, oldest first.
    fn replay(&mut self) -> Result<Vec<JournalRecord>, StoreError>;
}

/// Journal that keeps records in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryJournal {
    records: Vec<JournalRecord>,
}

impl MemoryJournal {
    /// An empty journal.
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Records written so far.
    pub fn records(&self) -> &[JournalRecord] {
        &self.records
    }
}

impl Journal for MemoryJournal {
    fn append(&mut self, record: &JournalRecord) -> Result<(), StoreError> {
        self.records.push(record.clone());
        Ok(())
    }

    fn replay(&mut self) -> Result<Vec<JournalRecord>, StoreError> {
        Ok(self.records.clone())
    }
}

/// Journal stored as JSON lines in a single file.
#[derive(Debug)]
pub struct FileJournal {
    path: PathBuf,
    file: File,
}

impl FileJournal {
    /// Open (or create) the journal at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        Ok(Self { path, file })
    }

    /// Location of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Journal for FileJournal {
    fn append(&mut self, record: &JournalRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.sync_data()?;
        Ok(())
    }

    fn replay(&mut self) -> Result<Vec<JournalRecord>, StoreError> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();
        let mut good_len: u64 = 0;
        let mut pending: Option<(usize, serde_json::Error)> = None;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = index.saturating_add(1);
            if let Some((bad_line, source)) = pending.take() {
                // A bad record followed by more data is not a torn tail.
                return Err(StoreError::CorruptJournal {
                    line: bad_line,
                    source,
                });
            }
            if line.trim().is_empty() {
                good_len = good_len.saturating_add(line_len(&line));
                continue;
            }
            match serde_json::from_str::<JournalRecord>(&line) {
                Ok(record) => {
                    records.push(record);
                    good_len = good_len.saturating_add(line_len(&line));
                }
                Err(source) => pending = Some((line_no, source)),
            }
        }

        if let Some((line, error)) = pending {
            warn!(
                path = %self.path.display(),
                line,
                error = %error,
                "dropping torn journal tail"
            );
            self.file.set_len(good_len)?;
            self.file.sync_data()?;
        }

        debug!(path = %self.path.display(), records = records.len(), "journal replayed");
        Ok(records)
    }
}

/// On-disk length of a line including its newline.
fn line_len(line: &str) -> u64 {
    u64::try_from(line.len()).unwrap_or(u64::MAX).saturating_add(1)
}
