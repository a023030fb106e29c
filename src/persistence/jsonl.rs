//! JSON Lines document store.
//!
//! Each collection is one file, one document per line:
//!
//! ```text
//! <root>/<db>/<collection>.jsonl
//! ```
//!
//! Every insert is fsynced before returning. A failed insert is rolled back
//! to the previous length. An unterminated final line left by a crash
//! mid-write is truncated when the store is opened. Unreadable lines further
//! up are never removed: they are logged and skipped, so records written after
//! them are kept.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use super::document::{DocumentFilter, StoredDocument};
use super::store::{DocumentStore, Result, StoreError};

/// File extension of collection files.
const EXTENSION: &str = "jsonl";

/// A collection backed by a JSON Lines file.
pub struct JsonlStore {
    /// Append handle. Also serializes readers against writers.
    file: Mutex<File>,
    path: PathBuf,
}

impl JsonlStore {
    /// Opens `<root>/<db>/<collection>.jsonl`, creating it if needed.
    pub fn open_collection(root: impl AsRef<Path>, db: &str, collection: &str) -> Result<Self> {
        let path = root
            .as_ref()
            .join(db)
            .join(format!("{}.{}", collection, EXTENSION));
        Self::open(path)
    }

    /// Opens a collection file, creating it and its parent directory if needed.
    ///
    /// An unterminated final line is truncated away before the file is opened
    /// for appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
        let created = !path.exists();
        if created && let Some(parent) = parent {
            fs::create_dir_all(parent)?;
        }
        if !created {
            truncate_unterminated_tail(&path)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)?;

        if created && let Some(parent) = parent {
            fsync_dir(parent)?;
        }

        debug!(path = %path.display(), created, "Opened collection file");
        Ok(JsonlStore {
            file: Mutex::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentStore for JsonlStore {
    fn insert(&self, doc: &StoredDocument) -> Result<()> {
        let mut line = serde_json::to_vec(doc)?;
        line.push(b'\n');

        let mut file = self.file.lock().map_err(|_| StoreError::Poisoned)?;
        let len = file.metadata()?.len();
        if !ends_with_newline(&mut file, len)? {
            warn!(path = %self.path.display(), "Terminating torn line before append");
            line.insert(0, b'\n');
        }

        if let Err(e) = file.write_all(&line).and_then(|()| file.sync_all()) {
            if let Err(rollback) = file.set_len(len).and_then(|()| file.sync_all()) {
                warn!(
                    path = %self.path.display(),
                    error = %rollback,
                    "Failed to roll back partial insert"
                );
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn find(&self, filter: &DocumentFilter) -> Result<Vec<StoredDocument>> {
        // Held so no insert is half-written while we read.
        let _guard = self.file.lock().map_err(|_| StoreError::Poisoned)?;

        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut docs = Vec::new();
        let mut line = Vec::new();
        let mut line_no = 0usize;
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            line_no += 1;
            if line.trim_ascii().is_empty() {
                continue;
            }
            match serde_json::from_slice::<StoredDocument>(&line) {
                Ok(doc) if filter.matches(&doc) => docs.push(doc),
                Ok(_) => {}
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = line_no,
                    error = %e,
                    "Skipping unreadable record"
                ),
            }
        }
        Ok(docs)
    }
}

/// True for an empty file or one whose last byte is a newline.
fn ends_with_newline(file: &mut File, len: u64) -> io::Result<bool> {
    if len == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Truncates the bytes after the last newline, if any.
///
/// Terminated lines are never removed, even unreadable ones. Returns the
/// number of bytes removed.
fn truncate_unterminated_tail(path: &Path) -> Result<u64> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let mut terminated_end = 0u64;
    let mut unreadable = 0usize;
    let mut line = Vec::new();
    loop {
        line.clear();
        let bytes_read = reader.read_until(b'\n', &mut line)?;
        if bytes_read == 0 || line.last() != Some(&b'\n') {
            break;
        }
        terminated_end += bytes_read as u64;

        if !line.trim_ascii().is_empty()
            && serde_json::from_slice::<StoredDocument>(&line).is_err()
        {
            unreadable += 1;
        }
    }

    if unreadable > 0 {
        warn!(
            path = %path.display(),
            unreadable,
            "Collection file has unreadable records, keeping them in place"
        );
    }

    let removed = file_len - terminated_end;
    if removed > 0 {
        warn!(
            path = %path.display(),
            removed_bytes = removed,
            "Truncating partial record at end of collection file"
        );
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_len(terminated_end)?;
        file.sync_all()?;
    }
    Ok(removed)
}

/// Syncs a directory so a newly created file's entry survives power loss.
fn fsync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}
