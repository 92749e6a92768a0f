//! Offline-build manifest entries and the sink that collects them.

use super::error::PkgError;
use super::integrity::Integrity;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

/// One source in the generated manifest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ManifestEntry {
    /// A git checkout pinned to a commit.
    Git {
        url: String,
        commit: String,
        dest: String,
    },
    /// A single downloaded file, checked by `<algorithm>: <hex digest>`.
    File {
        url: String,
        #[serde(flatten)]
        checksum: BTreeMap<String, String>,
        dest: String,
        #[serde(rename = "dest-filename")]
        dest_filename: String,
    },
    /// An archive unpacked into `dest`.
    Archive {
        url: String,
        sha256: String,
        dest: String,
    },
    /// A file with literal contents.
    Inline {
        contents: String,
        dest: String,
        #[serde(rename = "dest-filename")]
        dest_filename: String,
    },
}

impl ManifestEntry {
    /// A `File` entry checked by `integrity`.
    #[must_use]
    pub fn file(url: &str, integrity: &Integrity, dest: &str, dest_filename: &str) -> Self {
        Self::File {
            url: url.to_string(),
            checksum: BTreeMap::from([(integrity.algorithm.clone(), integrity.digest.clone())]),
            dest: dest.to_string(),
            dest_filename: dest_filename.to_string(),
        }
    }

    /// Destination directory.
    #[must_use]
    pub fn dest(&self) -> &str {
        match self {
            Self::Git { dest, .. }
            | Self::File { dest, .. }
            | Self::Archive { dest, .. }
            | Self::Inline { dest, .. } => dest,
        }
    }
}

/// Receives manifest entries from concurrent module provider calls.
pub trait ManifestSink: Send + Sync {
    /// Record one entry.
    ///
    /// # Errors
    /// Returns `MANIFEST_WRITE_FAILED` if the entry cannot be recorded.
    fn add_entry(&self, entry: ManifestEntry) -> Result<(), PkgError>;
}

/// Collects entries in memory and writes them as a JSON array.
#[derive(Debug, Default)]
pub struct JsonManifest {
    entries: Mutex<Vec<ManifestEntry>>,
}

impl JsonManifest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the collected entries, sorted.
    ///
    /// # Errors
    /// Returns `MANIFEST_WRITE_FAILED` if a writer panicked while holding the lock.
    pub fn entries(&self) -> Result<Vec<ManifestEntry>, PkgError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PkgError::manifest_write("Manifest lock poisoned"))?
            .clone();
        entries.sort();
        Ok(entries)
    }

    /// Serialize the sorted entries as pretty JSON.
    ///
    /// # Errors
    /// Returns `MANIFEST_WRITE_FAILED` if serialization fails.
    pub fn to_json(&self) -> Result<String, PkgError> {
        serde_json::to_string_pretty(&self.entries()?)
            .map_err(|e| PkgError::manifest_write(format!("Failed to serialize manifest: {e}")))
    }

    /// Write the manifest to `path` atomically.
    ///
    /// # Errors
    /// Returns `MANIFEST_WRITE_FAILED` if serialization or the write fails.
    pub fn write_to(&self, path: &Path) -> Result<(), PkgError> {
        let mut json = self.to_json()?;
        json.push('\n');
        nodepin_util::fs::atomic_write(path, json.as_bytes()).map_err(|e| {
            PkgError::manifest_write(format!("Failed to write {}: {e}", path.display()))
        })
    }
}

impl ManifestSink for JsonManifest {
    fn add_entry(&self, entry: ManifestEntry) -> Result<(), PkgError> {
        self.entries
            .lock()
            .map_err(|_| PkgError::manifest_write("Manifest lock poisoned"))?
            .push(entry);
        Ok(())
    }
}
