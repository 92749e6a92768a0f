//! On-disk cache of derived integrity digests.
//!
//! Deriving a digest means downloading a whole tarball, so results are
//! memoized per URL across runs.

use super::error::PkgError;
use super::integrity::Integrity;
use crate::config::Channel;
use crate::paths::cache_dir;
use nodepin_util::fs::{atomic_write, read_optional};
use nodepin_util::hash::short_key;
use std::path::PathBuf;

/// Integrity cache manager.
#[derive(Debug, Clone)]
pub struct IntegrityCache {
    /// Root directory for cached digests.
    root: PathBuf,
}

impl IntegrityCache {
    /// Create the cache for the given channel.
    #[must_use]
    pub fn new(channel: Channel) -> Self {
        Self::at(cache_dir(channel).join("integrity"))
    }

    /// Create a cache rooted at an explicit directory.
    #[must_use]
    pub fn at(root: PathBuf) -> Self {
        Self { root }
    }

    /// File holding the digest for `url`.
    #[must_use]
    pub fn entry_path(&self, url: &str) -> PathBuf {
        self.root.join(short_key(url, 32))
    }

    /// Cached digest for `url`, if any.
    ///
    /// Unreadable or corrupt entries count as misses.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<Integrity> {
        let content = read_optional(&self.entry_path(url)).ok()??;
        let (algorithm, digest) = content.trim().split_once(':')?;
        if algorithm.is_empty() || digest.is_empty() {
            return None;
        }
        Some(Integrity {
            algorithm: algorithm.to_string(),
            digest: digest.to_string(),
        })
    }

    /// Store the digest for `url`.
    ///
    /// # Errors
    /// Returns `IO_ERROR` if the entry cannot be written.
    pub fn put(&self, url: &str, integrity: &Integrity) -> Result<(), PkgError> {
        let path = self.entry_path(url);
        let line = format!("{}:{}\n", integrity.algorithm, integrity.digest);
        atomic_write(&path, line.as_bytes()).map_err(|e| PkgError::io(&path, &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const URL: &str = "https://registry.npmjs.org/a/-/a-1.0.0.tgz";

    #[test]
    fn test_miss_then_hit() {
        let dir = tempdir().unwrap();
        let cache = IntegrityCache::at(dir.path().to_path_buf());
        assert_eq!(cache.get(URL), None);

        let integrity = Integrity::sha256_of(b"tarball");
        cache.put(URL, &integrity).unwrap();
        assert_eq!(cache.get(URL), Some(integrity));
    }

    #[test]
    fn test_entries_keyed_by_url() {
        let dir = tempdir().unwrap();
        let cache = IntegrityCache::at(dir.path().to_path_buf());

        cache.put(URL, &Integrity::sha256_of(b"one")).unwrap();
        assert_eq!(cache.get("https://registry.npmjs.org/b/-/b-1.0.0.tgz"), None);
        assert_ne!(
            cache.entry_path(URL),
            cache.entry_path("https://registry.npmjs.org/b/-/b-1.0.0.tgz")
        );
        assert!(cache.entry_path(URL).starts_with(dir.path()));
    }

    #[test]
    fn test_corrupt_entry_is_miss() {
        let dir = tempdir().unwrap();
        let cache = IntegrityCache::at(dir.path().to_path_buf());
        std::fs::write(cache.entry_path(URL), "garbage").unwrap();
        assert_eq!(cache.get(URL), None);
    }

    #[test]
    fn test_channel_root() {
        let cache = IntegrityCache::new(Channel::Dev);
        let entry = cache.entry_path(URL);
        assert!(entry.parent().unwrap().ends_with("integrity"));
    }
}
