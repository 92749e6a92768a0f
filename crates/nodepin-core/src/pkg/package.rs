//! Package records produced by lockfile providers.

use super::git::GitSource;
use super::integrity::Integrity;
use std::path::PathBuf;

/// A tarball fetched from a registry (or any plain HTTP URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrySource {
    /// Tarball URL recorded in the lockfile.
    pub resolved: String,
    /// Declared digest, if the lockfile has one.
    pub integrity: Option<Integrity>,
}

/// A package living on the local filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalSource {
    /// Path relative to the lockfile, without the `file:` prefix.
    pub path: String,
}

/// Where a package is retrieved from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PackageSource {
    Registry(RegistrySource),
    Git(GitSource),
    Local(LocalSource),
}

/// One lockfile entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Package {
    pub name: String,
    pub version: String,
    pub source: PackageSource,
    /// Lockfile this entry came from.
    pub lockfile: PathBuf,
}

impl Package {
    /// Create a package record.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        source: PackageSource,
        lockfile: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            source,
            lockfile: lockfile.into(),
        }
    }

    /// `name@version`, the form used in log lines and reports.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

/// Strip a `file:` prefix, returning the local path if present.
#[must_use]
pub fn local_path(spec: &str) -> Option<&str> {
    spec.strip_prefix("file:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_key() {
        let pkg = Package::new(
            "@types/node",
            "20.0.0",
            PackageSource::Local(LocalSource {
                path: "x".to_string(),
            }),
            "/p/package-lock.json",
        );
        assert_eq!(pkg.key(), "@types/node@20.0.0");
    }

    #[test]
    fn test_local_path() {
        assert_eq!(local_path("file:../shared"), Some("../shared"));
        assert_eq!(local_path("1.0.0"), None);
    }
}
