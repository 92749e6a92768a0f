//! Lockfile providers.
//!
//! A [`LockfileProvider`] turns one lockfile dialect into a lazy sequence of
//! [`Package`] records. Opening the lockfile reads and parses it up front;
//! individual entries are converted as the sequence is consumed, so a
//! malformed git reference surfaces as an `Err` item. Collect with
//! `Result<Vec<_>, _>` to get all-or-nothing semantics: a partial dependency
//! graph is never safe to build from.
//!
//! This module carries the npm dialect (`package-lock.json` /
//! `npm-shrinkwrap.json`, lockfile versions 1 through 3).

use super::error::PkgError;
use super::git::{is_git_reference, parse_git_source};
use super::integrity::Integrity;
use super::package::{local_path, LocalSource, Package, PackageSource, RegistrySource};
use super::registry::default_tarball_url;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// npm's lockfile name.
pub const NPM_LOCKFILE_NAME: &str = "package-lock.json";

/// Highest `lockfileVersion` understood.
pub const MAX_NPM_LOCKFILE_VERSION: u64 = 3;

/// Produces packages from one lockfile dialect.
pub trait LockfileProvider {
    /// Lazy, single-pass package sequence.
    type Packages: Iterator<Item = Result<Package, PkgError>>;

    /// Open a lockfile.
    ///
    /// # Errors
    /// Returns `IO_ERROR` if the file cannot be read and `LOCKFILE_INVALID`
    /// if it cannot be parsed.
    fn process_lockfile(&self, lockfile: &Path) -> Result<Self::Packages, PkgError>;
}

/// Read a lockfile to a string.
pub(crate) fn read_lockfile(path: &Path) -> Result<String, PkgError> {
    std::fs::read_to_string(path).map_err(|e| PkgError::io(path, &e))
}

/// npm `package-lock.json` provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct NpmLockfileProvider {
    no_devel: bool,
}

impl NpmLockfileProvider {
    #[must_use]
    pub fn new(no_devel: bool) -> Self {
        Self { no_devel }
    }
}

impl LockfileProvider for NpmLockfileProvider {
    type Packages = NpmPackages;

    fn process_lockfile(&self, lockfile: &Path) -> Result<NpmPackages, PkgError> {
        let content = read_lockfile(lockfile)?;
        let root: Value = serde_json::from_str(&content).map_err(|e| {
            PkgError::lockfile_invalid(format!(
                "Invalid lockfile JSON in {}: {e}",
                lockfile.display()
            ))
        })?;
        NpmPackages::new(lockfile, root, self.no_devel)
    }
}

/// How an npm lockfile lays out its entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// v1: `dependencies` tree keyed by package name.
    Nested,
    /// v2/v3: flat `packages` map keyed by install path.
    Flat,
}

#[derive(Debug)]
struct Entry {
    key: String,
    info: Value,
}

/// Lazy iterator over an npm lockfile's packages.
#[derive(Debug)]
pub struct NpmPackages {
    lockfile: PathBuf,
    no_devel: bool,
    shape: Shape,
    // Stack; the next entry to visit is at the end.
    pending: Vec<Entry>,
}

impl NpmPackages {
    fn new(lockfile: &Path, mut root: Value, no_devel: bool) -> Result<Self, PkgError> {
        let version = root.get("lockfileVersion").and_then(Value::as_u64);
        if let Some(v) = version {
            if v == 0 || v > MAX_NPM_LOCKFILE_VERSION {
                return Err(PkgError::lockfile_invalid(format!(
                    "Unsupported lockfileVersion {v} in {}",
                    lockfile.display()
                )));
            }
        }

        let (shape, table) = if version.unwrap_or(1) >= 2 || root.get("packages").is_some() {
            (Shape::Flat, root.get_mut("packages").map(Value::take))
        } else {
            (Shape::Nested, root.get_mut("dependencies").map(Value::take))
        };

        let mut pending = match table {
            Some(Value::Object(map)) => into_entries(map),
            None | Some(Value::Null) => Vec::new(),
            Some(_) => {
                return Err(PkgError::lockfile_invalid(format!(
                    "Package table in {} is not an object",
                    lockfile.display()
                )))
            }
        };
        if shape == Shape::Flat {
            pending.retain(|e| !e.key.is_empty());
        }

        Ok(Self {
            lockfile: lockfile.to_path_buf(),
            no_devel,
            shape,
            pending,
        })
    }

    fn is_skipped(&self, info: &Value) -> bool {
        let flag = |name: &str| info.get(name).and_then(Value::as_bool).unwrap_or(false);
        flag("bundled") || flag("inBundle") || (self.no_devel && flag("dev"))
    }

    fn convert_nested(&self, name: &str, info: &Value) -> Result<Package, PkgError> {
        let version = required_str(info, "version", name, &self.lockfile)?;
        let from = info.get("from").and_then(Value::as_str);

        let source = if let Some(path) = local_path(version) {
            PackageSource::Local(LocalSource {
                path: path.to_string(),
            })
        } else if is_git_reference(version) {
            PackageSource::Git(parse_git_source(version, from)?)
        } else if version.starts_with("http://") || version.starts_with("https://") {
            registry_source(version, info)?
        } else {
            let resolved = info
                .get("resolved")
                .and_then(Value::as_str)
                .map_or_else(|| default_tarball_url(name, version), str::to_string);
            registry_source(&resolved, info)?
        };

        Ok(Package::new(name, version, source, &self.lockfile))
    }

    fn convert_flat(&self, install_path: &str, info: &Value) -> Result<Package, PkgError> {
        let name = info
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_else(|| package_name_from_path(install_path));
        let version = info.get("version").and_then(Value::as_str).unwrap_or("");
        let resolved = info.get("resolved").and_then(Value::as_str);

        // Workspace members live outside node_modules
        if !install_path.contains("node_modules/") {
            return Ok(Package::new(
                name,
                version,
                PackageSource::Local(LocalSource {
                    path: install_path.to_string(),
                }),
                &self.lockfile,
            ));
        }

        let source = match resolved {
            Some(r) if is_git_reference(r) => PackageSource::Git(parse_git_source(r, None)?),
            Some(r) => match local_path(r) {
                Some(path) => PackageSource::Local(LocalSource {
                    path: path.to_string(),
                }),
                None => registry_source(r, info)?,
            },
            None => {
                if version.is_empty() {
                    return Err(PkgError::lockfile_invalid(format!(
                        "Entry '{install_path}' in {} has neither version nor resolved",
                        self.lockfile.display()
                    )));
                }
                registry_source(&default_tarball_url(name, version), info)?
            }
        };

        Ok(Package::new(name, version, source, &self.lockfile))
    }
}

impl Iterator for NpmPackages {
    type Item = Result<Package, PkgError>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(Entry { key, mut info }) = self.pending.pop() {
            if self.is_skipped(&info) {
                continue;
            }

            match self.shape {
                Shape::Nested => {
                    if let Some(Value::Object(children)) =
                        info.get_mut("dependencies").map(Value::take)
                    {
                        self.pending.extend(into_entries(children));
                    }
                    return Some(self.convert_nested(&key, &info));
                }
                Shape::Flat => {
                    if info.get("link").and_then(Value::as_bool).unwrap_or(false) {
                        continue;
                    }
                    return Some(self.convert_flat(&key, &info));
                }
            }
        }
        None
    }
}

/// Map entries in stack order (first entry popped first).
fn into_entries(map: Map<String, Value>) -> Vec<Entry> {
    let mut entries: Vec<Entry> = map
        .into_iter()
        .map(|(key, info)| Entry { key, info })
        .collect();
    entries.reverse();
    entries
}

fn required_str<'a>(
    info: &'a Value,
    field: &str,
    name: &str,
    lockfile: &Path,
) -> Result<&'a str, PkgError> {
    info.get(field).and_then(Value::as_str).ok_or_else(|| {
        PkgError::lockfile_invalid(format!(
            "Entry '{name}' in {} has no '{field}'",
            lockfile.display()
        ))
    })
}

fn registry_source(resolved: &str, info: &Value) -> Result<PackageSource, PkgError> {
    let integrity = info
        .get("integrity")
        .and_then(Value::as_str)
        .map(Integrity::parse)
        .transpose()?;
    Ok(PackageSource::Registry(RegistrySource {
        resolved: resolved.to_string(),
        integrity,
    }))
}

/// `node_modules/a/node_modules/@s/b` -> `@s/b`
fn package_name_from_path(install_path: &str) -> &str {
    install_path
        .rsplit_once("node_modules/")
        .map_or(install_path, |(_, name)| name)
}
