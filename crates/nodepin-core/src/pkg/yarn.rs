//! yarn v1 lockfile provider.
//!
//! `yarn.lock` is an indented key/value format:
//!
//! ```text
//! # yarn lockfile v1
//!
//! "@babel/code-frame@^7.0.0", "@babel/code-frame@^7.8.3":
//!   version "7.8.3"
//!   resolved "https://registry.yarnpkg.com/@babel/code-frame/-/code-frame-7.8.3.tgz#33e2..."
//!   integrity sha512-...
//!   dependencies:
//!     "@babel/highlight" "^7.8.3"
//! ```
//!
//! Each top-level block is one package; its selectors are every range that
//! resolved to it.

use super::error::PkgError;
use super::git::{is_git_reference, parse_git_source};
use super::integrity::Integrity;
use super::lockfile::{read_lockfile, LockfileProvider};
use super::package::{local_path, LocalSource, Package, PackageSource, RegistrySource};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// yarn's lockfile name.
pub const YARN_LOCKFILE_NAME: &str = "yarn.lock";

/// One top-level block of a yarn lockfile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YarnEntry {
    /// `name@range` selectors, unquoted.
    pub selectors: Vec<String>,
    /// Scalar fields (`version`, `resolved`, `integrity`, ...).
    pub fields: BTreeMap<String, String>,
    /// Nested maps (`dependencies`, `optionalDependencies`, ...).
    pub maps: BTreeMap<String, BTreeMap<String, String>>,
}

impl YarnEntry {
    /// Package name, taken from the first selector.
    ///
    /// The range starts at the first `@` after the leading character, so
    /// scoped names and `npm:` aliases keep their own name.
    #[must_use]
    pub fn name(&self) -> &str {
        let selector = self.selectors.first().map_or("", String::as_str);
        selector
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '@')
            .map_or(selector, |(i, _)| &selector[..i])
    }

    fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// The range part of a selector pointing at a local directory, if any.
    fn local_selector(&self) -> Option<&str> {
        let name_len = self.name().len();
        self.selectors.iter().find_map(|s| {
            let range = s.get(name_len + 1..)?;
            local_path(range).or_else(|| range.strip_prefix("link:"))
        })
    }
}

/// Parse yarn v1 lockfile text.
///
/// # Errors
/// Returns `LOCKFILE_INVALID` for yarn berry (YAML) lockfiles and for lines
/// that fit no block.
pub fn parse_yarn_lock(content: &str) -> Result<Vec<YarnEntry>, PkgError> {
    let mut entries: Vec<YarnEntry> = Vec::new();
    let mut current_map: Option<String> = None;

    for (index, raw) in content.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = raw.trim_end();
        let body = trimmed.trim_start();
        if body.is_empty() || body.starts_with('#') {
            continue;
        }
        let indent = trimmed.len() - body.len();

        if indent == 0 {
            let Some(header) = body.strip_suffix(':') else {
                return Err(invalid_line(line_no, "expected a package header"));
            };
            if header == "__metadata" {
                return Err(PkgError::lockfile_invalid(
                    "yarn berry lockfiles are not supported",
                ));
            }
            entries.push(YarnEntry {
                selectors: header.split(',').map(|s| unquote(s.trim())).collect(),
                ..YarnEntry::default()
            });
            current_map = None;
            continue;
        }

        let Some(entry) = entries.last_mut() else {
            return Err(invalid_line(line_no, "indented line before any package"));
        };

        if indent <= 2 {
            if let Some(map_name) = body.strip_suffix(':') {
                let map_name = unquote(map_name);
                entry.maps.entry(map_name.clone()).or_default();
                current_map = Some(map_name);
            } else {
                let (key, value) = split_pair(body);
                entry.fields.insert(key, value);
                current_map = None;
            }
        } else {
            let Some(map_name) = &current_map else {
                return Err(invalid_line(line_no, "unexpected indentation"));
            };
            let (key, value) = split_pair(body);
            entry
                .maps
                .entry(map_name.clone())
                .or_default()
                .insert(key, value);
        }
    }

    Ok(entries)
}

fn invalid_line(line_no: usize, reason: &str) -> PkgError {
    PkgError::lockfile_invalid(format!("yarn.lock line {line_no}: {reason}"))
}

/// Split `key value`, either side optionally quoted.
fn split_pair(body: &str) -> (String, String) {
    let (key, rest) = if let Some(quoted) = body.strip_prefix('"') {
        match quoted.find('"') {
            Some(end) => (&quoted[..end], &quoted[end + 1..]),
            None => (quoted, ""),
        }
    } else {
        body.split_once(char::is_whitespace).unwrap_or((body, ""))
    };
    (key.to_string(), unquote(rest.trim()))
}

fn unquote(s: &str) -> String {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
        .replace("\\\"", "\"")
}

/// yarn v1 `yarn.lock` provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct YarnLockfileProvider;

impl LockfileProvider for YarnLockfileProvider {
    type Packages = YarnPackages;

    fn process_lockfile(&self, lockfile: &Path) -> Result<YarnPackages, PkgError> {
        let content = read_lockfile(lockfile)?;
        let entries = parse_yarn_lock(&content).map_err(|e| {
            PkgError::lockfile_invalid(format!("{}: {}", lockfile.display(), e.message()))
        })?;
        Ok(YarnPackages {
            lockfile: lockfile.to_path_buf(),
            entries: entries.into_iter(),
        })
    }
}

/// Lazy iterator over a yarn lockfile's packages.
#[derive(Debug)]
pub struct YarnPackages {
    lockfile: PathBuf,
    entries: std::vec::IntoIter<YarnEntry>,
}

impl YarnPackages {
    fn convert(&self, entry: &YarnEntry) -> Result<Package, PkgError> {
        let name = entry.name();
        let version = entry.field("version").ok_or_else(|| {
            PkgError::lockfile_invalid(format!(
                "Entry '{name}' in {} has no version",
                self.lockfile.display()
            ))
        })?;
        let resolved = entry.field("resolved");

        let local = local_path(version)
            .or_else(|| resolved.and_then(local_path))
            .or_else(|| entry.local_selector());

        let source = if let Some(path) = local {
            PackageSource::Local(LocalSource {
                path: path.to_string(),
            })
        } else {
            let resolved = resolved.ok_or_else(|| {
                PkgError::lockfile_invalid(format!(
                    "Entry '{name}' in {} has no resolved URL",
                    self.lockfile.display()
                ))
            })?;
            if is_git_reference(resolved) {
                PackageSource::Git(parse_git_source(resolved, None)?)
            } else {
                let (url, fragment) = match resolved.split_once('#') {
                    Some((url, fragment)) => (url, Some(fragment)),
                    None => (resolved, None),
                };
                let integrity = match (entry.field("integrity"), fragment) {
                    (Some(sri), _) => Some(Integrity::parse(sri)?),
                    (None, Some(sha1)) => Some(Integrity::from_sha1(sha1)?),
                    (None, None) => None,
                };
                PackageSource::Registry(RegistrySource {
                    resolved: url.to_string(),
                    integrity,
                })
            }
        };

        Ok(Package::new(name, version, source, &self.lockfile))
    }
}

impl Iterator for YarnPackages {
    type Item = Result<Package, PkgError>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.next()?;
        Some(self.convert(&entry))
    }
}
