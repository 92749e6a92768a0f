//! `.npmrc` / `.yarnrc` parsing.
//!
//! Both files are line oriented: `key value`, `key = value` or
//! `key "quoted value"`. Lines starting with `#` or `;` are comments and lines
//! that do not fit the pattern are skipped without error.
//!
//! On top of the flat mapping this module extracts:
//! - `target`/`runtime`/`disturl` as [`NodeHeaders`]
//! - `//host/:_authToken=TOKEN` directives, with `${ENV_VAR}` expansion

use super::error::PkgError;
use super::headers::NodeHeaders;
use regex_lite::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// npm's rcfile name.
pub const NPMRC_NAME: &str = ".npmrc";

/// yarn v1's rcfile name.
pub const YARNRC_NAME: &str = ".yarnrc";

fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^(\S+)(?:\s+|\s*=\s*)(?:"(.+)"|(\S+))$"#)
            .expect("rcfile line pattern is a valid regex")
    })
}

/// Parsed rcfile values (last occurrence of a key wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RcFile {
    pub values: HashMap<String, String>,
}

/// Parse rcfile text.
#[must_use]
pub fn parse_rcfile_str(content: &str) -> RcFile {
    let pattern = line_pattern();
    let mut values = HashMap::new();

    for line in content.lines() {
        if line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        let Some(caps) = pattern.captures(line) else {
            continue;
        };
        let key = &caps[1];
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str());
        values.insert(key.to_string(), value.to_string());
    }

    RcFile { values }
}

impl RcFile {
    /// Look up a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Native build-header configuration, if this file declares a `target`.
    ///
    /// # Errors
    /// Returns `MISSING_CONFIG_KEY` when `target` is set but `runtime` or
    /// `disturl` is not.
    pub fn node_headers(&self, path: &Path) -> Result<Option<NodeHeaders>, PkgError> {
        let Some(target) = self.get("target") else {
            return Ok(None);
        };
        let runtime = self
            .get("runtime")
            .ok_or_else(|| PkgError::missing_config_key(path, "runtime"))?;
        let disturl = self
            .get("disturl")
            .ok_or_else(|| PkgError::missing_config_key(path, "disturl"))?;

        Ok(Some(NodeHeaders::new(target, runtime, disturl)))
    }

    /// Host (optionally with path) -> auth token, from `//host/:_authToken` keys.
    #[must_use]
    pub fn auth_tokens(&self) -> HashMap<String, String> {
        let mut tokens = HashMap::new();
        for (key, value) in &self.values {
            let Some(host_part) = key
                .strip_prefix("//")
                .and_then(|k| k.strip_suffix(":_authToken"))
            else {
                continue;
            };
            let token = expand_env_vars(value);
            if !token.is_empty() {
                tokens.insert(host_part.trim_end_matches('/').to_string(), token);
            }
        }
        tokens
    }
}

/// Parses one flavor of rcfile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RcFileProvider {
    rcfile_name: &'static str,
}

impl RcFileProvider {
    /// Provider for `.npmrc`.
    pub const NPM: Self = Self {
        rcfile_name: NPMRC_NAME,
    };

    /// Provider for `.yarnrc`.
    pub const YARN: Self = Self {
        rcfile_name: YARNRC_NAME,
    };

    /// File name this provider reads.
    #[must_use]
    pub fn rcfile_name(&self) -> &'static str {
        self.rcfile_name
    }

    /// Where this provider's rcfile lives in `dir`.
    #[must_use]
    pub fn rcfile_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.rcfile_name)
    }

    /// Read and parse an rcfile.
    ///
    /// # Errors
    /// Returns `IO_ERROR` only when the file cannot be read; content never
    /// fails to parse.
    pub fn parse_rcfile(&self, rcfile: &Path) -> Result<RcFile, PkgError> {
        let content = std::fs::read_to_string(rcfile).map_err(|e| PkgError::io(rcfile, &e))?;
        Ok(parse_rcfile_str(&content))
    }

    /// Read an rcfile and extract its node headers configuration.
    ///
    /// # Errors
    /// Returns `IO_ERROR` when unreadable and `MISSING_CONFIG_KEY` when
    /// `target` is set without `runtime` or `disturl`.
    pub fn get_node_headers(&self, rcfile: &Path) -> Result<Option<NodeHeaders>, PkgError> {
        self.parse_rcfile(rcfile)?.node_headers(rcfile)
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
            // Unset variables expand to nothing, as npm does
            if let Ok(val) = std::env::var(&var_name) {
                result.push_str(&val);
            }
        } else {
            result.push(ch);
        }
    }

    result
}
