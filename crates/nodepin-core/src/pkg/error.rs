//! Package layer error types.

use std::fmt;
use std::io;

/// Package layer error codes.
pub mod codes {
    /// A git dependency string lacks a scheme, path or commit fragment.
    pub const MALFORMED_GIT_REFERENCE: &str = "MALFORMED_GIT_REFERENCE";
    /// An rcfile declares `target` without `runtime` or `disturl`.
    pub const MISSING_CONFIG_KEY: &str = "MISSING_CONFIG_KEY";
    /// A lockfile or rcfile could not be read.
    pub const IO_ERROR: &str = "IO_ERROR";
    /// Retrieving a source over the network failed.
    pub const FETCH_ERROR: &str = "FETCH_ERROR";
    /// An artifact has no declared digest and none can be derived.
    pub const INTEGRITY_ERROR: &str = "INTEGRITY_ERROR";
    /// A lockfile is syntactically invalid or has an unsupported shape.
    pub const LOCKFILE_INVALID: &str = "LOCKFILE_INVALID";
    /// The manifest could not be serialized or written.
    pub const MANIFEST_WRITE_FAILED: &str = "MANIFEST_WRITE_FAILED";
}

/// Package layer error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkgError {
    code: &'static str,
    message: String,
}

impl PkgError {
    /// Create a new error with the given code and message.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether this error must stop the batch.
    ///
    /// Only fetch failures are recoverable; the caller decides whether to
    /// continue past them.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.code != codes::FETCH_ERROR
    }

    /// Create a malformed git reference error.
    #[must_use]
    pub fn malformed_git_reference(version: &str, reason: &str) -> Self {
        Self::new(
            codes::MALFORMED_GIT_REFERENCE,
            format!("Malformed git reference '{version}': {reason}"),
        )
    }

    /// Create a missing config key error.
    #[must_use]
    pub fn missing_config_key(path: &std::path::Path, key: &str) -> Self {
        Self::new(
            codes::MISSING_CONFIG_KEY,
            format!(
                "{} declares 'target' but has no '{key}'",
                path.display()
            ),
        )
    }

    /// Create an I/O error for a path being read or written.
    #[must_use]
    pub fn io(path: &std::path::Path, err: &io::Error) -> Self {
        Self::new(
            codes::IO_ERROR,
            format!("I/O error on {}: {err}", path.display()),
        )
    }

    /// Create a fetch error.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::new(codes::FETCH_ERROR, msg)
    }

    /// Create an integrity error.
    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::new(codes::INTEGRITY_ERROR, msg)
    }

    /// Create a lockfile invalid error.
    pub fn lockfile_invalid(msg: impl Into<String>) -> Self {
        Self::new(codes::LOCKFILE_INVALID, msg)
    }

    /// Create a manifest write error.
    pub fn manifest_write(msg: impl Into<String>) -> Self {
        Self::new(codes::MANIFEST_WRITE_FAILED, msg)
    }
}

impl fmt::Display for PkgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PkgError {}

impl From<io::Error> for PkgError {
    fn from(e: io::Error) -> Self {
        Self::new(codes::IO_ERROR, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        let err = PkgError::malformed_git_reference("github:a/b", "missing commit");
        assert_eq!(err.code(), codes::MALFORMED_GIT_REFERENCE);
        assert!(err.to_string().starts_with("MALFORMED_GIT_REFERENCE: "));
        assert!(err.message().contains("github:a/b"));
    }

    #[test]
    fn test_only_fetch_errors_are_recoverable() {
        assert!(!PkgError::fetch("timeout").is_fatal());
        assert!(PkgError::integrity("no digest").is_fatal());
        assert!(PkgError::lockfile_invalid("bad json").is_fatal());
        assert!(PkgError::malformed_git_reference("x", "y").is_fatal());
        assert!(PkgError::manifest_write("disk full").is_fatal());
    }

    #[test]
    fn test_missing_config_key_names_key() {
        let err = PkgError::missing_config_key(std::path::Path::new("/p/.npmrc"), "disturl");
        assert_eq!(err.code(), codes::MISSING_CONFIG_KEY);
        assert!(err.message().contains("disturl"));
        assert!(err.message().contains(".npmrc"));
    }

    #[test]
    fn test_error_codes_uppercase() {
        let all_codes = [
            codes::MALFORMED_GIT_REFERENCE,
            codes::MISSING_CONFIG_KEY,
            codes::IO_ERROR,
            codes::FETCH_ERROR,
            codes::INTEGRITY_ERROR,
            codes::LOCKFILE_INVALID,
            codes::MANIFEST_WRITE_FAILED,
        ];

        for code in all_codes {
            assert!(
                code.chars().all(|c| c.is_uppercase() || c == '_'),
                "Error code '{code}' should be SCREAMING_SNAKE_CASE"
            );
        }
    }
}
