use crate::pkg::PkgError;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for nodepin operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown lockfile dialect '{0}' (expected npm or yarn)")]
    UnknownDialect(String),

    #[error("Lockfile not found at {path}")]
    LockfileNotFound { path: PathBuf },

    #[error("Invalid value for {key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },

    #[error("[{}] {}", .0.code(), .0.message())]
    Pkg(#[from] PkgError),
}

impl Error {
    /// Stable SCREAMING_SNAKE code for machine-readable output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO_ERROR",
            Self::UnknownDialect(_) => "UNKNOWN_DIALECT",
            Self::LockfileNotFound { .. } => "LOCKFILE_NOT_FOUND",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
            Self::Pkg(e) => e.code(),
        }
    }
}
