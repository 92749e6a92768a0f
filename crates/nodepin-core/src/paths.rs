use crate::config::Channel;
use crate::version::SCHEMA_VERSION;
use std::path::PathBuf;

/// Environment variable to override the cache directory.
pub const CACHE_DIR_ENV: &str = "NODEPIN_CACHE_DIR";

/// Get the cache directory for nodepin.
///
/// Uses platform-appropriate locations with versioning:
/// - Linux: `$XDG_CACHE_HOME/nodepin/v{N}/{channel}` or `~/.cache/nodepin/v{N}/{channel}`
/// - macOS: `~/Library/Caches/nodepin/v{N}/{channel}`
/// - Windows: `%LOCALAPPDATA%\nodepin\v{N}\{channel}`
///
/// `NODEPIN_CACHE_DIR` replaces the platform base.
#[must_use]
pub fn cache_dir(channel: Channel) -> PathBuf {
    let base = match std::env::var_os(CACHE_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs_next::cache_dir().map_or_else(
            || {
                dirs_next::home_dir().map_or_else(
                    || PathBuf::from(".nodepin-cache"),
                    |p| p.join(".cache").join("nodepin"),
                )
            },
            |p| p.join("nodepin"),
        ),
    };

    base.join(format!("v{SCHEMA_VERSION}"))
        .join(channel.as_str())
}
