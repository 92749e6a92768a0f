/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Schema version for the cache directory.
/// Bump this when changing the integrity cache format.
pub const SCHEMA_VERSION: u32 = 1;
