#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod config;
pub mod error;
pub mod paths;
pub mod pkg;
pub mod version;

pub use config::{Channel, Config, Dialect};
pub use error::Error;
pub use version::{SCHEMA_VERSION, VERSION};

/// Result type alias using the core error type.
pub type Result<T> = std::result::Result<T, Error>;
