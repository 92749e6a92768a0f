//! Source resolution for npm and yarn lockfiles.
//!
//! Provides:
//! - Git dependency normalization to a fetch URL plus commit
//! - rcfile parsing (`.npmrc`, `.yarnrc`) for node headers and registry auth
//! - Lockfile providers for npm (v1-v3) and yarn v1
//! - Module providers that turn packages into manifest entries
//! - Provider factories wiring a dialect together
//! - A bounded-concurrency driver over a module provider

pub mod cache;
pub mod error;
pub mod factory;
pub mod generate;
pub mod git;
pub mod headers;
pub mod integrity;
pub mod lockfile;
pub mod manifest;
pub mod module;
pub mod package;
pub mod rcfile;
pub mod registry;
pub mod special;
pub mod yarn;

pub use cache::IntegrityCache;
pub use error::{codes as pkg_codes, PkgError};
pub use factory::{NpmProviderFactory, ProviderFactory, ProviderOptions, YarnProviderFactory};
pub use generate::{generate_packages, GenerateReport, PackageFailure, MAX_CONCURRENT_FETCHES};
pub use git::{is_git_reference, parse_git_source, GitSource};
pub use headers::NodeHeaders;
pub use integrity::Integrity;
pub use lockfile::{LockfileProvider, NpmLockfileProvider, NPM_LOCKFILE_NAME};
pub use manifest::{JsonManifest, ManifestEntry, ManifestSink};
pub use module::{Layout, ModuleProvider, RegistryModuleProvider};
pub use package::{LocalSource, Package, PackageSource, RegistrySource};
pub use rcfile::{parse_rcfile_str, RcFile, RcFileProvider, NPMRC_NAME, YARNRC_NAME};
pub use registry::{RegistryClient, DEFAULT_REGISTRY};
pub use special::{NoSpecialSources, SpecialSourceResolver};
pub use yarn::{parse_yarn_lock, YarnEntry, YarnLockfileProvider, YARN_LOCKFILE_NAME};
