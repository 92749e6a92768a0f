//! Module providers: turn packages into manifest entries.
//!
//! A provider is a scoped resource. [`RegistryModuleProvider::open`] acquires
//! the HTTP client and the integrity cache, and dropping the provider
//! releases them on every exit path. One instance is shared by all
//! concurrent `generate_package` calls.
//!
//! Each distinct source is processed once. Packages that share a source wait
//! for that first attempt and get its result, so a failed download is
//! reported for every package that needed it.

use super::cache::IntegrityCache;
use super::error::PkgError;
use super::git::GitSource;
use super::headers::NodeHeaders;
use super::integrity::Integrity;
use super::manifest::{ManifestEntry, ManifestSink};
use super::package::{Package, PackageSource, RegistrySource};
use super::registry::RegistryClient;
use super::special::SpecialSourceResolver;
use nodepin_util::hash::short_key;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// Fetches one package at a time. Safe to call concurrently.
pub trait ModuleProvider: Send + Sync {
    /// Emit whatever the manifest needs for `package`.
    ///
    /// # Errors
    /// `FETCH_ERROR` is recoverable; every other code is fatal for the run.
    fn generate_package(
        &self,
        package: &Package,
    ) -> impl Future<Output = Result<(), PkgError>> + Send;

    /// Emit node headers for native module builds.
    ///
    /// Backends without header support emit nothing.
    fn generate_node_headers(
        &self,
        _headers: &NodeHeaders,
    ) -> impl Future<Output = Result<(), PkgError>> + Send {
        async { Ok(()) }
    }
}

/// Where a dialect's entries land in the build tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Npm,
    Yarn,
}

impl Layout {
    /// Destination prefix shared by every entry.
    #[must_use]
    pub fn root(&self) -> &'static str {
        match self {
            Self::Npm => "offline-cache/npm",
            Self::Yarn => "offline-cache/yarn",
        }
    }

    /// Checkout directory for a git source.
    #[must_use]
    pub fn git_dest(&self, git: &GitSource) -> String {
        let key = short_key(&format!("{}#{}", git.url, git.commit), 16);
        format!("{}/git/{key}", self.root())
    }

    /// Directory holding registry tarballs.
    #[must_use]
    pub fn packages_dest(&self) -> String {
        format!("{}/packages", self.root())
    }

    /// `@scope/name` + `1.0.0` -> `@scope-name-1.0.0.tgz`
    #[must_use]
    pub fn tarball_filename(name: &str, version: &str) -> String {
        format!("{}-{version}.tgz", name.replace('/', "-"))
    }

    /// Directory node-gyp reads headers for `target` from.
    #[must_use]
    pub fn headers_dest(&self, headers: &NodeHeaders) -> String {
        format!("{}/node-gyp/{}", self.root(), headers.target)
    }
}

/// Identity of a fetched source, for dedup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SourceKey {
    Registry(String),
    Git { url: String, commit: String },
}

/// Outcome of the first attempt at a source.
type SourceOutcome = Arc<OnceCell<Result<(), PkgError>>>;

/// Module provider backed by the npm registry.
pub struct RegistryModuleProvider<R> {
    layout: Layout,
    sink: Arc<dyn ManifestSink>,
    special: R,
    client: RegistryClient,
    cache: IntegrityCache,
    sources: Mutex<HashMap<SourceKey, SourceOutcome>>,
}

impl<R: SpecialSourceResolver> RegistryModuleProvider<R> {
    /// Open a provider writing to `sink`.
    #[must_use]
    pub fn open(
        layout: Layout,
        sink: Arc<dyn ManifestSink>,
        special: R,
        client: RegistryClient,
        cache: IntegrityCache,
    ) -> Self {
        Self {
            layout,
            sink,
            special,
            client,
            cache,
            sources: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Run `emit` for the first package with source `key`; later callers
    /// wait for it and share its result.
    async fn once<F, Fut>(&self, key: SourceKey, emit: F) -> Result<(), PkgError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), PkgError>>,
    {
        let outcome = {
            let mut sources = self
                .sources
                .lock()
                .map_err(|_| PkgError::fetch("Source table lock poisoned"))?;
            Arc::clone(sources.entry(key).or_default())
        };
        outcome.get_or_init(emit).await.clone()
    }

    async fn derive_sha256(&self, url: &str) -> Result<Integrity, PkgError> {
        if let Some(cached) = self.cache.get(url) {
            return Ok(cached);
        }
        let bytes = self.client.download(url).await?;
        let integrity = Integrity::sha256_of(&bytes);
        self.cache.put(url, &integrity).map_err(|e| {
            PkgError::fetch(format!(
                "Derived digest for '{url}' could not be cached: {}",
                e.message()
            ))
        })?;
        Ok(integrity)
    }

    async fn generate_registry(
        &self,
        package: &Package,
        registry: &RegistrySource,
    ) -> Result<(), PkgError> {
        if registry.resolved.is_empty() {
            return Err(match registry.integrity {
                None => PkgError::integrity(format!(
                    "No integrity and no tarball URL for {}",
                    package.key()
                )),
                Some(_) => PkgError::fetch(format!("No tarball URL for {}", package.key())),
            });
        }
        self.once(SourceKey::Registry(registry.resolved.clone()), || async {
            let integrity = match &registry.integrity {
                Some(integrity) => integrity.clone(),
                None => self.derive_sha256(&registry.resolved).await?,
            };

            self.sink.add_entry(ManifestEntry::file(
                &registry.resolved,
                &integrity,
                &self.layout.packages_dest(),
                &Layout::tarball_filename(&package.name, &package.version),
            ))
        })
        .await
    }
}

impl<R: SpecialSourceResolver> ModuleProvider for RegistryModuleProvider<R> {
    async fn generate_package(&self, package: &Package) -> Result<(), PkgError> {
        if self.special.resolve(package).await? {
            return Ok(());
        }

        match &package.source {
            PackageSource::Local(_) => Ok(()),
            PackageSource::Git(git) => {
                let key = SourceKey::Git {
                    url: git.url.clone(),
                    commit: git.commit.clone(),
                };
                self.once(key, || async {
                    self.sink.add_entry(ManifestEntry::Git {
                        url: git.url.clone(),
                        commit: git.commit.clone(),
                        dest: self.layout.git_dest(git),
                    })
                })
                .await
            }
            PackageSource::Registry(registry) => self.generate_registry(package, registry).await,
        }
    }

    async fn generate_node_headers(&self, headers: &NodeHeaders) -> Result<(), PkgError> {
        let url = headers.url();
        let integrity = self.derive_sha256(&url).await?;
        let dest = self.layout.headers_dest(headers);

        self.sink.add_entry(ManifestEntry::Archive {
            url,
            sha256: integrity.digest,
            dest: dest.clone(),
        })?;
        self.sink.add_entry(ManifestEntry::Inline {
            contents: headers.install_version().to_string(),
            dest,
            dest_filename: "installVersion".to_string(),
        })
    }
}
