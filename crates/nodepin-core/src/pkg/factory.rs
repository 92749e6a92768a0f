//! Provider factories: one composition root per lockfile dialect.

use super::cache::IntegrityCache;
use super::error::PkgError;
use super::lockfile::{LockfileProvider, NpmLockfileProvider};
use super::manifest::ManifestSink;
use super::module::{Layout, ModuleProvider, RegistryModuleProvider};
use super::rcfile::{RcFile, RcFileProvider};
use super::registry::RegistryClient;
use super::special::SpecialSourceResolver;
use super::yarn::YarnLockfileProvider;
use crate::config::Channel;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Settings shared by every provider a factory creates.
#[derive(Debug, Clone, Default)]
pub struct ProviderOptions {
    /// Skip development-only dependencies.
    pub no_devel: bool,
    /// Channel for the integrity cache location.
    pub channel: Channel,
    /// Overrides the channel's integrity cache directory.
    pub cache_root: Option<PathBuf>,
    /// `host[/path]` -> bearer token, from rcfiles.
    pub auth_tokens: HashMap<String, String>,
}

impl ProviderOptions {
    #[must_use]
    pub fn with_no_devel(mut self, no_devel: bool) -> Self {
        self.no_devel = no_devel;
        self
    }

    #[must_use]
    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    #[must_use]
    pub fn with_cache_root(mut self, root: PathBuf) -> Self {
        self.cache_root = Some(root);
        self
    }

    /// Take auth tokens from a parsed rcfile. Tokens already set win.
    #[must_use]
    pub fn with_rcfile(mut self, rcfile: &RcFile) -> Self {
        for (host, token) in rcfile.auth_tokens() {
            self.auth_tokens.entry(host).or_insert(token);
        }
        self
    }

    fn integrity_cache(&self) -> IntegrityCache {
        self.cache_root
            .clone()
            .map_or_else(|| IntegrityCache::new(self.channel), IntegrityCache::at)
    }

    fn open_registry_provider<R: SpecialSourceResolver>(
        &self,
        layout: Layout,
        sink: Arc<dyn ManifestSink>,
        special: R,
    ) -> Result<RegistryModuleProvider<R>, PkgError> {
        let client = RegistryClient::new(self.auth_tokens.clone())?;
        Ok(RegistryModuleProvider::open(
            layout,
            sink,
            special,
            client,
            self.integrity_cache(),
        ))
    }
}

/// Builds the providers for one dialect.
pub trait ProviderFactory {
    type Lockfile: LockfileProvider;
    type Modules<R: SpecialSourceResolver>: ModuleProvider;

    fn create_lockfile_provider(&self) -> Self::Lockfile;

    /// rcfile flavors in lookup order.
    fn create_rcfile_providers(&self) -> Vec<RcFileProvider>;

    /// Open a module provider writing to `sink`.
    ///
    /// # Errors
    /// Returns `FETCH_ERROR` if the HTTP client cannot be built.
    fn create_module_provider<R: SpecialSourceResolver>(
        &self,
        sink: Arc<dyn ManifestSink>,
        special: R,
    ) -> Result<Self::Modules<R>, PkgError>;
}

/// Factory for `package-lock.json`.
#[derive(Debug, Clone, Default)]
pub struct NpmProviderFactory {
    options: ProviderOptions,
}

impl NpmProviderFactory {
    #[must_use]
    pub fn new(options: ProviderOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &ProviderOptions {
        &self.options
    }
}

impl ProviderFactory for NpmProviderFactory {
    type Lockfile = NpmLockfileProvider;
    type Modules<R: SpecialSourceResolver> = RegistryModuleProvider<R>;

    fn create_lockfile_provider(&self) -> NpmLockfileProvider {
        NpmLockfileProvider::new(self.options.no_devel)
    }

    fn create_rcfile_providers(&self) -> Vec<RcFileProvider> {
        vec![RcFileProvider::NPM]
    }

    fn create_module_provider<R: SpecialSourceResolver>(
        &self,
        sink: Arc<dyn ManifestSink>,
        special: R,
    ) -> Result<RegistryModuleProvider<R>, PkgError> {
        self.options
            .open_registry_provider(Layout::Npm, sink, special)
    }
}

/// Factory for yarn v1 `yarn.lock`.
#[derive(Debug, Clone, Default)]
pub struct YarnProviderFactory {
    options: ProviderOptions,
}

impl YarnProviderFactory {
    #[must_use]
    pub fn new(options: ProviderOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &ProviderOptions {
        &self.options
    }
}

impl ProviderFactory for YarnProviderFactory {
    type Lockfile = YarnLockfileProvider;
    type Modules<R: SpecialSourceResolver> = RegistryModuleProvider<R>;

    fn create_lockfile_provider(&self) -> YarnLockfileProvider {
        YarnLockfileProvider
    }

    fn create_rcfile_providers(&self) -> Vec<RcFileProvider> {
        vec![RcFileProvider::YARN, RcFileProvider::NPM]
    }

    fn create_module_provider<R: SpecialSourceResolver>(
        &self,
        sink: Arc<dyn ManifestSink>,
        special: R,
    ) -> Result<RegistryModuleProvider<R>, PkgError> {
        self.options
            .open_registry_provider(Layout::Yarn, sink, special)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkg::manifest::JsonManifest;
    use crate::pkg::rcfile::parse_rcfile_str;
    use crate::pkg::special::NoSpecialSources;

    #[test]
    fn test_rcfile_order() {
        let npm = NpmProviderFactory::default().create_rcfile_providers();
        assert_eq!(npm, [RcFileProvider::NPM]);

        let yarn = YarnProviderFactory::default().create_rcfile_providers();
        assert_eq!(yarn, [RcFileProvider::YARN, RcFileProvider::NPM]);
    }

    #[test]
    fn test_module_provider_layout() {
        let sink: Arc<dyn ManifestSink> = Arc::new(JsonManifest::new());

        let npm = NpmProviderFactory::default()
            .create_module_provider(sink.clone(), NoSpecialSources)
            .unwrap();
        assert_eq!(npm.layout(), Layout::Npm);

        let yarn = YarnProviderFactory::default()
            .create_module_provider(sink, NoSpecialSources)
            .unwrap();
        assert_eq!(yarn.layout(), Layout::Yarn);
    }

    #[test]
    fn test_options_from_rcfile() {
        let rc = parse_rcfile_str("//npm.example.com/:_authToken=secret\n");
        let options = ProviderOptions::default()
            .with_no_devel(true)
            .with_rcfile(&rc);

        assert!(options.no_devel);
        assert_eq!(
            options.auth_tokens.get("npm.example.com"),
            Some(&"secret".to_string())
        );
    }

    #[test]
    fn test_first_rcfile_token_wins() {
        let yarnrc = parse_rcfile_str("//npm.example.com/:_authToken first\n");
        let npmrc = parse_rcfile_str("//npm.example.com/:_authToken=second\n");
        let options = ProviderOptions::default()
            .with_rcfile(&yarnrc)
            .with_rcfile(&npmrc);

        assert_eq!(
            options.auth_tokens.get("npm.example.com"),
            Some(&"first".to_string())
        );
    }
}
