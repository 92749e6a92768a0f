//! Hook for packages that need handling outside the regular fetch path.

use super::error::PkgError;
use super::package::Package;
use std::future::Future;

/// Claims packages before a module provider processes them.
///
/// Returning `Ok(true)` means the package was handled and the provider
/// emits nothing for it.
pub trait SpecialSourceResolver: Send + Sync {
    fn resolve(&self, package: &Package)
        -> impl Future<Output = Result<bool, PkgError>> + Send;
}

/// Resolver that claims nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSpecialSources;

impl SpecialSourceResolver for NoSpecialSources {
    async fn resolve(&self, _package: &Package) -> Result<bool, PkgError> {
        Ok(false)
    }
}
