//! npm registry client.
//!
//! Only used to fetch tarballs whose digest the lockfile does not declare.

use super::error::PkgError;
use crate::version::VERSION;
use bytes::Bytes;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Default npm registry URL.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Maximum tarball size (200 MB).
pub const MAX_TARBALL_SIZE: u64 = 200 * 1024 * 1024;

/// Download timeout in seconds.
const DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Tarball URL npm would use for `name@version` on the default registry.
///
/// `@scope/name` -> `{registry}@scope/name/-/name-{version}.tgz`
#[must_use]
pub fn default_tarball_url(name: &str, version: &str) -> String {
    let basename = name.rsplit('/').next().unwrap_or(name);
    format!("{DEFAULT_REGISTRY}{name}/-/{basename}-{version}.tgz")
}

/// HTTP client plus the auth tokens read from rcfiles.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: Client,
    tokens: HashMap<String, String>,
}

impl RegistryClient {
    /// Create a client. `tokens` maps `host[/path]` to a bearer token.
    ///
    /// # Errors
    /// Returns `FETCH_ERROR` if the HTTP client cannot be created.
    pub fn new(tokens: HashMap<String, String>) -> Result<Self, PkgError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .user_agent(format!("nodepin/{VERSION}"))
            .build()
            .map_err(|e| PkgError::fetch(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { http, tokens })
    }

    /// Token for the longest `host[/path]` prefix of `url`.
    #[must_use]
    pub fn auth_token_for(&self, url: &str) -> Option<&str> {
        let url = Url::parse(url).ok()?;
        let host = url.host_str()?;
        let target = format!("{host}{}", url.path());

        self.tokens
            .iter()
            .filter(|(key, _)| {
                key.as_str() == host
                    || target
                        .strip_prefix(key.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|(key, _)| key.len())
            .map(|(_, token)| token.as_str())
    }

    /// Download a tarball, attaching the matching auth token.
    ///
    /// # Errors
    /// Returns `FETCH_ERROR` if the download fails or exceeds the size limit.
    pub async fn download(&self, url: &str) -> Result<Bytes, PkgError> {
        download_tarball(&self.http, url, MAX_TARBALL_SIZE, self.auth_token_for(url)).await
    }
}

/// Download a tarball from a URL.
///
/// If `auth_token` is provided, attaches a `Bearer` authorization header.
///
/// # Errors
/// Returns `FETCH_ERROR` if the download fails or exceeds the size limit.
pub async fn download_tarball(
    client: &Client,
    url: &str,
    max_bytes: u64,
    auth_token: Option<&str>,
) -> Result<Bytes, PkgError> {
    let mut request = client
        .get(url)
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS));

    if let Some(token) = auth_token {
        request = request.header("Authorization", format!("Bearer {token}"));
    }

    let response = request
        .send()
        .await
        .map_err(|e| PkgError::fetch(format!("Failed to download '{url}': {e}")))?;

    if !response.status().is_success() {
        return Err(PkgError::fetch(format!(
            "Download failed with status {} for '{url}'",
            response.status()
        )));
    }

    if let Some(len) = response.content_length() {
        if len > max_bytes {
            return Err(PkgError::fetch(format!(
                "Tarball too large: {len} bytes (max: {max_bytes})"
            )));
        }
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| PkgError::fetch(format!("Failed to read response body: {e}")))?;

    if bytes.len() as u64 > max_bytes {
        return Err(PkgError::fetch(format!(
            "Tarball too large: {} bytes (max: {max_bytes})",
            bytes.len()
        )));
    }

    Ok(bytes)
}
