//! Subresource integrity values.
//!
//! Lockfiles declare digests as SRI strings (`sha512-<base64>`), yarn also
//! pins a bare sha1 in the `#` fragment of `resolved`. Both are normalized to
//! an algorithm name plus a lowercase hex digest, the form offline build
//! manifests expect.

use super::error::PkgError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Hash algorithms accepted in lockfiles, weakest first.
const ALGORITHMS: &[&str] = &["sha1", "sha256", "sha384", "sha512"];

/// A normalized integrity digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Integrity {
    /// Algorithm name (`sha1`, `sha256`, `sha384` or `sha512`).
    pub algorithm: String,
    /// Lowercase hex digest.
    pub digest: String,
}

impl Integrity {
    /// Parse an SRI string.
    ///
    /// When several space-separated hashes are present the strongest one
    /// wins. Unknown algorithms and `?options` suffixes are ignored.
    ///
    /// # Errors
    /// Returns `INTEGRITY_ERROR` if no usable hash is present.
    pub fn parse(sri: &str) -> Result<Self, PkgError> {
        let mut best: Option<(usize, Self)> = None;

        for token in sri.split_whitespace() {
            let Some((algorithm, encoded)) = token.split_once('-') else {
                continue;
            };
            let Some(rank) = ALGORITHMS.iter().position(|a| *a == algorithm) else {
                continue;
            };
            let encoded = encoded.split('?').next().unwrap_or(encoded);
            let Ok(bytes) = STANDARD.decode(encoded) else {
                continue;
            };

            if best.as_ref().map_or(true, |(r, _)| rank > *r) {
                best = Some((
                    rank,
                    Self {
                        algorithm: algorithm.to_string(),
                        digest: to_hex(&bytes),
                    },
                ));
            }
        }

        best.map(|(_, integrity)| integrity)
            .ok_or_else(|| PkgError::integrity(format!("Unusable integrity value '{sri}'")))
    }

    /// Build from a bare sha1 hex digest.
    ///
    /// # Errors
    /// Returns `INTEGRITY_ERROR` unless the input is 40 hex characters.
    pub fn from_sha1(hex: &str) -> Result<Self, PkgError> {
        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PkgError::integrity(format!("Invalid sha1 digest '{hex}'")));
        }
        Ok(Self {
            algorithm: "sha1".to_string(),
            digest: hex.to_ascii_lowercase(),
        })
    }

    /// Compute a sha256 integrity over downloaded bytes.
    #[must_use]
    pub fn sha256_of(bytes: &[u8]) -> Self {
        Self {
            algorithm: "sha256".to_string(),
            digest: to_hex(&Sha256::digest(bytes)),
        }
    }
}

fn to_hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(hex, "{b:02x}");
    }
    hex
}
