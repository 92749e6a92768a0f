//! Native addon build-header configuration.

use super::error::{codes, PkgError};

/// Which runtime headers native addons are compiled against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeHeaders {
    /// Runtime version (e.g. `12.0.0`).
    pub target: String,
    /// Runtime name (`node`, `electron`, ...).
    pub runtime: String,
    /// Base URL the headers tarball is served from.
    pub disturl: String,
}

impl NodeHeaders {
    #[must_use]
    pub fn new(
        target: impl Into<String>,
        runtime: impl Into<String>,
        disturl: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            runtime: runtime.into(),
            disturl: disturl.into(),
        }
    }

    /// Fill in the runtime (`node`) and its well-known dist URL.
    ///
    /// # Errors
    /// Returns `MISSING_CONFIG_KEY` for a runtime with no known dist URL when
    /// none is given.
    pub fn with_defaults(
        target: &str,
        runtime: Option<&str>,
        disturl: Option<&str>,
    ) -> Result<Self, PkgError> {
        let runtime = runtime.unwrap_or("node");
        let disturl = match (disturl, runtime) {
            (Some(url), _) => url,
            (None, "node") => "http://nodejs.org/dist",
            (None, "electron") => "https://www.electronjs.org/headers",
            (None, other) => {
                return Err(PkgError::new(
                    codes::MISSING_CONFIG_KEY,
                    format!("No default disturl for runtime '{other}'"),
                ))
            }
        };
        Ok(Self::new(target, runtime, disturl))
    }

    /// URL of the headers tarball.
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "{}/v{target}/node-v{target}-headers.tar.gz",
            self.disturl.trim_end_matches('/'),
            target = self.target
        )
    }

    /// node-gyp's install layout version marker.
    #[must_use]
    pub fn install_version(&self) -> &'static str {
        "9"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url() {
        let headers = NodeHeaders::new("12.0.0", "node", "https://nodejs.org/dist/");
        assert_eq!(
            headers.url(),
            "https://nodejs.org/dist/v12.0.0/node-v12.0.0-headers.tar.gz"
        );
    }

    #[test]
    fn test_with_defaults_node() {
        let headers = NodeHeaders::with_defaults("18.17.0", None, None).unwrap();
        assert_eq!(headers.runtime, "node");
        assert_eq!(headers.disturl, "http://nodejs.org/dist");
    }

    #[test]
    fn test_with_defaults_electron() {
        let headers = NodeHeaders::with_defaults("25.0.0", Some("electron"), None).unwrap();
        assert_eq!(headers.disturl, "https://www.electronjs.org/headers");
    }

    #[test]
    fn test_with_defaults_explicit_disturl_wins() {
        let headers =
            NodeHeaders::with_defaults("1.0.0", Some("nw"), Some("https://dl.nwjs.io")).unwrap();
        assert_eq!(headers.disturl, "https://dl.nwjs.io");
    }

    #[test]
    fn test_with_defaults_unknown_runtime() {
        let err = NodeHeaders::with_defaults("1.0.0", Some("nw"), None).unwrap_err();
        assert_eq!(err.code(), codes::MISSING_CONFIG_KEY);
    }

    #[test]
    fn test_install_version() {
        let headers = NodeHeaders::new("12.0.0", "node", "https://x");
        assert_eq!(headers.install_version(), "9");
    }
}
