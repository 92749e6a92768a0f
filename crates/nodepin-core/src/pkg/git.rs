//! Git dependency normalization.
//!
//! Lockfiles spell git dependencies in many ways:
//!
//! - host shorthand: `github:owner/repo#sha`, `gitlab:`, `bitbucket:`
//! - explicit git schemes: `git://`, `git+http://`, `git+https://`, `git+ssh://`
//! - host embedded in the path: `git:github.com/owner/repo#sha`
//! - scp-style authorities: `git+ssh://git@github.com:owner/repo.git#sha`
//!
//! [`parse_git_source`] collapses all of them into one fetchable URL plus the
//! commit pinned in the fragment. The URL is handled with a generic
//! `scheme:[//netloc]path[?query][#fragment]` split rather than a WHATWG
//! parser, because scp-style authorities and opaque shorthand paths are not
//! valid URLs in the strict sense.

use super::error::PkgError;

/// Replacement applied to a git dependency's scheme and netloc.
#[derive(Debug, Clone, Copy)]
struct SchemeOverride {
    scheme: Option<&'static str>,
    netloc: Option<&'static str>,
}

/// Git schemes understood in lockfiles and what each one is rewritten to.
const GIT_SCHEMES: &[(&str, SchemeOverride)] = &[
    (
        "github",
        SchemeOverride {
            scheme: Some("https"),
            netloc: Some("github.com"),
        },
    ),
    (
        "gitlab",
        SchemeOverride {
            scheme: Some("https"),
            netloc: Some("gitlab.com"),
        },
    ),
    (
        "bitbucket",
        SchemeOverride {
            scheme: Some("https"),
            netloc: Some("bitbucket.com"),
        },
    ),
    (
        "git",
        SchemeOverride {
            scheme: None,
            netloc: None,
        },
    ),
    (
        "git+http",
        SchemeOverride {
            scheme: Some("http"),
            netloc: None,
        },
    ),
    (
        "git+https",
        SchemeOverride {
            scheme: Some("https"),
            netloc: None,
        },
    ),
    (
        "git+ssh",
        SchemeOverride {
            scheme: Some("https"),
            netloc: None,
        },
    ),
];

/// Schemes whose recomposed form carries a `//` authority even when empty.
const NETLOC_SCHEMES: &[&str] = &[
    "file", "ftp", "git", "git+ssh", "http", "https", "nfs", "rsync", "sftp", "svn", "svn+ssh",
    "ws", "wss",
];

fn scheme_override(scheme: &str) -> Option<SchemeOverride> {
    GIT_SCHEMES
        .iter()
        .find(|(name, _)| *name == scheme)
        .map(|(_, o)| *o)
}

/// A canonical git source with a pinned commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GitSource {
    /// The input, recomposed unchanged (for diagnostics).
    pub original: String,
    /// Canonical fetch URL, never carrying a fragment.
    pub url: String,
    /// Commit or ref taken from the input's fragment.
    pub commit: String,
    /// Provenance declared by the lockfile, passed through untouched.
    pub from: Option<String>,
}

/// Generic URL components.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct UrlParts {
    scheme: String,
    netloc: String,
    path: String,
    query: String,
    fragment: String,
}

impl UrlParts {
    fn split(input: &str) -> Self {
        let mut rest = input;
        let mut scheme = String::new();

        if let Some(i) = rest.find(':') {
            let candidate = &rest[..i];
            if is_scheme(candidate) {
                scheme = candidate.to_ascii_lowercase();
                rest = &rest[i + 1..];
            }
        }

        let mut netloc = "";
        if let Some(after) = rest.strip_prefix("//") {
            let end = after
                .find(|c| matches!(c, '/' | '?' | '#'))
                .unwrap_or(after.len());
            netloc = &after[..end];
            rest = &after[end..];
        }

        let (rest, fragment) = rest.split_once('#').unwrap_or((rest, ""));
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));

        Self {
            scheme,
            netloc: netloc.to_string(),
            path: path.to_string(),
            query: query.to_string(),
            fragment: fragment.to_string(),
        }
    }

    fn unsplit(&self) -> String {
        let mut url = self.path.clone();

        if !self.netloc.is_empty() {
            if !url.is_empty() && !url.starts_with('/') {
                url.insert(0, '/');
            }
            url = format!("//{}{url}", self.netloc);
        } else if url.starts_with("//")
            || (NETLOC_SCHEMES.contains(&self.scheme.as_str())
                && (url.is_empty() || url.starts_with('/')))
        {
            url = format!("//{url}");
        }

        if !self.scheme.is_empty() {
            url = format!("{}:{url}", self.scheme);
        }
        if !self.query.is_empty() {
            url.push('?');
            url.push_str(&self.query);
        }
        if !self.fragment.is_empty() {
            url.push('#');
            url.push_str(&self.fragment);
        }
        url
    }
}

/// A scheme starts with an ASCII letter and continues with letters, digits,
/// `+`, `-` or `.`.
fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// Whether a lockfile version/resolved string points at a git repository.
#[must_use]
pub fn is_git_reference(version: &str) -> bool {
    let parts = UrlParts::split(version);
    !parts.scheme.is_empty() && scheme_override(&parts.scheme).is_some()
}

/// Canonicalize a git dependency string.
///
/// `from` is never reconstructed from `version`: dialects that do not record
/// provenance pass `None` and downstream consumers that need it must supply
/// it themselves.
///
/// # Errors
/// Returns `MALFORMED_GIT_REFERENCE` when the input has no scheme, no path or
/// no commit fragment. Feeding an already normalized `url` back in therefore
/// fails.
pub fn parse_git_source(version: &str, from: Option<&str>) -> Result<GitSource, PkgError> {
    let original = UrlParts::split(version);

    if original.scheme.is_empty() {
        return Err(PkgError::malformed_git_reference(version, "missing scheme"));
    }
    if original.path.is_empty() {
        return Err(PkgError::malformed_git_reference(version, "missing path"));
    }
    if original.fragment.is_empty() {
        return Err(PkgError::malformed_git_reference(
            version,
            "missing commit fragment",
        ));
    }

    let mut url = UrlParts {
        fragment: String::new(),
        ..original.clone()
    };
    if let Some(o) = scheme_override(&original.scheme) {
        if let Some(scheme) = o.scheme {
            url.scheme = scheme.to_string();
        }
        if let Some(netloc) = o.netloc {
            url.netloc = netloc.to_string();
        }
    }

    // git:github.com/owner/repo -> host comes from the first path segment
    if url.netloc.is_empty() {
        let (host, rest) = match url.path.split_once('/') {
            Some((host, rest)) => (host.to_string(), rest.to_string()),
            None => (url.path.clone(), String::new()),
        };
        url.netloc = host;
        url.path = rest;
    }

    // git@github.com:owner/repo -> the part after ':' is the leading path segment
    if let Some((host, lead)) = url.netloc.split_once(':') {
        let path = if url.path.is_empty() || url.path.starts_with('/') {
            format!("/{lead}{}", url.path)
        } else {
            format!("/{lead}/{}", url.path)
        };
        url.netloc = host.to_string();
        url.path = path;
    }

    Ok(GitSource {
        original: original.unsplit(),
        url: url.unsplit(),
        commit: original.fragment,
        from: from.map(str::to_string),
    })
}
