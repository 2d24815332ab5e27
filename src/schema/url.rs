//! URL decomposition following the regular expression of RFC 3986 Appendix B.
//!
//! The grammar is permissive: almost any string matches, so callers check
//! the components (`scheme`, `query`, ...) rather than rely on a parse
//! failure.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static URI_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(([^:/?#]+):)?(//([^/?#]*))?([^?#]*)(\?([^#]*))?(#(.*))?")
        .expect("RFC 3986 Appendix B expression is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0} is not a valid URL.")]
pub struct UrlError(pub String);

/// Components of a URI reference. Absent components are `None`, present
/// but empty ones are `Some("")`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedUrl {
    pub scheme: Option<String>,
    pub authority: Option<String>,
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl ParsedUrl {
    /// True if a non-empty query string is present.
    pub fn has_query(&self) -> bool {
        self.query.as_deref().is_some_and(|q| !q.is_empty())
    }

    /// True if a non-empty fragment is present.
    pub fn has_fragment(&self) -> bool {
        self.fragment.as_deref().is_some_and(|f| !f.is_empty())
    }
}

/// Split `url` into scheme, authority, path, query and fragment.
pub fn parse_url(url: &str) -> Result<ParsedUrl, UrlError> {
    let caps = URI_REFERENCE
        .captures(url)
        .ok_or_else(|| UrlError(url.to_string()))?;
    let group = |i: usize| caps.get(i).map(|m| m.as_str().to_string());

    Ok(ParsedUrl {
        scheme: group(2),
        authority: group(4),
        path: group(5).unwrap_or_default(),
        query: group(7),
        fragment: group(9),
    })
}
