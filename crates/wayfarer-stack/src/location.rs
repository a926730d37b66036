//! Location values handed to route parsers
//!
//! Locations arrive either absolute (`https://host/a?b=c`) or relative to
//! the application (`/profile/123`). Both are resolved against a base URI
//! so parsers always see a normalized path and query.

use std::fmt;
use url::Url;

use crate::error::StackError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    url: Url,
}

impl Location {
    /// Resolve `input` against `base`
    pub fn parse(input: &str, base: &Url) -> Result<Self> {
        let url = base
            .join(input.trim())
            .map_err(|source| StackError::InvalidLocation {
                input: input.to_string(),
                source,
            })?;

        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Non-empty path segments, e.g. `["profile", "123"]`
    pub fn segments(&self) -> Vec<&str> {
        self.url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    /// First value of a query parameter
    pub fn query(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.url.fragment()
    }

    /// Path, query and fragment without scheme or host
    pub fn relative(&self) -> String {
        let mut out = self.url.path().to_string();
        if let Some(query) = self.url.query() {
            out.push('?');
            out.push_str(query);
        }
        if let Some(fragment) = self.url.fragment() {
            out.push('#');
            out.push_str(fragment);
        }
        out
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.relative())
    }
}
