//! Version negotiation from inbound request metadata
//!
//! A negotiator reads the requested version out of request headers. An absent
//! header means "latest", which is spelled as today's date so that every
//! negotiated version compares the same way. A malformed header is rejected
//! with a not-acceptable error and never replaced by a default.
//!
//! Copyright (c) 2025 Datever Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::version::VersionIdentifier;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Default header carrying the requested version
pub const VERSION_HEADER: &str = "X-Version";

/// Header-like metadata of an inbound request
///
/// Lookups ignore case and accept both the wire spelling (`X-Version`) and the
/// CGI spelling (`HTTP_X_VERSION`) of a header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    headers: HashMap<String, String>,
}

impl RequestMetadata {
    /// Create empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header, builder style
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace a header
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.headers.insert(normalize_header(name.as_ref()), value.into());
    }

    /// Look up a header by any of its spellings
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(&normalize_header(name)).map(String::as_str)
    }

    /// Number of headers
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Whether no headers are present
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for RequestMetadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Self::new();
        for (name, value) in iter {
            metadata.insert(name, value);
        }
        metadata
    }
}

fn normalize_header(name: &str) -> String {
    let lower = name.to_ascii_lowercase().replace('_', "-");
    match lower.strip_prefix("http-") {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}

/// Resolves the version a request is bound to
pub trait VersionNegotiator: Send + Sync {
    /// Extract and validate the requested version
    fn negotiate(&self, metadata: &RequestMetadata) -> Result<VersionIdentifier>;
}

/// Source of "today" for requests that name no version
pub type Clock = Arc<dyn Fn() -> VersionIdentifier + Send + Sync>;

/// Negotiates a `YYYY-MM-DD` version carried in a single header
#[derive(Clone)]
pub struct DateHeaderNegotiator {
    header: String,
    clock: Clock,
}

impl DateHeaderNegotiator {
    /// Negotiator reading the `X-Version` header
    pub fn new() -> Self {
        Self::with_header(VERSION_HEADER)
    }

    /// Negotiator reading a custom header
    pub fn with_header(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            clock: Arc::new(VersionIdentifier::today),
        }
    }

    /// Replace the clock used for unversioned requests
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> VersionIdentifier + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// The header this negotiator reads
    pub fn header(&self) -> &str {
        &self.header
    }
}

impl Default for DateHeaderNegotiator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DateHeaderNegotiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DateHeaderNegotiator")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

impl VersionNegotiator for DateHeaderNegotiator {
    fn negotiate(&self, metadata: &RequestMetadata) -> Result<VersionIdentifier> {
        let Some(raw) = metadata.get(&self.header) else {
            let today = (self.clock)();
            tracing::debug!(header = %self.header, version = %today, "no version header, using today");
            return Ok(today);
        };

        match VersionIdentifier::parse(raw) {
            Ok(version) => {
                tracing::debug!(header = %self.header, version = %version, "negotiated version");
                Ok(version)
            }
            Err(e) => {
                tracing::debug!(header = %self.header, value = raw, error = %e, "rejecting version header");
                Err(Error::not_acceptable(&self.header))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_clock() -> VersionIdentifier {
        VersionIdentifier::parse("2024-05-01").unwrap()
    }

    #[test]
    fn test_no_versioning_defaults_to_today() {
        let negotiator = DateHeaderNegotiator::new().with_clock(fixed_clock);
        let version = negotiator.negotiate(&RequestMetadata::new()).unwrap();
        assert_eq!(version.to_string(), "2024-05-01");
    }

    #[test]
    fn test_default_clock_is_today() {
        let version = DateHeaderNegotiator::new().negotiate(&RequestMetadata::new()).unwrap();
        assert_eq!(version, VersionIdentifier::today());
    }

    #[test]
    fn test_valid_version() {
        let metadata = RequestMetadata::new().with_header("X-Version", "2018-08-03");
        let version = DateHeaderNegotiator::new().negotiate(&metadata).unwrap();
        assert_eq!(version.to_string(), "2018-08-03");
    }

    #[test]
    fn test_invalid_version() {
        let metadata = RequestMetadata::new().with_header("X-Version", "not-a-date");
        let err = DateHeaderNegotiator::new()
            .with_clock(fixed_clock)
            .negotiate(&metadata)
            .unwrap_err();
        assert!(matches!(err, Error::NotAcceptable { .. }));
        assert_eq!(err.to_string(), "Invalid version in \"X-Version\" header.");
    }

    #[test]
    fn test_header_spellings() {
        let negotiator = DateHeaderNegotiator::new();
        for name in ["X-Version", "x-version", "HTTP_X_VERSION", "x_version"] {
            let metadata = RequestMetadata::new().with_header(name, "2018-07-29");
            let version = negotiator.negotiate(&metadata).unwrap();
            assert_eq!(version.to_string(), "2018-07-29", "header spelled {}", name);
        }
    }

    #[test]
    fn test_custom_header() {
        let negotiator = DateHeaderNegotiator::with_header("Api-Date").with_clock(fixed_clock);
        let metadata: RequestMetadata = [("X-Version", "2018-07-29"), ("api-date", "2019-02-01")]
            .into_iter()
            .collect();
        assert_eq!(negotiator.negotiate(&metadata).unwrap().to_string(), "2019-02-01");

        let metadata = RequestMetadata::new().with_header("Api-Date", "02/01/2019");
        let err = negotiator.negotiate(&metadata).unwrap_err();
        assert_eq!(err.to_string(), "Invalid version in \"Api-Date\" header.");
    }
}
