//! Request context handed to versioned models
//!
//! A model finds its version through the context it was built with: either a
//! request that has been through negotiation, or a version placed directly in
//! the context. A context with neither yields no version, and a model without
//! a version always behaves as the canonical, latest schema.

use crate::error::Result;
use crate::negotiation::{RequestMetadata, VersionNegotiator};
use crate::version::VersionIdentifier;
use std::sync::Arc;

/// An inbound request and the version negotiated for it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    metadata: RequestMetadata,
    version: Option<VersionIdentifier>,
}

impl Request {
    /// Create a request that has not been negotiated yet
    pub fn new(metadata: RequestMetadata) -> Self {
        Self {
            metadata,
            version: None,
        }
    }

    /// Negotiate the request's version and bind it
    pub fn negotiate(mut self, negotiator: &dyn VersionNegotiator) -> Result<Self> {
        self.version = Some(negotiator.negotiate(&self.metadata)?);
        Ok(self)
    }

    /// Bind an already resolved version
    pub fn with_version(mut self, version: VersionIdentifier) -> Self {
        self.version = Some(version);
        self
    }

    /// The request's metadata
    pub fn metadata(&self) -> &RequestMetadata {
        &self.metadata
    }

    /// The negotiated version, if negotiation ran
    pub fn version(&self) -> Option<VersionIdentifier> {
        self.version
    }
}

/// Context shared by a model and every model nested in it
#[derive(Debug, Clone, Default)]
pub struct Context {
    request: Option<Arc<Request>>,
    version: Option<VersionIdentifier>,
}

impl Context {
    /// A context with no request bound
    pub fn new() -> Self {
        Self::default()
    }

    /// A context carrying a request
    pub fn from_request(request: Request) -> Self {
        Self {
            request: Some(Arc::new(request)),
            ..Self::default()
        }
    }

    /// A context carrying a version directly
    pub fn with_version(version: VersionIdentifier) -> Self {
        Self {
            version: Some(version),
            ..Self::default()
        }
    }

    /// The bound request
    pub fn request(&self) -> Option<&Request> {
        self.request.as_deref()
    }

    /// The version this context is bound to
    ///
    /// The request's negotiated version wins over a version set directly.
    pub fn version(&self) -> Option<VersionIdentifier> {
        self.request
            .as_ref()
            .and_then(|request| request.version())
            .or(self.version)
    }
}
