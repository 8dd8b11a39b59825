//! Datever Core - Date-keyed API versioning for serialization schemas
//!
//! This crate lets a schema keep one canonical, always-latest declaration
//! while still serving clients pinned to older API versions. Each breaking
//! change is recorded once, under the date it shipped, and replayed in
//! reverse for older clients.
//!
//! # Main Components
//!
//! - **Versions**: `YYYY-MM-DD` identifiers negotiated from request headers
//! - **Changes**: reversible field transformations (add, remove, rename, retype)
//! - **Change Sets**: date-ordered changes folded into downgrades and upgrades
//! - **Models**: version-aware fields, output data and upgraded input
//! - **Definitions**: schemas and change sets loaded from YAML or JSON
//!
//! # Example
//!
//! ```
//! use datever_core::{
//!     Change, ChangeSet, Context, Field, Request, RequestMetadata, Result, Schema,
//!     DateHeaderNegotiator, VersionedModel,
//! };
//! use serde_json::json;
//!
//! fn example() -> Result<()> {
//!     let changes = ChangeSet::builder()
//!         .change("2018-07-29", Change::rename_field("iColor", "eyeColor"))
//!         .build()?;
//!     let schema = Schema::builder("PersonSerializer")
//!         .field("name", Field::char())
//!         .field("eyeColor", Field::char())
//!         .changes(changes)
//!         .build();
//!
//!     let request = Request::new(RequestMetadata::new().with_header("X-Version", "2018-07-01"))
//!         .negotiate(&DateHeaderNegotiator::new())?;
//!     let mut model = VersionedModel::new(schema)
//!         .with_context(Context::from_request(request))
//!         .with_instance(json!({"name": "Chewbacca", "eyeColor": "blue"}));
//!
//!     assert_eq!(model.data()?["iColor"], json!("blue"));
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

pub mod change;
pub mod changeset;
pub mod context;
pub mod definition;
pub mod error;
pub mod field;
pub mod model;
pub mod negotiation;
pub mod schema;
pub mod version;

// Re-export main types for convenience
pub use change::Change;
pub use changeset::{ActiveChanges, ChangeSet, ChangeSetBuilder};
pub use context::{Context, Request};
pub use definition::{SchemaDocument, SchemaRegistry};
pub use error::{Error, FieldErrors, Result, NOT_ACCEPTABLE};
pub use field::{Field, FieldKind, FieldSet, Payload};
pub use model::{Status, VersionedModel};
pub use negotiation::{
    DateHeaderNegotiator, RequestMetadata, VersionNegotiator, VERSION_HEADER,
};
pub use schema::{Schema, SchemaBuilder};
pub use version::{VersionError, VersionIdentifier};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
