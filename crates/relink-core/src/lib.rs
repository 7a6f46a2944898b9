//! relink-core - JSON:API composition and relationship linking.
//!
//! Converts flat relational records (foreign keys pointing at related
//! records by id) into hypermedia documents with `relationships` and
//! `included`, and converges a persisted relationship graph to the
//! linkage described by an inbound document.

pub mod document;
pub mod error;
pub mod mutate;
pub mod schema;
pub mod traits;
pub mod types;

pub use document::{
    Assembler, ComposeContext, CompoundDocument, IncludeChain, IncludeTree, IncomingDocument,
    IncomingResource, Links, Primary, PrimaryData, RelatedRecord, RelatedSet, RelationshipObject,
    ResourceComposer, ResourceObject, fetch_related,
};
pub use error::{Error, RepositoryError, SchemaError};
pub use mutate::{GraphMutator, UpdateStrategy, detect_strategy};
pub use schema::{
    IdType, ModelBuilder, ModelDef, Polymorphic, RelationDefinition, RelationDescriptor,
    RelationKind, Schema, SchemaBuilder, SchemaDefinition,
};
pub use traits::{Condition, Filter, LinkBuilder, Repository, UrlBuilder};
pub use types::{BaseUrl, FieldMap, Record, ReferenceObject, RelationshipData};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
