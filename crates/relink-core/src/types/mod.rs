//! Core value types.
//!
//! Records are schema-agnostic field maps; references and relationship
//! data are the wire-level linkage shapes shared by composition and
//! mutation.

mod base_url;
mod record;
mod reference;

pub use base_url::BaseUrl;
pub use record::{FieldMap, Record, key_string, keys_equal};
pub use reference::{ReferenceObject, RelationshipData};
