//! JSON:API documents: outbound composition and inbound parsing.

mod assemble;
mod compose;
mod fetch;
mod incoming;
mod include;
mod resource;

pub use assemble::{Assembler, Primary};
pub use compose::{ComposeContext, ResourceComposer};
pub use fetch::{RelatedRecord, RelatedSet, fetch_related};
pub use incoming::{IncomingDocument, IncomingResource};
pub use include::{IncludeChain, IncludeTree};
pub use resource::{CompoundDocument, Links, PrimaryData, RelationshipObject, ResourceObject};
