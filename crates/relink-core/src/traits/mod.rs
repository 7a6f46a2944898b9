//! Collaborator traits the core is implemented against.

mod repository;
mod links;

pub use repository::{Condition, Filter, RepoResult, Repository};
pub use links::{LinkBuilder, UrlBuilder};
