//! Relationship updates.
//!
//! A relation's storage shape picks an [`UpdateStrategy`]; the
//! [`GraphMutator`] runs it against a repository.

mod mutator;
mod strategy;

pub use mutator::GraphMutator;
pub use strategy::{UpdateStrategy, detect_strategy};
