//! Error types for relink.
//!
//! This module provides a unified error type with explicit variants for
//! schema lookups, include requests, inbound document shape and
//! repository failures. Every variant carries the offending relation,
//! path or pointer so a boundary layer can render a user-facing document.

use serde_json::{Value, json};
use thiserror::Error;

/// The unified error type for relink operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The schema declares no such relation on the type.
    #[error("unknown relation '{relation}' on type '{type_name}'")]
    UnknownRelation { type_name: String, relation: String },

    /// The schema declares no model for this type name.
    #[error("unknown type '{type_name}'")]
    UnknownType { type_name: String },

    /// An include path references an undeclared relation or is malformed.
    #[error("invalid include '{path}': {reason}")]
    InvalidInclude { path: String, reason: String },

    /// A submitted reference's type does not match the relation's target.
    #[error("relation '{relation}' expects type '{expected}', got '{found}'")]
    RelatedTypeMismatch {
        relation: String,
        expected: String,
        found: String,
    },

    /// An inbound document does not have the expected shape.
    #[error("invalid document at '{pointer}': {message}")]
    InvalidDocument { pointer: String, message: String },

    /// A record handed to the composer has no usable primary key.
    #[error("record of type '{type_name}' has no value for primary key '{primary_key}'")]
    MissingPrimaryKey {
        type_name: String,
        primary_key: String,
    },

    /// The resource addressed by a request does not exist.
    #[error("{type_name} {id} not found")]
    ResourceNotFound { type_name: String, id: String },

    /// An invalid base URL was configured for link generation.
    #[error("invalid base URL '{value}': {reason}")]
    InvalidUrl { value: String, reason: String },

    /// The schema definition is inconsistent.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// The underlying repository failed. Propagated unmodified.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl Error {
    /// HTTP status a boundary layer should answer with.
    pub fn status(&self) -> u16 {
        match self {
            Error::UnknownRelation { .. }
            | Error::UnknownType { .. }
            | Error::InvalidInclude { .. }
            | Error::InvalidDocument { .. } => 400,
            Error::RelatedTypeMismatch { .. } => 422,
            Error::ResourceNotFound { .. } => 404,
            Error::Repository(RepositoryError::NotFound { .. }) => 404,
            Error::MissingPrimaryKey { .. }
            | Error::InvalidUrl { .. }
            | Error::Schema(_)
            | Error::Repository(_) => 500,
        }
    }

    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Error::UnknownRelation { .. } => "UNKNOWN_RELATION",
            Error::UnknownType { .. } => "UNKNOWN_TYPE",
            Error::InvalidInclude { .. } => "INVALID_INCLUDE",
            Error::RelatedTypeMismatch { .. } => "RELATED_TYPE_MISMATCH",
            Error::InvalidDocument { .. } => "INVALID_DOCUMENT",
            Error::MissingPrimaryKey { .. } => "MISSING_PRIMARY_KEY",
            Error::ResourceNotFound { .. } => "RESOURCE_NOT_FOUND",
            Error::InvalidUrl { .. } => "INVALID_URL",
            Error::Schema(_) => "SCHEMA_ERROR",
            Error::Repository(_) => "REPOSITORY_ERROR",
        }
    }

    /// Render this error as a JSON:API `errors` document.
    pub fn to_document(&self) -> Value {
        let mut error = json!({
            "status": self.status().to_string(),
            "code": self.code(),
            "detail": self.to_string(),
        });

        let source = match self {
            Error::InvalidDocument { pointer, .. } => Some(json!({ "pointer": pointer })),
            Error::InvalidInclude { .. } => Some(json!({ "parameter": "include" })),
            Error::RelatedTypeMismatch { relation, .. } => Some(json!({
                "pointer": format!("/data/relationships/{}/data", relation)
            })),
            Error::UnknownRelation { relation, .. } => Some(json!({
                "pointer": format!("/data/relationships/{}", relation)
            })),
            _ => None,
        };

        if let Some(source) = source {
            error["source"] = source;
        }

        json!({ "errors": [error] })
    }
}

/// Errors raised while loading or validating a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A relation targets a model that is not declared.
    #[error("relation '{model}.{relation}' references unknown model '{target}'")]
    UnknownTarget {
        model: String,
        relation: String,
        target: String,
    },

    /// A relation definition is incomplete or contradictory.
    #[error("relation '{model}.{relation}': {reason}")]
    InvalidRelation {
        model: String,
        relation: String,
        reason: String,
    },

    /// A model's default include does not resolve against the schema.
    #[error("default include '{path}' on model '{model}': {reason}")]
    InvalidDefaultInclude {
        model: String,
        path: String,
        reason: String,
    },

    /// Two models share the same plural wire type.
    #[error("models '{first}' and '{second}' share the plural '{plural}'")]
    DuplicatePlural {
        first: String,
        second: String,
        plural: String,
    },

    /// The schema source could not be read or parsed.
    #[error("invalid schema definition: {message}")]
    Parse { message: String },
}

/// Errors surfaced by a [`Repository`](crate::traits::Repository) backend.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A write addressed a record that does not exist.
    #[error("{type_name} with id {id} not found")]
    NotFound { type_name: String, id: String },

    /// A create collided with an existing primary key.
    #[error("{type_name} with id {id} already exists")]
    Conflict { type_name: String, id: String },

    /// Generic backend failure.
    #[error("backend failure: {message}")]
    Backend { message: String },

    /// Storage I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_boundary_mapping() {
        let unknown = Error::UnknownRelation {
            type_name: "post".to_string(),
            relation: "editor".to_string(),
        };
        assert_eq!(unknown.status(), 400);

        let mismatch = Error::RelatedTypeMismatch {
            relation: "comments".to_string(),
            expected: "comment".to_string(),
            found: "people".to_string(),
        };
        assert_eq!(mismatch.status(), 422);

        let missing = Error::Repository(RepositoryError::NotFound {
            type_name: "comment".to_string(),
            id: "9".to_string(),
        });
        assert_eq!(missing.status(), 404);

        let backend = Error::Repository(RepositoryError::Backend {
            message: "disk full".to_string(),
        });
        assert_eq!(backend.status(), 500);
    }

    #[test]
    fn error_document_carries_source_pointer() {
        let err = Error::RelatedTypeMismatch {
            relation: "author".to_string(),
            expected: "person".to_string(),
            found: "posts".to_string(),
        };

        let doc = err.to_document();
        let first = &doc["errors"][0];
        assert_eq!(first["status"], "422");
        assert_eq!(first["code"], "RELATED_TYPE_MISMATCH");
        assert_eq!(first["source"]["pointer"], "/data/relationships/author/data");
    }

    #[test]
    fn include_error_points_at_parameter() {
        let err = Error::InvalidInclude {
            path: "author.nope".to_string(),
            reason: "no relation 'nope' on person".to_string(),
        };
        let doc = err.to_document();
        assert_eq!(doc["errors"][0]["source"]["parameter"], "include");
        assert!(doc["errors"][0]["detail"].as_str().unwrap().contains("author.nope"));
    }
}
