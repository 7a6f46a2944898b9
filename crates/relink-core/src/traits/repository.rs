//! Repository trait.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RepositoryError;
use crate::types::{FieldMap, Record, keys_equal};

/// Result type for repository operations.
pub type RepoResult<T> = std::result::Result<T, RepositoryError>;

/// A single filter condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `field = value`. A null value matches absent or null fields.
    Eq { field: String, value: Value },
    /// `field IN (values)`.
    In { field: String, values: Vec<Value> },
}

impl Condition {
    /// Returns true if the record satisfies this condition.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Condition::Eq { field, value } => {
                let actual = record.get(field).unwrap_or(&Value::Null);
                keys_equal(actual, value)
            }
            Condition::In { field, values } => match record.get(field) {
                Some(actual) if !actual.is_null() => {
                    values.iter().any(|candidate| keys_equal(actual, candidate))
                }
                _ => false,
            },
        }
    }
}

/// A conjunction of equality and membership conditions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// An empty filter matching every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `field = value` condition.
    pub fn eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.conditions.push(Condition::Eq {
            field: field.into(),
            value,
        });
        self
    }

    /// Add a `field IN (values)` condition.
    pub fn one_of(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.conditions.push(Condition::In {
            field: field.into(),
            values,
        });
        self
    }

    /// The conditions of this filter.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Returns true if the record satisfies every condition.
    ///
    /// Key values are compared by canonical string form.
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }
}

/// Record storage the core reads from and writes through.
///
/// The core never holds records beyond one request and never implements
/// its own transactions. A backend that needs atomicity across the
/// read-then-write phases of one mutation must provide it itself.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Fetch a record by primary key. A missing record is `Ok(None)`.
    async fn find_by_id(&self, type_name: &str, id: &Value) -> RepoResult<Option<Record>>;

    /// Fetch all records matching a filter, in storage order.
    async fn find(&self, type_name: &str, filter: &Filter) -> RepoResult<Vec<Record>>;

    /// Create a record, returning it as stored (with its primary key).
    async fn create(&self, type_name: &str, fields: FieldMap) -> RepoResult<Record>;

    /// Update fields of an existing record.
    async fn update(&self, type_name: &str, id: &Value, fields: FieldMap) -> RepoResult<()>;

    /// Delete every record matching a filter.
    async fn delete_where(&self, type_name: &str, filter: &Filter) -> RepoResult<()>;
}
