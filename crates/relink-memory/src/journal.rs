//! Write journal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteOp {
    /// A record was created.
    Create,
    /// A record's fields were updated.
    Update,
    /// Records matching a filter were deleted.
    Delete,
}

/// One write applied to the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteEvent {
    pub op: WriteOp,

    /// Model written to.
    #[serde(rename = "type")]
    pub type_name: String,

    /// Key of the written record; `None` for filtered deletes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Number of records affected.
    pub affected: usize,

    pub time: DateTime<Utc>,
}

impl WriteEvent {
    pub(crate) fn new(op: WriteOp, type_name: &str, id: Option<String>, affected: usize) -> Self {
        Self {
            op,
            type_name: type_name.to_string(),
            id,
            affected,
            time: Utc::now(),
        }
    }
}
