//! In-memory repository.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use relink_core::traits::RepoResult;
use relink_core::types::{key_string, keys_equal};
use relink_core::{FieldMap, Filter, IdType, Record, Repository, RepositoryError, Schema};

use crate::journal::{WriteEvent, WriteOp};
use crate::snapshot::Snapshot;

#[derive(Debug, Clone)]
struct TableKey {
    primary_key: String,
    id_type: IdType,
}

impl Default for TableKey {
    fn default() -> Self {
        Self {
            primary_key: "id".to_string(),
            id_type: IdType::Integer,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<String, Vec<Record>>,
    keys: HashMap<String, TableKey>,
    journal: Vec<WriteEvent>,
}

impl State {
    fn for_schema(schema: &Schema) -> Self {
        let keys = schema
            .models()
            .map(|model| {
                (
                    model.name().to_string(),
                    TableKey {
                        primary_key: model.primary_key().to_string(),
                        id_type: model.id_type(),
                    },
                )
            })
            .collect();
        Self {
            keys,
            ..Self::default()
        }
    }

    fn key(&self, type_name: &str) -> TableKey {
        self.keys.get(type_name).cloned().unwrap_or_default()
    }

    fn next_id(&self, type_name: &str, key: &TableKey) -> Value {
        let next = self
            .tables
            .get(type_name)
            .into_iter()
            .flatten()
            .filter_map(|record| record.key(&key.primary_key))
            .filter_map(|id| id.parse::<i64>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        match key.id_type {
            IdType::Integer => Value::from(next),
            IdType::String => Value::String(next.to_string()),
        }
    }
}

/// A [`Repository`] holding every table in memory.
///
/// Clones share the same tables. Each operation takes the lock once, so
/// individual reads and writes are atomic; a sequence of them is not.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    state: Arc<RwLock<State>>,
}

impl MemoryRepository {
    /// Create an empty repository using the schema's primary keys.
    pub fn new(schema: &Schema) -> Self {
        Self::with_state(State::for_schema(schema))
    }

    /// Create a repository seeded from a snapshot.
    ///
    /// Table names may be model names or plural wire types.
    pub fn from_snapshot(schema: &Schema, snapshot: Snapshot) -> Self {
        let mut state = State::for_schema(schema);
        for (table, records) in snapshot.tables() {
            let name = schema
                .model_for_wire_type(table)
                .map(|model| model.name().to_string())
                .unwrap_or_else(|| table.clone());
            state
                .tables
                .entry(name)
                .or_default()
                .extend(records.iter().cloned());
        }
        Self::with_state(state)
    }

    fn with_state(state: State) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Copy every table into a snapshot.
    pub async fn snapshot(&self) -> Snapshot {
        let state = self.state.read().await;
        let mut snapshot = Snapshot::new();
        for (name, records) in &state.tables {
            snapshot.insert(name.clone(), records.clone());
        }
        snapshot
    }

    /// Add a record without journaling it.
    pub async fn insert(&self, type_name: &str, record: Record) {
        let mut state = self.state.write().await;
        state
            .tables
            .entry(type_name.to_string())
            .or_default()
            .push(record);
    }

    /// Every record of a table, in insertion order.
    pub async fn records(&self, type_name: &str) -> Vec<Record> {
        let state = self.state.read().await;
        state.tables.get(type_name).cloned().unwrap_or_default()
    }

    /// Writes applied since creation or the last [`clear_journal`](Self::clear_journal).
    pub async fn journal(&self) -> Vec<WriteEvent> {
        self.state.read().await.journal.clone()
    }

    /// Forget journaled writes.
    pub async fn clear_journal(&self) {
        self.state.write().await.journal.clear();
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_by_id(&self, type_name: &str, id: &Value) -> RepoResult<Option<Record>> {
        let state = self.state.read().await;
        let key = state.key(type_name);
        Ok(state.tables.get(type_name).and_then(|table| {
            table
                .iter()
                .find(|record| {
                    record
                        .get(&key.primary_key)
                        .is_some_and(|value| keys_equal(value, id))
                })
                .cloned()
        }))
    }

    async fn find(&self, type_name: &str, filter: &Filter) -> RepoResult<Vec<Record>> {
        let state = self.state.read().await;
        Ok(state
            .tables
            .get(type_name)
            .map(|table| {
                table
                    .iter()
                    .filter(|record| filter.matches(record))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    #[instrument(skip(self, fields))]
    async fn create(&self, type_name: &str, fields: FieldMap) -> RepoResult<Record> {
        let mut state = self.state.write().await;
        let key = state.key(type_name);

        let mut record = Record::new(fields);
        match record.get(&key.primary_key).filter(|v| !v.is_null()).cloned() {
            Some(id) => {
                let taken = state.tables.get(type_name).is_some_and(|table| {
                    table.iter().any(|existing| {
                        existing
                            .get(&key.primary_key)
                            .is_some_and(|value| keys_equal(value, &id))
                    })
                });
                if taken {
                    return Err(RepositoryError::Conflict {
                        type_name: type_name.to_string(),
                        id: key_string(&id).unwrap_or_default(),
                    });
                }
            }
            None => {
                let id = state.next_id(type_name, &key);
                record.set(key.primary_key.clone(), id);
            }
        }

        let id = record.key(&key.primary_key);
        state
            .tables
            .entry(type_name.to_string())
            .or_default()
            .push(record.clone());
        state
            .journal
            .push(WriteEvent::new(WriteOp::Create, type_name, id.clone(), 1));

        debug!(id = ?id, "Created record");

        Ok(record)
    }

    #[instrument(skip(self, fields))]
    async fn update(&self, type_name: &str, id: &Value, fields: FieldMap) -> RepoResult<()> {
        let mut state = self.state.write().await;
        let key = state.key(type_name);

        let record = state
            .tables
            .get_mut(type_name)
            .and_then(|table| {
                table.iter_mut().find(|record| {
                    record
                        .get(&key.primary_key)
                        .is_some_and(|value| keys_equal(value, id))
                })
            })
            .ok_or_else(|| RepositoryError::NotFound {
                type_name: type_name.to_string(),
                id: key_string(id).unwrap_or_default(),
            })?;
        record.merge(fields);

        state
            .journal
            .push(WriteEvent::new(WriteOp::Update, type_name, key_string(id), 1));

        debug!("Updated record");

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_where(&self, type_name: &str, filter: &Filter) -> RepoResult<()> {
        let mut state = self.state.write().await;

        let removed = match state.tables.get_mut(type_name) {
            Some(table) => {
                let before = table.len();
                table.retain(|record| !filter.matches(record));
                before - table.len()
            }
            None => 0,
        };

        state
            .journal
            .push(WriteEvent::new(WriteOp::Delete, type_name, None, removed));

        debug!(removed, "Deleted records");

        Ok(())
    }
}
