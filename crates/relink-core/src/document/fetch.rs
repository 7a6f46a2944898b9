//! Loading related records for a set of owners.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::Result;
use crate::schema::{RelationDescriptor, RelationKind, Schema};
use crate::traits::{Filter, Repository};
use crate::types::{Record, key_string};

/// A record together with the model it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedRecord {
    pub type_name: String,
    pub record: Record,
}

impl RelatedRecord {
    pub fn new(type_name: &str, record: Record) -> Self {
        Self {
            type_name: type_name.to_string(),
            record,
        }
    }
}

/// Related records grouped by owner key, in repository order.
#[derive(Debug, Clone, Default)]
pub struct RelatedSet {
    by_owner: HashMap<String, Vec<RelatedRecord>>,
    single: bool,
}

impl RelatedSet {
    fn new(single: bool) -> Self {
        Self {
            by_owner: HashMap::new(),
            single,
        }
    }

    fn push(&mut self, owner_key: String, related: RelatedRecord) {
        let entries = self.by_owner.entry(owner_key).or_default();
        if self.single && !entries.is_empty() {
            return;
        }
        entries.push(related);
    }

    /// Related records of one owner, by the owner's canonical key.
    pub fn for_owner(&self, owner_key: &str) -> &[RelatedRecord] {
        self.by_owner
            .get(owner_key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of related records across owners.
    pub fn len(&self) -> usize {
        self.by_owner.values().map(Vec::len).sum()
    }

    /// Returns true if no owner has related records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fetch the records related to `owners` through one relation.
///
/// Issues one `find` per target model (one for fixed relations, one per
/// discriminator value for a polymorphic `belongsTo`, two for through
/// relations) regardless of how many owners are given.
#[instrument(skip_all, fields(relation = %descriptor.name, owner = %descriptor.owner_type, owners = owners.len()))]
pub async fn fetch_related<R: Repository + ?Sized>(
    repo: &R,
    schema: &Schema,
    descriptor: &RelationDescriptor,
    owners: Vec<Record>,
) -> Result<RelatedSet> {
    let owner_model = schema.model(&descriptor.owner_type)?;
    let owner_pk = owner_model.primary_key();
    let owner_ids: Vec<Value> = unique_values(owners.iter().filter_map(|o| o.get(owner_pk)));

    let set = match &descriptor.kind {
        RelationKind::BelongsTo { foreign_key } => {
            let mut set = RelatedSet::new(true);
            let mut by_type: BTreeMap<String, Vec<(String, &Value)>> = BTreeMap::new();

            for owner in &owners {
                let (Some(owner_key), Some(target_id)) =
                    (owner.key(owner_pk), owner.get(foreign_key).filter(|v| !v.is_null()))
                else {
                    continue;
                };
                let target = match &descriptor.related_type {
                    Some(related) => related.clone(),
                    None => {
                        let Some(discriminator) = descriptor.discriminator().and_then(|d| owner.key(d))
                        else {
                            continue;
                        };
                        match schema.model_for_wire_type(&discriminator) {
                            Some(model) => model.name().to_string(),
                            None => {
                                warn!(%discriminator, "Discriminator names no known model");
                                continue;
                            }
                        }
                    }
                };
                by_type.entry(target).or_default().push((owner_key, target_id));
            }

            for (target, links) in by_type {
                let model = schema.model(&target)?;
                let ids = unique_values(links.iter().map(|(_, id)| *id));
                let records = repo
                    .find(&target, &Filter::new().one_of(model.primary_key(), ids))
                    .await?;
                let index = index_by(records, model.primary_key());
                for (owner_key, target_id) in links {
                    if let Some(record) = key_string(target_id).and_then(|key| index.get(&key)) {
                        set.push(owner_key, RelatedRecord::new(&target, record.clone()));
                    }
                }
            }
            set
        }
        RelationKind::HasOne { foreign_key } | RelationKind::HasMany { foreign_key } => {
            let mut set = RelatedSet::new(!descriptor.is_to_many());
            let Some(related) = descriptor.related_type.as_deref() else {
                return Ok(set);
            };
            if owner_ids.is_empty() {
                return Ok(set);
            }

            let mut filter = Filter::new().one_of(foreign_key.as_str(), owner_ids);
            if let Some(discriminator) = descriptor.discriminator() {
                filter = filter.eq(discriminator, Value::String(descriptor.owner_type.clone()));
            }

            for record in repo.find(related, &filter).await? {
                if let Some(owner_key) = record.key(foreign_key) {
                    set.push(owner_key, RelatedRecord::new(related, record));
                }
            }
            set
        }
        RelationKind::HasManyThrough {
            through,
            key_through_self,
            key_through_related,
        } => {
            let mut set = RelatedSet::new(false);
            let Some(related) = descriptor.related_type.as_deref() else {
                return Ok(set);
            };
            if owner_ids.is_empty() {
                return Ok(set);
            }

            let mut filter = Filter::new().one_of(key_through_self.as_str(), owner_ids);
            if let Some(discriminator) = descriptor.discriminator() {
                filter = filter.eq(discriminator, Value::String(descriptor.owner_type.clone()));
            }
            let rows = repo.find(through, &filter).await?;

            let related_ids = unique_values(rows.iter().filter_map(|row| row.get(key_through_related)));
            if related_ids.is_empty() {
                return Ok(set);
            }

            let model = schema.model(related)?;
            let records = repo
                .find(related, &Filter::new().one_of(model.primary_key(), related_ids))
                .await?;
            let index = index_by(records, model.primary_key());

            let mut linked = HashSet::new();
            for row in rows {
                let (Some(owner_key), Some(related_key)) =
                    (row.key(key_through_self), row.key(key_through_related))
                else {
                    continue;
                };
                if !linked.insert((owner_key.clone(), related_key.clone())) {
                    continue;
                }
                if let Some(record) = index.get(&related_key) {
                    set.push(owner_key, RelatedRecord::new(related, record.clone()));
                }
            }
            set
        }
    };

    debug!(related = set.len(), "Fetched related records");

    Ok(set)
}

// Non-null values, first occurrence kept, compared by canonical key.
fn unique_values<'a>(values: impl Iterator<Item = &'a Value>) -> Vec<Value> {
    let mut seen = HashSet::new();
    values
        .filter(|v| key_string(v).is_some_and(|k| seen.insert(k)))
        .cloned()
        .collect()
}

fn index_by(records: Vec<Record>, field: &str) -> HashMap<String, Record> {
    records
        .into_iter()
        .filter_map(|record| record.key(field).map(|key| (key, record)))
        .collect()
}
