//! Compound document assembly.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use futures_util::future::try_join_all;
use tracing::{debug, instrument};

use super::compose::{ComposeContext, ResourceComposer};
use super::fetch::fetch_related;
use super::include::{IncludeChain, IncludeTree};
use super::resource::{CompoundDocument, Links, PrimaryData};
use crate::Result;
use crate::error::Error;
use crate::schema::{ModelDef, RelationDescriptor, RelationKind, Schema};
use crate::traits::{Filter, Repository, UrlBuilder};
use crate::types::Record;

/// Primary data handed to the assembler.
#[derive(Debug, Clone, PartialEq)]
pub enum Primary {
    /// A single record, or none.
    One(Option<Record>),
    /// A collection, in the order it should appear in `data`.
    Many(Vec<Record>),
}

impl Primary {
    fn records(&self) -> Vec<&Record> {
        match self {
            Self::One(record) => record.iter().collect(),
            Self::Many(records) => records.iter().collect(),
        }
    }
}

/// Builds compound documents from a repository.
pub struct Assembler<'a, R: Repository + ?Sized> {
    schema: &'a Schema,
    repo: &'a R,
    links: &'a dyn UrlBuilder,
}

struct Entry {
    type_name: String,
    id: String,
    record: Record,
    ctx: ComposeContext,
}

// Every resource reached while assembling, once per (type, id).
#[derive(Default)]
struct Graph {
    entries: Vec<Entry>,
    index: HashMap<(String, String), usize>,
}

impl Graph {
    fn add(&mut self, schema: &Schema, type_name: &str, record: Record, top_level: bool) -> Result<usize> {
        let model = schema.model(type_name)?;
        let id = record_id(model, &record)?;
        let key = (type_name.to_string(), id.clone());

        if let Some(&position) = self.index.get(&key) {
            if top_level {
                self.entries[position].ctx.top_level = true;
            }
            return Ok(position);
        }

        let ctx = if top_level {
            ComposeContext::top_level()
        } else {
            ComposeContext::included()
        };
        self.entries.push(Entry {
            type_name: type_name.to_string(),
            id,
            record,
            ctx,
        });
        self.index.insert(key, self.entries.len() - 1);
        Ok(self.entries.len() - 1)
    }
}

impl<'a, R: Repository + ?Sized> Assembler<'a, R> {
    pub fn new(schema: &'a Schema, repo: &'a R, links: &'a dyn UrlBuilder) -> Self {
        Self {
            schema,
            repo,
            links,
        }
    }

    /// Assemble a document for already-loaded primary records.
    ///
    /// The model's default includes are merged with `includes`, and the
    /// whole include tree is validated before anything is fetched. Each
    /// level of the tree is fetched with one query per relation and
    /// owner type, concurrently. A resource reachable along several
    /// paths is emitted once; primary resources never appear in
    /// `included`.
    ///
    /// # Errors
    ///
    /// `InvalidInclude` for a path that does not resolve, `UnknownType`
    /// for an undeclared type, or any repository failure.
    pub async fn assemble(
        &self,
        type_name: &str,
        primary: Primary,
        includes: &[IncludeChain],
    ) -> Result<CompoundDocument> {
        self.assemble_partitioned(type_name, primary, includes, None)
            .await
    }

    #[instrument(skip(self, primary, includes))]
    async fn assemble_partitioned(
        &self,
        type_name: &str,
        primary: Primary,
        includes: &[IncludeChain],
        partition_key: Option<&str>,
    ) -> Result<CompoundDocument> {
        let model = self.schema.model(type_name)?;

        let tree = IncludeTree::from_chains(model.default_include().iter().chain(includes));
        tree.validate(self.schema, type_name)?;

        let mut graph = Graph::default();
        let mut roots = Vec::new();
        for record in primary.records() {
            let position = graph.add(self.schema, type_name, record.clone(), true)?;
            graph.entries[position].ctx.partition_key = partition_key.map(str::to_string);
            if !roots.contains(&position) {
                roots.push(position);
            }
        }

        let mut queue = VecDeque::from([(roots.clone(), &tree)]);
        while let Some((owners, node)) = queue.pop_front() {
            let mut by_type: BTreeMap<String, Vec<usize>> = BTreeMap::new();
            for &owner in &owners {
                by_type
                    .entry(graph.entries[owner].type_name.clone())
                    .or_default()
                    .push(owner);
            }

            let mut jobs: Vec<(&RelationDescriptor, Vec<usize>, &IncludeTree)> = Vec::new();
            for (relation, child) in node.children() {
                for (owner_type, group) in &by_type {
                    // Polymorphic targets may not all declare the relation.
                    if let Some(descriptor) = self.schema.model(owner_type)?.relation(relation) {
                        jobs.push((descriptor, group.clone(), child));
                    }
                }
            }

            let fetches = jobs.iter().map(|(descriptor, group, _)| {
                let records = group
                    .iter()
                    .map(|&owner| graph.entries[owner].record.clone())
                    .collect();
                fetch_related(self.repo, self.schema, descriptor, records)
            });
            let results = try_join_all(fetches).await?;

            for ((descriptor, group, child), set) in jobs.into_iter().zip(results) {
                let mut next = Vec::new();
                let mut queued = HashSet::new();
                for owner in group {
                    let related = set.for_owner(&graph.entries[owner].id).to_vec();
                    for item in &related {
                        let position =
                            graph.add(self.schema, &item.type_name, item.record.clone(), false)?;
                        if queued.insert(position) {
                            next.push(position);
                        }
                    }
                    graph.entries[owner].ctx = std::mem::take(&mut graph.entries[owner].ctx)
                        .with_related(&descriptor.name, related);
                }
                if !child.is_empty() && !next.is_empty() {
                    queue.push_back((next, child));
                }
            }
        }

        let composer = ResourceComposer::new(self.schema, self.links);
        let primary_positions: HashSet<usize> = roots.iter().copied().collect();

        let mut data = Vec::with_capacity(roots.len());
        for &position in &roots {
            let entry = &graph.entries[position];
            if let Some(resource) = composer.compose(&entry.type_name, &entry.record, &entry.ctx)? {
                data.push(resource);
            }
        }

        let mut included = Vec::new();
        for (position, entry) in graph.entries.iter().enumerate() {
            if primary_positions.contains(&position) {
                continue;
            }
            if let Some(resource) = composer.compose(&entry.type_name, &entry.record, &entry.ctx)? {
                included.push(resource);
            }
        }

        debug!(
            primary = data.len(),
            included = included.len(),
            "Assembled document"
        );

        let data = match primary {
            Primary::One(_) => PrimaryData::Single(data.into_iter().next()),
            Primary::Many(_) => PrimaryData::Many(data),
        };

        Ok(CompoundDocument {
            data,
            included,
            links: None,
        })
    }

    /// Document for one resource by id.
    ///
    /// # Errors
    ///
    /// `ResourceNotFound` if no record has the id.
    pub async fn resource_document(
        &self,
        type_name: &str,
        id: &str,
        includes: &[IncludeChain],
    ) -> Result<CompoundDocument> {
        let model = self.schema.model(type_name)?;
        let record = self.load(model, id).await?;

        let mut document = self
            .assemble(type_name, Primary::One(Some(record)), includes)
            .await?;
        document.links = Some(self_link(self.links.build(model.plural(), Some(id), None)));
        Ok(document)
    }

    /// Document for every record of a type matching `filter`.
    pub async fn collection_document(
        &self,
        type_name: &str,
        filter: &Filter,
        includes: &[IncludeChain],
    ) -> Result<CompoundDocument> {
        let model = self.schema.model(type_name)?;
        let records = self.repo.find(type_name, filter).await?;

        let mut document = self
            .assemble(type_name, Primary::Many(records), includes)
            .await?;
        document.links = Some(self_link(self.links.build(model.plural(), None, None)));
        Ok(document)
    }

    /// Linkage-only document for `/{type}/{id}/relationships/{relation}`.
    ///
    /// # Errors
    ///
    /// `ResourceNotFound` if the owner does not exist, `UnknownRelation`
    /// if the type declares no such relation.
    pub async fn relationship_document(
        &self,
        type_name: &str,
        id: &str,
        relation: &str,
    ) -> Result<CompoundDocument> {
        let model = self.schema.model(type_name)?;
        let descriptor = self.schema.resolve(type_name, relation)?;
        let record = self.load(model, id).await?;

        let related = match descriptor.kind {
            RelationKind::BelongsTo { .. } => Vec::new(),
            _ => fetch_related(self.repo, self.schema, descriptor, vec![record.clone()])
                .await?
                .for_owner(&record_id(model, &record)?)
                .to_vec(),
        };

        let composer = ResourceComposer::new(self.schema, self.links);
        let linkage = composer.linkage(descriptor, &record, Some(&related))?;

        Ok(CompoundDocument {
            data: PrimaryData::Linkage(linkage),
            included: Vec::new(),
            links: Some(Links {
                self_link: Some(self.links.relationship(model.plural(), id, relation)),
                related: Some(self.links.build(model.plural(), Some(id), Some(relation))),
            }),
        })
    }

    /// Document for `/{type}/{id}/{relation}`: the related resources as
    /// primary data.
    ///
    /// For `hasOne` and `hasMany` the foreign key back to the owner
    /// partitions the result; it is neither an attribute nor a
    /// relationship of the returned resources.
    pub async fn related_document(
        &self,
        type_name: &str,
        id: &str,
        relation: &str,
        includes: &[IncludeChain],
    ) -> Result<CompoundDocument> {
        let model = self.schema.model(type_name)?;
        let descriptor = self.schema.resolve(type_name, relation)?;
        let record = self.load(model, id).await?;
        let links = Some(self_link(self.links.build(model.plural(), Some(id), Some(relation))));

        let mut related = fetch_related(self.repo, self.schema, descriptor, vec![record.clone()])
            .await?
            .for_owner(&record_id(model, &record)?)
            .to_vec();

        let partition_key = match &descriptor.kind {
            RelationKind::HasOne { foreign_key } | RelationKind::HasMany { foreign_key } => {
                Some(foreign_key.as_str())
            }
            _ => None,
        };

        let (target, primary) = if descriptor.is_to_many() {
            let Some(target) = descriptor.related_type.clone() else {
                return Ok(CompoundDocument {
                    data: PrimaryData::Many(Vec::new()),
                    included: Vec::new(),
                    links,
                });
            };
            let records = related.into_iter().map(|item| item.record).collect();
            (target, Primary::Many(records))
        } else {
            if related.is_empty() {
                return Ok(CompoundDocument {
                    data: PrimaryData::Single(None),
                    included: Vec::new(),
                    links,
                });
            }
            let item = related.remove(0);
            (item.type_name, Primary::One(Some(item.record)))
        };

        let mut document = self
            .assemble_partitioned(&target, primary, includes, partition_key)
            .await?;
        document.links = links;
        Ok(document)
    }

    async fn load(&self, model: &ModelDef, id: &str) -> Result<Record> {
        let not_found = || Error::ResourceNotFound {
            type_name: model.name().to_string(),
            id: id.to_string(),
        };
        let key = model.id_value(id).ok_or_else(not_found)?;
        self.repo
            .find_by_id(model.name(), &key)
            .await?
            .ok_or_else(not_found)
    }
}

fn record_id(model: &ModelDef, record: &Record) -> Result<String> {
    record
        .key(model.primary_key())
        .ok_or_else(|| Error::MissingPrimaryKey {
            type_name: model.name().to_string(),
            primary_key: model.primary_key().to_string(),
        })
}

fn self_link(url: String) -> Links {
    Links {
        self_link: Some(url),
        related: None,
    }
}
