//! Include paths.
//!
//! An include request (`author.posts,comments` or a nested structure) is
//! parsed into [`IncludeChain`]s and merged into an [`IncludeTree`] so
//! that chains sharing a prefix fetch that prefix once.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::Error;
use crate::schema::Schema;

/// A dotted include path: `author.posts.comments`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IncludeChain(Vec<String>);

impl IncludeChain {
    /// Create a chain from relation names.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInclude` if the chain or any segment is empty.
    pub fn new(segments: Vec<String>) -> Result<Self, Error> {
        let path = segments.join(".");
        if segments.is_empty() {
            return Err(invalid(&path, "empty include path"));
        }
        if segments.iter().any(|s| s.trim().is_empty()) {
            return Err(invalid(&path, "empty relation name"));
        }
        Ok(Self(segments))
    }

    /// Parse a single dotted path.
    pub fn parse(path: &str) -> Result<Self, Error> {
        let segments = path.trim().split('.').map(|s| s.trim().to_string()).collect();
        Self::new(segments).map_err(|_| invalid(path, "empty relation name"))
    }

    /// Parse a comma-separated list of dotted paths.
    ///
    /// Blank entries (`"a,,b"`, trailing commas) are skipped; a blank
    /// segment inside a path is an error.
    pub fn parse_list(list: &str) -> Result<Vec<Self>, Error> {
        let mut chains = Vec::new();
        for entry in list.split(',') {
            if entry.trim().is_empty() {
                continue;
            }
            chains.push(Self::parse(entry)?);
        }
        Ok(dedup(chains))
    }

    /// Parse a nested include structure.
    ///
    /// Accepts a path string, an array of entries, an object mapping a
    /// relation to nested includes (`{"author": {"posts": "comments"}}`)
    /// or the scoped form `{"relation": "posts", "scope": {"include": ...}}`.
    pub fn parse_value(value: &Value) -> Result<Vec<Self>, Error> {
        let chains = match value {
            Value::Null => Vec::new(),
            Value::String(list) => Self::parse_list(list)?,
            Value::Array(items) => {
                let mut chains = Vec::new();
                for item in items {
                    chains.extend(Self::parse_value(item)?);
                }
                chains
            }
            Value::Object(map) => {
                if let Some(relation) = map.get("relation") {
                    let name = relation
                        .as_str()
                        .ok_or_else(|| invalid(&relation.to_string(), "relation must be a string"))?;
                    let nested = map
                        .get("scope")
                        .and_then(|scope| scope.get("include"))
                        .unwrap_or(&Value::Null);
                    prefixed(name, nested)?
                } else {
                    let mut chains = Vec::new();
                    for (name, nested) in map {
                        chains.extend(prefixed(name, nested)?);
                    }
                    chains
                }
            }
            other => return Err(invalid(&other.to_string(), "unsupported include value")),
        };
        Ok(dedup(chains))
    }

    /// Relation names in order.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; chains have at least one segment.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for IncludeChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl Serialize for IncludeChain {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

fn invalid(path: &str, reason: &str) -> Error {
    Error::InvalidInclude {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

// `name` itself plus `name.<nested>` for every nested chain.
fn prefixed(name: &str, nested: &Value) -> Result<Vec<IncludeChain>, Error> {
    let head = IncludeChain::parse(name)?;
    let mut chains = vec![head.clone()];
    for tail in IncludeChain::parse_value(nested)? {
        let mut segments = head.0.clone();
        segments.extend(tail.0);
        chains.push(IncludeChain(segments));
    }
    Ok(chains)
}

fn dedup(chains: Vec<IncludeChain>) -> Vec<IncludeChain> {
    let mut seen = BTreeSet::new();
    chains
        .into_iter()
        .filter(|chain| seen.insert(chain.to_string()))
        .collect()
}

/// Include chains merged by shared prefix.
///
/// Children keep first-seen order so `included` is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeTree {
    children: Vec<(String, IncludeTree)>,
}

impl IncludeTree {
    /// Merge chains into a tree.
    pub fn from_chains<'a>(chains: impl IntoIterator<Item = &'a IncludeChain>) -> Self {
        let mut tree = Self::default();
        for chain in chains {
            tree.insert(chain);
        }
        tree
    }

    /// Merge one chain into the tree.
    pub fn insert(&mut self, chain: &IncludeChain) {
        let mut node = self;
        for segment in chain.segments() {
            let position = match node.children.iter().position(|(name, _)| name == segment) {
                Some(position) => position,
                None => {
                    node.children.push((segment.clone(), IncludeTree::default()));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[position].1;
        }
    }

    /// Direct children: relation name and the subtree below it.
    pub fn children(&self) -> impl Iterator<Item = (&str, &IncludeTree)> {
        self.children.iter().map(|(name, tree)| (name.as_str(), tree))
    }

    /// Returns true if nothing is included.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Relation names directly below this node.
    pub fn relation_names(&self) -> BTreeSet<String> {
        self.children.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Check every path against the schema, starting from `root_type`.
    ///
    /// A segment below a polymorphic `belongsTo` may be declared on any
    /// model; it is valid if at least one candidate declares it.
    ///
    /// # Errors
    ///
    /// `InvalidInclude` naming the first path that does not resolve.
    pub fn validate(&self, schema: &Schema, root_type: &str) -> Result<(), Error> {
        schema.model(root_type)?;
        let roots = BTreeSet::from([root_type.to_string()]);
        self.validate_from(schema, &roots, "")
    }

    fn validate_from(
        &self,
        schema: &Schema,
        types: &BTreeSet<String>,
        prefix: &str,
    ) -> Result<(), Error> {
        for (name, child) in &self.children {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}.{}", prefix, name)
            };

            let mut next = BTreeSet::new();
            let mut declared = false;
            for type_name in types {
                let Some(relation) = schema.model(type_name)?.relation(name) else {
                    continue;
                };
                declared = true;
                match &relation.related_type {
                    Some(related) => {
                        next.insert(related.clone());
                    }
                    None => next.extend(schema.models().map(|m| m.name().to_string())),
                }
            }

            if !declared {
                let candidates: Vec<&str> = types.iter().map(String::as_str).collect();
                return Err(invalid(
                    &path,
                    &format!("no relation '{}' on {}", name, candidates.join(" or ")),
                ));
            }

            child.validate_from(schema, &next, &path)?;
        }
        Ok(())
    }
}
