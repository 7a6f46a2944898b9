//! Shared fixtures for repository-backed tests.

#![allow(dead_code)]

use relink_core::{BaseUrl, LinkBuilder, Record, Schema};
use relink_memory::MemoryRepository;
use serde_json::{Value, json};

pub const BLOG_SCHEMA: &str = r#"{
  "models": {
    "person": {
      "plural": "people",
      "relations": {
        "posts": { "type": "hasMany", "model": "post", "foreignKey": "authorId" },
        "mentor": { "type": "belongsTo", "model": "person" },
        "mentees": { "type": "hasMany", "model": "person", "foreignKey": "mentorId" },
        "notes": { "type": "hasMany", "model": "note", "polymorphic": "notable" }
      }
    },
    "post": {
      "relations": {
        "author": { "type": "belongsTo", "model": "person" },
        "comments": { "type": "hasMany", "model": "comment" },
        "cover": { "type": "hasOne", "model": "cover" },
        "tags": { "type": "hasMany", "model": "tag", "through": "postTag" },
        "notes": { "type": "hasMany", "model": "note", "polymorphic": "notable" }
      }
    },
    "comment": {
      "relations": {
        "post": { "type": "belongsTo", "model": "post" },
        "author": { "type": "belongsTo", "model": "person" }
      }
    },
    "cover": {
      "relations": {
        "post": { "type": "belongsTo", "model": "post" }
      }
    },
    "tag": {
      "idType": "string",
      "relations": {
        "posts": { "type": "hasMany", "model": "post", "through": "postTag" }
      }
    },
    "postTag": {},
    "note": {
      "relations": {
        "notable": { "type": "belongsTo", "polymorphic": "notable" }
      }
    }
  }
}"#;

pub fn schema() -> Schema {
    Schema::from_json(BLOG_SCHEMA).expect("fixture schema is valid")
}

pub fn links() -> LinkBuilder {
    LinkBuilder::new(
        BaseUrl::new("http://localhost:3000").expect("valid host"),
        "/api",
    )
}

pub fn record(value: Value) -> Record {
    Record::from_value(value).expect("fixture record is an object")
}

/// A repository seeded with a small blog.
pub async fn seeded(schema: &Schema) -> MemoryRepository {
    let repo = MemoryRepository::new(schema);
    let rows = [
        ("person", json!({"id": 1, "name": "Ada"})),
        ("person", json!({"id": 2, "name": "Grace", "mentorId": 1})),
        ("person", json!({"id": 3, "name": "Linus", "mentorId": 1})),
        ("post", json!({"id": 1, "title": "Hello", "authorId": 1})),
        ("post", json!({"id": 2, "title": "Second", "authorId": 2})),
        ("post", json!({"id": 3, "title": "Orphan", "authorId": null})),
        ("comment", json!({"id": 10, "body": "first", "postId": 1, "authorId": 2})),
        ("comment", json!({"id": 11, "body": "second", "postId": 1, "authorId": 3})),
        ("comment", json!({"id": 12, "body": "other", "postId": 2, "authorId": 1})),
        ("cover", json!({"id": 20, "url": "hello.png", "postId": 1})),
        ("tag", json!({"id": "rust", "label": "Rust"})),
        ("tag", json!({"id": "web", "label": "Web"})),
        ("tag", json!({"id": "db", "label": "Databases"})),
        ("postTag", json!({"id": 1, "postId": 1, "tagId": "rust"})),
        ("postTag", json!({"id": 2, "postId": 1, "tagId": "web"})),
        ("note", json!({"id": 30, "text": "on post", "notableId": 1, "notableType": "post"})),
        ("note", json!({"id": 31, "text": "on person", "notableId": 1, "notableType": "person"})),
    ];
    for (type_name, value) in rows {
        repo.insert(type_name, record(value)).await;
    }
    repo
}

/// Ids of every record in a table, as canonical strings.
pub async fn ids(repo: &MemoryRepository, type_name: &str) -> Vec<String> {
    repo.records(type_name)
        .await
        .iter()
        .filter_map(|r| r.key("id"))
        .collect()
}
