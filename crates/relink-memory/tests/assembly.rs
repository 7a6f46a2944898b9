//! Compound document assembly against the in-memory repository.

mod common;

use std::collections::HashSet;

use relink_core::{
    Assembler, Error, Filter, GraphMutator, IncludeChain, ModelBuilder, Primary, PrimaryData,
    RelationDefinition, RelationshipData, Schema,
};
use relink_memory::MemoryRepository;
use serde_json::json;

use common::{links, record, schema, seeded};

fn include(list: &str) -> Vec<IncludeChain> {
    IncludeChain::parse_list(list).unwrap()
}

#[tokio::test]
async fn resource_without_include_has_links_only() {
    let schema = schema();
    let repo = seeded(&schema).await;
    let links = links();
    let assembler = Assembler::new(&schema, &repo, &links);

    let document = assembler.resource_document("post", "1", &[]).await.unwrap();
    let value = document.to_value();

    assert_eq!(value["data"]["type"], "posts");
    assert_eq!(value["data"]["id"], "1");
    assert_eq!(value["data"]["attributes"], json!({"title": "Hello"}));
    assert_eq!(
        value["data"]["relationships"]["author"],
        json!({"links": {"related": "http://localhost:3000/api/posts/1/author"}})
    );
    assert_eq!(value["links"]["self"], "http://localhost:3000/api/posts/1");
    assert!(value.get("included").is_none());
}

#[tokio::test]
async fn included_resources_are_deduplicated_across_chains() {
    let schema = schema();
    let repo = seeded(&schema).await;
    let links = links();
    let assembler = Assembler::new(&schema, &repo, &links);

    let document = assembler
        .resource_document("post", "1", &include("author,comments.author,comments"))
        .await
        .unwrap();

    let identities: Vec<(String, String)> = document
        .included
        .iter()
        .map(|r| (r.type_name.clone(), r.id.clone()))
        .collect();
    let unique: HashSet<_> = identities.iter().cloned().collect();
    assert_eq!(identities.len(), unique.len());
    assert_eq!(
        identities,
        vec![
            ("people".to_string(), "1".to_string()),
            ("comments".to_string(), "10".to_string()),
            ("comments".to_string(), "11".to_string()),
            ("people".to_string(), "2".to_string()),
            ("people".to_string(), "3".to_string()),
        ]
    );

    let post = document.primary()[0];
    assert_eq!(
        post.relationship_data("comments"),
        Some(&RelationshipData::ToMany(vec![
            relink_core::ReferenceObject::new("comments", "10"),
            relink_core::ReferenceObject::new("comments", "11"),
        ]))
    );

    let comment = document.find_included("comments", "10").unwrap();
    assert_eq!(
        comment.relationship_data("author"),
        Some(&RelationshipData::ToOne(Some(
            relink_core::ReferenceObject::new("people", "2")
        )))
    );
    // Only the requested relations carry data.
    assert!(comment.relationship_data("post").is_none());
}

#[tokio::test]
async fn primary_resources_are_not_repeated_in_included() {
    let schema = schema();
    let repo = seeded(&schema).await;
    let links = links();
    let assembler = Assembler::new(&schema, &repo, &links);

    let document = assembler
        .resource_document("post", "1", &include("comments.post"))
        .await
        .unwrap();

    assert!(document.find_included("posts", "1").is_none());
    assert_eq!(document.included.len(), 2);
}

#[tokio::test]
async fn collection_shares_related_fetches() {
    let schema = schema();
    let repo = seeded(&schema).await;
    let links = links();
    let assembler = Assembler::new(&schema, &repo, &links);

    let document = assembler
        .collection_document("post", &Filter::new(), &include("author"))
        .await
        .unwrap();

    let PrimaryData::Many(posts) = &document.data else {
        panic!("expected a collection");
    };
    assert_eq!(posts.len(), 3);
    assert_eq!(
        posts[2].relationship_data("author"),
        Some(&RelationshipData::ToOne(None))
    );

    let people: Vec<&str> = document.included.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(people, vec!["1", "2"]);
    assert_eq!(
        document.links.as_ref().and_then(|l| l.self_link.as_deref()),
        Some("http://localhost:3000/api/posts")
    );
}

#[tokio::test]
async fn through_and_has_one_includes() {
    let schema = schema();
    let repo = seeded(&schema).await;
    let links = links();
    let assembler = Assembler::new(&schema, &repo, &links);

    let document = assembler
        .resource_document("post", "1", &include("tags,cover"))
        .await
        .unwrap();

    let post = document.primary()[0];
    assert_eq!(
        post.relationship_data("tags"),
        Some(&RelationshipData::ToMany(vec![
            relink_core::ReferenceObject::new("tags", "rust"),
            relink_core::ReferenceObject::new("tags", "web"),
        ]))
    );
    assert_eq!(
        post.relationship_data("cover"),
        Some(&RelationshipData::ToOne(Some(
            relink_core::ReferenceObject::new("covers", "20")
        )))
    );

    let cover = document.find_included("covers", "20").unwrap();
    assert!(!cover.attributes.contains_key("postId"));
    assert!(document.find_included("tags", "db").is_none());
}

#[tokio::test]
async fn polymorphic_targets_resolve_per_record() {
    let schema = schema();
    let repo = seeded(&schema).await;
    let links = links();
    let assembler = Assembler::new(&schema, &repo, &links);

    let document = assembler
        .collection_document("note", &Filter::new(), &include("notable"))
        .await
        .unwrap();

    assert!(document.find_included("posts", "1").is_some());
    assert!(document.find_included("people", "1").is_some());

    let note = document.primary()[0];
    assert!(!note.attributes.contains_key("notableType"));
    assert_eq!(
        note.relationship_data("notable"),
        Some(&RelationshipData::ToOne(Some(
            relink_core::ReferenceObject::new("posts", "1")
        )))
    );

    // The inverse side filters by discriminator.
    let person = assembler
        .resource_document("person", "1", &include("notes"))
        .await
        .unwrap();
    let ids: Vec<&str> = person.included.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["31"]);
}

#[tokio::test]
async fn reflexive_includes_terminate() {
    let schema = schema();
    let repo = seeded(&schema).await;
    let links = links();
    let assembler = Assembler::new(&schema, &repo, &links);

    let document = assembler
        .resource_document("person", "1", &include("mentees.mentor.mentees"))
        .await
        .unwrap();

    let ids: Vec<&str> = document.included.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "3"]);
}

#[tokio::test]
async fn invalid_include_fails_before_fetching() {
    let schema = schema();
    let repo = seeded(&schema).await;
    let links = links();
    let assembler = Assembler::new(&schema, &repo, &links);

    let err = assembler
        .resource_document("post", "1", &include("comments.nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInclude { ref path, .. } if path == "comments.nope"));
    assert_eq!(err.to_document()["errors"][0]["source"]["parameter"], "include");
}

#[tokio::test]
async fn missing_resource_is_not_found() {
    let schema = schema();
    let repo = seeded(&schema).await;
    let links = links();
    let assembler = Assembler::new(&schema, &repo, &links);

    for id in ["99", "abc"] {
        let err = assembler
            .resource_document("post", id, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ResourceNotFound { .. }));
        assert_eq!(err.status(), 404);
    }
}

#[tokio::test]
async fn attributeless_related_records_are_omitted() {
    let schema = schema();
    let repo = seeded(&schema).await;
    repo.insert("person", record(json!({"id": 4}))).await;
    repo.insert("post", record(json!({"id": 4, "title": "x", "authorId": 4})))
        .await;
    let links = links();
    let assembler = Assembler::new(&schema, &repo, &links);

    let document = assembler
        .resource_document("post", "4", &include("author"))
        .await
        .unwrap();

    assert_eq!(
        document.primary()[0].relationship_data("author"),
        Some(&RelationshipData::ToOne(Some(
            relink_core::ReferenceObject::new("people", "4")
        )))
    );
    assert!(document.included.is_empty());
}

#[tokio::test]
async fn default_includes_are_merged() {
    let schema = Schema::builder()
        .model(
            ModelBuilder::new("comment")
                .default_include("author")
                .relation("author", RelationDefinition::belongs_to("person")),
        )
        .model(ModelBuilder::new("person").plural("people"))
        .build()
        .unwrap();
    let repo = MemoryRepository::new(&schema);
    repo.insert("person", record(json!({"id": 1, "name": "Ada"}))).await;
    repo.insert("comment", record(json!({"id": 1, "body": "b", "authorId": 1})))
        .await;
    let links = links();
    let assembler = Assembler::new(&schema, &repo, &links);

    let document = assembler
        .assemble(
            "comment",
            Primary::One(Some(record(json!({"id": 1, "body": "b", "authorId": 1})))),
            &[],
        )
        .await
        .unwrap();
    assert!(document.find_included("people", "1").is_some());
}

#[tokio::test]
async fn relationship_document_is_linkage_only() {
    let schema = schema();
    let repo = seeded(&schema).await;
    let links = links();
    let assembler = Assembler::new(&schema, &repo, &links);

    let document = assembler
        .relationship_document("post", "1", "comments")
        .await
        .unwrap();

    assert_eq!(
        document.to_value(),
        json!({
            "data": [
                {"type": "comments", "id": "10"},
                {"type": "comments", "id": "11"}
            ],
            "links": {
                "self": "http://localhost:3000/api/posts/1/relationships/comments",
                "related": "http://localhost:3000/api/posts/1/comments"
            }
        })
    );

    let author = assembler
        .relationship_document("post", "3", "author")
        .await
        .unwrap();
    assert_eq!(author.to_value()["data"], json!(null));

    let err = assembler
        .relationship_document("post", "1", "editor")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownRelation { .. }));
}

#[tokio::test]
async fn related_document_drops_the_partition_key() {
    let schema = schema();
    let repo = seeded(&schema).await;
    let links = links();
    let assembler = Assembler::new(&schema, &repo, &links);

    let document = assembler
        .related_document("post", "1", "comments", &include("author"))
        .await
        .unwrap();

    let comments = document.primary();
    assert_eq!(comments.len(), 2);
    for comment in &comments {
        assert!(!comment.attributes.contains_key("postId"));
        assert!(!comment.relationships.contains_key("post"));
        assert!(comment.relationships.contains_key("author"));
    }
    assert_eq!(document.included.len(), 2);
    assert_eq!(
        document.links.as_ref().and_then(|l| l.self_link.as_deref()),
        Some("http://localhost:3000/api/posts/1/comments")
    );

    let author = assembler
        .related_document("post", "3", "author", &[])
        .await
        .unwrap();
    assert_eq!(author.to_value()["data"], json!(null));
}

#[tokio::test]
async fn composed_linkage_round_trips_through_the_mutator() {
    let schema = schema();
    let repo = seeded(&schema).await;
    let links = links();
    let assembler = Assembler::new(&schema, &repo, &links);
    let mutator = GraphMutator::new(&schema, &repo);

    let document = assembler
        .resource_document("post", "1", &include("author,comments,tags,cover"))
        .await
        .unwrap();
    let post = document.primary()[0];

    for relation in ["author", "comments", "tags", "cover"] {
        let data = post.relationship_data(relation).unwrap();
        mutator
            .apply_relationship(
                "post",
                &json!(1),
                schema.resolve("post", relation).unwrap(),
                data,
            )
            .await
            .unwrap();
    }

    // Only the owning foreign key is rewritten; every other relation
    // already matches.
    let journal = repo.journal().await;
    assert_eq!(journal.len(), 1);
    assert_eq!(journal[0].type_name, "post");
}
