#![allow(clippy::unwrap_used, clippy::expect_used)]

//! `SQLite` integration tests: generated predicates executed against a real
//! in-memory database.

use chrono::{DateTime, TimeZone, Utc};
use modkit_predicate::{Clock, PredicateSelectExt, PredicateSet, TypeFamily};
use modkit_query_errors::ErrorCategory;
use sea_orm::{
    ActiveValue::Set, ConnectionTrait, Database, DatabaseConnection, DbBackend, EntityTrait,
    PaginatorTrait, Schema,
};
use serde_json::{Value as Json, json};

mod post {
    use sea_orm::entity::prelude::*;

    #[derive(Debug, Clone, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "posts")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: i64,
        pub title: String,
        pub status: Option<String>,
        pub view_count: Option<i64>,
        pub featured: Option<bool>,
        pub published_at: Option<DateTimeUtc>,
        pub metadata: Option<Json>,
        pub tags: Option<Json>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

fn predicates() -> PredicateSet<post::Entity> {
    PredicateSet::builder("post")
        .fields([
            post::Column::Title,
            post::Column::Status,
            post::Column::ViewCount,
            post::Column::Featured,
            post::Column::PublishedAt,
            post::Column::Metadata,
        ])
        .field_as(post::Column::Tags, TypeFamily::Array)
        .backend(DbBackend::Sqlite)
        // Saturday
        .clock(Clock::fixed(at(2024, 6, 15, 12)))
        .build()
        .unwrap()
}

fn row(model: post::Model) -> post::ActiveModel {
    post::ActiveModel {
        id: Set(model.id),
        title: Set(model.title),
        status: Set(model.status),
        view_count: Set(model.view_count),
        featured: Set(model.featured),
        published_at: Set(model.published_at),
        metadata: Set(model.metadata),
        tags: Set(model.tags),
    }
}

async fn seeded_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let backend = db.get_database_backend();
    let stmt = Schema::new(backend).create_table_from_entity(post::Entity);
    db.execute(backend.build(&stmt)).await.unwrap();

    let rows = vec![
        post::Model {
            id: 1,
            title: "Rust 50% Off".to_owned(),
            status: Some("published".to_owned()),
            view_count: Some(150),
            featured: Some(true),
            published_at: Some(at(2024, 6, 15, 10)),
            metadata: Some(json!({"lang": "en", "draft": false})),
            tags: Some(json!(["rust", "db"])),
        },
        post::Model {
            id: 2,
            title: "   ".to_owned(),
            status: Some("draft".to_owned()),
            view_count: Some(10),
            featured: Some(false),
            published_at: Some(at(2024, 6, 14, 9)),
            metadata: Some(json!({"lang": "de"})),
            tags: Some(json!([])),
        },
        post::Model {
            id: 3,
            title: "Async Rust".to_owned(),
            status: None,
            view_count: None,
            featured: None,
            published_at: Some(at(2024, 6, 10, 0)),
            metadata: None,
            tags: None,
        },
        post::Model {
            id: 4,
            title: "Postgres tips".to_owned(),
            status: Some("published".to_owned()),
            view_count: Some(1000),
            featured: Some(true),
            published_at: Some(at(2024, 5, 20, 8)),
            metadata: Some(json!({"lang": "en", "tier": "pro"})),
            tags: Some(json!(["db"])),
        },
        post::Model {
            id: 5,
            title: "Old post".to_owned(),
            status: Some("archived".to_owned()),
            view_count: Some(5),
            featured: Some(false),
            published_at: Some(at(2023, 12, 31, 23)),
            metadata: Some(json!({"lang": "fr"})),
            tags: Some(json!(["misc", "rust"])),
        },
    ];
    post::Entity::insert_many(rows.into_iter().map(row))
        .exec(&db)
        .await
        .unwrap();
    db
}

fn unscheduled(id: i64, title: &str) -> post::Model {
    post::Model {
        id,
        title: title.to_owned(),
        status: None,
        view_count: None,
        featured: None,
        published_at: None,
        metadata: None,
        tags: None,
    }
}

async fn insert(db: &DatabaseConnection, model: post::Model) {
    post::Entity::insert(row(model)).exec(db).await.unwrap();
}

async fn ids(db: &DatabaseConnection, name: &str, arg: Json) -> Vec<i64> {
    let mut ids: Vec<i64> = post::Entity::find()
        .predicate(&predicates(), name, arg)
        .unwrap()
        .all(db)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    ids.sort_unstable();
    ids
}

#[tokio::test]
async fn string_predicates() {
    let db = seeded_db().await;
    assert_eq!(ids(&db, "title_cont", json!("RUST")).await, vec![1, 3]);
    assert_eq!(ids(&db, "title_cont", json!("50%")).await, vec![1]);
    assert_eq!(ids(&db, "title_cont", json!("%")).await, vec![1]);
    assert_eq!(ids(&db, "title_start", json!("async")).await, vec![3]);
    assert_eq!(ids(&db, "title_end", json!("TIPS")).await, vec![4]);
    assert_eq!(ids(&db, "title_blank", Json::Null).await, vec![2]);
    assert_eq!(ids(&db, "title_present", json!(true)).await, vec![1, 3, 4, 5]);
    assert_eq!(ids(&db, "title_present", json!(false)).await, vec![2]);
}

#[tokio::test]
async fn substring_predicates_match_non_ascii_text_in_stored_case() {
    let db = seeded_db().await;
    insert(&db, unscheduled(6, "Über Rust")).await;
    assert_eq!(ids(&db, "title_cont", json!("Über")).await, vec![6]);
    assert_eq!(ids(&db, "title_start", json!("Über")).await, vec![6]);
    assert_eq!(ids(&db, "title_end", json!("RUST")).await, vec![3, 6]);
    assert_eq!(ids(&db, "title_eq", json!("Über Rust")).await, vec![6]);
}

#[tokio::test]
async fn comparisons_never_match_null() {
    let db = seeded_db().await;
    assert_eq!(ids(&db, "status_eq", Json::Null).await, vec![3]);
    assert_eq!(ids(&db, "status_not_eq", json!("draft")).await, vec![1, 4, 5]);
    assert_eq!(ids(&db, "status_not_eq", Json::Null).await, vec![1, 2, 4, 5]);
    assert_eq!(ids(&db, "status_in", json!([])).await, Vec::<i64>::new());
    assert_eq!(ids(&db, "status_not_in", json!([])).await, vec![1, 2, 4, 5]);
    assert_eq!(ids(&db, "status_not_in", json!(["draft"])).await, vec![1, 4, 5]);
    assert_eq!(ids(&db, "view_count_between", json!([10, 150])).await, vec![1, 2]);
    assert_eq!(ids(&db, "view_count_not_between", json!([10, 150])).await, vec![4, 5]);
    assert_eq!(ids(&db, "view_count_gteq", json!(150)).await, vec![1, 4]);
    assert_eq!(ids(&db, "view_count_null", Json::Null).await, vec![3]);
}

#[tokio::test]
async fn between_excludes_null_temporal_and_numeric_values() {
    let db = seeded_db().await;
    insert(&db, unscheduled(6, "Unscheduled")).await;
    let june = json!(["2024-06-01", "2024-06-30"]);
    assert_eq!(ids(&db, "published_at_between", june.clone()).await, vec![1, 2, 3]);
    assert_eq!(ids(&db, "published_at_not_between", june).await, vec![4, 5]);
    assert_eq!(ids(&db, "published_at_null", Json::Null).await, vec![6]);
    assert_eq!(ids(&db, "view_count_between", json!([0, 2000])).await, vec![1, 2, 4, 5]);
    assert_eq!(ids(&db, "view_count_not_between", json!([10, 150])).await, vec![4, 5]);
    assert_eq!(ids(&db, "view_count_present", json!(true)).await, vec![1, 2, 4, 5]);
    assert_eq!(ids(&db, "view_count_present", json!(false)).await, vec![3, 6]);
}

#[tokio::test]
async fn boolean_false_includes_null() {
    let db = seeded_db().await;
    assert_eq!(ids(&db, "featured_true", Json::Null).await, vec![1, 4]);
    assert_eq!(ids(&db, "featured_false", Json::Null).await, vec![2, 3, 5]);
    assert_eq!(ids(&db, "featured_eq", json!(false)).await, vec![2, 5]);
}

#[tokio::test]
async fn temporal_windows_follow_the_clock() {
    let db = seeded_db().await;
    assert_eq!(ids(&db, "published_at_today", Json::Null).await, vec![1]);
    assert_eq!(ids(&db, "published_at_yesterday", Json::Null).await, vec![2]);
    assert_eq!(ids(&db, "published_at_this_week", Json::Null).await, vec![1, 2, 3]);
    assert_eq!(ids(&db, "published_at_this_month", Json::Null).await, vec![1, 2, 3]);
    assert_eq!(ids(&db, "published_at_this_year", Json::Null).await, vec![1, 2, 3, 4]);
    assert_eq!(ids(&db, "published_at_year", json!(2023)).await, vec![5]);
    assert_eq!(ids(&db, "published_at_month", json!(6)).await, vec![1, 2, 3]);
    assert_eq!(ids(&db, "published_at_day", json!(31)).await, vec![5]);
    assert_eq!(ids(&db, "published_at_within", json!("1d")).await, vec![1]);
    assert_eq!(ids(&db, "published_at_within", json!(259_200)).await, vec![1, 2]);
    assert_eq!(
        ids(&db, "published_at_gteq", json!("2024-06-10")).await,
        vec![1, 2, 3]
    );
}

#[tokio::test]
async fn array_predicates() {
    let db = seeded_db().await;
    assert_eq!(ids(&db, "tags_contains", json!("rust")).await, vec![1, 5]);
    assert_eq!(ids(&db, "tags_overlaps", json!(["db", "misc"])).await, vec![1, 4, 5]);
    assert_eq!(ids(&db, "tags_overlaps", json!([])).await, Vec::<i64>::new());
    assert_eq!(ids(&db, "tags_contains_all", json!(["rust", "db"])).await, vec![1]);
    assert_eq!(ids(&db, "tags_empty", Json::Null).await, vec![2, 3]);
    assert_eq!(ids(&db, "tags_present", Json::Null).await, vec![1, 4, 5]);
}

#[tokio::test]
async fn document_predicates() {
    let db = seeded_db().await;
    assert_eq!(ids(&db, "metadata_has_key", json!("tier")).await, vec![4]);
    assert_eq!(
        ids(&db, "metadata_has_any_key", json!(["tier", "draft"])).await,
        vec![1, 4]
    );
    assert_eq!(
        ids(&db, "metadata_has_all_keys", json!(["lang", "tier"])).await,
        vec![4]
    );
    assert_eq!(ids(&db, "metadata_contains", json!({"lang": "en"})).await, vec![1, 4]);
}

#[tokio::test]
async fn document_contains_matches_nested_fragments() {
    let db = seeded_db().await;
    let mut nested = unscheduled(6, "Nested");
    nested.metadata = Some(json!({
        "lang": "en",
        "author": {"name": "ann", "org": "x"},
        "labels": ["a", "b"],
        "revisions": [{"by": "ann", "n": 1}, {"by": "bob", "n": 2}],
    }));
    insert(&db, nested).await;

    let db = &db;
    let contains = move |fragment: Json| ids(db, "metadata_contains", fragment);
    assert_eq!(contains(json!({"author": {"name": "ann"}})).await, vec![6]);
    assert_eq!(contains(json!({"lang": "en", "author": {"org": "x"}})).await, vec![6]);
    assert_eq!(contains(json!({"author": {}})).await, vec![6]);
    assert_eq!(contains(json!({"author": {"name": "bob"}})).await, Vec::<i64>::new());
    assert_eq!(contains(json!({"labels": ["b"]})).await, vec![6]);
    assert_eq!(contains(json!({"labels": ["b", "c"]})).await, Vec::<i64>::new());
    assert_eq!(contains(json!({"revisions": [{"by": "bob", "n": 2}]})).await, vec![6]);
    assert_eq!(contains(json!({"revisions": [{"by": "bob", "n": 1}]})).await, Vec::<i64>::new());
    assert_eq!(contains(json!({"lang": "en"})).await, vec![1, 4, 6]);
    assert_eq!(contains(json!({"draft": false})).await, vec![1]);
}

#[tokio::test]
async fn applying_a_predicate_twice_is_idempotent() {
    let db = seeded_db().await;
    let set = predicates();
    let twice = post::Entity::find()
        .predicate(&set, "view_count_gt", json!(5))
        .unwrap()
        .predicate(&set, "view_count_gt", json!(5))
        .unwrap()
        .count(&db)
        .await
        .unwrap();
    let once = post::Entity::find()
        .predicate(&set, "view_count_gt", json!(5))
        .unwrap()
        .count(&db)
        .await
        .unwrap();
    assert_eq!(once, twice);
    assert_eq!(once, 3);
}

#[tokio::test]
async fn argument_errors_do_not_reach_the_database() {
    let err = post::Entity::find()
        .predicate(&predicates(), "status_in", json!("draft"))
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidArgument);
    assert_eq!(err.module(), "post");

    let err = post::Entity::find()
        .predicate(&predicates(), "published_at_within", json!("eventually"))
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidArgument);
}
