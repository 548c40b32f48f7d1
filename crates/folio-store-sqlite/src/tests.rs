//! Integration tests for `SqliteStore` against an in-memory database.

use folio_core::{
  ErrorClass,
  Classify as _,
  content::{Category, ContactMessage, Media, MediaType, Post, SchemaBlock, Tag},
  guard::GuardPolicy,
  record::{Actor, RecordState, View},
  relation,
  store::{ListQuery, RecordStore, RelatedField, RelatedFilter, SortOrder},
};
use serde_json::json;
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn actor() -> Actor { Actor(Uuid::new_v4()) }

fn category(title: &str) -> Category {
  Category { title: title.into(), slug: None }
}

fn tag(title: &str) -> Tag {
  Tag { title: Some(title.into()), slug: None }
}

fn post_in(category_id: Uuid) -> Post {
  Post { category_id: Some(category_id), ..Post::titled("Hello") }
}

fn is_not_found(err: &Error) -> bool {
  matches!(err, Error::Core(folio_core::Error::NotFound { .. }))
}

fn is_validation(err: &Error) -> bool {
  matches!(err, Error::Core(folio_core::Error::Validation(_)))
}

// ─── Create / audit ──────────────────────────────────────────────────────────

#[tokio::test]
async fn create_assigns_identity_and_audit_fields() {
  let s = store().await;
  let u1 = actor();

  let rec = s.create(tag("News"), u1).await.unwrap();
  assert_eq!(rec.meta.created_by, u1);
  assert_eq!(rec.meta.updated_by, u1);
  assert_eq!(rec.meta.created_at, rec.meta.updated_at);
  assert!(!rec.meta.is_deleted);
  assert!(rec.meta.deleted_at.is_none());
  assert_eq!(rec.fields.slug.as_deref(), Some("news"));

  let fetched = s.get::<Tag>(rec.id(), View::Alive).await.unwrap().unwrap();
  assert_eq!(fetched.meta, rec.meta);
  assert_eq!(fetched.fields, rec.fields);
}

#[tokio::test]
async fn update_keeps_creator_and_moves_updater() {
  let s = store().await;
  let (u1, u2) = (actor(), actor());

  let created = s.create(tag("News"), u1).await.unwrap();
  let updated = s
    .update(created.id(), tag("Breaking News"), u2)
    .await
    .unwrap();

  assert_eq!(updated.id(), created.id());
  assert_eq!(updated.meta.created_by, u1);
  assert_eq!(updated.meta.created_at, created.meta.created_at);
  assert_eq!(updated.meta.updated_by, u2);
  assert!(updated.meta.updated_at >= created.meta.updated_at);
  assert_eq!(updated.fields.slug.as_deref(), Some("breaking-news"));

  let fetched = s.get::<Tag>(created.id(), View::Alive).await.unwrap().unwrap();
  assert_eq!(fetched.meta.created_by, u1);
  assert_eq!(fetched.meta.updated_by, u2);
}

#[tokio::test]
async fn create_rejects_invalid_fields() {
  let s = store().await;
  let err = s
    .create(
      ContactMessage {
        name:    None,
        email:   "nope".into(),
        subject: None,
        message: None,
      },
      Actor::ANONYMOUS,
    )
    .await
    .unwrap_err();
  assert!(is_validation(&err));
  assert_eq!(err.class(), ErrorClass::Validation);
  assert!(s.list_all::<ContactMessage>().await.unwrap().is_empty());
}

#[tokio::test]
async fn anonymous_contact_message_is_accepted() {
  let s = store().await;
  let rec = s
    .create(
      ContactMessage {
        name:    Some("Sara".into()),
        email:   "sara@example.com".into(),
        subject: Some("Hi".into()),
        message: Some("Loved the post".into()),
      },
      Actor::ANONYMOUS,
    )
    .await
    .unwrap();
  assert!(rec.meta.created_by.is_anonymous());
}

// ─── Views ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn created_record_is_alive_only() {
  let s = store().await;
  let rec = s.create(category("Rust"), actor()).await.unwrap();

  let alive = s.list_alive::<Category>().await.unwrap();
  assert!(alive.iter().any(|r| r.id() == rec.id()));
  let deleted = s.list_deleted::<Category>().await.unwrap();
  assert!(deleted.is_empty());
}

#[tokio::test]
async fn soft_delete_moves_record_between_views() {
  let s = store().await;
  let rec = s.create(category("Rust"), actor()).await.unwrap();
  assert_eq!(s.list_all::<Category>().await.unwrap().len(), 1);

  let u2 = actor();
  let deleted = s.soft_delete::<Category>(rec.id(), u2).await.unwrap();
  assert_eq!(deleted.state(), RecordState::SoftDeleted);
  assert!(deleted.meta.deleted_at.is_some());
  assert_eq!(deleted.meta.updated_by, u2);

  assert!(s.list_alive::<Category>().await.unwrap().is_empty());
  let dead = s.list_deleted::<Category>().await.unwrap();
  assert_eq!(dead.len(), 1);
  assert_eq!(dead[0].id(), rec.id());
  assert_eq!(s.list_all::<Category>().await.unwrap().len(), 1);

  assert!(s.get::<Category>(rec.id(), View::Alive).await.unwrap().is_none());
  assert!(s.get::<Category>(rec.id(), View::Deleted).await.unwrap().is_some());
}

#[tokio::test]
async fn soft_delete_is_idempotent() {
  let s = store().await;
  let rec = s.create(category("Rust"), actor()).await.unwrap();

  let first = s.soft_delete::<Category>(rec.id(), actor()).await.unwrap();
  let second = s.soft_delete::<Category>(rec.id(), actor()).await.unwrap();
  assert_eq!(first.meta, second.meta);
}

#[tokio::test]
async fn restore_round_trip_is_idempotent() {
  let s = store().await;
  let rec = s.create(category("Rust"), actor()).await.unwrap();
  s.soft_delete::<Category>(rec.id(), actor()).await.unwrap();

  let u3 = actor();
  let restored = s.restore::<Category>(rec.id(), u3).await.unwrap();
  assert_eq!(restored.state(), RecordState::Alive);
  assert!(restored.meta.deleted_at.is_none());
  assert_eq!(restored.meta.updated_by, u3);

  let again = s.restore::<Category>(rec.id(), actor()).await.unwrap();
  assert_eq!(again.meta, restored.meta);

  let alive = s.list_alive::<Category>().await.unwrap();
  assert_eq!(alive.len(), 1);
  assert!(alive[0].meta.deleted_at.is_none());
  assert!(s.list_deleted::<Category>().await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_flag_and_timestamp_agree_across_lifecycle() {
  let s = store().await;
  let id = s.create(tag("a"), actor()).await.unwrap().id();

  let check = |rec: &folio_core::record::Record<Tag>| {
    assert_eq!(rec.meta.is_deleted, rec.meta.deleted_at.is_some());
  };

  check(&s.update(id, tag("b"), actor()).await.unwrap());
  check(&s.soft_delete::<Tag>(id, actor()).await.unwrap());
  check(&s.get::<Tag>(id, View::All).await.unwrap().unwrap());
  check(&s.restore::<Tag>(id, actor()).await.unwrap());
  check(&s.get::<Tag>(id, View::All).await.unwrap().unwrap());
}

#[tokio::test]
async fn update_of_soft_deleted_record_is_not_found() {
  let s = store().await;
  let rec = s.create(tag("a"), actor()).await.unwrap();
  s.soft_delete::<Tag>(rec.id(), actor()).await.unwrap();

  let err = s.update(rec.id(), tag("b"), actor()).await.unwrap_err();
  assert!(is_not_found(&err));
}

#[tokio::test]
async fn ids_are_scoped_by_kind() {
  let s = store().await;
  let rec = s.create(tag("a"), actor()).await.unwrap();

  assert!(s.get::<Category>(rec.id(), View::All).await.unwrap().is_none());
  let err = s.soft_delete::<Category>(rec.id(), actor()).await.unwrap_err();
  assert!(is_not_found(&err));
}

// ─── Dependency guard ────────────────────────────────────────────────────────

#[tokio::test]
async fn category_with_live_post_cannot_be_deleted() {
  let s = store().await;
  let c1 = s.create(category("C1"), actor()).await.unwrap();
  let p1 = s.create(post_in(c1.id()), actor()).await.unwrap();

  assert!(!s.can_delete::<Category>(c1.id()).await.unwrap());
  let err = s.soft_delete::<Category>(c1.id(), actor()).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(folio_core::Error::HasDependents { id, .. }) if id == c1.id()
  ));
  assert_eq!(err.class(), ErrorClass::Conflict);

  s.soft_delete::<Post>(p1.id(), actor()).await.unwrap();
  assert!(s.can_delete::<Category>(c1.id()).await.unwrap());
  s.soft_delete::<Category>(c1.id(), actor()).await.unwrap();
}

#[tokio::test]
async fn reassigning_the_child_unblocks_the_parent() {
  let s = store().await;
  let c1 = s.create(category("C1"), actor()).await.unwrap();
  let c2 = s.create(category("C2"), actor()).await.unwrap();
  let p1 = s.create(post_in(c1.id()), actor()).await.unwrap();

  assert!(!s.can_delete::<Category>(c1.id()).await.unwrap());
  s.update(p1.id(), post_in(c2.id()), actor()).await.unwrap();

  assert!(s.can_delete::<Category>(c1.id()).await.unwrap());
  assert!(!s.can_delete::<Category>(c2.id()).await.unwrap());
}

#[tokio::test]
async fn dependents_report_counts_per_relation() {
  let s = store().await;
  let news = s.create(tag("news"), actor()).await.unwrap();
  for title in ["one", "two"] {
    s.create(
      Post { tag_ids: vec![news.id()], ..Post::titled(title) },
      actor(),
    )
    .await
    .unwrap();
  }

  let blockers = s.dependents::<Tag>(news.id()).await.unwrap();
  assert_eq!(blockers.len(), 1);
  assert_eq!(blockers[0].relation, "post.tags");
  assert_eq!(blockers[0].live_count, 2);
}

#[tokio::test]
async fn schema_blocks_guard_their_post() {
  let s = store().await;
  let post = s.create(Post::titled("Guide"), actor()).await.unwrap();
  let block = s
    .create(
      SchemaBlock {
        post_id:     post.id(),
        schema_type: "Article".into(),
        data:        json!({ "headline": "Guide" }),
      },
      actor(),
    )
    .await
    .unwrap();

  assert!(!s.can_delete::<Post>(post.id()).await.unwrap());
  s.soft_delete::<SchemaBlock>(block.id(), actor()).await.unwrap();
  assert!(s.can_delete::<Post>(post.id()).await.unwrap());
}

#[tokio::test]
async fn restoring_a_child_blocks_the_parent_again() {
  let s = store().await;
  let c1 = s.create(category("C1"), actor()).await.unwrap();
  let p1 = s.create(post_in(c1.id()), actor()).await.unwrap();

  s.soft_delete::<Post>(p1.id(), actor()).await.unwrap();
  assert!(s.can_delete::<Category>(c1.id()).await.unwrap());

  s.restore::<Post>(p1.id(), actor()).await.unwrap();
  assert!(!s.can_delete::<Category>(c1.id()).await.unwrap());
}

#[tokio::test]
async fn can_delete_unknown_record_is_not_found() {
  let s = store().await;
  let err = s.can_delete::<Category>(Uuid::new_v4()).await.unwrap_err();
  assert!(is_not_found(&err));
}

#[tokio::test]
async fn guard_policy_is_configurable() {
  let s = store().await.with_guard_policy(GuardPolicy::Strict);
  assert_eq!(s.guard_policy(), GuardPolicy::Strict);

  let c1 = s.create(category("C1"), actor()).await.unwrap();
  assert!(s.can_delete::<Category>(c1.id()).await.unwrap());
}

// ─── Reference validation ────────────────────────────────────────────────────

#[tokio::test]
async fn references_must_point_at_alive_targets() {
  let s = store().await;

  let err = s.create(post_in(Uuid::new_v4()), actor()).await.unwrap_err();
  assert!(is_validation(&err));

  let c1 = s.create(category("C1"), actor()).await.unwrap();
  s.soft_delete::<Category>(c1.id(), actor()).await.unwrap();
  let err = s.create(post_in(c1.id()), actor()).await.unwrap_err();
  assert!(is_validation(&err));
}

#[tokio::test]
async fn references_must_match_the_target_kind() {
  let s = store().await;
  let t = s.create(tag("not a category"), actor()).await.unwrap();
  let err = s.create(post_in(t.id()), actor()).await.unwrap_err();
  assert!(is_validation(&err));
}

#[tokio::test]
async fn cover_media_is_a_dependent() {
  let s = store().await;
  let media = s
    .create(
      Media {
        title:      Some("Hero".into()),
        path:       "uploads/hero.png".into(),
        media_type: MediaType::Image,
        alt_text:   None,
      },
      actor(),
    )
    .await
    .unwrap();
  s.create(
    Post { cover_media_id: Some(media.id()), ..Post::titled("With cover") },
    actor(),
  )
  .await
  .unwrap();

  let err = s.soft_delete::<Media>(media.id(), actor()).await.unwrap_err();
  assert_eq!(err.class(), ErrorClass::Conflict);
}

// ─── Hard delete ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn hard_delete_removes_record_everywhere() {
  let s = store().await;
  let rec = s.create(tag("gone"), actor()).await.unwrap();
  s.soft_delete::<Tag>(rec.id(), actor()).await.unwrap();

  s.hard_delete::<Tag>(rec.id()).await.unwrap();

  assert!(s.list_alive::<Tag>().await.unwrap().is_empty());
  assert!(s.list_deleted::<Tag>().await.unwrap().is_empty());
  assert!(s.list_all::<Tag>().await.unwrap().is_empty());

  assert!(is_not_found(&s.update(rec.id(), tag("x"), actor()).await.unwrap_err()));
  assert!(is_not_found(&s.soft_delete::<Tag>(rec.id(), actor()).await.unwrap_err()));
  assert!(is_not_found(&s.restore::<Tag>(rec.id(), actor()).await.unwrap_err()));
  assert!(is_not_found(&s.hard_delete::<Tag>(rec.id()).await.unwrap_err()));
}

#[tokio::test]
async fn hard_delete_bypasses_the_guard() {
  let s = store().await;
  let c1 = s.create(category("C1"), actor()).await.unwrap();
  let p1 = s.create(post_in(c1.id()), actor()).await.unwrap();

  s.hard_delete::<Category>(c1.id()).await.unwrap();

  let post = s.get::<Post>(p1.id(), View::Alive).await.unwrap().unwrap();
  assert_eq!(post.fields.category_id, Some(c1.id()));

  // The dangling reference surfaces on the next write of the post.
  let err = s.update(p1.id(), post.fields.clone(), actor()).await.unwrap_err();
  assert!(is_validation(&err));
}

#[tokio::test]
async fn hard_deleting_a_source_releases_its_targets() {
  let s = store().await;
  let c1 = s.create(category("C1"), actor()).await.unwrap();
  let p1 = s.create(post_in(c1.id()), actor()).await.unwrap();

  s.hard_delete::<Post>(p1.id()).await.unwrap();
  assert!(s.can_delete::<Category>(c1.id()).await.unwrap());
}

// ─── Slugs ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn post_slugs_get_a_counter() {
  let s = store().await;
  let a = s.create(Post::titled("Hello World"), actor()).await.unwrap();
  let b = s.create(Post::titled("Hello World"), actor()).await.unwrap();
  let c = s.create(Post::titled("Hello World"), actor()).await.unwrap();

  assert_eq!(a.fields.slug.as_deref(), Some("hello-world"));
  assert_eq!(b.fields.slug.as_deref(), Some("hello-world-2"));
  assert_eq!(c.fields.slug.as_deref(), Some("hello-world-3"));
}

#[tokio::test]
async fn updating_a_post_keeps_its_own_slug() {
  let s = store().await;
  let a = s.create(Post::titled("Hello World"), actor()).await.unwrap();
  let updated = s
    .update(
      a.id(),
      Post { body: Some("text".into()), ..Post::titled("Hello World") },
      actor(),
    )
    .await
    .unwrap();
  assert_eq!(updated.fields.slug.as_deref(), Some("hello-world"));
}

#[tokio::test]
async fn renaming_a_post_keeps_its_permalink() {
  let s = store().await;
  let a = s.create(Post::titled("Hello World"), actor()).await.unwrap();

  let renamed = s.update(a.id(), Post::titled("Goodbye World"), actor()).await.unwrap();
  assert_eq!(renamed.fields.slug.as_deref(), Some("hello-world"));

  let stored = s.get::<Post>(a.id(), View::Alive).await.unwrap().unwrap();
  assert_eq!(stored.fields.slug.as_deref(), Some("hello-world"));
}

#[tokio::test]
async fn an_explicit_slug_on_update_replaces_the_stored_one() {
  let s = store().await;
  let a = s.create(category("Rust"), actor()).await.unwrap();
  let moved = s
    .update(
      a.id(),
      Category { title: "Rust".into(), slug: Some("rust-lang".into()) },
      actor(),
    )
    .await
    .unwrap();
  assert_eq!(moved.fields.slug.as_deref(), Some("rust-lang"));
}

#[tokio::test]
async fn get_by_slug_respects_the_view() {
  let s = store().await;
  let post = s.create(Post::titled("Hello World"), actor()).await.unwrap();

  let found = s
    .get_by_slug::<Post>("hello-world".into(), View::Alive)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(found.id(), post.id());
  assert!(
    s.get_by_slug::<Post>("missing".into(), View::All)
      .await
      .unwrap()
      .is_none()
  );

  s.soft_delete::<Post>(post.id(), actor()).await.unwrap();
  assert!(
    s.get_by_slug::<Post>("hello-world".into(), View::Alive)
      .await
      .unwrap()
      .is_none()
  );
  assert!(
    s.get_by_slug::<Post>("hello-world".into(), View::Deleted)
      .await
      .unwrap()
      .is_some()
  );
}

#[tokio::test]
async fn get_by_slug_is_scoped_by_kind() {
  let s = store().await;
  s.create(category("Rust"), actor()).await.unwrap();
  assert!(
    s.get_by_slug::<Tag>("rust".into(), View::All)
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn duplicate_category_slug_is_rejected() {
  let s = store().await;
  s.create(category("Rust"), actor()).await.unwrap();
  let err = s.create(category("rust"), actor()).await.unwrap_err();
  assert!(is_validation(&err));
}

#[tokio::test]
async fn slugs_stay_reserved_while_soft_deleted() {
  let s = store().await;
  let first = s.create(category("Rust"), actor()).await.unwrap();
  s.soft_delete::<Category>(first.id(), actor()).await.unwrap();

  let err = s.create(category("Rust"), actor()).await.unwrap_err();
  assert!(is_validation(&err));

  s.restore::<Category>(first.id(), actor()).await.unwrap();
}

// ─── Listing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_is_newest_first_and_paged() {
  let s = store().await;
  let mut ids = Vec::new();
  for title in ["first", "second", "third"] {
    ids.push(s.create(tag(title), actor()).await.unwrap().id());
  }

  let all = s.list_alive::<Tag>().await.unwrap();
  let listed: Vec<_> = all.iter().map(|r| r.id()).collect();
  assert_eq!(listed, vec![ids[2], ids[1], ids[0]]);

  let page = s
    .list::<Tag>(ListQuery { limit: Some(1), offset: Some(1), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(page.len(), 1);
  assert_eq!(page[0].id(), ids[1]);
}

#[tokio::test]
async fn list_filters_by_text() {
  let s = store().await;
  s.create(Post::titled("Async Rust"), actor()).await.unwrap();
  s.create(Post::titled("Gardening"), actor()).await.unwrap();

  let hits = s
    .list::<Post>(ListQuery { text: Some("rust".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].fields.title.as_deref(), Some("Async Rust"));
}

#[tokio::test]
async fn text_search_ignores_field_names_and_wildcards() {
  let s = store().await;
  s.create(Post::titled("Async Rust"), actor()).await.unwrap();
  s.create(Post::titled("Gardening"), actor()).await.unwrap();

  for needle in ["title", "tag_ids", "%", "_"] {
    let hits = s
      .list::<Post>(ListQuery { text: Some(needle.into()), ..Default::default() })
      .await
      .unwrap();
    assert!(hits.is_empty(), "{needle:?} matched {} posts", hits.len());
  }
}

#[tokio::test]
async fn text_search_matches_wildcard_characters_literally() {
  let s = store().await;
  s.create(Post::titled("50% off"), actor()).await.unwrap();
  s.create(Post::titled("500 ways"), actor()).await.unwrap();

  let hits = s
    .list::<Post>(ListQuery { text: Some("50%".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].fields.title.as_deref(), Some("50% off"));
}

#[tokio::test]
async fn posts_filter_by_category_slug_and_tag_title() {
  let s = store().await;
  let rust = s.create(category("Rust"), actor()).await.unwrap();
  let garden = s.create(category("Garden"), actor()).await.unwrap();
  let async_tag = s.create(tag("async"), actor()).await.unwrap();

  let tagged = s
    .create(
      Post { tag_ids: vec![async_tag.id()], ..post_in(rust.id()) },
      actor(),
    )
    .await
    .unwrap();
  let untagged = s.create(post_in(rust.id()), actor()).await.unwrap();
  s.create(post_in(garden.id()), actor()).await.unwrap();

  let by_category = |slug: &str| RelatedFilter {
    relation: &relation::POST_CATEGORY,
    field:    RelatedField::Slug,
    value:    slug.to_owned(),
  };
  let by_tag = |title: &str| RelatedFilter {
    relation: &relation::POST_TAGS,
    field:    RelatedField::Title,
    value:    title.to_owned(),
  };

  let in_rust = s
    .list::<Post>(ListQuery { related: vec![by_category("rust")], ..Default::default() })
    .await
    .unwrap();
  let ids: Vec<_> = in_rust.iter().map(|r| r.id()).collect();
  assert_eq!(ids, vec![untagged.id(), tagged.id()]);

  let both = s
    .list::<Post>(ListQuery {
      related: vec![by_category("rust"), by_tag("async")],
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(both.len(), 1);
  assert_eq!(both[0].id(), tagged.id());

  let none = s
    .list::<Post>(ListQuery { related: vec![by_tag("missing")], ..Default::default() })
    .await
    .unwrap();
  assert!(none.is_empty());
}

#[tokio::test]
async fn list_can_order_by_update_time() {
  let s = store().await;
  let first = s.create(tag("first"), actor()).await.unwrap();
  let second = s.create(tag("second"), actor()).await.unwrap();
  s.update(first.id(), tag("first, edited"), actor()).await.unwrap();

  let ids = |records: Vec<folio_core::record::Record<Tag>>| {
    records.iter().map(|r| r.id()).collect::<Vec<_>>()
  };

  let recent = s
    .list::<Tag>(ListQuery { order: SortOrder::RecentlyUpdated, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(ids(recent), vec![first.id(), second.id()]);

  let oldest = s
    .list::<Tag>(ListQuery { order: SortOrder::OldestFirst, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(ids(oldest), vec![first.id(), second.id()]);

  let newest = s.list_alive::<Tag>().await.unwrap();
  assert_eq!(ids(newest), vec![second.id(), first.id()]);
}

#[tokio::test]
async fn lists_are_scoped_by_kind() {
  let s = store().await;
  s.create(tag("t"), actor()).await.unwrap();
  s.create(category("c"), actor()).await.unwrap();

  assert_eq!(s.list_all::<Tag>().await.unwrap().len(), 1);
  assert_eq!(s.list_all::<Category>().await.unwrap().len(), 1);
  assert!(s.list_all::<Post>().await.unwrap().is_empty());
}
