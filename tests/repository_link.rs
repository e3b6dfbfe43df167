//! PostgreSQL store tests. Need `DATABASE_URL`; run with `cargo test -- --ignored`.

mod common;

use sqlx::PgPool;
use std::sync::Arc;
use url_shortener_store::domain::entities::{DeleteRequest, ShortLink};
use url_shortener_store::domain::repositories::LinkRepository;
use url_shortener_store::error::AppError;
use url_shortener_store::infrastructure::persistence::PgLinkRepository;

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_set_and_get(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));

    let stored = repo
        .set(ShortLink::new("AbC123", "https://a.example/", "user-1"))
        .await
        .unwrap();
    assert_eq!(stored.code, "AbC123");

    let link = repo.get("AbC123").await.unwrap();
    assert_eq!(link.url, "https://a.example/");
    assert_eq!(link.owner, "user-1");
    assert!(!link.deleted);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_get_unknown_code(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));

    let err = repo.get("nope00").await.unwrap_err();

    assert!(matches!(err, AppError::NotFound { .. }));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_get_deleted_link_is_gone(pool: PgPool) {
    common::insert_deleted_link(&pool, "gone01", "https://a.example", "user-1").await;
    let repo = PgLinkRepository::new(Arc::new(pool));

    let err = repo.get("gone01").await.unwrap_err();

    assert!(matches!(err, AppError::Gone { .. }));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_set_duplicate_url_returns_existing(pool: PgPool) {
    common::insert_link(&pool, "first1", "https://a.example", Some("user-1")).await;
    let repo = PgLinkRepository::new(Arc::new(pool));

    let err = repo
        .set(ShortLink::new("second", "https://a.example", "user-2"))
        .await
        .unwrap_err();

    let existing = err.existing_link().unwrap();
    assert_eq!(existing.code, "first1");
    assert_eq!(existing.owner, "user-1");
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_set_taken_code_is_collision(pool: PgPool) {
    common::insert_link(&pool, "taken1", "https://a.example", None).await;
    let repo = PgLinkRepository::new(Arc::new(pool));

    let err = repo
        .set(ShortLink::new("taken1", "https://b.example", ""))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::CodeCollision { ref code } if code == "taken1"));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_url_can_be_reshortened_after_delete(pool: PgPool) {
    common::insert_deleted_link(&pool, "old001", "https://a.example", "user-1").await;
    let repo = PgLinkRepository::new(Arc::new(pool));

    let stored = repo
        .set(ShortLink::new("new001", "https://a.example", "user-1"))
        .await
        .unwrap();

    assert_eq!(stored.code, "new001");
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_set_batch_is_atomic(pool: PgPool) {
    common::insert_link(&pool, "exist1", "https://b.example", None).await;
    let repo = PgLinkRepository::new(Arc::new(pool.clone()));

    let err = repo
        .set_batch(vec![
            ShortLink::new("row001", "https://a.example", "u"),
            ShortLink::new("row002", "https://b.example", "u"),
            ShortLink::new("row003", "https://c.example", "u"),
        ])
        .await
        .unwrap_err();

    assert_eq!(err.existing_link().unwrap().code, "exist1");
    assert!(matches!(
        repo.get("row001").await.unwrap_err(),
        AppError::NotFound { .. }
    ));
    assert_eq!(repo.stats().await.unwrap().url_count, 1);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_set_batch_preserves_order(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));

    let stored = repo
        .set_batch(vec![
            ShortLink::new("zzzzzz", "https://z.example", "u"),
            ShortLink::new("aaaaaa", "https://a.example", "u"),
        ])
        .await
        .unwrap();

    assert_eq!(stored[0].code, "zzzzzz");
    assert_eq!(stored[1].code, "aaaaaa");
    assert!(repo.set_batch(Vec::new()).await.unwrap().is_empty());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_batch_checks_owner(pool: PgPool) {
    common::insert_link(&pool, "mine01", "https://a.example", Some("user-1")).await;
    common::insert_link(&pool, "mine02", "https://b.example", Some("user-1")).await;
    common::insert_link(&pool, "their1", "https://c.example", Some("user-2")).await;
    let repo = PgLinkRepository::new(Arc::new(pool.clone()));

    repo.delete_batch(vec![
        DeleteRequest::new("mine01", "user-1"),
        DeleteRequest::new("mine02", "user-1"),
        DeleteRequest::new("their1", "user-1"),
        DeleteRequest::new("unknown", "user-1"),
    ])
    .await
    .unwrap();

    assert!(common::is_deleted(&pool, "mine01").await);
    assert!(common::is_deleted(&pool, "mine02").await);
    assert!(!common::is_deleted(&pool, "their1").await);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_batch_spans_chunks(pool: PgPool) {
    common::insert_link(&pool, "first1", "https://a.example", Some("user-1")).await;
    common::insert_link(&pool, "last01", "https://b.example", Some("user-1")).await;
    let repo = PgLinkRepository::new(Arc::new(pool.clone()));

    let mut requests = vec![DeleteRequest::new("first1", "user-1")];
    requests.extend((0..1500).map(|i| DeleteRequest::new(format!("fill{i:04}"), "user-1")));
    requests.push(DeleteRequest::new("last01", "user-1"));

    repo.delete_batch(requests).await.unwrap();

    assert!(common::is_deleted(&pool, "first1").await);
    assert!(common::is_deleted(&pool, "last01").await);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_batch_failure_in_later_chunk_rolls_back(pool: PgPool) {
    common::insert_link(&pool, "mine01", "https://a.example", Some("user-1")).await;
    common::insert_link(&pool, "mine02", "https://b.example", Some("user-1")).await;
    let repo = PgLinkRepository::new(Arc::new(pool.clone()));

    let mut requests = vec![
        DeleteRequest::new("mine01", "user-1"),
        DeleteRequest::new("mine02", "user-1"),
    ];
    requests.extend((0..1200).map(|i| DeleteRequest::new(format!("fill{i:04}"), "user-1")));
    // Postgres rejects NUL in text values, so the second chunk fails.
    requests.push(DeleteRequest::new("bad\0code", "user-1"));

    let err = repo.delete_batch(requests).await.unwrap_err();

    assert!(matches!(err, AppError::BackendUnavailable { .. }));
    assert!(!common::is_deleted(&pool, "mine01").await);
    assert!(!common::is_deleted(&pool, "mine02").await);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_get_batch_by_owner(pool: PgPool) {
    common::insert_link(&pool, "bbbbbb", "https://b.example", Some("user-1")).await;
    common::insert_link(&pool, "aaaaaa", "https://a.example", Some("user-1")).await;
    common::insert_link(&pool, "cccccc", "https://c.example", Some("user-2")).await;
    common::insert_deleted_link(&pool, "dddddd", "https://d.example", "user-1").await;
    let repo = PgLinkRepository::new(Arc::new(pool));

    let links = repo.get_batch_by_owner("user-1").await.unwrap();
    let codes: Vec<&str> = links.iter().map(|l| l.code.as_str()).collect();
    assert_eq!(codes, ["aaaaaa", "bbbbbb"]);

    assert_eq!(repo.get_batch_by_owner("").await.unwrap().len(), 3);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_stats_count_live_links_and_owners_including_anonymous(pool: PgPool) {
    common::insert_link(&pool, "aaaaaa", "https://a.example", Some("user-1")).await;
    common::insert_link(&pool, "bbbbbb", "https://b.example", Some("user-1")).await;
    common::insert_link(&pool, "cccccc", "https://c.example", None).await;
    common::insert_deleted_link(&pool, "dddddd", "https://d.example", "user-3").await;
    let repo = PgLinkRepository::new(Arc::new(pool));

    let stats = repo.stats().await.unwrap();

    assert_eq!(stats.url_count, 3);
    // user-1 plus the anonymous owner stored as NULL.
    assert_eq!(stats.user_count, 2);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_ping(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));

    repo.ping().await.unwrap();
    assert_eq!(repo.backend_name(), "postgres");
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_duplicate_url_stored_once(pool: PgPool) {
    let repo = Arc::new(PgLinkRepository::new(Arc::new(pool)));
    let mut handles = vec![];

    for i in 0..8 {
        let repo = Arc::clone(&repo);
        handles.push(tokio::spawn(async move {
            repo.set(ShortLink::new(
                format!("race{i:02}"),
                "https://same.example",
                "u",
            ))
            .await
        }));
    }

    let mut stored = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => stored += 1,
            Err(e) => assert!(e.existing_link().is_some(), "unexpected error: {e}"),
        }
    }

    assert_eq!(stored, 1);
    assert_eq!(repo.stats().await.unwrap().url_count, 1);
}
