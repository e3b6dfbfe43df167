#![allow(dead_code)]

use sqlx::PgPool;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url_shortener_store::prelude::*;

pub const FLUSH_INTERVAL: Duration = Duration::from_millis(50);

/// Hands out predefined codes, then random ones.
pub struct FixedCodes(Mutex<VecDeque<String>>);

impl FixedCodes {
    pub fn new(codes: &[&str]) -> Arc<Self> {
        Arc::new(Self(Mutex::new(
            codes.iter().map(|c| c.to_string()).collect(),
        )))
    }
}

impl CodeGenerator for FixedCodes {
    fn generate(&self) -> String {
        self.0
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| RandomCodeGenerator::default().generate())
    }
}

pub fn service(repo: Arc<dyn LinkRepository>, codes: &[&str]) -> ShortenerService {
    let deletions = DeletionQueue::start(Arc::clone(&repo), 100, FLUSH_INTERVAL);
    ShortenerService::new(repo, FixedCodes::new(codes), deletions)
}

/// Waits long enough for at least one deletion flush.
pub async fn wait_for_flush() {
    tokio::time::sleep(FLUSH_INTERVAL * 4).await;
}

pub async fn insert_link(pool: &PgPool, code: &str, url: &str, owner: Option<&str>) {
    sqlx::query("INSERT INTO shortener (code, url, owner) VALUES ($1, $2, $3)")
        .bind(code)
        .bind(url)
        .bind(owner)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn insert_deleted_link(pool: &PgPool, code: &str, url: &str, owner: &str) {
    sqlx::query("INSERT INTO shortener (code, url, owner, deleted) VALUES ($1, $2, $3, TRUE)")
        .bind(code)
        .bind(url)
        .bind(owner)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn is_deleted(pool: &PgPool, code: &str) -> bool {
    sqlx::query_scalar("SELECT deleted FROM shortener WHERE code = $1")
        .bind(code)
        .fetch_one(pool)
        .await
        .unwrap()
}
