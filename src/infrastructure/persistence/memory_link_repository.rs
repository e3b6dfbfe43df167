//! Volatile in-memory implementation of the link repository.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::entities::{DeleteRequest, ShortLink, Stats};
use crate::domain::repositories::{LinkRepository, ensure_distinct_urls};
use crate::error::AppError;

/// Code-keyed link table shared by the memory and log-file stores.
///
/// Not synchronised by itself: owners keep it behind a single lock so that the
/// dedup scan and the insert that follows it are one critical section.
#[derive(Debug, Default)]
pub(crate) struct LinkTable {
    links: HashMap<String, ShortLink>,
}

impl LinkTable {
    pub(crate) fn len(&self) -> usize {
        self.links.len()
    }

    pub(crate) fn get(&self, code: &str) -> Result<ShortLink, AppError> {
        match self.links.get(code) {
            None => Err(AppError::not_found(code)),
            Some(link) if link.is_deleted() => Err(AppError::gone(code)),
            Some(link) => Ok(link.clone()),
        }
    }

    /// Verifies that `link` can be inserted without touching the table.
    pub(crate) fn check_insert(&self, link: &ShortLink) -> Result<(), AppError> {
        if let Some(existing) = self
            .links
            .values()
            .find(|l| !l.is_deleted() && l.url == link.url)
        {
            return Err(AppError::already_exists(existing.clone()));
        }

        if self.links.contains_key(&link.code) {
            return Err(AppError::CodeCollision {
                code: link.code.clone(),
            });
        }

        Ok(())
    }

    /// Verifies every row of a batch, including codes repeated inside it.
    pub(crate) fn check_batch(&self, links: &[ShortLink]) -> Result<(), AppError> {
        ensure_distinct_urls(links)?;

        let mut codes = std::collections::HashSet::with_capacity(links.len());
        for link in links {
            self.check_insert(link)?;
            if !codes.insert(link.code.as_str()) {
                return Err(AppError::CodeCollision {
                    code: link.code.clone(),
                });
            }
        }

        Ok(())
    }

    pub(crate) fn insert(&mut self, link: ShortLink) {
        self.links.insert(link.code.clone(), link);
    }

    /// Replays a persisted record, overwriting any earlier record for the code.
    pub(crate) fn restore(&mut self, link: ShortLink) {
        self.insert(link);
    }

    pub(crate) fn by_owner(&self, owner: &str) -> Vec<ShortLink> {
        let mut links: Vec<ShortLink> = self
            .links
            .values()
            .filter(|l| !l.is_deleted() && (owner.is_empty() || l.is_owned_by(owner)))
            .cloned()
            .collect();
        links.sort_by(|a, b| a.code.cmp(&b.code));
        links
    }

    /// Applies tombstones and returns how many links changed state.
    pub(crate) fn tombstone(&mut self, requests: &[DeleteRequest]) -> usize {
        let mut deleted = 0;

        for request in requests {
            if let Some(link) = self.links.get_mut(&request.code)
                && !link.is_deleted()
                && link.is_owned_by(&request.owner)
            {
                link.deleted = true;
                deleted += 1;
            }
        }

        deleted
    }

    pub(crate) fn stats(&self) -> Stats {
        Stats::from_links(self.links.values())
    }
}

/// In-memory store guarded by one mutex.
///
/// Nothing survives a restart. Every operation, including the O(n) dedup scan
/// on writes, runs under the same lock.
#[derive(Debug, Default)]
pub struct MemoryLinkRepository {
    table: Mutex<LinkTable>,
}

impl MemoryLinkRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LinkRepository for MemoryLinkRepository {
    async fn get(&self, code: &str) -> Result<ShortLink, AppError> {
        self.table.lock().await.get(code)
    }

    async fn set(&self, link: ShortLink) -> Result<ShortLink, AppError> {
        let mut table = self.table.lock().await;

        table.check_insert(&link)?;
        table.insert(link.clone());

        debug!(code = %link.code, "Stored short link in memory");
        Ok(link)
    }

    async fn set_batch(&self, links: Vec<ShortLink>) -> Result<Vec<ShortLink>, AppError> {
        let mut table = self.table.lock().await;

        table.check_batch(&links)?;
        for link in &links {
            table.insert(link.clone());
        }

        debug!(rows = links.len(), "Stored short link batch in memory");
        Ok(links)
    }

    async fn get_batch_by_owner(&self, owner: &str) -> Result<Vec<ShortLink>, AppError> {
        Ok(self.table.lock().await.by_owner(owner))
    }

    async fn delete_batch(&self, requests: Vec<DeleteRequest>) -> Result<(), AppError> {
        let deleted = self.table.lock().await.tombstone(&requests);

        debug!(
            requested = requests.len(),
            deleted, "Tombstoned short links in memory"
        );
        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn stats(&self) -> Result<Stats, AppError> {
        Ok(self.table.lock().await.stats())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
