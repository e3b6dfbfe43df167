//! Repository trait for short link data access.

use std::collections::HashSet;

use crate::domain::entities::{DeleteRequest, ShortLink, Stats};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface shared by the memory, log-file and PostgreSQL stores.
///
/// # Deduplication
///
/// A store never holds two live links for the same URL. Writes that would
/// break this fail with [`AppError::AlreadyExists`] carrying the record already
/// on file.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::MemoryLinkRepository`] - volatile
/// - [`crate::infrastructure::persistence::FileLinkRepository`] - append-only JSON log
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Looks up a link by its short code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the code is unknown and
    /// [`AppError::Gone`] if the link has been tombstoned.
    async fn get(&self, code: &str) -> Result<ShortLink, AppError>;

    /// Stores a new link unless its URL is already shortened.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::AlreadyExists`] with the existing record if a live
    /// link for the same URL exists, and [`AppError::CodeCollision`] if the
    /// code is taken by another URL.
    async fn set(&self, link: ShortLink) -> Result<ShortLink, AppError>;

    /// Stores a batch of links atomically.
    ///
    /// Either every row is stored or none is. The first conflicting row aborts
    /// the batch and is the only one reported.
    ///
    /// # Errors
    ///
    /// Same as [`LinkRepository::set`], plus [`AppError::Validation`] when two
    /// rows of the batch share a URL.
    async fn set_batch(&self, links: Vec<ShortLink>) -> Result<Vec<ShortLink>, AppError>;

    /// Lists live links created by `owner`.
    ///
    /// An empty owner matches every live link; callers that need an
    /// ownership scope must reject empty owners themselves.
    async fn get_batch_by_owner(&self, owner: &str) -> Result<Vec<ShortLink>, AppError>;

    /// Tombstones every link whose code and owner match a request.
    ///
    /// Requests naming somebody else's link, or an unknown code, are skipped
    /// without error.
    async fn delete_batch(&self, requests: Vec<DeleteRequest>) -> Result<(), AppError>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<(), AppError>;

    /// Counts distinct live URLs and distinct owners.
    async fn stats(&self) -> Result<Stats, AppError>;

    /// Short backend identifier used in logs.
    fn backend_name(&self) -> &'static str;
}

/// Rejects a batch in which two rows share a URL.
///
/// Such a batch can never be stored atomically without breaking the
/// one-live-link-per-URL invariant.
pub fn ensure_distinct_urls(links: &[ShortLink]) -> Result<(), AppError> {
    let mut seen = HashSet::with_capacity(links.len());

    for link in links {
        if !seen.insert(link.url.as_str()) {
            return Err(AppError::validation(format!(
                "url appears more than once in batch: {}",
                link.url
            )));
        }
    }

    Ok(())
}
