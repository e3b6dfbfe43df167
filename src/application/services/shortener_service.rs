//! Short link creation, lookup and deletion service.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::domain::deletion_queue::DeletionQueue;
use crate::domain::entities::{DeleteRequest, ShortLink, Stats};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::utils::code_generator::{CodeGenerator, RandomCodeGenerator};
use crate::utils::url_validator::validate_url;

/// Attempts made to find a free code before giving up.
const MAX_CODE_ATTEMPTS: usize = 10;

/// Entry point used by every transport.
///
/// Combines code generation, the selected store and the deletion queue.
/// Creation and lookup go straight to the store; deletion is queued and
/// applied asynchronously.
pub struct ShortenerService {
    repo: Arc<dyn LinkRepository>,
    generator: Arc<dyn CodeGenerator>,
    deletions: DeletionQueue,
}

impl ShortenerService {
    /// Creates a service from its parts.
    pub fn new(
        repo: Arc<dyn LinkRepository>,
        generator: Arc<dyn CodeGenerator>,
        deletions: DeletionQueue,
    ) -> Self {
        Self {
            repo,
            generator,
            deletions,
        }
    }

    /// Wires a random code generator and a deletion queue sized from `config`
    /// around `repo`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn from_config(repo: Arc<dyn LinkRepository>, config: &Config) -> Self {
        let deletions = DeletionQueue::start(
            Arc::clone(&repo),
            config.delete_queue_capacity,
            config.delete_flush_interval(),
        );
        let generator = Arc::new(RandomCodeGenerator::new(config.code_length));

        Self::new(repo, generator, deletions)
    }

    /// Shortens `url` on behalf of `owner`.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] if the URL is not an absolute http(s) URL
    /// - [`AppError::AlreadyExists`] carrying the existing link if the URL was
    ///   shortened before
    /// - [`AppError::BackendUnavailable`] on storage failure, or when no free
    ///   code was found after repeated collisions
    pub async fn create(&self, url: &str, owner: &str) -> Result<ShortLink, AppError> {
        validate_url(url)?;

        for _ in 0..MAX_CODE_ATTEMPTS {
            let link = ShortLink::new(self.generator.generate(), url, owner);

            match self.repo.set(link).await {
                Ok(stored) => return Ok(stored),
                Err(AppError::CodeCollision { code }) => {
                    debug!(%code, "Short code collision, regenerating");
                }
                Err(e) => return Err(e.context("failed to store short link")),
            }
        }

        Err(too_many_collisions())
    }

    /// Shortens every URL in `urls` atomically.
    ///
    /// The result is in input order so callers can correlate rows with their
    /// own identifiers.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create`]. The first invalid or already shortened URL
    /// fails the whole batch and nothing is stored.
    pub async fn create_batch(
        &self,
        urls: Vec<String>,
        owner: &str,
    ) -> Result<Vec<ShortLink>, AppError> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }
        for url in &urls {
            validate_url(url)?;
        }

        for _ in 0..MAX_CODE_ATTEMPTS {
            let links = self.assign_codes(&urls, owner);

            match self.repo.set_batch(links).await {
                Ok(stored) => return Ok(stored),
                Err(AppError::CodeCollision { code }) => {
                    debug!(%code, "Short code collision in batch, regenerating");
                }
                Err(e) => return Err(e.context("failed to store short link batch")),
            }
        }

        Err(too_many_collisions())
    }

    /// Builds one link per URL with pairwise distinct codes.
    fn assign_codes(&self, urls: &[String], owner: &str) -> Vec<ShortLink> {
        let mut used = HashSet::with_capacity(urls.len());

        urls.iter()
            .map(|url| {
                let mut code = self.generator.generate();
                // Bounded so a generator stuck on one value cannot spin forever;
                // the store then reports the clash as a collision.
                for _ in 1..MAX_CODE_ATTEMPTS {
                    if !used.contains(&code) {
                        break;
                    }
                    code = self.generator.generate();
                }
                used.insert(code.clone());
                ShortLink::new(code, url.as_str(), owner)
            })
            .collect()
    }

    /// Looks up the link behind `code`.
    ///
    /// # Errors
    ///
    /// [`AppError::NotFound`] for unknown codes and [`AppError::Gone`] for
    /// deleted links, so transports can answer 404 and 410 respectively.
    pub async fn resolve(&self, code: &str) -> Result<ShortLink, AppError> {
        self.repo
            .get(code)
            .await
            .map_err(|e| e.context("failed to resolve short link"))
    }

    /// Lists the live links created by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for an empty owner: anonymous callers
    /// own nothing.
    pub async fn list_for_owner(&self, owner: &str) -> Result<Vec<ShortLink>, AppError> {
        require_owner(owner)?;

        self.repo
            .get_batch_by_owner(owner)
            .await
            .map_err(|e| e.context("failed to list short links"))
    }

    /// Schedules `codes` for deletion and returns immediately.
    ///
    /// Codes that do not belong to `owner` are skipped when the queue
    /// flushes.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] for an empty owner
    /// - [`AppError::QueueFull`] when the deletion queue is saturated
    pub fn delete(&self, codes: Vec<String>, owner: &str) -> Result<(), AppError> {
        require_owner(owner)?;

        let requests = codes
            .into_iter()
            .map(|code| DeleteRequest::new(code, owner))
            .collect();

        self.deletions.enqueue(requests)
    }

    pub async fn stats(&self) -> Result<Stats, AppError> {
        self.repo
            .stats()
            .await
            .map_err(|e| e.context("failed to compute stats"))
    }

    /// Checks that the store is reachable.
    pub async fn ping(&self) -> Result<(), AppError> {
        self.repo.ping().await
    }

    pub fn backend_name(&self) -> &'static str {
        self.repo.backend_name()
    }

    /// Flushes pending deletions and stops the deletion queue.
    pub async fn shutdown(&self) {
        self.deletions.shutdown().await;
    }
}

fn require_owner(owner: &str) -> Result<(), AppError> {
    if owner.is_empty() {
        return Err(AppError::validation("owner must not be empty"));
    }
    Ok(())
}

fn too_many_collisions() -> AppError {
    AppError::backend(
        "failed to generate unique code",
        format!("{MAX_CODE_ATTEMPTS} consecutive code collisions"),
    )
}
