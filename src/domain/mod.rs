//! Domain layer containing business entities and logic.
//!
//! It defines entities, the repository contract and the deletion pipeline,
//! independent of which store backs them.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`deletion_queue`] - Batched asynchronous tombstoning
//!
//! # Deletion Flow
//!
//! 1. [`crate::application::services::ShortenerService::delete`] builds
//!    [`entities::DeleteRequest`]s
//! 2. [`deletion_queue::DeletionQueue`] buffers them without blocking
//! 3. The flush loop tombstones them via [`repositories::LinkRepository::delete_batch`]

pub mod deletion_queue;
pub mod entities;
pub mod repositories;
