//! Repository trait definitions for the domain layer.
//!
//! The [`LinkRepository`] trait is the single contract every store backend
//! implements. Concrete backends live in `crate::infrastructure::persistence`.
//!
//! # Architecture
//!
//! - Traits define the contract for data operations
//! - Implementations live in `crate::infrastructure::persistence`
//! - Mock implementations are auto-generated via `mockall` for testing

pub mod link_repository;

pub use link_repository::{LinkRepository, ensure_distinct_urls};

#[cfg(test)]
pub use link_repository::MockLinkRepository;
