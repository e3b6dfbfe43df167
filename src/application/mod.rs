//! Application layer services implementing business logic.
//!
//! This layer orchestrates domain operations by coordinating repository calls,
//! validation, and the deletion queue. Services consume the repository trait
//! and provide a clean API for transports.
//!
//! # Available Services
//!
//! - [`services::shortener_service::ShortenerService`] - Short link creation, lookup and deletion

pub mod services;
