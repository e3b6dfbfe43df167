//! Infrastructure layer for external integrations.
//!
//! This layer implements the repository contract defined by the domain layer.
//!
//! # Modules
//!
//! - [`persistence`] - Memory, log-file and PostgreSQL stores
pub mod persistence;
