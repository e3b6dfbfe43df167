//! Core domain entities.
//!
//! Plain data structures shared by every store backend and the service layer.
//!
//! # Entity Types
//!
//! - [`ShortLink`] - A short code mapped to its original URL
//! - [`DeleteRequest`] - A `(code, owner)` pair scheduled for tombstoning
//! - [`Stats`] - Aggregate counters over live links

pub mod delete_request;
pub mod short_link;
pub mod stats;

pub use delete_request::DeleteRequest;
pub use short_link::ShortLink;
pub use stats::Stats;
