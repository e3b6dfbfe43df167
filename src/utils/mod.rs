//! Utility functions for code generation and URL validation.
//!
//! - [`code_generator`] - Short code generation
//! - [`url_validator`] - Accepts only absolute http(s) URLs

pub mod code_generator;
pub mod url_validator;
