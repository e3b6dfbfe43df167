//! Short code generation.
//!
//! Codes are public identifiers, not secrets, so a fast non-cryptographic
//! thread-local RNG is sufficient. Uniqueness is enforced by the stores, not
//! here.

use rand::Rng;
use rand::distr::Alphanumeric;

/// Default length of generated codes.
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Source of candidate short codes.
///
/// Implementations are pure generators that never touch storage.
pub trait CodeGenerator: Send + Sync {
    /// Produces the next candidate code.
    fn generate(&self) -> String;
}

/// Draws every symbol independently and uniformly from `[A-Za-z0-9]`.
#[derive(Debug, Clone)]
pub struct RandomCodeGenerator {
    length: usize,
}

impl RandomCodeGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for RandomCodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_LENGTH)
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        generate_code(self.length)
    }
}

/// Generates a random alphanumeric code of `length` characters.
///
/// # Examples
///
/// ```ignore
/// let code = generate_code(6);
/// assert_eq!(code.len(), 6);
/// assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
/// ```
pub fn generate_code(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
