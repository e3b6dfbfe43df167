//! Deletion request model for asynchronous tombstoning.

/// A request to tombstone `code` on behalf of `owner`.
///
/// The store only applies the request when the owner on file matches, so a
/// caller can never delete links created by somebody else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeleteRequest {
    pub code: String,
    pub owner: String,
}

impl DeleteRequest {
    pub fn new(code: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            owner: owner.into(),
        }
    }
}
