//! Short link entity representing a code-to-URL mapping.

/// A shortened URL.
///
/// The code is the key and never changes after creation. The only permitted
/// mutation is setting `deleted`, after which lookups report the link as gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortLink {
    pub code: String,
    pub url: String,
    /// Caller identity that created the link. Empty for anonymous callers.
    pub owner: String,
    pub deleted: bool,
}

impl ShortLink {
    /// Creates a live (non-deleted) link.
    pub fn new(code: impl Into<String>, url: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            url: url.into(),
            owner: owner.into(),
            deleted: false,
        }
    }

    /// Returns true if the link has been tombstoned.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Returns true if the link belongs to `owner`.
    pub fn is_owned_by(&self, owner: &str) -> bool {
        self.owner == owner
    }
}
