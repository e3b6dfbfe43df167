//! Aggregate counters over the live link set.

use serde::Serialize;

/// Service-wide statistics.
///
/// Both counters only consider links that have not been tombstoned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Number of distinct shortened URLs.
    #[serde(rename = "urls")]
    pub url_count: u64,
    /// Number of distinct owners. Anonymous links count as one owner.
    #[serde(rename = "users")]
    pub user_count: u64,
}

impl Stats {
    /// Computes statistics from an iterator of links.
    ///
    /// Used by the in-process backends; the relational store computes the
    /// same numbers in SQL.
    pub fn from_links<'a, I>(links: I) -> Self
    where
        I: IntoIterator<Item = &'a crate::domain::entities::ShortLink>,
    {
        use std::collections::HashSet;

        let mut urls = HashSet::new();
        let mut owners = HashSet::new();

        for link in links.into_iter().filter(|l| !l.is_deleted()) {
            urls.insert(link.url.as_str());
            owners.insert(link.owner.as_str());
        }

        Self {
            url_count: urls.len() as u64,
            user_count: owners.len() as u64,
        }
    }
}
