use crate::CrawlError;
use serde::Serialize;
use std::fmt;

/// Opaque identifier of one catalog category (e.g. `"igrushki"`)
///
/// The upstream API decides which ids exist; the only client-side check is
/// that the id is not blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    /// Creates a category id, rejecting empty or whitespace-only input
    pub fn new(id: impl Into<String>) -> Result<Self, CrawlError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(CrawlError::InvalidCategory(id));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Parses a whole list of category ids, failing on the first invalid one
    pub fn parse_all<I, S>(ids: I) -> Result<Vec<Self>, CrawlError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ids.into_iter().map(Self::new).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CategoryId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One item discovered on a listing page
///
/// Created by a listing walker and consumed exactly once by a detail fetcher.
/// The category title is the listing-time label; the detail endpoint may
/// label the item differently and is never consulted for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReference {
    /// Item slug used by the detail endpoint
    pub item_url: String,

    /// Category the item was listed under
    pub category: CategoryId,

    /// Human-readable category title, used as the record's section
    pub category_title: String,
}

impl ItemReference {
    pub fn new(
        item_url: impl Into<String>,
        category: CategoryId,
        category_title: impl Into<String>,
    ) -> Self {
        Self {
            item_url: item_url.into(),
            category,
            category_title: category_title.into(),
        }
    }
}
