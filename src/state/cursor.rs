use crate::catalog::CategoryId;

/// Pagination position of one category's listing walk
///
/// Owned by exactly one walker. The page only ever moves forward, one step
/// at a time, after a page produced results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub category: CategoryId,
    page: u32,
    pub page_size: u32,
    pub sort_key: String,
}

impl PageCursor {
    /// Creates a cursor positioned on page 1
    ///
    /// A page size of 0 is bumped to 1.
    pub fn new(category: CategoryId, page_size: u32, sort_key: impl Into<String>) -> Self {
        Self {
            category,
            page: 1,
            page_size: page_size.max(1),
            sort_key: sort_key.into(),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// Moves to the next page
    pub fn advance(&mut self) {
        self.page += 1;
    }

    /// Query parameters of the listing request for the current page
    pub fn query_pairs(&self) -> [(&'static str, String); 3] {
        [
            ("page", self.page.to_string()),
            ("limit", self.page_size.to_string()),
            ("sort", self.sort_key.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor() -> PageCursor {
        PageCursor::new(CategoryId::new("igrushki").unwrap(), 24, "sold")
    }

    #[test]
    fn test_starts_on_first_page() {
        let cursor = cursor();
        assert_eq!(cursor.page(), 1);
        assert_eq!(cursor.page_size, 24);
    }

    #[test]
    fn test_advance_is_monotonic() {
        let mut cursor = cursor();
        for expected in 2..=5 {
            cursor.advance();
            assert_eq!(cursor.page(), expected);
        }
    }

    #[test]
    fn test_zero_page_size_clamped() {
        let cursor = PageCursor::new(CategoryId::new("x").unwrap(), 0, "sold");
        assert_eq!(cursor.page_size, 1);
    }

    #[test]
    fn test_query_pairs() {
        let mut cursor = cursor();
        cursor.advance();
        let pairs = cursor.query_pairs();
        assert_eq!(pairs[0], ("page", "2".to_string()));
        assert_eq!(pairs[1], ("limit", "24".to_string()));
        assert_eq!(pairs[2], ("sort", "sold".to_string()));
    }
}
