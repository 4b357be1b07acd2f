#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    /// Builds a window from a 1-based page number. Out of range values fall
    /// back to the first page and the default page size.
    pub fn from_page(page: Option<i64>, size: Option<i64>) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let limit = size.filter(|s| *s > 0 && *s <= Self::MAX_LIMIT).unwrap_or(Self::DEFAULT_LIMIT);
        Self::new(limit, (page - 1) * limit)
    }

    pub fn page(&self) -> i64 {
        self.offset / self.limit + 1
    }
}
