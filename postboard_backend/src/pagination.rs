use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 100;
const MAX_OFFSET: usize = i64::MAX as usize;

/// `?page=&limit=` as sent by clients. Missing or zero values fall back to
/// page 1 and [`DEFAULT_LIMIT`]; limits above [`MAX_LIMIT`] are clamped.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageRequest {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl PageRequest {
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    pub fn page(&self) -> usize {
        self.page.filter(|page| *page > 0).unwrap_or(1)
    }

    pub fn limit(&self) -> usize {
        self.limit
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT)
    }

    /// Rows to skip. Capped at `i64::MAX` so any page number binds as an
    /// SQLite integer; pages past the end come back empty.
    pub fn offset(&self) -> usize {
        (self.page() - 1)
            .saturating_mul(self.limit())
            .min(MAX_OFFSET)
    }

    pub fn paginate<T>(&self, items: Vec<T>, total: usize) -> Page<T> {
        Page {
            items,
            pagination: Pagination {
                total,
                page: self.page(),
                pages: total.div_ceil(self.limit()),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: usize,
    pub page: usize,
    pub pages: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}
