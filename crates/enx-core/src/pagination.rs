use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Page {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Result<Self, CoreError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if page < 1 {
            return Err(CoreError::InvalidPage);
        }
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(CoreError::InvalidLimit { max: MAX_LIMIT });
        }
        Ok(Self { page, limit })
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_items: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, page: Page, total: u64) -> Self {
        let total_pages = total.div_ceil(u64::from(page.limit));
        Self {
            data,
            pagination: PaginationMeta {
                current_page: page.page,
                total_pages,
                total_items: total,
                has_next_page: u64::from(page.page) < total_pages,
                has_prev_page: page.page > 1,
            },
        }
    }
}
