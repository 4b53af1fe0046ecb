//! Fixed-size pages over a cached result buffer.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, SessionError};

/// One page of cached results plus its position in the whole set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub items: Vec<Value>,
    /// Zero-based.
    pub page_index: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub items_per_page: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Page {
    /// Cut page `page_index` out of `items`.
    ///
    /// An empty buffer has no pages, so every index is out of range.
    pub fn slice(items: &[Value], page_index: usize, page_size: usize) -> Result<Self> {
        let total_items = items.len();
        let total_pages = total_pages(total_items, page_size);
        if page_index >= total_pages {
            return Err(SessionError::PageOutOfRange {
                page_index,
                total_pages,
            });
        }

        let start = page_index * page_size;
        let end = (start + page_size).min(total_items);
        Ok(Self {
            items: items[start..end].to_vec(),
            page_index,
            total_pages,
            total_items,
            items_per_page: page_size,
            has_next: page_index + 1 < total_pages,
            has_previous: page_index > 0,
        })
    }
}

/// `ceil(total_items / page_size)`; zero when `page_size` is zero.
#[must_use]
pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total_items.div_ceil(page_size)
}
