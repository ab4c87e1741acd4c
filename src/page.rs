//! Paginated collection responses.

use serde::{Deserialize, Serialize};

/// Pagination metadata returned alongside every page.
///
/// `next` and `previous` are `0` when there is no such page, matching the JSON
/// shape the console's REST API uses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub next: u32,
    #[serde(default)]
    pub previous: u32,
    pub count: u32,
    pub current: u32,
    pub total_pages: u32,
    #[serde(default)]
    pub start_index: u32,
    #[serde(default)]
    pub end_index: u32,
    #[serde(default)]
    pub page_size: u32,
}

impl Pagination {
    pub fn next_page(&self) -> Option<u32> {
        (self.next > 0).then_some(self.next)
    }

    pub fn previous_page(&self) -> Option<u32> {
        (self.previous > 0).then_some(self.previous)
    }
}

/// One fetched slice of a remote collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub pagination: Pagination,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// A page with no results.
    pub fn empty(page_size: u32) -> Self {
        Self {
            pagination: Pagination {
                current: 1,
                total_pages: 1,
                page_size,
                ..Default::default()
            },
            results: Vec::new(),
        }
    }

    /// Cuts `page` out of an already filtered and ordered collection.
    ///
    /// Requests beyond the last page are answered with the last page, and
    /// `pagination.current` reports the page actually returned.
    pub fn paginate(items: Vec<T>, page: u32, page_size: u32) -> Self {
        let page_size = page_size.max(1);
        let count = items.len() as u32;
        let total_pages = count.div_ceil(page_size).max(1);
        let current = page.clamp(1, total_pages);

        let start = ((current - 1) * page_size) as usize;
        let results: Vec<T> = items
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .collect();

        let (start_index, end_index) = if results.is_empty() {
            (0, 0)
        } else {
            (start as u32 + 1, start as u32 + results.len() as u32)
        };

        Self {
            pagination: Pagination {
                next: if current < total_pages { current + 1 } else { 0 },
                previous: current.saturating_sub(1),
                count,
                current,
                total_pages,
                start_index,
                end_index,
                page_size,
            },
            results,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// No results on this page, or nothing in the collection at all.
    pub fn is_empty(&self) -> bool {
        self.pagination.count == 0 || self.results.is_empty()
    }
}
