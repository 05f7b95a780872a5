use crate::config::DEFAULT_START_URL;
use serde::Serialize;
use std::ops::Range;

/// Which index pages to walk for listing links
#[derive(Debug, Clone, Serialize)]
pub struct SearchParams {
    /// Search results URL; the page parameter is appended to it
    pub start_url: String,
    /// First page number to fetch
    pub start_page: u32,
    /// Number of pages to fetch
    pub pages: u32,
}

impl SearchParams {
    /// Page numbers in fetch order; empty when `pages` is 0
    pub fn page_numbers(&self) -> Range<u32> {
        self.start_page..self.start_page.saturating_add(self.pages)
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            start_url: DEFAULT_START_URL.to_string(),
            start_page: 1,
            pages: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(start_page: u32, pages: u32) -> SearchParams {
        SearchParams {
            start_page,
            pages,
            ..SearchParams::default()
        }
    }

    #[test]
    fn pages_count_from_start_page() {
        assert_eq!(params(3, 2).page_numbers().collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(params(1, 1).page_numbers().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn zero_pages_fetch_nothing() {
        assert_eq!(params(1, 0).page_numbers().count(), 0);
        assert_eq!(params(7, 0).page_numbers().count(), 0);
    }
}
