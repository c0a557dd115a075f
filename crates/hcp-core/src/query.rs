// crates/hcp-core/src/query.rs
//
// The filter/pagination contract shared by every list operation.
//
// A list call takes a filter (named optional predicates, `None` meaning "no
// constraint") plus a `PageRequest`, and returns the requested slice together
// with the total number of matching rows. Both numbers come from one pass
// over the same predicate set, so they can never disagree.

use serde::{Deserialize, Serialize};

/// Page used when the caller sends zero (or nothing).
pub const DEFAULT_PAGE: u32 = 1;

/// Page size used when the caller sends zero (or nothing).
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// A normalised, 1-indexed page request.
///
/// Construct through [`PageRequest::new`], which applies the defaulting rule
/// used identically by every listing: `page == 0` becomes 1 and
/// `page_size == 0` becomes 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: if page == 0 { DEFAULT_PAGE } else { page },
            page_size: if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size },
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of matching rows skipped before this page starts.
    pub fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.page_size as usize)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_PAGE_SIZE)
    }
}

/// One page of results plus the total count of all matching rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_items: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn empty(request: PageRequest) -> Self {
        Self {
            items: Vec::new(),
            total_items: 0,
            page: request.page(),
            page_size: request.page_size(),
        }
    }

    /// `ceil(total_items / page_size)`.
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_items.div_ceil(self.page_size as u64)
    }
}

/// A set of optional predicates over one entity type.
pub trait Filter<T> {
    /// Returns true if `item` satisfies every predicate that is present.
    fn matches(&self, item: &T) -> bool;
}

/// Match an optional exact-equality predicate.
pub(crate) fn eq_opt<V: PartialEq + ?Sized>(predicate: Option<&V>, value: &V) -> bool {
    predicate.map_or(true, |p| p == value)
}

/// Builds one page from rows pushed in contract order, counting every row
/// but holding only the ones that land on the page.
///
/// For scans that decode rows fallibly and cannot hand [`paginate`] an
/// iterator.
#[derive(Debug)]
pub struct PageCollector<T> {
    offset: usize,
    limit: usize,
    seen: usize,
    page: Page<T>,
}

impl<T> PageCollector<T> {
    pub fn new(request: PageRequest) -> Self {
        Self {
            offset: request.offset(),
            limit: request.page_size() as usize,
            seen: 0,
            page: Page::empty(request),
        }
    }

    pub fn push(&mut self, row: T) {
        if self.seen >= self.offset && self.page.items.len() < self.limit {
            self.page.items.push(row);
        }
        self.seen += 1;
        self.page.total_items += 1;
    }

    pub fn finish(self) -> Page<T> {
        self.page
    }
}

/// Count every row and keep only the ones that fall on the requested page.
///
/// `rows` must already be filtered and in the contract order for the entity.
pub fn paginate<T, I>(rows: I, request: PageRequest) -> Page<T>
where
    I: IntoIterator<Item = T>,
{
    let mut collector = PageCollector::new(request);
    for row in rows {
        collector.push(row);
    }
    collector.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_values_fall_back_to_defaults() {
        let req = PageRequest::new(0, 0);
        assert_eq!(req.page(), 1);
        assert_eq!(req.page_size(), 10);
        assert_eq!(req, PageRequest::default());
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(1, 25).offset(), 0);
        assert_eq!(PageRequest::new(3, 25).offset(), 50);
    }

    #[test]
    fn test_paginate_counts_everything() {
        let page = paginate(0..23, PageRequest::new(3, 10));
        assert_eq!(page.total_items, 23);
        assert_eq!(page.items, vec![20, 21, 22]);
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn test_page_size_matches_min_rule() {
        // min(pageSize, total - (page-1)*pageSize), floored at zero.
        let total = 17u64;
        for page_size in 1..=20u32 {
            for page in 1..=20u32 {
                let result = paginate(0..total, PageRequest::new(page, page_size));
                let skipped = (page as u64 - 1) * page_size as u64;
                let expected = total.saturating_sub(skipped).min(page_size as u64);
                assert_eq!(result.items.len() as u64, expected, "page={} size={}", page, page_size);
                assert_eq!(result.total_items, total);
            }
        }
    }

    #[test]
    fn test_out_of_range_page_is_empty() {
        let page = paginate(vec!["a", "b"], PageRequest::new(5, 10));
        assert!(page.items.is_empty());
        assert_eq!(page.total_items, 2);
        assert_eq!(page.total_pages(), 1);
    }

    #[test]
    fn test_collector_matches_paginate() {
        let mut collector = PageCollector::new(PageRequest::new(2, 4));
        for row in 0..10 {
            collector.push(row);
        }
        assert_eq!(collector.finish(), paginate(0..10, PageRequest::new(2, 4)));
    }

    #[test]
    fn test_empty_input_has_zero_pages() {
        let page = paginate(Vec::<u8>::new(), PageRequest::default());
        assert_eq!(page.total_pages(), 0);
    }
}
