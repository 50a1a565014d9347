//! Pagination utilities
//!
//! List endpoints take `page` (1-indexed, default 1) and `page_size`
//! (1..=100, default 50). Out-of-range values are rejected rather than
//! clamped so clients notice malformed requests.

use asigest_common::{Error, Result};
use serde::Serialize;

/// Default page size for all paged lists
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Largest page a client may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// Validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Rows per page
    pub page_size: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
}

impl Pagination {
    /// Validate raw query values
    ///
    /// # Examples
    /// ```
    /// use asigest_api::pagination::Pagination;
    ///
    /// let p = Pagination::from_params(Some(3), Some(20)).unwrap();
    /// assert_eq!(p.offset, 40);
    ///
    /// let p = Pagination::from_params(None, None).unwrap();
    /// assert_eq!((p.page, p.page_size), (1, 50));
    ///
    /// assert!(Pagination::from_params(Some(0), None).is_err());
    /// ```
    pub fn from_params(page: Option<i64>, page_size: Option<i64>) -> Result<Self> {
        let page = page.unwrap_or(1);
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);

        if page < 1 {
            return Err(Error::InvalidInput("page must be >= 1".to_string()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(Error::InvalidInput(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let offset = (page - 1)
            .checked_mul(page_size)
            .ok_or_else(|| Error::InvalidInput(format!("page {} is out of range", page)))?;

        Ok(Self {
            page,
            page_size,
            offset,
        })
    }

    /// Number of pages needed for `total` rows
    pub fn total_pages(&self, total: i64) -> i64 {
        (total + self.page_size - 1) / self.page_size
    }
}

/// One page of results
#[derive(Debug, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> Paged<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            page: pagination.page,
            page_size: pagination.page_size,
            total_pages: pagination.total_pages(total),
        }
    }

    /// Convert each item, keeping page metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let p = Pagination::from_params(None, None).unwrap();
        assert_eq!(p.page, 1);
        assert_eq!(p.page_size, 50);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_offset() {
        let p = Pagination::from_params(Some(2), Some(25)).unwrap();
        assert_eq!(p.offset, 25);
    }

    #[test]
    fn test_pagination_rejects_page_zero() {
        assert!(Pagination::from_params(Some(0), None).is_err());
        assert!(Pagination::from_params(Some(-3), None).is_err());
    }

    #[test]
    fn test_pagination_rejects_page_size_out_of_range() {
        assert!(Pagination::from_params(None, Some(0)).is_err());
        assert!(Pagination::from_params(None, Some(101)).is_err());
        assert!(Pagination::from_params(None, Some(100)).is_ok());
    }

    #[test]
    fn test_pagination_rejects_offset_overflow() {
        assert!(Pagination::from_params(Some(i64::MAX), None).is_err());
        assert!(Pagination::from_params(Some(i64::MAX), Some(1)).is_ok());

        let result = Pagination::from_params(Some(i64::MAX / 2), Some(100));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_total_pages() {
        let p = Pagination::from_params(Some(1), Some(50)).unwrap();
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(50), 1);
        assert_eq!(p.total_pages(51), 2);
        assert_eq!(p.total_pages(250), 5);
    }

    #[test]
    fn test_page_beyond_end_keeps_metadata() {
        let p = Pagination::from_params(Some(9), Some(10)).unwrap();
        let paged: Paged<i64> = Paged::new(Vec::new(), 15, p);
        assert_eq!(paged.page, 9);
        assert_eq!(paged.total_pages, 2);
        assert!(paged.items.is_empty());
    }
}
