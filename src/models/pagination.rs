//! Pagination types shared by every listing page

use serde::{Deserialize, Serialize};

/// Pagination parameters for a listing query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    /// Resolve the raw `?page=` value against the size of a listing.
    ///
    /// A missing value means page 1 and `last` means the last page. The
    /// first page always exists, even for an empty listing. Anything else
    /// that is not an integer within `1..=total_pages` is rejected.
    pub fn resolve(raw: Option<&str>, total: i64, per_page: u32) -> Result<Self, InvalidPage> {
        let per_page = per_page.max(1);
        let pages = total_pages(total, per_page);

        let page = match raw.map(str::trim) {
            None | Some("") => 1,
            Some("last") => pages,
            Some(value) => value
                .parse::<i64>()
                .map_err(|_| InvalidPage::NotANumber(value.to_string()))?
                .try_into()
                .map_err(|_| InvalidPage::OutOfRange)?,
        };

        if page < 1 || page > pages {
            return Err(InvalidPage::OutOfRange);
        }

        Ok(Self { page, per_page })
    }
}

/// Why a requested page does not exist
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidPage {
    #[error("Page number is not an integer: {0}")]
    NotANumber(String),
    #[error("That page contains no results")]
    OutOfRange,
}

/// Number of pages for `total` items; never less than one
fn total_pages(total: i64, per_page: u32) -> u32 {
    let per_page = per_page.max(1) as i64;
    let pages = (total.max(0) + per_page - 1) / per_page;
    pages.max(1) as u32
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        total_pages(self.total, self.per_page)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Navigation data for the paginator template
    pub fn page_info(&self) -> PageInfo {
        PageInfo {
            number: self.page,
            num_pages: self.total_pages(),
            total: self.total,
            has_next: self.has_next(),
            has_previous: self.has_prev(),
            next_page_number: self.has_next().then(|| self.page + 1),
            previous_page_number: self.has_prev().then(|| self.page - 1),
        }
    }
}

/// Serializable paginator state handed to templates as `page_obj`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageInfo {
    pub number: u32,
    pub num_pages: u32,
    pub total: i64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u32>,
    pub previous_page_number: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_page_is_first() {
        let params = ListParams::resolve(None, 25, 10).unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.offset(), 0);
        assert_eq!(params.limit(), 10);
    }

    #[test]
    fn test_last_page() {
        let params = ListParams::resolve(Some("last"), 25, 10).unwrap();
        assert_eq!(params.page, 3);
        assert_eq!(params.offset(), 20);
    }

    #[test]
    fn test_empty_listing_has_one_page() {
        assert_eq!(ListParams::resolve(Some("1"), 0, 10).unwrap().page, 1);
        assert_eq!(ListParams::resolve(Some("last"), 0, 10).unwrap().page, 1);
        assert_eq!(
            ListParams::resolve(Some("2"), 0, 10),
            Err(InvalidPage::OutOfRange)
        );
    }

    #[test]
    fn test_invalid_pages_rejected() {
        assert!(matches!(
            ListParams::resolve(Some("abc"), 25, 10),
            Err(InvalidPage::NotANumber(_))
        ));
        assert_eq!(
            ListParams::resolve(Some("0"), 25, 10),
            Err(InvalidPage::OutOfRange)
        );
        assert_eq!(
            ListParams::resolve(Some("-1"), 25, 10),
            Err(InvalidPage::OutOfRange)
        );
        assert_eq!(
            ListParams::resolve(Some("4"), 25, 10),
            Err(InvalidPage::OutOfRange)
        );
    }

    #[test]
    fn test_page_info() {
        let params = ListParams::new(2, 10);
        let page = PagedResult::new(vec![1, 2, 3], 23, &params);
        let info = page.page_info();

        assert_eq!(info.num_pages, 3);
        assert!(info.has_next);
        assert!(info.has_previous);
        assert_eq!(info.next_page_number, Some(3));
        assert_eq!(info.previous_page_number, Some(1));
    }
}
