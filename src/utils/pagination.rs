use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: i64 = 15;
pub const MAX_PER_PAGE: i64 = 100;

/// Common query parameters accepted by every list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.per_page()
    }

    pub fn descending(&self) -> bool {
        !matches!(self.sort_order.as_deref(), Some("asc"))
    }

    /// Caller-requested sort column. Each list handler matches this against
    /// its own sortable columns and falls back to its default for anything
    /// else.
    pub fn sort_column(&self) -> Option<&str> {
        self.sort_by
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            page,
            per_page,
            total,
            total_pages: total_pages(total, per_page),
        }
    }
}

fn total_pages(total: i64, per_page: i64) -> i64 {
    if total == 0 {
        0
    } else {
        (total + per_page - 1) / per_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_page_one_of_fifteen() {
        let params = PageParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(), 15);
        assert_eq!(params.offset(), 0);
        assert!(params.descending());
    }

    #[test]
    fn clamps_out_of_range_values() {
        let params = PageParams {
            page: Some(-3),
            per_page: Some(10_000),
            ..Default::default()
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(), MAX_PER_PAGE);
    }

    #[test]
    fn sort_column_ignores_blank_values() {
        let params = PageParams {
            sort_by: Some("  name  ".to_string()),
            ..Default::default()
        };
        assert_eq!(params.sort_column(), Some("name"));

        let blank = PageParams {
            sort_by: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(blank.sort_column(), None);
        assert_eq!(PageParams::default().sort_column(), None);
    }

    #[test]
    fn rounds_total_pages_up() {
        assert_eq!(Pagination::new(1, 15, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 15, 15).total_pages, 1);
        assert_eq!(Pagination::new(1, 15, 16).total_pages, 2);
    }
}
