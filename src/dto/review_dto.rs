use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::{ApplicationFilter, ApplicationListing, SortSpec};
use crate::error::{Error, Result};
use crate::utils::time::parse_range_bound;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ReviewQuery {
    /// Builds the school-scoped filter. Blank strings count as absent.
    pub fn filter(&self, school_id: Uuid) -> Result<ApplicationFilter> {
        let mut filter = ApplicationFilter::for_school(school_id);

        if let Some(status) = present(&self.status) {
            filter.status = Some(status.parse()?);
        }
        filter.search = present(&self.search).map(str::to_string);

        match (present(&self.start_date), present(&self.end_date)) {
            (Some(start), Some(end)) => {
                let start = parse_range_bound(start, false)?;
                let end = parse_range_bound(end, true)?;
                if start > end {
                    return Err(Error::InvalidArgument(
                        "startDate must not be after endDate".into(),
                    ));
                }
                filter.created_between = Some((start, end));
            }
            (None, None) => {}
            _ => {
                return Err(Error::InvalidArgument(
                    "startDate and endDate must be provided together".into(),
                ))
            }
        }

        Ok(filter)
    }

    pub fn sort(&self) -> Result<SortSpec> {
        let mut sort = SortSpec::default();
        if let Some(field) = present(&self.sort_by) {
            sort.field = field.parse()?;
        }
        if let Some(order) = present(&self.sort_order) {
            sort.order = order.parse()?;
        }
        Ok(sort)
    }

    /// 1-based page and clamped limit.
    pub fn page_window(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(DEFAULT_PAGE).max(1);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        (page, limit)
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: i64,
    pub pages: i64,
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        let pages = ((total as f64) / (limit as f64)).ceil() as i64;
        Self {
            total,
            pages,
            page,
            limit,
        }
    }

    /// Rows before `page`. Saturates instead of overflowing on absurd page numbers.
    pub fn skip(page: i64, limit: i64) -> i64 {
        page.saturating_sub(1).max(0).saturating_mul(limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewPage {
    pub applications: Vec<ApplicationListing>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{SortField, SortOrder};
    use crate::models::application::ApplicationStatus;

    #[test]
    fn defaults_apply_when_nothing_is_given() {
        let q = ReviewQuery::default();
        assert_eq!(q.page_window(), (1, 10));
        assert_eq!(q.sort().unwrap(), SortSpec::default());
        let f = q.filter(Uuid::nil()).unwrap();
        assert_eq!(f, ApplicationFilter::for_school(Uuid::nil()));
    }

    #[test]
    fn page_and_limit_are_clamped() {
        let q = ReviewQuery {
            page: Some(0),
            limit: Some(1000),
            ..Default::default()
        };
        assert_eq!(q.page_window(), (1, MAX_LIMIT));
    }

    #[test]
    fn one_sided_date_range_is_rejected() {
        let q = ReviewQuery {
            start_date: Some("2025-01-01".into()),
            ..Default::default()
        };
        assert!(matches!(q.filter(Uuid::nil()).unwrap_err(), Error::InvalidArgument(_)));
    }

    #[test]
    fn filter_and_sort_are_parsed() {
        let q = ReviewQuery {
            status: Some("Approved".into()),
            search: Some("  ".into()),
            sort_by: Some("payment.amount".into()),
            sort_order: Some("asc".into()),
            ..Default::default()
        };
        let f = q.filter(Uuid::nil()).unwrap();
        assert_eq!(f.status, Some(ApplicationStatus::Approved));
        assert_eq!(f.search, None);
        let s = q.sort().unwrap();
        assert_eq!(s.field, SortField::PaymentAmount);
        assert_eq!(s.order, SortOrder::Asc);
    }

    #[test]
    fn pages_round_up() {
        assert_eq!(Pagination::new(12, 2, 5).pages, 3);
        assert_eq!(Pagination::new(0, 1, 10).pages, 0);
        assert_eq!(Pagination::skip(2, 5), 5);
    }

    #[test]
    fn skip_saturates_for_huge_pages() {
        assert_eq!(Pagination::skip(i64::MAX / 2, 10), i64::MAX);
        assert_eq!(Pagination::skip(i64::MAX, MAX_LIMIT), i64::MAX);
        assert_eq!(Pagination::skip(1, MAX_LIMIT), 0);
    }
}
