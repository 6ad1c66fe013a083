use modkit_query_errors::{BoundRule, PaginationField, QueryError};
use serde::{Deserialize, Serialize};

/// Requested page. Missing values fall back to defaults; nothing is clamped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub per_page: Option<i64>,
}

impl Pagination {
    #[must_use]
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }
}

/// Validated pagination bounds of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationLimits {
    pub default_per_page: i64,
    pub max_per_page: i64,
    pub max_page: Option<i64>,
}

/// A validated page together with the `LIMIT` / `OFFSET` it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    page: i64,
    per_page: i64,
    offset: u64,
}

impl PageWindow {
    #[must_use]
    pub fn page(&self) -> i64 {
        self.page
    }

    #[must_use]
    pub fn per_page(&self) -> i64 {
        self.per_page
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[must_use]
    pub fn limit(&self) -> u64 {
        self.per_page.unsigned_abs()
    }
}

/// Check `pagination` against `limits`.
///
/// # Errors
/// Returns an invalid-pagination error naming the field, the rejected value
/// and the bound when `page < 1`, `page > max_page`, `per_page < 1`,
/// `per_page > max_per_page`, or the offset does not fit in an `i64`.
pub fn validate(
    model: &str,
    pagination: &Pagination,
    limits: &PaginationLimits,
) -> Result<PageWindow, QueryError> {
    let page = pagination.page.unwrap_or(1);
    let per_page = pagination.per_page.unwrap_or(limits.default_per_page);
    let reject = |field, value, rule, bound| {
        Err(QueryError::invalid_pagination(model, field, value, rule, bound))
    };

    if page < 1 {
        return reject(PaginationField::Page, page, BoundRule::Min, 1);
    }
    if let Some(max_page) = limits.max_page
        && page > max_page
    {
        return reject(PaginationField::Page, page, BoundRule::Max, max_page);
    }
    if per_page < 1 {
        return reject(PaginationField::PerPage, per_page, BoundRule::Min, 1);
    }
    if per_page > limits.max_per_page {
        return reject(
            PaginationField::PerPage,
            per_page,
            BoundRule::Max,
            limits.max_per_page,
        );
    }

    let Some(offset) = (page - 1).checked_mul(per_page) else {
        let last_page = (i64::MAX / per_page).saturating_add(1);
        return reject(PaginationField::Page, page, BoundRule::Max, last_page);
    };

    Ok(PageWindow {
        page,
        per_page,
        offset: offset.unsigned_abs(),
    })
}
