//! # Listing Parameters
//!
//! Pagination, search and sort parameters shared by every list endpoint,
//! plus the [`Page`] envelope returned to clients.
//!
//! ## Query String
//! ```text
//! GET /v1/admin/products?offset=20&limit=10&search=pizza&sort=-price
//!                        │         │        │             │
//!                        │         │        │             └─ "-" = descending
//!                        │         │        └─ case-insensitive substring of
//!                        │         │           any searchable field
//!                        │         └─ 1..=100, default 50
//!                        └─ >= 0, default 0
//! ```
//!
//! Each entity declares which columns may be sorted and which fields feed
//! its search key; both live next to the repositories in tavola-db.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{ValidationError, ValidationErrors};
use crate::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

// =============================================================================
// List Params
// =============================================================================

/// Raw list parameters as received in the query string.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
pub struct ListParams {
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
}

impl ListParams {
    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT)
    }

    /// Trimmed search term; blank terms disable searching.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    /// Checks the pagination bounds and resolves `sort` against `sortable`.
    pub fn resolve(&self, sortable: &[&'static str]) -> Result<Option<SortSpec>, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.offset() < 0 {
            errors.push(ValidationError::OutOfRange {
                field: "offset".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }

        if !(1..=MAX_PAGE_LIMIT).contains(&self.limit()) {
            errors.push(ValidationError::OutOfRange {
                field: "limit".to_string(),
                min: 1,
                max: MAX_PAGE_LIMIT,
            });
        }

        let sort = match self.sort.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => match SortSpec::parse(raw, sortable) {
                Ok(spec) => Some(spec),
                Err(err) => {
                    errors.push(err);
                    None
                }
            },
            None => None,
        };

        errors.into_result().map(|_| sort)
    }
}

// =============================================================================
// Sorting
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// A validated sort key. `field` always comes from an allow-list, so it is
/// safe to splice into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: &'static str,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Parses `name` / `-name` against the allowed fields.
    ///
    /// ## Example
    /// ```rust
    /// use tavola_core::{SortDirection, SortSpec};
    ///
    /// let spec = SortSpec::parse("-price", &["name", "price"]).unwrap();
    /// assert_eq!(spec.field, "price");
    /// assert_eq!(spec.direction, SortDirection::Descending);
    ///
    /// assert!(SortSpec::parse("password_hash", &["name"]).is_err());
    /// ```
    pub fn parse(raw: &str, allowed: &[&'static str]) -> Result<SortSpec, ValidationError> {
        let (direction, name) = match raw.strip_prefix('-') {
            Some(name) => (SortDirection::Descending, name),
            None => (SortDirection::Ascending, raw),
        };

        allowed
            .iter()
            .copied()
            .find(|field| *field == name)
            .map(|field| SortSpec {
                field,
                direction,
            })
            .ok_or_else(|| ValidationError::SortFieldNotAllowed {
                value: raw.to_string(),
                allowed: allowed.join(", "),
            })
    }
}

// =============================================================================
// Page
// =============================================================================

/// One page of results; `total` counts every match, not just this page.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Page {
            items,
            total,
            limit: params.limit(),
            offset: params.offset(),
        }
    }

    /// Re-wraps the items, keeping the pagination data.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
