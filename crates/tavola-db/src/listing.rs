//! # Generic List Query
//!
//! Shared pagination, search and sort for every list endpoint.
//!
//! ## Query Shape
//! ```text
//! SELECT <columns> FROM <source>
//!  WHERE <filter> = ?                                  (e.g. user_id)
//!    AND search_text LIKE ? ESCAPE '\'                (search term, lowercased
//!                                                      in Rust)
//!  ORDER BY <sort field> ASC|DESC, <id> ASC            (allow-listed field)
//!  LIMIT ? OFFSET ?
//!
//! SELECT COUNT(*) FROM <source> WHERE ...              (same filters)
//! ```
//!
//! Column names in a [`ListSpec`] are compile-time constants and sort
//! fields come from an allow-list ([`tavola_core::SortSpec`]); only values
//! are bound.
//!
//! ## Search Keys
//! SQLite folds case for ASCII only. Every searchable table carries a
//! `search_text` column built by [`search_text`] on each write: the
//! entity's searchable fields, lowercased with [`char::to_lowercase`] and
//! joined with [`SEARCH_SEPARATOR`]. The term goes through the same
//! folding, so `TIRAMISÙ` finds `Tiramisù`.

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use tavola_core::{ListParams, SortSpec};
use tracing::debug;

use crate::error::DbResult;

/// Describes how to list one entity.
#[derive(Debug, Clone)]
pub struct ListSpec {
    /// `SELECT ... FROM ...` without WHERE/ORDER BY.
    pub select: &'static str,
    /// `SELECT COUNT(*) FROM ...` over the same source.
    pub count: &'static str,
    /// Column used as default order and tie-breaker.
    pub id_column: &'static str,
    /// The `search_text` column of the source, if the entity is searchable.
    pub search_column: Option<&'static str>,
    /// Equality filters ANDed to the search.
    pub filters: Vec<(&'static str, i64)>,
}

impl ListSpec {
    /// Restricts the listing to rows where `column = value`.
    pub fn filter(mut self, column: &'static str, value: i64) -> Self {
        self.filters.push((column, value));
        self
    }
}

/// Separates fields inside a `search_text` value.
pub const SEARCH_SEPARATOR: char = '\u{1f}';

/// Builds the `search_text` value of a row from its searchable fields.
pub fn search_text<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    let mut text = String::new();
    for (index, field) in fields.into_iter().enumerate() {
        if index > 0 {
            text.push(SEARCH_SEPARATOR);
        }
        text.push_str(&fold_term(field));
    }
    text
}

/// Lowercases a term and drops separators so it cannot span two fields.
pub fn fold_term(term: &str) -> String {
    term.chars()
        .filter(|c| *c != SEARCH_SEPARATOR)
        .flat_map(char::to_lowercase)
        .collect()
}

/// Rewrites the `search_text` of one row after an update.
pub async fn store_search_text(
    conn: &mut SqliteConnection,
    table: &'static str,
    id: i64,
    text: &str,
) -> DbResult<()> {
    let sql = format!("UPDATE {} SET search_text = ? WHERE id = ?", table);
    sqlx::query(&sql).bind(text).bind(id).execute(&mut *conn).await?;
    Ok(())
}

/// Escapes LIKE wildcards so the term matches literally.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_conditions(qb: &mut QueryBuilder<'_, Sqlite>, spec: &ListSpec, search: Option<&str>) {
    let mut keyword = " WHERE ";

    for (column, value) in &spec.filters {
        qb.push(keyword).push(*column).push(" = ").push_bind(*value);
        keyword = " AND ";
    }

    if let (Some(term), Some(column)) = (search, spec.search_column) {
        qb.push(keyword)
            .push(column)
            .push(" LIKE ")
            .push_bind(like_pattern(&fold_term(term)))
            .push(" ESCAPE '\\'");
    }
}

/// Runs the page query and the count query for `spec`.
///
/// `params` must already be validated (`ListParams::resolve`).
pub async fn fetch_page<T>(
    conn: &mut SqliteConnection,
    spec: &ListSpec,
    params: &ListParams,
    sort: Option<SortSpec>,
) -> DbResult<(Vec<T>, i64)>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let search = params.search_term();

    let mut count_qb = QueryBuilder::<Sqlite>::new(spec.count);
    push_conditions(&mut count_qb, spec, search);
    let total: i64 = count_qb.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(spec.select);
    push_conditions(&mut qb, spec, search);

    qb.push(" ORDER BY ");
    if let Some(sort) = sort {
        qb.push(sort.field)
            .push(" ")
            .push(sort.direction.as_sql())
            .push(", ");
    }
    qb.push(spec.id_column).push(" ASC");

    qb.push(" LIMIT ")
        .push_bind(params.limit())
        .push(" OFFSET ")
        .push_bind(params.offset());

    debug!(sql = qb.sql(), total, "Fetching page");

    let items = qb.build_query_as::<T>().fetch_all(&mut *conn).await?;

    Ok((items, total))
}
