//! The shared index-page query helper: substring search across a fixed set
//! of columns, allowlisted sorting, and clamped pagination.
//!
//! RULE: request-supplied sort keys never reach SQL directly — they are
//! resolved against the per-listing allowlist, falling back to the default
//! sort when unrecognized. Search binds go through placeholders.

use serde::{Deserialize, Serialize};

/// Parameters as parsed from an index-page query string. All optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    /// Sort key, `-` prefix for descending (e.g. `-created_at`).
    pub sort: Option<String>,
    pub per: Option<i64>,
    pub page: Option<i64>,
}

impl ListParams {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            ..Self::default()
        }
    }
}

/// One page of an index listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: i64,
    pub num_pages: i64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}

/// Per-listing description of which columns are searchable and sortable.
/// `sort_keys` maps the request-facing key to the SQL column expression.
pub struct QuerySpec<'a> {
    pub search_columns: &'a [&'a str],
    pub sort_keys: &'a [(&'a str, &'a str)],
    pub default_sort: &'a str,
}

impl QuerySpec<'_> {
    /// WHERE fragment (to append after an existing `WHERE 1=1` and scope
    /// clauses) plus the bind values for it. With no search term — or with
    /// an empty searchable-column list, which is a deliberate pass-through —
    /// this is empty.
    pub fn filter_clause(&self, params: &ListParams) -> (String, Vec<String>) {
        let term = match params.search.as_deref() {
            Some(t) if !t.is_empty() && !self.search_columns.is_empty() => t,
            _ => return (String::new(), Vec::new()),
        };
        let like = format!("%{}%", term.to_lowercase());
        let preds = self
            .search_columns
            .iter()
            .map(|col| format!("LOWER({col}) LIKE ?"))
            .collect::<Vec<_>>()
            .join(" OR ");
        let binds = vec![like; self.search_columns.len()];
        (format!(" AND ({preds})"), binds)
    }

    /// ORDER BY fragment. Unknown sort keys fall back to the default; a
    /// default missing from the allowlist falls back to the first key, and
    /// an empty allowlist yields no ordering at all.
    pub fn order_clause(&self, params: &ListParams) -> String {
        let requested = params.sort.as_deref().unwrap_or(self.default_sort);
        let resolved = self
            .resolve(requested)
            .or_else(|| self.resolve(self.default_sort))
            .or_else(|| self.sort_keys.first().map(|(_, col)| (*col, false)));
        match resolved {
            Some((column, descending)) => {
                format!(" ORDER BY {column} {}", if descending { "DESC" } else { "ASC" })
            }
            None => String::new(),
        }
    }

    fn resolve(&self, key: &str) -> Option<(&str, bool)> {
        let (name, descending) = match key.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (key, false),
        };
        self.sort_keys
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, col)| (*col, descending))
    }
}

/// Resolved paging window for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub per: i64,
    pub page: i64,
    pub num_pages: i64,
    pub offset: i64,
}

/// Resolve page size and page number against the row count. Page size comes
/// from the request, else from the viewer's preference (threaded in by the
/// caller), clamped to [1,100]. Out-of-range page numbers clamp to the last
/// page; an empty listing still reports page 1 of 1.
pub fn paginate(total: i64, params: &ListParams, viewer_per: i64) -> Paging {
    let per = params.per.unwrap_or(viewer_per).clamp(1, 100);
    let num_pages = (total.max(0) + per - 1).div_euclid(per).max(1);
    let page = params.page.unwrap_or(1).clamp(1, num_pages);
    Paging {
        per,
        page,
        num_pages,
        offset: (page - 1) * per,
    }
}
