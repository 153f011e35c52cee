//! Screen-agnostic grid wire model.
//!
//! Every list endpoint on both sites renders the same grid JSON: a column
//! set, string cell rows, paging metadata, and the currently applied filter
//! chips. The helpers here do column-name resolution and row/cell extraction
//! so callers never hardcode column positions, and `GridQuery` builds the
//! matching query parameters (search, filters, group-by, paging).

use serde::{Deserialize, Serialize};

/// Paging metadata attached to grid responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInfo {
    pub number: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
}

/// A filter chip the server reports as currently applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedFilter {
    pub field: String,
    pub value: String,
}

/// One data row; cells are positionally aligned with `Grid::columns`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridRow {
    pub cells: Vec<String>,
}

/// A rendered grid page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    pub columns: Vec<String>,
    pub rows: Vec<GridRow>,
    pub page: Option<PageInfo>,
    #[serde(default)]
    pub applied_filters: Vec<AppliedFilter>,
}

impl Grid {
    /// Resolve a column name to its index. Matching is exact first, then
    /// case-insensitive, mirroring how the product renders header casing
    /// inconsistently between sites.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        if let Some(idx) = self.columns.iter().position(|c| c == name) {
            return Some(idx);
        }
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// All values of a column by index, in row order.
    #[must_use]
    pub fn column_values(&self, index: usize) -> Vec<&str> {
        self.rows
            .iter()
            .filter_map(|row| row.cells.get(index).map(String::as_str))
            .collect()
    }

    /// All values of a column by name.
    #[must_use]
    pub fn column_values_by_name(&self, name: &str) -> Option<Vec<&str>> {
        self.column_index(name).map(|idx| self.column_values(idx))
    }

    /// Cell text at (row, column name).
    #[must_use]
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.cells.get(idx).map(String::as_str)
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rows whose cell in `column` equals `value`.
    #[must_use]
    pub fn rows_where(&self, column: &str, value: &str) -> Vec<&GridRow> {
        match self.column_index(column) {
            Some(idx) => self
                .rows
                .iter()
                .filter(|row| row.cells.get(idx).is_some_and(|c| c == value))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Total element count across all pages, falling back to the local row
    /// count for unpaged grids.
    #[must_use]
    pub fn total_elements(&self) -> u64 {
        self.page
            .as_ref()
            .map_or(self.rows.len() as u64, |p| p.total_elements)
    }
}

/// Query parameters for grid endpoints.
///
/// Filters accumulate; `clear_filters` drops them all, which is the
/// "clear all applied chips" operation. Paging is 1-based like the product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridQuery {
    pub search: Option<String>,
    pub filters: Vec<(String, String)>,
    pub group_by: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl GridQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    #[must_use]
    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    /// Drop every applied filter, returning the query to its unfiltered
    /// shape.
    #[must_use]
    pub fn clear_filters(mut self) -> Self {
        self.filters.clear();
        self
    }

    #[must_use]
    pub fn with_group_by(mut self, field: impl Into<String>) -> Self {
        self.group_by = Some(field.into());
        self
    }

    #[must_use]
    pub fn with_page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, size: u64) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Advance to the next page (page 2 if no page was set).
    #[must_use]
    pub fn next_page(mut self) -> Self {
        self.page = Some(self.page.unwrap_or(1).saturating_add(1));
        self
    }

    /// Step back one page, never below page 1.
    #[must_use]
    pub fn previous_page(mut self) -> Self {
        self.page = Some(self.page.unwrap_or(1).saturating_sub(1).max(1));
        self
    }

    /// Render as HTTP query parameters. Filters use the product's
    /// `filters=field:value` repetition.
    #[must_use]
    pub fn to_query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(ref search) = self.search {
            params.push(("search".to_string(), search.clone()));
        }
        for (field, value) in &self.filters {
            params.push(("filters".to_string(), format!("{field}:{value}")));
        }
        if let Some(ref group_by) = self.group_by {
            params.push(("groupBy".to_string(), group_by.clone()));
        }
        if let Some(page) = self.page {
            params.push(("page".to_string(), page.to_string()));
        }
        if let Some(size) = self.page_size {
            params.push(("pageSize".to_string(), size.to_string()));
        }
        params
    }
}
