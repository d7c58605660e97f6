//! Triage filter builder for constructing dynamic SQL queries
//!
//! This module provides a builder pattern for constructing WHERE clauses
//! and related SQL components for pending-transaction queries.

use crate::models::MessageSource;

/// Builder for constructing triage queue query filters
///
/// This avoids duplicating the query building logic between
/// `list_pending` and `count_pending`.
///
/// The lifetime `'query` represents how long the filter parameters
/// (search terms, sort fields) must remain valid.
#[derive(Default)]
pub struct TriageFilter<'query> {
    pub search: Option<&'query str>,
    pub source: Option<MessageSource>,
    pub sort_field: Option<&'query str>,
    pub sort_order: Option<&'query str>,
}

/// Result of building a filter - contains SQL components and parameters
pub struct FilterResult {
    /// WHERE clause including "WHERE" keyword (empty if no conditions)
    pub where_clause: String,
    /// ORDER BY clause including "ORDER BY" keyword
    pub order_clause: String,
    /// Parameters for the query (boxed for rusqlite compatibility)
    pub params: Vec<Box<dyn rusqlite::ToSql>>,
}

impl<'query> TriageFilter<'query> {
    /// Create a new filter builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set search query (searches recipient and description)
    pub fn search(mut self, query: Option<&'query str>) -> Self {
        self.search = query;
        self
    }

    /// Set source filter (None = all sources)
    pub fn source(mut self, source: Option<MessageSource>) -> Self {
        self.source = source;
        self
    }

    /// Set sort field (date, amount, or recipient)
    pub fn sort_field(mut self, field: Option<&'query str>) -> Self {
        self.sort_field = field;
        self
    }

    /// Set sort order (asc or desc)
    pub fn sort_order(mut self, order: Option<&'query str>) -> Self {
        self.sort_order = order;
        self
    }

    /// Build the filter components
    pub fn build(self) -> FilterResult {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        // Search filter (recipient and description)
        if let Some(q) = self.search {
            if !q.trim().is_empty() {
                conditions.push(
                    "(p.recipient LIKE ? COLLATE NOCASE OR p.description LIKE ? COLLATE NOCASE)"
                        .to_string(),
                );
                let pattern = format!("%{}%", q.trim());
                params.push(Box::new(pattern.clone()));
                params.push(Box::new(pattern));
            }
        }

        // Source filter
        if let Some(source) = self.source {
            conditions.push("p.source = ?".to_string());
            params.push(Box::new(source.as_str().to_string()));
        }

        // Build WHERE clause
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        // Build ORDER BY clause
        let order_column = match self.sort_field {
            Some("amount") => "p.amount",
            Some("recipient") => "p.recipient COLLATE NOCASE",
            _ => "p.date",
        };
        let order_dir = match self.sort_order {
            Some("asc") => "ASC",
            _ => "DESC",
        };
        let order_clause = format!("ORDER BY {} {}, p.id DESC", order_column, order_dir);

        FilterResult {
            where_clause,
            order_clause,
            params,
        }
    }
}

impl FilterResult {
    /// Build a COUNT query
    pub fn build_count_query(&self) -> String {
        format!(
            "SELECT COUNT(*) FROM pending_transactions p {}",
            self.where_clause
        )
    }

    /// Get parameter references for query execution
    pub fn params_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }

    /// Get mutable parameter vector to append pagination params
    pub fn into_params(self) -> Vec<Box<dyn rusqlite::ToSql>> {
        self.params
    }
}
