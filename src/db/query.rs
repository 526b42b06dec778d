//! Helpers for building filterable, searchable, paginated listings.

use serde::Serialize;
use sqlx::{Postgres, QueryBuilder};

const DEFAULT_PER_PAGE: i64 = 20;
const MAX_PER_PAGE: i64 = 100;

/// Accumulates `WHERE` predicates on a query under construction.
/// Absent filter values are skipped.
pub struct Predicates<'q, 'args> {
    qb: &'q mut QueryBuilder<'args, Postgres>,
    started: bool,
}

impl<'q, 'args> Predicates<'q, 'args> {
    pub fn new(qb: &'q mut QueryBuilder<'args, Postgres>) -> Self {
        Self { qb, started: false }
    }

    fn next(&mut self) -> &mut QueryBuilder<'args, Postgres> {
        self.qb.push(if self.started { " AND " } else { " WHERE " });
        self.started = true;
        self.qb
    }

    pub fn eq<T>(&mut self, column: &str, value: Option<T>) -> &mut Self
    where
        T: 'args + sqlx::Encode<'args, Postgres> + sqlx::Type<Postgres> + Send,
    {
        if let Some(value) = value {
            self.next().push(column).push(" = ").push_bind(value);
        }
        self
    }

    /// Case-insensitive substring match of `term` against any of `columns`.
    pub fn search(&mut self, columns: &[&str], term: Option<&str>) -> &mut Self {
        let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) else {
            return self;
        };
        let pattern = format!("%{}%", escape_like(term));

        let qb = self.next();
        qb.push("(");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(*column)
                .push("::text ILIKE ")
                .push_bind(pattern.clone());
        }
        qb.push(")");
        self
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub per_page: i64,
}

impl Page {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn push_limit(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" LIMIT ")
            .push_bind(self.per_page)
            .push(" OFFSET ")
            .push_bind(self.offset());
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub results: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(results: Vec<T>, total: i64, page: Page) -> Self {
        Self {
            results,
            total,
            page: page.page,
            per_page: page.per_page,
            total_pages: (total + page.per_page - 1) / page.per_page,
        }
    }
}
