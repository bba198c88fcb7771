//! Query building blocks
//!
//! Column names only ever come from `&'static str` constants of a
//! [`Resource`]; values are always bound as parameters.

use crate::error::{Error, Result};

/// A type persisted in its own table
///
/// All columns are stored as `VARCHAR`. The first entry of `COLUMNS` is the
/// primary key.
pub trait Resource: Sized + Send + Sync + 'static {
    /// Table name
    const TABLE: &'static str;

    /// Human readable name used in "not found" errors
    const NAME: &'static str;

    /// All columns, primary key first
    const COLUMNS: &'static [&'static str];

    /// Columns a caller may order by
    const ORDER_COLUMNS: &'static [&'static str];

    /// Column used when no order is requested
    const DEFAULT_ORDER: &'static str;

    /// Column holding the ID that authorization scopes refer to
    const SCOPE_COLUMN: &'static str;

    /// Primary key column
    fn primary_key() -> &'static str {
        Self::COLUMNS[0]
    }

    /// Primary key value
    fn id(&self) -> &str;

    /// Column values, in `COLUMNS` order
    fn to_row(&self) -> Vec<String>;

    /// Read a row selected with `COLUMNS`
    fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self>;
}

// ============================================================================
// Conditions
// ============================================================================

/// A predicate on a single column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `column = value`
    Eq(&'static str, String),
    /// `column IN (values)`; an empty list matches nothing
    In(&'static str, Vec<String>),
}

impl Condition {
    /// Equality condition
    pub fn eq(column: &'static str, value: impl Into<String>) -> Self {
        Self::Eq(column, value.into())
    }

    /// Membership condition
    pub fn is_in(column: &'static str, values: Vec<String>) -> Self {
        Self::In(column, values)
    }

    fn render(&self, params: &mut Vec<String>) -> String {
        match self {
            Condition::Eq(column, value) => {
                params.push(value.clone());
                format!("{column} = ?")
            }
            Condition::In(_, values) if values.is_empty() => "FALSE".to_string(),
            Condition::In(column, values) => {
                params.extend(values.iter().cloned());
                let placeholders = vec!["?"; values.len()].join(", ");
                format!("{column} IN ({placeholders})")
            }
        }
    }
}

/// Render a `WHERE` clause (with leading space) or nothing
pub(crate) fn where_clause(conditions: &[Condition], params: &mut Vec<String>) -> String {
    if conditions.is_empty() {
        return String::new();
    }

    let rendered: Vec<String> = conditions.iter().map(|c| c.render(params)).collect();
    format!(" WHERE {}", rendered.join(" AND "))
}

// ============================================================================
// Ordering
// ============================================================================

/// A validated `ORDER BY` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    column: &'static str,
    asc: bool,
    tie_break: Option<&'static str>,
}

impl OrderBy {
    /// Validate a requested order column against an allow-list
    ///
    /// An empty request selects `default`. The primary key is added as a
    /// secondary key unless it already is the order column, so that rows
    /// with equal values keep a fixed position across pages.
    pub fn resolve(
        requested: &str,
        asc: bool,
        allowed: &'static [&'static str],
        default: &'static str,
        primary_key: &'static str,
    ) -> Result<Self> {
        let column = if requested.is_empty() {
            default
        } else {
            allowed
                .iter()
                .copied()
                .find(|allowed| *allowed == requested)
                .ok_or_else(|| Error::invalid_order_column(requested))?
        };

        Ok(Self {
            column,
            asc,
            tie_break: (column != primary_key).then_some(primary_key),
        })
    }

    /// Resolve against the allow-list of a resource
    pub fn for_resource<R: Resource>(requested: &str, asc: bool) -> Result<Self> {
        Self::resolve(
            requested,
            asc,
            R::ORDER_COLUMNS,
            R::DEFAULT_ORDER,
            R::primary_key(),
        )
    }

    /// Primary order column
    pub fn column(&self) -> &'static str {
        self.column
    }

    /// Ascending order
    pub fn is_asc(&self) -> bool {
        self.asc
    }

    /// Render the clause without the `ORDER BY` keyword
    pub fn to_sql(&self) -> String {
        let direction = if self.asc { "ASC" } else { "DESC" };
        match self.tie_break {
            Some(key) => format!("{} {direction}, {key} {direction}", self.column),
            None => format!("{} {direction}", self.column),
        }
    }
}
