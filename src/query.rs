use crate::{Conditions, Expr, ModelKey, ModelRegistry, Value, where_clause};
use std::sync::Arc;

/// Shared reference-counted column name list.
pub type RowNames = Arc<[String]>;
/// Owned row value slice matching `RowNames` length.
pub type Row = Box<[Value]>;

/// A result row with its corresponding column labels.
#[derive(Debug, Clone)]
pub struct RowLabeled {
    /// Column names.
    pub labels: RowNames,
    /// Data values (aligned by index with `labels`).
    pub values: Row,
}

impl RowLabeled {
    pub fn new(names: RowNames, values: Row) -> Self {
        Self {
            labels: names,
            values,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.labels
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get_column(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|v| v == name)
            .map(|i| &self.values[i])
    }
}

/// Metadata about modify operations reported by the connection collaborator.
#[derive(Default, Debug, Clone, Copy)]
pub struct RowsAffected {
    /// Total number of rows impacted.
    pub rows_affected: u64,
    /// Backend-specific last inserted / affected identifier when available.
    pub last_affected_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectList {
    /// Every column of the source (`*`).
    All,
    Columns(Vec<String>),
}

/// A structured SELECT document: no SQL text anywhere.
///
/// Absent fields stay absent; the builder only ever fills holes and merges
/// where clauses, it never overwrites what a caller put here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    pub columns: Option<SelectList>,
    pub from: Option<String>,
    pub filter: Option<Expr>,
}

/// Compile a model, an existing query fragment, a requested column list and a
/// condition map into a complete SELECT document.
///
/// Pure: identical inputs always produce an identical document, and applying
/// the builder to its own output (with nothing new to add) is a no-op.
pub fn build_select_query(
    registry: &ModelRegistry,
    model: &ModelKey,
    existing: SelectQuery,
    requested_columns: Option<&[String]>,
    conditions: Option<&Conditions>,
) -> SelectQuery {
    let columns = existing.columns.or_else(|| {
        Some(match requested_columns {
            Some(columns) => SelectList::Columns(columns.to_vec()),
            None => SelectList::All,
        })
    });
    let from = existing.from.or_else(|| registry.table_name(model));
    let filter = Expr::conjoin(existing.filter, conditions.and_then(where_clause));
    SelectQuery {
        columns,
        from,
        filter,
    }
}
