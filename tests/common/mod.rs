#![allow(dead_code)]

use relmap::{
    ChangeSet, Connection, Result, RowLabeled, RowsAffected, SelectQuery, Value, stream,
};
use futures::{future::BoxFuture, stream::BoxStream};
use std::sync::Arc;

/// One recorded `execute_update` invocation.
#[derive(Debug, Clone)]
pub struct UpdateCall {
    pub table: String,
    pub primary_key: Vec<(String, Value)>,
    pub changes: ChangeSet,
}

/// An in-memory connection that replays canned rows, reports a configurable
/// affected-row count and records every call it receives.
#[derive(Default)]
pub struct FakeConnection {
    pub rows: Vec<RowLabeled>,
    pub affected: u64,
    pub queries: Vec<SelectQuery>,
    pub updates: Vec<UpdateCall>,
}

impl FakeConnection {
    pub fn with_affected(affected: u64) -> Self {
        Self {
            affected,
            ..Default::default()
        }
    }

    pub fn with_rows(rows: Vec<RowLabeled>) -> Self {
        Self {
            rows,
            affected: 1,
            ..Default::default()
        }
    }
}

impl Connection for FakeConnection {
    fn execute_query<'a>(&'a mut self, query: &'a SelectQuery) -> BoxStream<'a, Result<RowLabeled>> {
        self.queries.push(query.clone());
        Box::pin(stream::iter(self.rows.clone().into_iter().map(Ok)))
    }

    fn execute_update<'a>(
        &'a mut self,
        table: &'a str,
        primary_key: &'a [(String, Value)],
        changes: &'a ChangeSet,
    ) -> BoxFuture<'a, Result<RowsAffected>> {
        self.updates.push(UpdateCall {
            table: table.to_string(),
            primary_key: primary_key.to_vec(),
            changes: changes.clone(),
        });
        let affected = RowsAffected {
            rows_affected: self.affected,
            last_affected_id: None,
        };
        Box::pin(async move { Ok(affected) })
    }
}

pub fn row(columns: &[(&str, Value)]) -> RowLabeled {
    let labels: Arc<[String]> = columns.iter().map(|(name, _)| name.to_string()).collect();
    let values = columns.iter().map(|(_, value)| value.clone()).collect();
    RowLabeled::new(labels, values)
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
