use crate::{ChangeSet, Result, RowLabeled, RowsAffected, SelectQuery, Value};
use futures::{future::BoxFuture, stream::BoxStream};

/// The pluggable storage collaborator.
///
/// Implementations own everything this engine treats as a black box: SQL
/// rendering of the structured documents, the wire protocol, pooling,
/// transactions and timeouts. Both calls may block or suspend; the engine
/// never retries them, failures propagate to the caller as-is.
///
/// Connections are passed explicitly (`&mut dyn Connection`) through every
/// operation rather than held in ambient state, so acquisition and release
/// stay scoped to the caller on every exit path.
pub trait Connection: Send {
    /// Execute a SELECT document and stream back the matching rows lazily.
    fn execute_query<'a>(&'a mut self, query: &'a SelectQuery) -> BoxStream<'a, Result<RowLabeled>>;

    /// Write `changes` to the rows of `table` matching the `primary_key`
    /// column/value pairs, reporting how many rows were touched.
    fn execute_update<'a>(
        &'a mut self,
        table: &'a str,
        primary_key: &'a [(String, Value)],
        changes: &'a ChangeSet,
    ) -> BoxFuture<'a, Result<RowsAffected>>;
}
