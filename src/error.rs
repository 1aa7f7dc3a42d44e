use crate::{ModelKey, Value};
use thiserror::Error;

/// The typed failures of the mapping engine.
///
/// These propagate through `anyhow` so the around layer can stack operation
/// context on top without losing the ability to downcast to the variant.
#[derive(Debug, Error)]
pub enum MapperError {
    /// No handler chain is resolvable: not even a wildcard default is
    /// registered for the operation.
    #[error("no handler registered for operation `{operation}` dispatching on `{model}`")]
    NoHandler {
        operation: &'static str,
        model: ModelKey,
    },

    /// The operation was invoked on a row that is not bound to a model.
    #[error("cannot {operation} a value that is not bound to a model")]
    NotAnInstance { operation: &'static str },

    /// An update keyed on the primary key matched no rows: the row the
    /// instance was built from is gone or its key changed underneath us.
    #[error("update of `{model}` ({table}) matched no rows for primary key {primary_key:?}")]
    StaleOrMissingRow {
        model: ModelKey,
        table: String,
        primary_key: Vec<(String, Value)>,
    },
}
