use crate::{ModelKey, RowLabeled, Value};
use std::collections::BTreeMap;

/// The columns whose working value differs from the baseline, with the
/// working value to write.
pub type ChangeSet = BTreeMap<String, Value>;

/// One fetched or constructed row: an immutable baseline snapshot plus the
/// live working copy the caller edits.
///
/// Mutation only ever touches the working copy. The baseline moves forward
/// exclusively through [`Instance::reset_original`], which the save path calls
/// after a confirmed write. Two instances represent the same stored row only
/// through their primary-key values, never through object identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    model: ModelKey,
    original: BTreeMap<String, Value>,
    current: BTreeMap<String, Value>,
}

impl Instance {
    pub fn new<K, V>(model: ModelKey, row: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let snapshot: BTreeMap<String, Value> = row
            .into_iter()
            .map(|(column, value)| (column.into(), value.into()))
            .collect();
        Self {
            model,
            original: snapshot.clone(),
            current: snapshot,
        }
    }

    /// A row not bound to any model. Detached rows cannot be saved.
    pub fn detached<K, V>(row: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::new(ModelKey::Any, row)
    }

    pub fn from_row(model: ModelKey, row: &RowLabeled) -> Self {
        Self::new(
            model,
            row.labels
                .iter()
                .cloned()
                .zip(row.values.iter().cloned()),
        )
    }

    pub fn model(&self) -> &ModelKey {
        &self.model
    }

    /// Whether the instance is bound to a concrete model.
    pub fn is_bound(&self) -> bool {
        !matches!(self.model, ModelKey::Any)
    }

    /// The working value of a column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.current.get(column)
    }

    /// The baseline value of a column.
    pub fn original_value(&self, column: &str) -> Option<&Value> {
        self.original.get(column)
    }

    pub fn current(&self) -> &BTreeMap<String, Value> {
        &self.current
    }

    pub fn original(&self) -> &BTreeMap<String, Value> {
        &self.original
    }

    /// Edit a column in the working copy.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.current.insert(column.into(), value.into());
        self
    }

    /// Drop a column from the working copy; it diffs as `Null` against a
    /// non-null baseline value.
    pub fn unset(&mut self, column: &str) -> &mut Self {
        self.current.remove(column);
        self
    }

    /// The minimal update set: every column, across both views, whose working
    /// value (missing counts as `Null`) differs from the baseline.
    pub fn changes(&self) -> ChangeSet {
        let mut diff = ChangeSet::new();
        for column in self.current.keys().chain(self.original.keys()) {
            if diff.contains_key(column) {
                continue;
            }
            let current = self.current.get(column).cloned().unwrap_or(Value::Null);
            let original = self.original.get(column).cloned().unwrap_or(Value::Null);
            if current != original {
                diff.insert(column.clone(), current);
            }
        }
        diff
    }

    /// Re-baseline: the result's baseline equals its working copy, which is
    /// left untouched.
    pub fn reset_original(mut self) -> Self {
        self.original = self.current.clone();
        self
    }
}
