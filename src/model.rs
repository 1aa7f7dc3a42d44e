use std::{
    borrow::Cow,
    collections::{HashMap, HashSet},
    fmt::{self, Display},
};

/// Identifies a logical table.
///
/// `Table` names pass through to the storage layer verbatim; `Ident` is a
/// symbolic, possibly namespace-qualified identifier (`reports/Visit`) whose
/// default table name is the unqualified segment, lower-cased. `Any` is the
/// wildcard every dispatch resolution falls back to; it is also the tag of a
/// detached row that is not bound to any model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelKey {
    Any,
    Table(Cow<'static, str>),
    Ident(Cow<'static, str>),
}

impl ModelKey {
    pub fn table(name: impl Into<Cow<'static, str>>) -> Self {
        ModelKey::Table(name.into())
    }

    pub fn ident(name: impl Into<Cow<'static, str>>) -> Self {
        ModelKey::Ident(name.into())
    }

    /// The table name this key resolves to when no override is registered.
    pub fn default_table_name(&self) -> Option<String> {
        match self {
            ModelKey::Any => None,
            ModelKey::Table(name) => Some(name.to_string()),
            ModelKey::Ident(name) => {
                let unqualified = name.rsplit('/').next().unwrap_or(name.as_ref());
                Some(unqualified.to_ascii_lowercase())
            }
        }
    }
}

impl Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKey::Any => f.write_str("*"),
            ModelKey::Table(name) | ModelKey::Ident(name) => f.write_str(name),
        }
    }
}

/// The is-a relation between model keys, supplied by the application.
///
/// A key may derive from several parents. Resolution paths visit the key
/// itself, then its ancestors nearest first (breadth first across multiple
/// parents, in derivation order), and end at the wildcard.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    parents: HashMap<ModelKey, Vec<ModelKey>>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `child` is-a `parent`. Idempotent.
    pub fn derive(&mut self, child: ModelKey, parent: ModelKey) {
        let parents = self.parents.entry(child).or_default();
        if !parents.contains(&parent) {
            parents.push(parent);
        }
    }

    pub fn parents(&self, key: &ModelKey) -> &[ModelKey] {
        self.parents.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// The specificity order for `key`: the key, its ancestors nearest first,
    /// the wildcard last.
    pub fn resolution_path(&self, key: &ModelKey) -> Vec<ModelKey> {
        let mut path = vec![key.clone()];
        let mut seen: HashSet<ModelKey> = path.iter().cloned().collect();
        let mut cursor = 0;
        while cursor < path.len() {
            let current = path[cursor].clone();
            for parent in self.parents(&current) {
                if seen.insert(parent.clone()) {
                    path.push(parent.clone());
                }
            }
            cursor += 1;
        }
        if seen.insert(ModelKey::Any) {
            path.push(ModelKey::Any);
        }
        path
    }
}

/// A per-model override. Absent fields fall back to the defaults.
#[derive(Debug, Clone, Default)]
pub struct ModelSpec {
    pub table: Option<String>,
    pub primary_keys: Option<Vec<String>>,
}

/// Resolves model keys to table metadata.
///
/// Lookups walk the key's resolution path and take the most specific
/// registered override; with none registered they silently fall back to the
/// key's derived table name and an `id` primary key.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    specs: HashMap<ModelKey, ModelSpec>,
    hierarchy: Hierarchy,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Record that `child` is-a `parent` for dispatch and metadata lookups.
    pub fn derive(&mut self, child: ModelKey, parent: ModelKey) {
        self.hierarchy.derive(child, parent);
    }

    /// Merge an override for `key`; fields left `None` keep any previously
    /// registered value.
    pub fn register(&mut self, key: ModelKey, spec: ModelSpec) {
        let entry = self.specs.entry(key).or_default();
        if spec.table.is_some() {
            entry.table = spec.table;
        }
        if spec.primary_keys.is_some() {
            entry.primary_keys = spec.primary_keys;
        }
    }

    pub fn register_table(&mut self, key: ModelKey, table: impl Into<String>) {
        self.register(
            key,
            ModelSpec {
                table: Some(table.into()),
                ..Default::default()
            },
        );
    }

    pub fn register_primary_keys(&mut self, key: ModelKey, columns: &[&str]) {
        self.register(
            key,
            ModelSpec {
                primary_keys: Some(columns.iter().map(|c| c.to_string()).collect()),
                ..Default::default()
            },
        );
    }

    /// The table `key` maps to. `None` only for an unregistered wildcard.
    pub fn table_name(&self, key: &ModelKey) -> Option<String> {
        for candidate in self.hierarchy.resolution_path(key) {
            if let Some(table) = self.specs.get(&candidate).and_then(|s| s.table.clone()) {
                return Some(table);
            }
        }
        key.default_table_name()
    }

    /// The ordered primary-key columns of `key`, defaulting to `id`.
    pub fn primary_keys(&self, key: &ModelKey) -> Vec<String> {
        for candidate in self.hierarchy.resolution_path(key) {
            if let Some(columns) = self.specs.get(&candidate).and_then(|s| s.primary_keys.clone())
            {
                return columns;
            }
        }
        vec!["id".to_string()]
    }
}
