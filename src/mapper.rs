use crate::{
    Conditions, Connection, DispatchTable, Error, Instance, MapperError, ModelKey, ModelRegistry,
    Next, Result, SelectQuery, build_select_query,
};
use anyhow::Context;
use futures::{StreamExt, future::BoxFuture};
use std::sync::Arc;

/// The arguments a `save` chain operates on.
pub struct SaveContext {
    /// The instance being written. The default handler replaces it with the
    /// re-baselined instance on success, so after handlers observe the saved
    /// state.
    pub instance: Instance,
    pub registry: Arc<ModelRegistry>,
}

/// The arguments a `select` chain operates on.
pub struct QueryContext {
    pub model: ModelKey,
    pub registry: Arc<ModelRegistry>,
    /// A query fragment the caller already populated; the built-in handler
    /// only fills its absent fields.
    pub base: SelectQuery,
    pub columns: Option<Vec<String>>,
    pub conditions: Option<Conditions>,
}

/// The mapping engine: model metadata plus the per-operation dispatch tables.
///
/// `Mapper::new` installs the built-in wildcard handlers, so every model is
/// selectable and saveable out of the box. Extensions refine behavior by
/// registering their own handlers on [`Mapper::save_handlers`] and
/// [`Mapper::select_handlers`] during startup; afterwards the mapper is used
/// through `&self` only and the tables stay frozen.
pub struct Mapper {
    registry: Arc<ModelRegistry>,
    select: DispatchTable<QueryContext, Vec<Instance>>,
    save: DispatchTable<SaveContext, Instance>,
}

impl Mapper {
    pub fn new(registry: ModelRegistry) -> Self {
        let mut select = DispatchTable::new("select");
        select.register_default(ModelKey::Any, select_default);
        let mut save = DispatchTable::new("save");
        save.register_around(ModelKey::Any, save_around);
        save.register_default(ModelKey::Any, save_default);
        Self {
            registry: Arc::new(registry),
            select,
            save,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ModelRegistry {
        Arc::make_mut(&mut self.registry)
    }

    /// The extension point for the `save` operation.
    pub fn save_handlers(&mut self) -> &mut DispatchTable<SaveContext, Instance> {
        &mut self.save
    }

    /// The extension point for the `select` operation.
    pub fn select_handlers(&mut self) -> &mut DispatchTable<QueryContext, Vec<Instance>> {
        &mut self.select
    }

    /// Fetch the instances of `model` matching `conditions`.
    pub async fn select(
        &self,
        conn: &mut dyn Connection,
        model: ModelKey,
        columns: Option<Vec<String>>,
        conditions: Option<Conditions>,
    ) -> Result<Vec<Instance>> {
        let chain = self.select.resolve(self.registry.hierarchy(), &model)?;
        let mut context = QueryContext {
            model,
            registry: self.registry.clone(),
            base: SelectQuery::default(),
            columns,
            conditions,
        };
        chain.invoke(&mut context, conn).await
    }

    /// Fetch at most one instance of `model` matching `conditions`.
    pub async fn find_one(
        &self,
        conn: &mut dyn Connection,
        model: ModelKey,
        conditions: Option<Conditions>,
    ) -> Result<Option<Instance>> {
        let mut instances = self.select(conn, model, None, conditions).await?;
        Ok(if instances.is_empty() {
            None
        } else {
            Some(instances.swap_remove(0))
        })
    }

    /// Write an instance's changes back to storage and return the
    /// re-baselined instance.
    ///
    /// An instance with no changes comes back unchanged without touching the
    /// connection. Zero affected rows fail with
    /// [`MapperError::StaleOrMissingRow`]; more than one affected row is
    /// logged as a warning and treated as success, since a model without a
    /// truly unique key is a data problem, not a save failure.
    pub async fn save(&self, conn: &mut dyn Connection, instance: Instance) -> Result<Instance> {
        let chain = self.save.resolve(self.registry.hierarchy(), instance.model())?;
        let mut context = SaveContext {
            instance,
            registry: self.registry.clone(),
        };
        chain.invoke(&mut context, conn).await
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new(ModelRegistry::new())
    }
}

/// Built-in wildcard `select`: compile the query document and materialize one
/// instance per row.
fn select_default<'a>(
    context: &'a mut QueryContext,
    conn: &'a mut dyn Connection,
) -> BoxFuture<'a, Result<Vec<Instance>>> {
    Box::pin(async move {
        let query = build_select_query(
            &context.registry,
            &context.model,
            context.base.clone(),
            context.columns.as_deref(),
            context.conditions.as_ref(),
        );
        log::debug!("selecting `{}`: {query:?}", context.model);
        let mut rows = conn.execute_query(&query);
        let mut instances = Vec::new();
        while let Some(row) = rows.next().await {
            instances.push(Instance::from_row(context.model.clone(), &row?));
        }
        Ok(instances)
    })
}

/// Built-in wildcard around for `save`: log the attempt and enrich any
/// failure from the rest of the chain with the operation, the model and the
/// diff that was being written.
fn save_around<'a>(
    context: &'a mut SaveContext,
    conn: &'a mut dyn Connection,
    next: Next<'a, SaveContext, Instance>,
) -> BoxFuture<'a, Result<Instance>> {
    Box::pin(async move {
        let model = context.instance.model().clone();
        let changes = context.instance.changes();
        log::debug!("saving `{model}` with changes {changes:?}");
        let snapshot = context.instance.clone();
        next.call(&mut *context, &mut *conn).await.with_context(|| {
            format!(
                "save of `{model}` failed (instance: {snapshot:?}, attempted changes: {changes:?})"
            )
        })
    })
}

/// Built-in wildcard default for `save`: the diff / update / re-baseline
/// state machine.
fn save_default<'a>(
    context: &'a mut SaveContext,
    conn: &'a mut dyn Connection,
) -> BoxFuture<'a, Result<Instance>> {
    Box::pin(async move {
        if !context.instance.is_bound() {
            return Err(MapperError::NotAnInstance { operation: "save" }.into());
        }
        let changes = context.instance.changes();
        if changes.is_empty() {
            return Ok(context.instance.clone());
        }
        let model = context.instance.model().clone();
        let table = context
            .registry
            .table_name(&model)
            .ok_or_else(|| Error::msg(format!("model `{model}` does not resolve to a table")))?;
        let mut primary_key = Vec::new();
        for column in context.registry.primary_keys(&model) {
            let value = context.instance.get(&column).cloned().ok_or_else(|| {
                Error::msg(format!(
                    "instance of `{model}` has no value for primary key column `{column}`"
                ))
            })?;
            primary_key.push((column, value));
        }
        let affected = conn.execute_update(&table, &primary_key, &changes).await?;
        if affected.rows_affected == 0 {
            return Err(MapperError::StaleOrMissingRow {
                model,
                table,
                primary_key,
            }
            .into());
        }
        if affected.rows_affected > 1 {
            log::warn!(
                "update of `{model}` ({table}) matched {} rows for primary key {primary_key:?}, expected exactly 1",
                affected.rows_affected
            );
        }
        let saved = context.instance.clone().reset_original();
        context.instance = saved.clone();
        Ok(saved)
    })
}
