use crate::{Connection, Hierarchy, MapperError, ModelKey, Result};
use futures::future::BoxFuture;
use std::{collections::HashMap, sync::Arc};

/// The innermost handler of a chain: performs the operation itself.
///
/// Free functions with the matching signature implement this automatically
/// through the blanket impl; stateful handlers implement it on a struct.
pub trait DefaultHandler<A, R>: Send + Sync {
    fn call<'a>(&'a self, args: &'a mut A, conn: &'a mut dyn Connection)
    -> BoxFuture<'a, Result<R>>;
}

impl<A, R, F> DefaultHandler<A, R> for F
where
    F: for<'a> Fn(&'a mut A, &'a mut dyn Connection) -> BoxFuture<'a, Result<R>> + Send + Sync,
{
    fn call<'a>(
        &'a self,
        args: &'a mut A,
        conn: &'a mut dyn Connection,
    ) -> BoxFuture<'a, Result<R>> {
        self(args, conn)
    }
}

/// A before or after handler: runs for effect only, around the default.
pub trait SideHandler<A>: Send + Sync {
    fn call<'a>(&'a self, args: &'a mut A, conn: &'a mut dyn Connection)
    -> BoxFuture<'a, Result<()>>;
}

impl<A, F> SideHandler<A> for F
where
    F: for<'a> Fn(&'a mut A, &'a mut dyn Connection) -> BoxFuture<'a, Result<()>> + Send + Sync,
{
    fn call<'a>(
        &'a self,
        args: &'a mut A,
        conn: &'a mut dyn Connection,
    ) -> BoxFuture<'a, Result<()>> {
        self(args, conn)
    }
}

/// An around handler: wraps the rest of the chain.
///
/// It must either call [`Next::call`] to fall through to the remaining chain
/// or intentionally short-circuit with its own result. The engine does not
/// police call-through; that is the chain author's contract.
pub trait AroundHandler<A, R>: Send + Sync {
    fn call<'a>(
        &'a self,
        args: &'a mut A,
        conn: &'a mut dyn Connection,
        next: Next<'a, A, R>,
    ) -> BoxFuture<'a, Result<R>>;
}

impl<A, R, F> AroundHandler<A, R> for F
where
    F: for<'a> Fn(&'a mut A, &'a mut dyn Connection, Next<'a, A, R>) -> BoxFuture<'a, Result<R>>
        + Send
        + Sync,
{
    fn call<'a>(
        &'a self,
        args: &'a mut A,
        conn: &'a mut dyn Connection,
        next: Next<'a, A, R>,
    ) -> BoxFuture<'a, Result<R>> {
        self(args, conn, next)
    }
}

/// Explicit fall-through to the rest of a resolved chain.
pub struct Next<'c, A, R> {
    chain: &'c HandlerChain<A, R>,
    index: usize,
}

impl<'c, A: Send, R: Send> Next<'c, A, R> {
    /// Invoke the remaining chain: inner around handlers first, then the
    /// before handlers, the default and the after handlers.
    pub fn call<'a>(
        &self,
        args: &'a mut A,
        conn: &'a mut dyn Connection,
    ) -> BoxFuture<'a, Result<R>>
    where
        'c: 'a,
    {
        self.chain.invoke_from(self.index, args, conn)
    }
}

struct Registrations<A, R> {
    default: Option<Arc<dyn DefaultHandler<A, R>>>,
    arounds: Vec<Arc<dyn AroundHandler<A, R>>>,
    befores: Vec<Arc<dyn SideHandler<A>>>,
    afters: Vec<Arc<dyn SideHandler<A>>>,
}

impl<A, R> Default for Registrations<A, R> {
    fn default() -> Self {
        Self {
            default: None,
            arounds: Vec::new(),
            befores: Vec::new(),
            afters: Vec::new(),
        }
    }
}

/// The open dispatch registry for one operation.
///
/// Handlers register under a model key with one of four roles; independent
/// extensions can pile registrations onto the same key without coordinating.
/// Registration happens at startup behind `&mut` access; resolution and
/// invocation only need `&self`, so a populated table is naturally frozen and
/// safe to share.
pub struct DispatchTable<A, R> {
    operation: &'static str,
    registrations: HashMap<ModelKey, Registrations<A, R>>,
}

impl<A, R> DispatchTable<A, R> {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            registrations: HashMap::new(),
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Register the default handler for `key`. Registering again for the same
    /// key replaces the previous default, open-dispatch style.
    pub fn register_default(&mut self, key: ModelKey, handler: impl DefaultHandler<A, R> + 'static) {
        self.registrations.entry(key).or_default().default = Some(Arc::new(handler));
    }

    pub fn register_around(&mut self, key: ModelKey, handler: impl AroundHandler<A, R> + 'static) {
        self.registrations
            .entry(key)
            .or_default()
            .arounds
            .push(Arc::new(handler));
    }

    pub fn register_before(&mut self, key: ModelKey, handler: impl SideHandler<A> + 'static) {
        self.registrations
            .entry(key)
            .or_default()
            .befores
            .push(Arc::new(handler));
    }

    pub fn register_after(&mut self, key: ModelKey, handler: impl SideHandler<A> + 'static) {
        self.registrations
            .entry(key)
            .or_default()
            .afters
            .push(Arc::new(handler));
    }

    /// Resolve the effective chain for `key`: a pure function of this table,
    /// the hierarchy and the key.
    ///
    /// The default is the most specific registration on the key's resolution
    /// path. Around and before handlers run most specific first, after
    /// handlers most specific last; registrations of equal specificity run in
    /// registration order (reversed for afters). With no default anywhere on
    /// the path, resolution fails with [`MapperError::NoHandler`].
    pub fn resolve(
        &self,
        hierarchy: &Hierarchy,
        key: &ModelKey,
    ) -> std::result::Result<HandlerChain<A, R>, MapperError> {
        let path = hierarchy.resolution_path(key);
        let mut default = None;
        let mut arounds = Vec::new();
        let mut befores = Vec::new();
        let mut afters = Vec::new();
        for candidate in &path {
            let Some(registrations) = self.registrations.get(candidate) else {
                continue;
            };
            if default.is_none() {
                if let Some(handler) = &registrations.default {
                    default = Some((candidate.clone(), handler.clone()));
                }
            }
            for handler in &registrations.arounds {
                arounds.push((candidate.clone(), handler.clone()));
            }
            for handler in &registrations.befores {
                befores.push((candidate.clone(), handler.clone()));
            }
        }
        for candidate in path.iter().rev() {
            let Some(registrations) = self.registrations.get(candidate) else {
                continue;
            };
            for handler in registrations.afters.iter().rev() {
                afters.push((candidate.clone(), handler.clone()));
            }
        }
        let Some(default) = default else {
            return Err(MapperError::NoHandler {
                operation: self.operation,
                model: key.clone(),
            });
        };
        Ok(HandlerChain {
            operation: self.operation,
            arounds,
            befores,
            default,
            afters,
        })
    }
}

/// The effective handlers for one (operation, model) call, with the model key
/// each handler was registered under kept for observability.
pub struct HandlerChain<A, R> {
    operation: &'static str,
    arounds: Vec<(ModelKey, Arc<dyn AroundHandler<A, R>>)>,
    befores: Vec<(ModelKey, Arc<dyn SideHandler<A>>)>,
    default: (ModelKey, Arc<dyn DefaultHandler<A, R>>),
    afters: Vec<(ModelKey, Arc<dyn SideHandler<A>>)>,
}

impl<A: Send, R: Send> HandlerChain<A, R> {
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Run the chain: around handlers outermost, then befores, the default
    /// and afters.
    pub fn invoke<'a>(
        &'a self,
        args: &'a mut A,
        conn: &'a mut dyn Connection,
    ) -> BoxFuture<'a, Result<R>> {
        self.invoke_from(0, args, conn)
    }

    fn invoke_from<'a>(
        &'a self,
        index: usize,
        args: &'a mut A,
        conn: &'a mut dyn Connection,
    ) -> BoxFuture<'a, Result<R>> {
        if let Some((_, around)) = self.arounds.get(index) {
            let next = Next {
                chain: self,
                index: index + 1,
            };
            around.call(args, conn, next)
        } else {
            Box::pin(async move {
                for (_, before) in &self.befores {
                    before.call(&mut *args, &mut *conn).await?;
                }
                let result = self.default.1.call(&mut *args, &mut *conn).await?;
                for (_, after) in &self.afters {
                    after.call(&mut *args, &mut *conn).await?;
                }
                Ok(result)
            })
        }
    }

    /// The key the effective default was registered under.
    pub fn default_source(&self) -> &ModelKey {
        &self.default.0
    }

    pub fn around_sources(&self) -> Vec<&ModelKey> {
        self.arounds.iter().map(|(key, _)| key).collect()
    }

    pub fn before_sources(&self) -> Vec<&ModelKey> {
        self.befores.iter().map(|(key, _)| key).collect()
    }

    pub fn after_sources(&self) -> Vec<&ModelKey> {
        self.afters.iter().map(|(key, _)| key).collect()
    }
}
