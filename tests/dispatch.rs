mod common;

use common::{FakeConnection, init_logging};
use futures::future::BoxFuture;
use relmap::{
    AroundHandler, Connection, DefaultHandler, DispatchTable, Hierarchy, Instance, Mapper,
    ModelKey, ModelRegistry, Next, Result, SaveContext, SideHandler, Value,
};

/// Call log the test handlers write into; doubles as the dispatch arguments.
#[derive(Default)]
struct Trace {
    calls: Vec<String>,
}

struct Mark(&'static str);

impl SideHandler<Trace> for Mark {
    fn call<'a>(
        &'a self,
        args: &'a mut Trace,
        _conn: &'a mut dyn Connection,
    ) -> BoxFuture<'a, Result<()>> {
        args.calls.push(self.0.to_string());
        Box::pin(async { Ok(()) })
    }
}

struct Produce(&'static str);

impl DefaultHandler<Trace, String> for Produce {
    fn call<'a>(
        &'a self,
        args: &'a mut Trace,
        _conn: &'a mut dyn Connection,
    ) -> BoxFuture<'a, Result<String>> {
        args.calls.push(format!("{}:default", self.0));
        let result = self.0.to_string();
        Box::pin(async move { Ok(result) })
    }
}

struct Wrap(&'static str);

impl AroundHandler<Trace, String> for Wrap {
    fn call<'a>(
        &'a self,
        args: &'a mut Trace,
        conn: &'a mut dyn Connection,
        next: Next<'a, Trace, String>,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            args.calls.push(format!("{}:enter", self.0));
            let result = next.call(&mut *args, &mut *conn).await?;
            args.calls.push(format!("{}:exit", self.0));
            Ok(result)
        })
    }
}

/// An around handler that never falls through.
struct Swallow;

impl AroundHandler<Trace, String> for Swallow {
    fn call<'a>(
        &'a self,
        args: &'a mut Trace,
        _conn: &'a mut dyn Connection,
        _next: Next<'a, Trace, String>,
    ) -> BoxFuture<'a, Result<String>> {
        args.calls.push("swallow".to_string());
        Box::pin(async { Ok("short-circuit".to_string()) })
    }
}

fn employee_hierarchy() -> Hierarchy {
    let mut hierarchy = Hierarchy::new();
    hierarchy.derive(ModelKey::ident("employee"), ModelKey::ident("person"));
    hierarchy
}

#[tokio::test]
async fn full_chain_runs_in_method_combination_order() {
    init_logging();
    let mut table = DispatchTable::new("save");
    table.register_default(ModelKey::Any, Produce("any"));
    table.register_default(ModelKey::ident("person"), Produce("person"));
    table.register_around(ModelKey::ident("person"), Wrap("person"));
    table.register_around(ModelKey::ident("employee"), Wrap("employee"));
    table.register_before(ModelKey::ident("person"), Mark("person:before"));
    table.register_before(ModelKey::ident("employee"), Mark("employee:before"));
    table.register_after(ModelKey::ident("person"), Mark("person:after"));
    table.register_after(ModelKey::ident("employee"), Mark("employee:after"));

    let chain = table
        .resolve(&employee_hierarchy(), &ModelKey::ident("employee"))
        .unwrap();
    let mut trace = Trace::default();
    let mut conn = FakeConnection::default();
    let result = chain.invoke(&mut trace, &mut conn).await.unwrap();

    assert_eq!(result, "person");
    assert_eq!(
        trace.calls,
        [
            "employee:enter",
            "person:enter",
            "employee:before",
            "person:before",
            "person:default",
            "person:after",
            "employee:after",
            "person:exit",
            "employee:exit",
        ]
    );
}

#[tokio::test]
async fn around_can_swallow_the_rest_of_the_chain() {
    init_logging();
    let mut table = DispatchTable::new("save");
    table.register_default(ModelKey::ident("person"), Produce("person"));
    table.register_before(ModelKey::ident("person"), Mark("person:before"));
    table.register_after(ModelKey::ident("person"), Mark("person:after"));
    table.register_around(ModelKey::ident("employee"), Swallow);

    let chain = table
        .resolve(&employee_hierarchy(), &ModelKey::ident("employee"))
        .unwrap();
    let mut trace = Trace::default();
    let mut conn = FakeConnection::default();
    let result = chain.invoke(&mut trace, &mut conn).await.unwrap();

    assert_eq!(result, "short-circuit");
    assert_eq!(trace.calls, ["swallow"]);
}

#[tokio::test]
async fn same_key_registrations_compose_without_collision() {
    init_logging();
    // Two independent extensions register before handlers on the same model;
    // both run, in registration order.
    let mut table = DispatchTable::new("save");
    table.register_default(ModelKey::ident("person"), Produce("person"));
    table.register_before(ModelKey::ident("person"), Mark("ext-a"));
    table.register_before(ModelKey::ident("person"), Mark("ext-b"));

    let chain = table
        .resolve(&Hierarchy::new(), &ModelKey::ident("person"))
        .unwrap();
    let mut trace = Trace::default();
    let mut conn = FakeConnection::default();
    chain.invoke(&mut trace, &mut conn).await.unwrap();
    assert_eq!(trace.calls, ["ext-a", "ext-b", "person:default"]);
}

#[tokio::test]
async fn re_registering_a_default_replaces_it() {
    init_logging();
    let mut table = DispatchTable::new("save");
    table.register_default(ModelKey::ident("person"), Produce("v1"));
    table.register_default(ModelKey::ident("person"), Produce("v2"));
    let chain = table
        .resolve(&Hierarchy::new(), &ModelKey::ident("person"))
        .unwrap();
    let mut trace = Trace::default();
    let mut conn = FakeConnection::default();
    assert_eq!(chain.invoke(&mut trace, &mut conn).await.unwrap(), "v2");
    assert_eq!(trace.calls, ["v2:default"]);
}

/// A per-model save override: acknowledge without writing anything.
fn skip_save<'a>(
    context: &'a mut SaveContext,
    _conn: &'a mut dyn Connection,
) -> BoxFuture<'a, Result<Instance>> {
    let instance = context.instance.clone();
    Box::pin(async move { Ok(instance) })
}

#[tokio::test]
async fn per_model_save_handler_overrides_the_builtin() {
    init_logging();
    let mut registry = ModelRegistry::new();
    registry.register_table(ModelKey::ident("user"), "users");
    let mut mapper = Mapper::new(registry);
    mapper
        .save_handlers()
        .register_default(ModelKey::ident("audit_log"), skip_save);

    let mut conn = FakeConnection::with_affected(1);
    let mut entry = Instance::new(
        ModelKey::ident("audit_log"),
        [("id", Value::from(1)), ("event", Value::from("login"))],
    );
    entry.set("event", "logout");
    let returned = mapper.save(&mut conn, entry).await.unwrap();
    // The override took the place of the built-in state machine: nothing was
    // written and nothing was re-baselined.
    assert!(conn.updates.is_empty());
    assert_eq!(returned.changes().len(), 1);

    // Other models still go through the built-in default.
    let mut user = Instance::new(ModelKey::ident("user"), [("id", Value::from(1))]);
    user.set("name", "Sam");
    let saved = mapper.save(&mut conn, user).await.unwrap();
    assert_eq!(conn.updates.len(), 1);
    assert!(saved.changes().is_empty());
}
