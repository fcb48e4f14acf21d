//! Native entity identity as seen from scripts.
//!
//! These classes are defined on the `_spindle` global and re-exported by the
//! `spindle` prelude module. None of them own native storage: `RawEntity`
//! names a slot in the entity manager, and `EntityManager` forwards to the
//! manager published by the script system.

use crate::component::ScriptComponent;
use crate::error::ScriptError;
use crate::exposed::ComponentRegistry;
use crate::ffi::ScriptHandle;
use crate::interpreter::Interpreter;
use crate::materializer::Materializer;
use crate::output::LoggerJs;
use rquickjs::class::Trace;
use rquickjs::function::Opt;
use rquickjs::{Array, Class, Ctx, Exception, JsLifetime, Object, Value};
use spindle_core::ecs::{Entity, EntityId, EntityManager};
use std::cell::RefCell;
use std::fmt::Display;
use std::rc::Rc;

/// Global holding the native classes.
pub const NATIVE_NAMESPACE: &str = "_spindle";
/// Global the entity manager is published under.
pub const MANAGER_GLOBAL: &str = "entityManager";

pub(crate) fn register(ctx: &Ctx<'_>) -> rquickjs::Result<()> {
    let namespace = Object::new(ctx.clone())?;
    Class::<EntityIdJs>::define(&namespace)?;
    Class::<RawEntityJs>::define(&namespace)?;
    Class::<EntityManagerJs>::define(&namespace)?;
    Class::<LoggerJs>::define(&namespace)?;
    ctx.globals().set(NATIVE_NAMESPACE, namespace)?;
    Ok(())
}

/// Make `bindings` the manager scripts see.
pub(crate) fn publish(ctx: &Ctx<'_>, bindings: Bindings) -> rquickjs::Result<()> {
    let manager = Class::instance(ctx.clone(), EntityManagerJs { bindings })?;
    ctx.globals().set(MANAGER_GLOBAL, manager)
}

/// Withdraw `manager` from scripts if it is the one currently published.
pub(crate) fn withdraw(ctx: &Ctx<'_>, manager: &EntityManager) -> rquickjs::Result<bool> {
    let globals = ctx.globals();
    let published: Option<Class<'_, EntityManagerJs>> = globals.get(MANAGER_GLOBAL)?;
    match published {
        Some(published) if published.borrow().bindings.manager.ptr_eq(manager) => {
            globals.remove(MANAGER_GLOBAL)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

fn throw<E: Display>(ctx: &Ctx<'_>, error: E) -> rquickjs::Error {
    Exception::throw_message(ctx, &error.to_string())
}

fn interpreter(ctx: &Ctx<'_>) -> rquickjs::Result<&'static Interpreter> {
    Interpreter::current().ok_or_else(|| throw(ctx, "script interpreter is not running"))
}

pub(crate) fn to_js<'js>(ctx: &Ctx<'js>, value: &serde_json::Value) -> rquickjs::Result<Value<'js>> {
    let text = serde_json::to_string(value).map_err(|e| throw(ctx, e))?;
    ctx.json_parse(text)
}

pub(crate) fn from_js<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> rquickjs::Result<serde_json::Value> {
    match ctx.json_stringify(value)? {
        Some(text) => serde_json::from_str(&text.to_string()?).map_err(|e| throw(ctx, e)),
        None => Ok(serde_json::Value::Null),
    }
}

#[rquickjs::class(rename = "EntityId")]
#[derive(Clone, Trace, JsLifetime)]
pub struct EntityIdJs {
    #[qjs(skip_trace)]
    id: EntityId,
}

impl EntityIdJs {
    pub fn entity_id(&self) -> EntityId {
        self.id
    }
}

#[rquickjs::methods]
impl EntityIdJs {
    #[qjs(constructor)]
    pub fn new(index: u32, version: u32) -> Self {
        Self {
            id: EntityId::new(index, version),
        }
    }

    #[qjs(get)]
    pub fn index(&self) -> u32 {
        self.id.index()
    }

    #[qjs(get)]
    pub fn version(&self) -> u32 {
        self.id.version()
    }

    /// Packed `(version << 32) | index`.
    #[qjs(get, rename = "id")]
    pub fn packed(&self) -> f64 {
        ScriptHandle::from(self.id).to_number()
    }

    pub fn equals<'js>(&self, other: Class<'js, EntityIdJs>) -> bool {
        self.id == other.borrow().id
    }

    #[qjs(rename = "toString")]
    pub fn to_display(&self) -> String {
        self.id.to_string()
    }
}

/// Script-side name for one native entity.
#[rquickjs::class(rename = "RawEntity")]
#[derive(Clone, Trace, JsLifetime)]
pub struct RawEntityJs {
    #[qjs(skip_trace)]
    entity: Entity,
}

impl RawEntityJs {
    pub(crate) fn new(entity: Entity) -> Self {
        Self { entity }
    }
}

#[rquickjs::methods]
impl RawEntityJs {
    #[qjs(get)]
    pub fn id<'js>(&self, ctx: Ctx<'js>) -> rquickjs::Result<Class<'js, EntityIdJs>> {
        Class::instance(ctx, EntityIdJs { id: self.entity.id() })
    }

    pub fn valid(&self) -> bool {
        self.entity.valid()
    }

    pub fn destroy(&self, ctx: Ctx<'_>) -> rquickjs::Result<()> {
        self.entity.destroy().map_err(|e| throw(&ctx, e))
    }

    #[qjs(rename = "toString")]
    pub fn to_display(&self) -> String {
        self.entity.id().to_string()
    }
}

/// What the published manager needs from the script system.
#[derive(Clone)]
pub(crate) struct Bindings {
    pub manager: EntityManager,
    pub components: Rc<RefCell<ComponentRegistry>>,
    pub materializer: Rc<Materializer>,
}

#[rquickjs::class(rename = "EntityManager")]
#[derive(Trace, JsLifetime)]
pub struct EntityManagerJs {
    #[qjs(skip_trace)]
    bindings: Bindings,
}

impl EntityManagerJs {
    fn attach(&self, ctx: &Ctx<'_>, id: EntityId, component: ScriptComponent) -> rquickjs::Result<()> {
        self.bindings
            .manager
            .assign(id, component)
            .map_err(|e| throw(ctx, e))?;
        // Attaching while a script runs queues materialization; finish it on
        // this context before returning to the script.
        self.bindings
            .materializer
            .flush_pending(ctx)
            .map_err(|e| throw(ctx, e))
    }

    fn registry_call<T>(
        &self,
        ctx: &Ctx<'_>,
        f: impl FnOnce(&ComponentRegistry, &EntityManager) -> Result<T, ScriptError>,
    ) -> rquickjs::Result<T> {
        let registry = self.bindings.components.borrow();
        f(&registry, &self.bindings.manager).map_err(|e| throw(ctx, e))
    }
}

#[rquickjs::methods]
impl EntityManagerJs {
    /// Create a native entity owned by `object` (script-origin creation).
    #[qjs(rename = "newEntity")]
    pub fn new_entity<'js>(&self, ctx: Ctx<'js>, object: Object<'js>) -> rquickjs::Result<Class<'js, RawEntityJs>> {
        let script_object = interpreter(&ctx)?.store(&ctx, object);
        let entity = self.bindings.manager.create().map_err(|e| throw(&ctx, e))?;
        self.attach(&ctx, entity.id(), ScriptComponent::from_object(script_object))?;
        Class::instance(ctx, RawEntityJs::new(entity))
    }

    /// Create a bare native entity.
    pub fn create<'js>(&self, ctx: Ctx<'js>) -> rquickjs::Result<Class<'js, RawEntityJs>> {
        let entity = self.bindings.manager.create().map_err(|e| throw(&ctx, e))?;
        Class::instance(ctx, RawEntityJs::new(entity))
    }

    pub fn entity<'js>(&self, ctx: Ctx<'js>, id: Class<'js, EntityIdJs>) -> rquickjs::Result<Class<'js, RawEntityJs>> {
        let entity = self.bindings.manager.entity(id.borrow().id);
        Class::instance(ctx, RawEntityJs::new(entity))
    }

    #[qjs(get)]
    pub fn size(&self) -> u32 {
        self.bindings.manager.size() as u32
    }

    #[qjs(rename = "attachScript")]
    pub fn attach_script<'js>(&self, ctx: Ctx<'js>, id: Class<'js, EntityIdJs>, object: Object<'js>) -> rquickjs::Result<()> {
        let script_object = interpreter(&ctx)?.store(&ctx, object);
        let id = id.borrow().id;
        self.attach(&ctx, id, ScriptComponent::from_object(script_object))
    }

    #[qjs(rename = "attachNamedScript")]
    pub fn attach_named_script<'js>(
        &self,
        ctx: Ctx<'js>,
        id: Class<'js, EntityIdJs>,
        module: String,
        class: String,
        args: Opt<Array<'js>>,
    ) -> rquickjs::Result<()> {
        let mut component = ScriptComponent::new(module, class);
        if let Some(args) = args.0 {
            for arg in args.iter::<Value>() {
                component.args.push(from_js(&ctx, arg?)?);
            }
        }
        let id = id.borrow().id;
        self.attach(&ctx, id, component)
    }

    /// `{ object, module, className }` for the entity's script component, or
    /// null. `object` is null until materialized.
    #[qjs(rename = "scriptComponent")]
    pub fn script_component<'js>(&self, ctx: Ctx<'js>, id: Class<'js, EntityIdJs>) -> rquickjs::Result<Value<'js>> {
        let id = id.borrow().id;
        let found = self
            .bindings
            .manager
            .with_component(id, |c: &ScriptComponent| (c.object_id(), c.module.clone(), c.class.clone()));
        let Some((object_id, module, class)) = found else {
            return Ok(Value::new_null(ctx));
        };
        let object = match object_id {
            Some(object_id) => interpreter(&ctx)?
                .restore(&ctx, object_id)
                .map_err(|e| throw(&ctx, e))?
                .into_value(),
            None => Value::new_null(ctx.clone()),
        };
        let view = Object::new(ctx.clone())?;
        view.set("object", object)?;
        view.set("module", module)?;
        view.set("className", class)?;
        Ok(view.into_value())
    }

    #[qjs(rename = "componentFields")]
    pub fn component_fields(&self, ctx: Ctx<'_>, component: String) -> rquickjs::Result<Vec<String>> {
        self.registry_call(&ctx, |registry, _| {
            Ok(registry.fields(&component)?.iter().map(|f| (*f).to_owned()).collect())
        })
    }

    #[qjs(rename = "hasComponent")]
    pub fn has_component<'js>(&self, ctx: Ctx<'js>, component: String, id: Class<'js, EntityIdJs>) -> rquickjs::Result<bool> {
        let id = id.borrow().id;
        self.registry_call(&ctx, |registry, manager| registry.has(&component, manager, id))
    }

    /// Current field values, or null if the entity lacks the component.
    #[qjs(rename = "getComponent")]
    pub fn get_component<'js>(&self, ctx: Ctx<'js>, component: String, id: Class<'js, EntityIdJs>) -> rquickjs::Result<Value<'js>> {
        let id = id.borrow().id;
        match self.registry_call(&ctx, |registry, manager| registry.read(&component, manager, id))? {
            Some(fields) => to_js(&ctx, &fields),
            None => Ok(Value::new_null(ctx)),
        }
    }

    #[qjs(rename = "assignComponent")]
    pub fn assign_component<'js>(
        &self,
        ctx: Ctx<'js>,
        component: String,
        id: Class<'js, EntityIdJs>,
        fields: Value<'js>,
    ) -> rquickjs::Result<()> {
        let id = id.borrow().id;
        let fields = from_js(&ctx, fields)?;
        self.registry_call(&ctx, |registry, manager| registry.assign(&component, manager, id, fields))?;
        self.bindings
            .materializer
            .flush_pending(&ctx)
            .map_err(|e| throw(&ctx, e))
    }

    #[qjs(rename = "setComponent")]
    pub fn set_component<'js>(
        &self,
        ctx: Ctx<'js>,
        component: String,
        id: Class<'js, EntityIdJs>,
        fields: Value<'js>,
    ) -> rquickjs::Result<()> {
        let id = id.borrow().id;
        let fields = from_js(&ctx, fields)?;
        self.registry_call(&ctx, |registry, manager| registry.write(&component, manager, id, fields))
    }
}
