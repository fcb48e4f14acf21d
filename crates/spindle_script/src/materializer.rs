//! Lazy creation of script objects for attached components.
//!
//! A [`ScriptComponent`] attached from native code names a module and class.
//! When the attach event arrives, the materializer imports the module, finds
//! the class, and calls its `fromNativeEntity` factory with the stored
//! arguments followed by `{ entity }`. The returned object is stored back on
//! the component. Each component is materialized at most once.

use crate::component::{ScriptComponent, ENTITY_PARAM, FACTORY_METHOD};
use crate::diagnostics::{self, Reporter};
use crate::error::ScriptError;
use crate::identity::{self, RawEntityJs};
use crate::interpreter::Interpreter;
use rquickjs::function::{Rest, This};
use rquickjs::{Class, Ctx, Module, Object, Value};
use spindle_core::ecs::{ComponentAddedEvent, ComponentHandle, EntityId};
use spindle_core::event::{BoxError, Receiver};
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};

pub struct Materializer {
    reporter: Reporter,
    /// Requests that arrived while a script call was on the stack.
    pending: RefCell<VecDeque<ComponentHandle<ScriptComponent>>>,
    /// Entities whose factory is running right now.
    in_flight: RefCell<HashSet<EntityId>>,
}

impl Materializer {
    pub fn new(reporter: Reporter) -> Self {
        Self {
            reporter,
            pending: RefCell::new(VecDeque::new()),
            in_flight: RefCell::new(HashSet::new()),
        }
    }

    /// Materialize the component behind `handle` unless it already has an
    /// object. Deferred if the interpreter is busy.
    pub fn request(&self, handle: &ComponentHandle<ScriptComponent>) -> Result<(), ScriptError> {
        if handle.with(ScriptComponent::is_materialized).unwrap_or(true) {
            return Ok(());
        }
        let interpreter = Interpreter::get()?;
        if interpreter.busy() {
            debug!(entity = %handle.entity(), "interpreter busy, deferring materialization");
            self.pending.borrow_mut().push_back(handle.clone());
            return Ok(());
        }
        interpreter.with(|ctx| self.materialize(&ctx, handle))?
    }

    /// Complete deferred requests on a context the caller already holds.
    ///
    /// Stops at the first failure; later requests stay queued.
    pub fn flush_pending(&self, ctx: &Ctx<'_>) -> Result<(), ScriptError> {
        loop {
            let next = self.pending.borrow_mut().pop_front();
            match next {
                Some(handle) => self.materialize(ctx, &handle)?,
                None => return Ok(()),
            }
        }
    }

    /// Complete deferred requests from outside the interpreter.
    pub fn drain(&self) -> Result<(), ScriptError> {
        if self.pending.borrow().is_empty() {
            return Ok(());
        }
        let interpreter = Interpreter::get()?;
        if interpreter.busy() {
            return Ok(());
        }
        interpreter.with(|ctx| self.flush_pending(&ctx))?
    }

    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    fn materialize(&self, ctx: &Ctx<'_>, handle: &ComponentHandle<ScriptComponent>) -> Result<(), ScriptError> {
        let request = handle
            .with(|c| (!c.is_materialized()).then(|| (c.module.clone(), c.class.clone(), c.args.clone())))
            .flatten();
        let Some((module, class, args)) = request else {
            return Ok(());
        };

        let entity = handle.entity();
        if !self.in_flight.borrow_mut().insert(entity) {
            debug!(%entity, "materialization already running");
            return Ok(());
        }
        let built = construct(ctx, handle, &module, &class, &args);
        self.in_flight.borrow_mut().remove(&entity);

        let object = match built {
            Ok(object) => object,
            Err(err) => {
                self.reporter.report(&err);
                return Err(err);
            }
        };

        let stored = Interpreter::get()?.store(ctx, object);
        match handle.with_mut(|c| c.set_object(stored)) {
            Some(Ok(())) => debug!(%entity, module, class, "materialized script object"),
            Some(Err(_)) => warn!(%entity, "entity already had a script object, keeping it"),
            None => warn!(%entity, "script component removed during construction"),
        }
        Ok(())
    }
}

impl Receiver<ComponentAddedEvent<ScriptComponent>> for Materializer {
    fn receive(&self, event: &ComponentAddedEvent<ScriptComponent>) -> Result<(), BoxError> {
        self.request(&event.component).map_err(Into::into)
    }
}

/// Module namespace for `name`, loading and evaluating it if needed.
pub(crate) fn import<'js>(ctx: &Ctx<'js>, name: &str) -> Result<Object<'js>, ScriptError> {
    Module::import(ctx, name.to_owned())
        .and_then(|promise| promise.finish::<Object>())
        .map_err(|e| ScriptError::UnresolvedModule {
            module: name.to_owned(),
            reason: diagnostics::describe_error(ctx, e),
        })
}

fn construct<'js>(
    ctx: &Ctx<'js>,
    handle: &ComponentHandle<ScriptComponent>,
    module: &str,
    class: &str,
    args: &[serde_json::Value],
) -> Result<Object<'js>, ScriptError> {
    let entity = handle.entity();
    debug!(%entity, module, class, "materializing script object");

    let namespace = import(ctx, module)?;
    let class_value: Value<'js> = namespace.get(class)?;
    let class_object = match class_value.into_object() {
        Some(object) if object.is_function() => object,
        _ => {
            return Err(ScriptError::UnresolvedClass {
                module: module.to_owned(),
                class: class.to_owned(),
            })
        }
    };
    let Some(factory) = class_object.get::<_, Value>(FACTORY_METHOD)?.into_function() else {
        return Err(ScriptError::MissingFactory {
            module: module.to_owned(),
            class: class.to_owned(),
            factory: FACTORY_METHOD,
        });
    };

    let during = format!("constructing {module}.{class} for {entity}");
    let mut call_args = args
        .iter()
        .map(|arg| identity::to_js(ctx, arg))
        .collect::<rquickjs::Result<Vec<_>>>()
        .map_err(|e| diagnostics::invocation(ctx, during.clone(), e))?;
    let named = Object::new(ctx.clone())?;
    let raw = Class::instance(ctx.clone(), RawEntityJs::new(handle.manager().entity(entity)))?;
    named.set(ENTITY_PARAM, raw)?;
    call_args.push(named.into_value());

    let result: Value<'js> = factory
        .call((This(class_object), Rest(call_args)))
        .map_err(|e| diagnostics::invocation(ctx, during.clone(), e))?;
    result.into_object().ok_or_else(|| ScriptError::Invocation {
        during,
        message: "factory did not return an object".to_owned(),
    })
}
