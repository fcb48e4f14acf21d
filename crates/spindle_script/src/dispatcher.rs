//! Per-tick update of script objects.

use crate::component::{ScriptComponent, UPDATE_METHOD};
use crate::diagnostics::{self, Reporter};
use crate::error::ScriptError;
use crate::interpreter::Interpreter;
use crate::object::ObjectId;
use rquickjs::function::{Rest, This};
use rquickjs::{Ctx, FromJs, Object, Value};
use spindle_core::ecs::{EntityId, EntityManager};
use spindle_core::time::TimeDelta;
use tracing::trace;

/// Something the dispatcher can tick.
pub trait Behaviour {
    fn update(&self, dt: TimeDelta) -> Result<(), ScriptError>;
}

/// A materialized script object, borrowed for the duration of a call.
pub struct ScriptInstance<'js> {
    ctx: Ctx<'js>,
    object: Object<'js>,
}

impl<'js> ScriptInstance<'js> {
    pub fn new(ctx: Ctx<'js>, object: Object<'js>) -> Self {
        Self { ctx, object }
    }

    pub fn restore(ctx: &Ctx<'js>, interpreter: &Interpreter, id: ObjectId) -> Result<Self, ScriptError> {
        Ok(Self::new(ctx.clone(), interpreter.restore(ctx, id)?))
    }

    pub fn object(&self) -> &Object<'js> {
        &self.object
    }

    /// Read a property.
    pub fn get<T: FromJs<'js>>(&self, name: &str) -> Result<T, ScriptError> {
        self.object
            .get(name)
            .map_err(|e| diagnostics::invocation(&self.ctx, format!("reading '{name}'"), e))
    }

    /// Call a method with `this` bound to the object.
    pub fn call_method<R: FromJs<'js>>(&self, name: &str, args: Vec<Value<'js>>) -> Result<R, ScriptError> {
        let method: Value<'js> = self.object.get(name)?;
        let Some(method) = method.into_function() else {
            return Err(ScriptError::MissingMethod {
                method: name.to_owned(),
            });
        };
        method
            .call((This(self.object.clone()), Rest(args)))
            .map_err(|e| diagnostics::invocation(&self.ctx, format!("calling '{name}'"), e))
    }
}

impl Behaviour for ScriptInstance<'_> {
    fn update(&self, dt: TimeDelta) -> Result<(), ScriptError> {
        let dt = Value::new_float(self.ctx.clone(), dt);
        self.call_method::<Value>(UPDATE_METHOD, vec![dt]).map(drop)
    }
}

pub struct UpdateDispatcher {
    reporter: Reporter,
}

impl UpdateDispatcher {
    pub fn new(reporter: Reporter) -> Self {
        Self { reporter }
    }

    /// Call `update(dt)` on every materialized script object in `manager`.
    ///
    /// Returns how many objects were updated. The first failure aborts the
    /// pass and is reported before being returned.
    pub fn update(&self, manager: &EntityManager, dt: TimeDelta) -> Result<usize, ScriptError> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(ScriptError::InvalidTimeDelta(dt));
        }
        let interpreter = Interpreter::get()?;
        let targets: Vec<(EntityId, ObjectId)> = manager
            .entities_with::<ScriptComponent>()
            .into_iter()
            .filter_map(|entity| {
                let object = manager.with_component(entity, ScriptComponent::object_id)??;
                Some((entity, object))
            })
            .collect();

        let result = interpreter.with(|ctx| -> Result<usize, ScriptError> {
            let mut updated = 0;
            for (entity, object) in targets {
                // Destroyed, or given a different object, earlier in this pass.
                if manager.with_component(entity, ScriptComponent::object_id).flatten() != Some(object) {
                    trace!(%entity, "skipping entity removed during update");
                    continue;
                }
                let instance = ScriptInstance::restore(&ctx, interpreter, object)?;
                instance.update(dt).map_err(|err| match err {
                    ScriptError::Invocation { message, .. } => ScriptError::Invocation {
                        during: format!("updating {entity}"),
                        message,
                    },
                    other => other,
                })?;
                updated += 1;
            }
            Ok(updated)
        })?;

        if let Err(err) = &result {
            self.reporter.report(err);
        }
        result
    }
}
