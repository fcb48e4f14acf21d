// system.rs - The script system: interpreter lifecycle and per-tick driving

use crate::component::ScriptComponent;
use crate::config::ScriptConfig;
use crate::diagnostics::{self, Reporter};
use crate::dispatcher::{ScriptInstance, UpdateDispatcher};
use crate::error::ScriptError;
use crate::exposed::{ComponentRegistry, ExposedComponent};
use crate::identity::{self, Bindings};
use crate::interpreter::Interpreter;
use crate::materializer::{self, Materializer};
use crate::object::{ObjectId, ScriptObject};
use crate::output::{self, sinks, LineSink, OutputRedirector, SharedRedirector};
use rquickjs::{Ctx, FromJs, Value};
use spindle_core::ecs::{ComponentAddedEvent, EntityManager, System};
use spindle_core::event::{BoxError, EventManager};
use spindle_core::time::TimeDelta;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Connects an entity manager to the interpreter.
///
/// Construction boots the interpreter (once per process) and registers the
/// native bindings. Search paths and output sinks are set up before
/// [`configure`](Self::configure), which wires the system into the event bus
/// and publishes the entity manager to scripts.
pub struct ScriptSystem {
    manager: EntityManager,
    interpreter: &'static Interpreter,
    config: ScriptConfig,
    paths: Vec<PathBuf>,
    stdout: SharedRedirector,
    stderr: SharedRedirector,
    reporter: Reporter,
    components: Rc<RefCell<ComponentRegistry>>,
    materializer: Rc<Materializer>,
    dispatcher: UpdateDispatcher,
    configured: bool,
}

impl ScriptSystem {
    pub fn new(manager: EntityManager) -> Result<Self, ScriptError> {
        Self::with_config(manager, ScriptConfig::default())
    }

    pub fn with_config(manager: EntityManager, config: ScriptConfig) -> Result<Self, ScriptError> {
        let interpreter = Interpreter::get()?;
        interpreter.register_bindings()?;
        if let Some(limit) = config.memory_limit {
            interpreter.set_memory_limit(limit);
        }
        if let Some(size) = config.max_stack_size {
            interpreter.set_max_stack_size(size);
        }

        let stdout = OutputRedirector::with_sink(sinks::stdout(config.stdout_prefix.clone())).shared();
        let stderr = OutputRedirector::with_sink(sinks::stderr(config.stderr_prefix.clone())).shared();
        let reporter = Reporter::new(stderr.clone());

        Ok(Self {
            manager,
            interpreter,
            paths: config.search_paths.clone(),
            config,
            stdout,
            stderr,
            materializer: Rc::new(Materializer::new(reporter.clone())),
            dispatcher: UpdateDispatcher::new(reporter.clone()),
            reporter,
            components: Rc::new(RefCell::new(ComponentRegistry::new())),
            configured: false,
        })
    }

    /// Add the installed script library directory, if one is configured or
    /// named by `SPINDLE_SCRIPT_LIB`. Returns whether a path was added.
    pub fn add_installed_library_path(&mut self) -> bool {
        match self.config.library_path() {
            Some(path) => {
                self.add_path(path);
                true
            }
            None => {
                debug!("no installed script library path");
                false
            }
        }
    }

    /// Add a module search path. Later paths take priority over earlier ones.
    pub fn add_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if self.configured {
            self.interpreter.prepend_search_path(&path);
        }
        self.paths.push(path);
    }

    pub fn add_paths<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for path in paths {
            self.add_path(path);
        }
    }

    /// Paths added to this system, in the order they were added.
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Send script output to `stdout` and `stderr` instead of the process
    /// streams.
    pub fn log_to(&mut self, stdout: impl Fn(&str) + 'static, stderr: impl Fn(&str) + 'static) {
        self.set_sinks(Rc::new(stdout), Rc::new(stderr));
    }

    /// Send script output to `tracing`.
    pub fn log_to_tracing(&mut self) {
        self.set_sinks(sinks::tracing_stdout(), sinks::tracing_stderr());
    }

    fn set_sinks(&mut self, stdout: LineSink, stderr: LineSink) {
        self.stdout.borrow_mut().set_sink(stdout);
        self.stderr.borrow_mut().set_sink(stderr);
    }

    /// Make `C` reachable from scripts by its exposed name.
    pub fn expose<C: ExposedComponent>(&mut self) -> &mut Self {
        if !self.components.borrow_mut().register::<C>() {
            warn!(component = C::NAME, "component type exposed twice");
        }
        self
    }

    pub fn manager(&self) -> &EntityManager {
        &self.manager
    }

    pub fn interpreter(&self) -> &'static Interpreter {
        self.interpreter
    }

    pub fn materializer(&self) -> &Rc<Materializer> {
        &self.materializer
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Subscribe to component events, install the output streams, apply the
    /// search paths and publish the entity manager.
    pub fn configure(&mut self, events: &EventManager) -> Result<(), ScriptError> {
        if self.configured {
            warn!("script system configured twice");
            return Ok(());
        }
        events.subscribe::<ComponentAddedEvent<ScriptComponent>, _>(self.materializer.clone());

        let bindings = Bindings {
            manager: self.manager.clone(),
            components: self.components.clone(),
            materializer: self.materializer.clone(),
        };
        self.interpreter.with(|ctx| {
            output::install_streams(&ctx, &self.stdout, &self.stderr)?;
            identity::publish(&ctx, bindings)
        })??;

        for path in &self.paths {
            self.interpreter.prepend_search_path(path);
        }
        self.configured = true;
        info!(paths = self.paths.len(), "script system configured");
        Ok(())
    }

    /// Update every materialized script object in this system's manager.
    pub fn update(&self, dt: TimeDelta) -> Result<usize, ScriptError> {
        self.update_entities(&self.manager, dt)
    }

    fn update_entities(&self, manager: &EntityManager, dt: TimeDelta) -> Result<usize, ScriptError> {
        self.materializer.drain()?;
        let updated = self.dispatcher.update(manager, dt)?;
        self.materializer.drain()?;
        Ok(updated)
    }

    /// Read a property of a stored script object.
    pub fn attribute<T>(&self, object: ObjectId, name: &str) -> Result<T, ScriptError>
    where
        T: for<'js> FromJs<'js>,
    {
        self.call(|ctx| ScriptInstance::restore(&ctx, self.interpreter, object)?.get(name))
    }

    /// Call a no-argument method on a stored script object.
    pub fn invoke(&self, object: ObjectId, method: &str) -> Result<(), ScriptError> {
        self.call(|ctx| {
            ScriptInstance::restore(&ctx, self.interpreter, object)?
                .call_method::<Value>(method, Vec::new())
                .map(drop)
        })
    }

    /// Call an exported no-argument function of a module.
    pub fn run_module_function<T>(&self, module: &str, function: &str) -> Result<T, ScriptError>
    where
        T: for<'js> FromJs<'js>,
    {
        self.call(|ctx| {
            let namespace = materializer::import(&ctx, module)?;
            let Some(exported) = namespace.get::<_, Value>(function)?.into_function() else {
                return Err(ScriptError::MissingMethod {
                    method: format!("{module}.{function}"),
                });
            };
            exported
                .call(())
                .map_err(|e| diagnostics::invocation(&ctx, format!("calling {module}.{function}"), e))
        })
    }

    /// Evaluate `source` as a global script.
    pub fn eval<T>(&self, source: &str) -> Result<T, ScriptError>
    where
        T: for<'js> FromJs<'js>,
    {
        self.call(|ctx| {
            ctx.eval::<T, _>(source)
                .map_err(|e| diagnostics::invocation(&ctx, "evaluating script", e))
        })
    }

    /// Evaluate an expression producing an object and keep the object alive
    /// for native code.
    pub fn create_object(&self, source: &str) -> Result<ScriptObject, ScriptError> {
        self.call(|ctx| {
            let value: Value = ctx
                .eval(source)
                .map_err(|e| diagnostics::invocation(&ctx, "evaluating script", e))?;
            let object = value.into_object().ok_or_else(|| ScriptError::Invocation {
                during: "evaluating script".to_owned(),
                message: "expression did not produce an object".to_owned(),
            })?;
            Ok(self.interpreter.store(&ctx, object))
        })
    }

    /// Forward any partial output lines.
    pub fn flush_output(&self) {
        for stream in [&self.stdout, &self.stderr] {
            if let Ok(mut stream) = stream.try_borrow_mut() {
                stream.flush();
            }
        }
    }

    fn call<T>(&self, f: impl FnOnce(Ctx<'_>) -> Result<T, ScriptError>) -> Result<T, ScriptError> {
        let result = self.interpreter.with(f).and_then(|r| r);
        if let Err(err) = &result {
            self.reporter.report(err);
        }
        // Deferred materializations report their own failures and never
        // replace the outcome of the call that queued them.
        if let Err(err) = self.materializer.drain() {
            warn!(error = %err, "deferred materialization failed");
        }
        result
    }
}

impl System for ScriptSystem {
    fn configure(&mut self, events: &EventManager) -> Result<(), BoxError> {
        ScriptSystem::configure(self, events).map_err(Into::into)
    }

    fn update(&mut self, entities: &EntityManager, _events: &EventManager, dt: TimeDelta) -> Result<(), BoxError> {
        self.update_entities(entities, dt).map(drop).map_err(Into::into)
    }
}

impl Drop for ScriptSystem {
    fn drop(&mut self) {
        // The interpreter outlives us and may still reference the streams.
        self.flush_output();
        if !self.configured {
            return;
        }
        match self.interpreter.with(|ctx| identity::withdraw(&ctx, &self.manager)) {
            Ok(Ok(true)) => debug!("entity manager withdrawn from scripts"),
            Ok(Ok(false)) => {}
            Ok(Err(err)) => warn!(error = %err, "cannot withdraw entity manager from scripts"),
            Err(err) => warn!(error = %err, "entity manager left published"),
        }
    }
}
