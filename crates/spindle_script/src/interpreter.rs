//! The embedded interpreter.
//!
//! One QuickJS runtime and context per process, bound to the thread that
//! first asks for it (the frame-update thread). Any other thread is refused
//! with [`ScriptError::ForeignThread`]. The interpreter is created lazily,
//! leaked, and never torn down: native components may hold references into
//! it for as long as the process runs.

use crate::error::ScriptError;
use crate::identity;
use crate::loader::{ScriptLoader, SearchPathResolver, SearchPaths};
use crate::object::{ObjectId, ScriptObject};
use crate::output;
use once_cell::sync::OnceCell as SyncOnceCell;
use once_cell::unsync::OnceCell;
use rquickjs::loader::{BuiltinLoader, BuiltinResolver};
use rquickjs::{Context, Ctx, Object, Persistent, Runtime};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::thread::{self, ThreadId};
use tracing::{debug, info};

/// Name scripts import the bridge's base classes from.
pub const PRELUDE_MODULE: &str = "spindle";

const PRELUDE_SOURCE: &str = include_str!("js/spindle.js");

/// The thread that booted the interpreter.
static OWNER: SyncOnceCell<ThreadId> = SyncOnceCell::new();

thread_local! {
    static INTERPRETER: OnceCell<&'static Interpreter> = const { OnceCell::new() };
}

#[derive(Default)]
struct ObjectTable {
    next: u64,
    slots: HashMap<ObjectId, Persistent<Object<'static>>>,
}

pub struct Interpreter {
    runtime: Runtime,
    context: Context,
    search_paths: SearchPaths,
    objects: RefCell<ObjectTable>,
    depth: Cell<u32>,
    bindings: OnceCell<()>,
}

/// Restores the call depth even if the closure unwinds.
struct DepthGuard<'a>(&'a Cell<u32>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

impl Interpreter {
    /// The process interpreter, booting it on first use.
    ///
    /// The first caller's thread becomes the owner; calls from any other
    /// thread fail.
    pub fn get() -> Result<&'static Interpreter, ScriptError> {
        let here = thread::current().id();
        if *OWNER.get_or_init(|| here) != here {
            return Err(ScriptError::ForeignThread);
        }
        INTERPRETER.with(|cell| {
            cell.get_or_try_init(|| {
                let interpreter = Self::boot()?;
                Ok::<_, ScriptError>(&*Box::leak(Box::new(interpreter)))
            })
            .copied()
        })
    }

    /// The interpreter, if it was booted and this is its thread.
    pub fn current() -> Option<&'static Interpreter> {
        INTERPRETER.with(|cell| cell.get().copied())
    }

    fn boot() -> Result<Self, ScriptError> {
        let runtime = Runtime::new()?;
        let context = Context::full(&runtime)?;
        info!("script interpreter started");
        Ok(Self {
            runtime,
            context,
            search_paths: SearchPaths::default(),
            objects: RefCell::new(ObjectTable::default()),
            depth: Cell::new(0),
            bindings: OnceCell::new(),
        })
    }

    /// Install the module loader and the native classes. Runs once.
    pub fn register_bindings(&self) -> Result<(), ScriptError> {
        self.bindings
            .get_or_try_init(|| {
                let resolver = (
                    BuiltinResolver::default().with_module(PRELUDE_MODULE),
                    SearchPathResolver::new(self.search_paths.clone()),
                );
                let loader = (
                    BuiltinLoader::default().with_module(PRELUDE_MODULE, PRELUDE_SOURCE),
                    ScriptLoader,
                );
                self.runtime.set_loader(resolver, loader);

                self.with(|ctx| {
                    identity::register(&ctx)?;
                    output::install_console(&ctx)
                })??;
                info!("script bindings registered");
                Ok::<_, ScriptError>(())
            })
            .map(|_| ())
    }

    pub fn set_memory_limit(&self, bytes: usize) {
        self.runtime.set_memory_limit(bytes);
    }

    pub fn set_max_stack_size(&self, bytes: usize) {
        self.runtime.set_max_stack_size(bytes);
    }

    /// Run `f` inside the interpreter.
    ///
    /// QuickJS cannot be entered twice from native code; a call made while
    /// another is on the stack fails with [`ScriptError::InterpreterBusy`].
    pub fn with<R>(&self, f: impl FnOnce(Ctx<'_>) -> R) -> Result<R, ScriptError> {
        if self.busy() {
            return Err(ScriptError::InterpreterBusy);
        }
        self.depth.set(self.depth.get() + 1);
        let _guard = DepthGuard(&self.depth);
        Ok(self.context.with(f))
    }

    /// Whether a call into the interpreter is in progress.
    pub fn busy(&self) -> bool {
        self.depth.get() > 0
    }

    /// Put `path` at the front of the module search list.
    pub fn prepend_search_path(&self, path: &Path) {
        let mut paths = self.search_paths.borrow_mut();
        paths.retain(|existing| existing != path);
        paths.insert(0, path.to_path_buf());
        debug!(path = %path.display(), "script search path added");
    }

    /// Module search list, highest priority first.
    pub fn search_paths(&self) -> Vec<PathBuf> {
        self.search_paths.borrow().clone()
    }

    /// Keep `object` alive in the object table.
    pub fn store<'js>(&self, ctx: &Ctx<'js>, object: Object<'js>) -> ScriptObject {
        let persistent = Persistent::save(ctx, object);
        let mut table = self.objects.borrow_mut();
        table.next += 1;
        let id = ObjectId(table.next);
        table.slots.insert(id, persistent);
        ScriptObject::new(id)
    }

    pub fn restore<'js>(&self, ctx: &Ctx<'js>, id: ObjectId) -> Result<Object<'js>, ScriptError> {
        let persistent = self
            .objects
            .borrow()
            .slots
            .get(&id)
            .cloned()
            .ok_or(ScriptError::StaleObject(id))?;
        Ok(persistent.restore(ctx)?)
    }

    pub(crate) fn release(&self, id: ObjectId) {
        // Drop the reference after the table borrow ends; freeing the object
        // can run finalizers that reach back into the table.
        let slot = self.objects.borrow_mut().slots.remove(&id);
        drop(slot);
    }

    /// Number of objects currently held for native code.
    pub fn live_objects(&self) -> usize {
        self.objects.borrow().slots.len()
    }
}
