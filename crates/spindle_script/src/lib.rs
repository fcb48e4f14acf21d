//! Spindle Scripting Bridge
//!
//! Entity behaviour written in JavaScript, run by an embedded QuickJS
//! interpreter.
//!
//! ## Architecture
//!
//! - **Identity:** native entities cross into scripts as `RawEntity`/`EntityId`
//!   objects; scripts extend the `Entity` class from the `spindle` module.
//! - **Materialization:** attaching a [`ScriptComponent`] that names a module
//!   and class creates the script object through the class's
//!   `fromNativeEntity` factory.
//! - **Dispatch:** [`ScriptSystem::update`] calls `update(dt)` on every script
//!   object once per tick.
//! - **Output:** script `stdout`/`stderr`/`console` are line-buffered and
//!   forwarded to configurable sinks.
//!
//! ```ignore
//! let mut scripts = ScriptSystem::new(manager.clone())?;
//! scripts.add_path("scripts");
//! scripts.configure(&events)?;
//! manager.create()?.assign(script_component!("game.enemy", "Grunt", 4.0, 5.0))?;
//! scripts.update(dt)?;
//! ```

pub mod component;
pub mod config;
pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod exposed;
pub mod ffi;
pub mod identity;
pub mod interpreter;
mod loader;
pub mod materializer;
pub mod object;
pub mod output;
pub mod system;

pub use component::{ScriptComponent, ENTITY_PARAM, FACTORY_METHOD, UPDATE_METHOD};
pub use config::{ScriptConfig, LIBRARY_PATH_ENV};
pub use dispatcher::{Behaviour, ScriptInstance, UpdateDispatcher};
pub use error::{ErrorKind, ScriptError};
pub use exposed::{assign_to, get_component, ComponentRegistry, ExposedComponent};
pub use interpreter::{Interpreter, PRELUDE_MODULE};
pub use object::{ObjectId, ScriptObject};
pub use output::{sinks, LineSink, OutputRedirector};
pub use system::ScriptSystem;

pub use rquickjs;
