//! Module resolution for the interpreter.
//!
//! Bare names resolve against the shared search-path list, front to back, so
//! the most recently configured path wins. Dotted names map onto directories
//! (`ai.patrol` → `ai/patrol.js`, or `ai/patrol/index.js` for packages).
//! Names starting with `./` or `../` resolve next to the importing module.

use rquickjs::loader::{Loader, Resolver};
use rquickjs::{Ctx, Module};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, error};

pub(crate) type SearchPaths = Rc<RefCell<Vec<PathBuf>>>;

pub(crate) struct SearchPathResolver {
    paths: SearchPaths,
}

impl SearchPathResolver {
    pub(crate) fn new(paths: SearchPaths) -> Self {
        Self { paths }
    }

    fn candidates(&self, base: &str, name: &str) -> Vec<PathBuf> {
        if name.starts_with("./") || name.starts_with("../") {
            let dir = Path::new(base).parent().unwrap_or_else(|| Path::new(""));
            return vec![dir.join(name)];
        }
        let relative = module_file(name);
        let package = relative.with_extension("").join("index.js");
        self.paths
            .borrow()
            .iter()
            .flat_map(|root| [root.join(&relative), root.join(&package)])
            .collect()
    }
}

impl Resolver for SearchPathResolver {
    fn resolve<'js>(&mut self, _ctx: &Ctx<'js>, base: &str, name: &str) -> rquickjs::Result<String> {
        for candidate in self.candidates(base, name) {
            if candidate.is_file() {
                debug!(module = name, path = %candidate.display(), "resolved script module");
                return Ok(candidate.to_string_lossy().into_owned());
            }
        }
        debug!(module = name, base, "script module not found on search path");
        Err(rquickjs::Error::new_resolving(base, name))
    }
}

/// Relative file for a module name.
fn module_file(name: &str) -> PathBuf {
    if name.ends_with(".js") || name.contains('/') {
        return PathBuf::from(name);
    }
    let mut path: PathBuf = name.split('.').collect();
    path.set_extension("js");
    path
}

/// Reads resolved module files from disk.
pub(crate) struct ScriptLoader;

impl Loader for ScriptLoader {
    fn load<'js>(&mut self, ctx: &Ctx<'js>, path: &str) -> rquickjs::Result<Module<'js>> {
        let source = fs::read_to_string(path).map_err(|e| {
            error!("failed to read script module '{path}': {e}");
            rquickjs::Error::new_loading(path)
        })?;
        Module::declare(ctx.clone(), path, source)
    }
}
