//! Script system configuration.

use crate::error::ScriptError;
use crate::output::sinks;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the installed script library directory.
pub const LIBRARY_PATH_ENV: &str = "SPINDLE_SCRIPT_LIB";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Module search paths, in the order they are added. Later paths take
    /// priority.
    pub search_paths: Vec<PathBuf>,
    /// Directory holding the shared script library. Falls back to
    /// `SPINDLE_SCRIPT_LIB` when unset.
    pub installed_library_path: Option<PathBuf>,
    pub stdout_prefix: String,
    pub stderr_prefix: String,
    /// Interpreter heap limit in bytes.
    pub memory_limit: Option<usize>,
    /// Interpreter stack limit in bytes.
    pub max_stack_size: Option<usize>,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            installed_library_path: None,
            stdout_prefix: sinks::STDOUT_PREFIX.to_owned(),
            stderr_prefix: sinks::STDERR_PREFIX.to_owned(),
            memory_limit: None,
            max_stack_size: None,
        }
    }
}

impl ScriptConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ScriptError> {
        let text = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String, ScriptError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The configured library directory, or the one named by the environment.
    pub fn library_path(&self) -> Option<PathBuf> {
        self.installed_library_path
            .clone()
            .or_else(|| std::env::var_os(LIBRARY_PATH_ENV).map(PathBuf::from))
    }
}
