//! Runtime settings, read from the JSON file given on the command line.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use spindle_script::ScriptConfig;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    pub script: ScriptConfig,
    /// Fixed ticks to simulate before exiting.
    pub ticks: u64,
    /// Route script output through `tracing` instead of the process streams.
    pub log_to_tracing: bool,
    pub spawn: Vec<SpawnSettings>,
}

/// Entities created at startup with a script component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnSettings {
    pub module: String,
    pub class: String,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
    #[serde(default = "one")]
    pub count: u32,
}

fn one() -> u32 {
    1
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            script: ScriptConfig {
                search_paths: vec![PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/scripts"))],
                ..ScriptConfig::default()
            },
            ticks: 120,
            log_to_tracing: false,
            spawn: vec![SpawnSettings {
                module: "demo.wanderer".to_owned(),
                class: "Wanderer".to_owned(),
                args: vec![serde_json::json!(1.5), serde_json::json!(-0.5)],
                count: 3,
            }],
        }
    }
}

impl RuntimeSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let mut settings: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing settings from {}", path.display()))?;

        // Relative script paths are relative to the settings file.
        if let Some(base) = path.parent() {
            for search_path in &mut settings.script.search_paths {
                if search_path.is_relative() {
                    *search_path = base.join(&*search_path);
                }
            }
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_count_defaults_to_one() {
        let settings: RuntimeSettings = serde_json::from_str(
            r#"{ "ticks": 3, "spawn": [{ "module": "demo.wanderer", "class": "Wanderer" }] }"#,
        )
        .unwrap();
        assert_eq!(settings.ticks, 3);
        assert_eq!(settings.spawn[0].count, 1);
        assert!(settings.spawn[0].args.is_empty());
        // Omitted sections keep the demo setup rather than a bare config.
        assert_eq!(settings.script, RuntimeSettings::default().script);
    }

    #[test]
    fn partial_script_section_fills_from_config_defaults() {
        let settings: RuntimeSettings =
            serde_json::from_str(r#"{ "script": { "stdout_prefix": "> " } }"#).unwrap();
        assert_eq!(settings.script.stdout_prefix, "> ");
        assert_eq!(settings.script.stderr_prefix, ScriptConfig::default().stderr_prefix);
        assert!(settings.script.search_paths.is_empty());
        assert_eq!(settings.ticks, RuntimeSettings::default().ticks);
    }

    #[test]
    fn defaults_run_the_demo() {
        let settings = RuntimeSettings::default();
        assert_eq!(settings.spawn[0].module, "demo.wanderer");
        assert!(settings.script.search_paths[0].ends_with("scripts"));
    }
}
