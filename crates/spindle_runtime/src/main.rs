//! Spindle Runtime
//!
//! Boots logging and the script system, spawns the configured entities and
//! runs a fixed number of simulation ticks.
//!
//! Usage: `spindle [settings.json]`

mod movement;
mod settings;

use anyhow::Result;
use movement::{Movement, Position, Velocity};
use settings::RuntimeSettings;
use spindle_core::ecs::{EntityManager, SystemManager};
use spindle_core::event::EventManager;
use spindle_core::time::SimulationTime;
use spindle_script::{ScriptComponent, ScriptSystem};
use std::path::Path;
use tracing::info;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Spindle runtime v{}", spindle_core::VERSION);
    let settings = match std::env::args_os().nth(1) {
        Some(path) => RuntimeSettings::load(Path::new(&path))?,
        None => RuntimeSettings::default(),
    };

    let events = EventManager::new();
    let entities = EntityManager::new(events.clone());

    let mut scripts = ScriptSystem::with_config(entities.clone(), settings.script.clone())?;
    scripts.add_installed_library_path();
    scripts.expose::<Position>().expose::<Velocity>();
    if settings.log_to_tracing {
        scripts.log_to_tracing();
    }

    let mut systems = SystemManager::new(entities.clone(), events.clone());
    systems.add("movement", Movement)?;
    systems.add("scripts", scripts)?;
    systems.configure()?;

    for spawn in &settings.spawn {
        for _ in 0..spawn.count {
            let component = ScriptComponent::new(&spawn.module, &spawn.class).with_args(spawn.args.clone());
            entities.create()?.assign(component)?;
        }
    }
    info!(entities = entities.size(), "initial entities spawned");

    let mut time = SimulationTime::new();
    for _ in 0..settings.ticks {
        let dt = time.advance_tick();
        systems.update_all(dt)?;
    }

    info!(
        ticks = time.tick_count(),
        entities = entities.size(),
        "simulation finished"
    );
    Ok(())
}
