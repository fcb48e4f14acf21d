//! Native components shared with scripts, and the system integrating them.

use serde::{Deserialize, Serialize};
use spindle_core::ecs::{EntityManager, System};
use spindle_core::event::{BoxError, EventManager};
use spindle_core::time::TimeDelta;
use spindle_script::expose_component;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

expose_component!(Position, "Position", [x, y]);

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

expose_component!(Velocity, "Velocity", [dx, dy]);

/// Moves every entity with a position and a velocity.
pub struct Movement;

impl System for Movement {
    fn update(&mut self, entities: &EntityManager, _events: &EventManager, dt: TimeDelta) -> Result<(), BoxError> {
        let dt = dt as f32;
        for id in entities.entities_with::<Velocity>() {
            let Some(velocity) = entities.with_component(id, |v: &Velocity| *v) else {
                continue;
            };
            entities.with_component_mut(id, |p: &mut Position| {
                p.x += velocity.dx * dt;
                p.y += velocity.dy * dt;
            });
        }
        Ok(())
    }
}
