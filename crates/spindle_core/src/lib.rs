//! Spindle Core
//!
//! The native side of the entity bridge:
//! - Entity storage (hecs-backed) with generational identities
//! - Typed, synchronous event delivery
//! - System registration and per-tick driving
//! - Fixed-step simulation time

pub mod ecs;
pub mod event;
pub mod time;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
