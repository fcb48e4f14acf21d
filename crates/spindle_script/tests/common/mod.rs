#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use spindle_core::ecs::{Entity, EntityManager};
use spindle_core::event::EventManager;
use spindle_script::{expose_component, ObjectId, ScriptComponent, ScriptSystem};
use once_cell::sync::Lazy;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc::{self, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

expose_component!(Position, "Position", [x, y]);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Direction {
    pub x: f32,
    pub y: f32,
}

expose_component!(Direction, "Direction", [x, y]);

type Job = Box<dyn FnOnce() + Send>;

/// The interpreter belongs to the first thread that boots it, so every test
/// in a binary runs on this one thread, one at a time.
static SCRIPT_THREAD: Lazy<Mutex<Sender<(Job, Sender<thread::Result<()>>)>>> = Lazy::new(|| {
    let (jobs, queue) = mpsc::channel::<(Job, Sender<thread::Result<()>>)>();
    thread::Builder::new()
        .name("script-tests".to_owned())
        .spawn(move || {
            for (job, done) in queue {
                let _ = done.send(panic::catch_unwind(AssertUnwindSafe(job)));
            }
        })
        .expect("spawn script test thread");
    Mutex::new(jobs)
});

/// Run `test` on the interpreter's thread, re-raising its panic here.
pub fn on_script_thread(test: impl FnOnce() + Send + 'static) {
    let (done, outcome) = mpsc::channel();
    SCRIPT_THREAD
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .send((Box::new(test), done))
        .expect("script test thread is running");
    if let Err(panic) = outcome.recv().expect("script test thread is running") {
        panic::resume_unwind(panic);
    }
}

pub fn scripts_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/scripts")
}

pub type Lines = Rc<RefCell<Vec<String>>>;

/// An entity manager wired to a configured script system, with script output
/// captured.
pub struct Harness {
    pub events: EventManager,
    pub manager: EntityManager,
    pub scripts: ScriptSystem,
    pub stdout: Lines,
    pub stderr: Lines,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_paths([scripts_dir()])
    }

    pub fn with_paths<I: IntoIterator<Item = PathBuf>>(paths: I) -> Self {
        let events = EventManager::new();
        let manager = EntityManager::new(events.clone());
        let mut scripts = ScriptSystem::new(manager.clone()).expect("script system");
        scripts.add_paths(paths);
        scripts.expose::<Position>().expose::<Direction>();

        let stdout = Lines::default();
        let stderr = Lines::default();
        let (out, err) = (stdout.clone(), stderr.clone());
        scripts.log_to(
            move |line| out.borrow_mut().push(line.to_owned()),
            move |line| err.borrow_mut().push(line.to_owned()),
        );
        scripts.configure(&events).expect("configure");

        Self {
            events,
            manager,
            scripts,
            stdout,
            stderr,
        }
    }

    pub fn spawn(&self, component: ScriptComponent) -> Entity {
        let entity = self.manager.create().expect("create");
        entity.assign(component).expect("assign script component");
        entity
    }

    pub fn object_of(&self, entity: &Entity) -> Option<ObjectId> {
        self.manager
            .with_component(entity.id(), ScriptComponent::object_id)
            .flatten()
    }

    pub fn stderr_text(&self) -> String {
        self.stderr.borrow().join("\n")
    }
}
