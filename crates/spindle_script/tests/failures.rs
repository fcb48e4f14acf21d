//! How the bridge fails: resolution errors, script exceptions, misuse.

mod common;

use common::{on_script_thread, scripts_dir, Harness};
use spindle_core::ecs::{EcsError, EntityCreatedEvent, EntityManager};
use spindle_core::event::EventManager;
use spindle_script::{script_component, ErrorKind, Interpreter, ScriptComponent, ScriptError, ScriptSystem};

/// Attach `component` to a fresh entity and return the failure it caused.
fn attach_error(h: &Harness, component: ScriptComponent) -> EcsError {
    let entity = h.manager.create().unwrap();
    entity.assign(component).unwrap_err()
}

fn script_error(err: &EcsError) -> &ScriptError {
    ScriptError::from_storage(err).expect("script failure behind the storage error")
}

#[test]
fn missing_module_is_a_resolution_failure() {
    on_script_thread(|| {
        let h = Harness::new();
        let err = attach_error(&h, script_component!("fixtures.no_such_module", "Anything"));
        let err = script_error(&err);
        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert!(matches!(err, ScriptError::UnresolvedModule { module, .. } if module == "fixtures.no_such_module"));
    });
}

#[test]
fn missing_class_is_a_resolution_failure() {
    on_script_thread(|| {
        let h = Harness::new();
        let err = attach_error(&h, script_component!("fixtures.broken", "NotThere"));
        let err = script_error(&err);
        assert!(matches!(err, ScriptError::UnresolvedClass { class, .. } if class == "NotThere"));

        let err = attach_error(&h, script_component!("fixtures.broken", "notAClass"));
        assert!(matches!(script_error(&err), ScriptError::UnresolvedClass { .. }));
    });
}

#[test]
fn class_without_factory_is_a_resolution_failure() {
    on_script_thread(|| {
        let h = Harness::new();
        let err = attach_error(&h, script_component!("fixtures.broken", "NoFactory"));
        let err = script_error(&err);
        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert!(matches!(err, ScriptError::MissingFactory { factory: "fromNativeEntity", .. }));
    });
}

#[test]
fn throwing_constructor_is_reported_and_returned() {
    on_script_thread(|| {
        let h = Harness::new();
        let err = attach_error(&h, script_component!("fixtures.broken", "ThrowsInConstructor"));
        let err = script_error(&err);
        assert_eq!(err.kind(), ErrorKind::ForeignInvocation);
        assert!(err.to_string().contains("refusing to construct"));
        assert!(h.stderr_text().contains("refusing to construct"));

        // The pending exception was consumed; the interpreter keeps working.
        assert_eq!(h.scripts.eval::<i32>("1 + 1").unwrap(), 2);
    });
}

#[test]
fn failing_update_aborts_the_pass() {
    on_script_thread(|| {
        let h = Harness::new();
        h.spawn(script_component!("fixtures.broken", "Exploding"));

        let err = h.scripts.update(0.1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ForeignInvocation);
        assert!(matches!(err, ScriptError::Invocation { ref during, .. } if during == "updating <Entity::Id 0.1>"));
        assert!(h.stderr_text().contains("kaboom"));
    });
}

#[test]
fn time_delta_must_be_finite_and_non_negative() {
    on_script_thread(|| {
        let h = Harness::new();
        for dt in [-0.5, f64::NAN, f64::INFINITY] {
            let err = h.scripts.update(dt).unwrap_err();
            assert!(matches!(err, ScriptError::InvalidTimeDelta(_)));
            assert_eq!(err.kind(), ErrorKind::Usage);
        }
        assert_eq!(h.scripts.update(0.0).unwrap(), 0);
    });
}

#[test]
fn update_from_inside_a_script_call_is_refused() {
    on_script_thread(|| {
        let h = Harness::new();
        let nested = h.scripts.interpreter().with(|_ctx| h.scripts.update(0.1)).unwrap();
        assert!(matches!(nested, Err(ScriptError::InterpreterBusy)));
    });
}

#[test]
fn scripts_need_a_configured_system() {
    on_script_thread(|| {
        // A system that configured and went away leaves nothing published.
        drop(Harness::new());

        let events = EventManager::new();
        let scripts = ScriptSystem::new(EntityManager::new(events)).unwrap();
        scripts
            .interpreter()
            .prepend_search_path(&scripts_dir());

        let err = scripts
            .run_module_function::<i32>("fixtures.create_entities_test", "createEntitiesTest")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert!(err.to_string().contains("configure the script system first"));
    });
}

#[test]
fn unknown_component_types_raise_in_scripts() {
    on_script_thread(|| {
        let h = Harness::new();
        let err = h
            .scripts
            .eval::<()>("entityManager.componentFields('Velocity')")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ForeignInvocation);
        assert!(err.to_string().contains("unknown component type 'Velocity'"));
    });
}

#[test]
fn other_threads_are_refused() {
    on_script_thread(|| {
        let h = Harness::new();
        let refused = std::thread::spawn(|| {
            let events = EventManager::new();
            let system = ScriptSystem::new(EntityManager::new(events)).err();
            (system, Interpreter::get().err(), Interpreter::current().is_none())
        })
        .join()
        .unwrap();

        assert!(matches!(refused.0, Some(ScriptError::ForeignThread)));
        assert!(matches!(refused.1, Some(ScriptError::ForeignThread)));
        assert!(refused.2);
        assert_eq!(ScriptError::ForeignThread.kind(), ErrorKind::Usage);
        assert_eq!(h.scripts.eval::<i32>("6 * 7").unwrap(), 42);
    });
}

#[test]
fn deferred_failures_do_not_replace_the_call_result() {
    on_script_thread(|| {
        let h = Harness::new();
        // Entities created by scripts get a script that cannot be resolved.
        // The request is queued during the call and fails when drained.
        h.events.subscribe_fn(|event: &EntityCreatedEvent| {
            event
                .entity
                .assign(script_component!("fixtures.no_such_module", "Anything"))
                .map(drop)
                .map_err(Into::into)
        });

        let made = h
            .scripts
            .create_object("(() => { entityManager.create(); return { made: true }; })()")
            .unwrap();
        assert!(h.scripts.attribute::<bool>(made.id(), "made").unwrap());
        assert_eq!(h.scripts.materializer().pending(), 0);
        assert!(h.stderr_text().contains("fixtures.no_such_module"));
    });
}
