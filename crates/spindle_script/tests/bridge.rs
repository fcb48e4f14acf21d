//! Materialization, identity and per-tick dispatch against real scripts.

mod common;

use common::{on_script_thread, scripts_dir, Harness, Position};
use spindle_core::ecs::{ComponentAddedEvent, EntityId};
use spindle_script::{get_component, script_component, ScriptComponent};

#[test]
fn update_reaches_materialized_objects() {
    on_script_thread(|| {
        let h = Harness::new();
        let entity = h.spawn(script_component!("fixtures.update_test", "UpdateTest"));
        let object = h.object_of(&entity).expect("materialized on attach");

        let counts = |h: &Harness| (h.manager.size(), h.manager.entities_with::<ScriptComponent>().len());
        let before = counts(&h);

        assert!(!h.scripts.attribute::<bool>(object, "updated").unwrap());
        assert_eq!(h.scripts.update(0.25).unwrap(), 1);
        assert!(h.scripts.attribute::<bool>(object, "updated").unwrap());
        assert_eq!(h.scripts.attribute::<f64>(object, "lastDt").unwrap(), 0.25);

        // Updating never adds or removes entities or script components.
        assert_eq!(counts(&h), before);
        assert_eq!(h.scripts.update(0.25).unwrap(), 1);
        assert_eq!(counts(&h), (1, 1));
    });
}

#[test]
fn factory_binds_the_owning_entity() {
    on_script_thread(|| {
        let h = Harness::new();
        let entity = h.spawn(script_component!("fixtures.update_test", "UpdateTest"));
        assert_eq!(entity.id(), EntityId::new(0, 1));

        let object = h.object_of(&entity).unwrap();
        let repr: String = h.scripts.attribute(object, "entityRepr").unwrap();
        assert_eq!(repr, "<Entity::Id 0.1>");
        assert_eq!(repr, entity.id().to_string());
    });
}

#[test]
fn constructor_arguments_are_positional() {
    on_script_thread(|| {
        let h = Harness::new();
        let entity = h.spawn(script_component!("fixtures.constructor_test", "ConstructorTest", 4.0, 5.0));
        let object = h.object_of(&entity).unwrap();

        assert_eq!(h.scripts.attribute::<f64>(object, "x").unwrap(), 4.0);
        assert_eq!(h.scripts.attribute::<f64>(object, "y").unwrap(), 5.0);
        assert_eq!(
            get_component::<Position>(&h.manager, entity.id()),
            Some(Position { x: 4.0, y: 5.0 })
        );
    });
}

#[test]
fn republishing_the_attach_event_does_not_rebuild_the_object() {
    on_script_thread(|| {
        let h = Harness::new();
        let entity = h.spawn(script_component!("fixtures.constructor_test", "ConstructorTest", 1.0, 1.0));
        let object = h.object_of(&entity).unwrap();
        let calls = h.scripts.eval::<i32>("globalThis.constructorCalls").unwrap();
        let handle = entity.component::<ScriptComponent>().unwrap();

        h.events
            .emit(&ComponentAddedEvent {
                entity: entity.clone(),
                component: handle,
            })
            .unwrap();

        assert_eq!(h.object_of(&entity), Some(object));
        assert_eq!(h.scripts.eval::<i32>("globalThis.constructorCalls").unwrap(), calls);
    });
}

#[test]
fn prebuilt_objects_are_never_replaced() {
    on_script_thread(|| {
        let h = Harness::new();
        let prebuilt = h
            .scripts
            .create_object("({ ticks: 0, update(dt) { this.ticks += 1; } })")
            .unwrap();
        let id = prebuilt.id();

        let entity = h.manager.create().unwrap();
        entity.assign(ScriptComponent::from_object(prebuilt)).unwrap();

        assert_eq!(h.object_of(&entity), Some(id));
        assert_eq!(h.scripts.update(0.1).unwrap(), 1);
        assert_eq!(h.scripts.attribute::<i32>(id, "ticks").unwrap(), 1);
    });
}

#[test]
fn later_search_paths_take_priority() {
    on_script_thread(|| {
        let low = scripts_dir().join("priority_low");
        let high = scripts_dir().join("priority_high");
        let h = Harness::with_paths([scripts_dir(), low.clone(), high.clone()]);

        assert_eq!(h.scripts.search_paths(), &[scripts_dir(), low, high.clone()]);
        assert_eq!(h.scripts.interpreter().search_paths()[0], high);

        let entity = h.spawn(script_component!("shadowed", "Shadowed"));
        let object = h.object_of(&entity).unwrap();
        assert_eq!(h.scripts.attribute::<String>(object, "origin").unwrap(), "high");
    });
}

#[test]
fn scripts_create_entities_with_native_identity() {
    on_script_thread(|| {
        let h = Harness::new();
        let size: i32 = h
            .scripts
            .run_module_function("fixtures.create_entities_test", "createEntitiesTest")
            .unwrap();

        assert_eq!(size, 4);
        assert_eq!(h.manager.size(), 4);
        let scripted = h.manager.entities_with::<ScriptComponent>();
        assert_eq!(scripted.len(), 4);
        for id in &scripted {
            assert!(h.manager.with_component(*id, ScriptComponent::is_materialized).unwrap());
        }
        assert_eq!(h.manager.entities_with::<Position>().len(), 4);
        assert!(h.manager.valid(EntityId::new(0, 2)));
        assert!(!h.manager.valid(EntityId::new(0, 1)));

        assert_eq!(h.scripts.update(0.1).unwrap(), 4);
    });
}

#[test]
fn script_assigns_a_new_component() {
    on_script_thread(|| {
        let h = Harness::new();
        let entity = h.spawn(script_component!("fixtures.assign_test", "AssignTest"));
        let object = h.object_of(&entity).unwrap();

        assert_eq!(
            get_component::<Position>(&h.manager, entity.id()),
            Some(Position::default())
        );
        h.scripts.invoke(object, "testAssignCreate").unwrap();
        assert_eq!(
            get_component::<Position>(&h.manager, entity.id()),
            Some(Position { x: 1.0, y: 2.0 })
        );
    });
}

#[test]
fn script_keeps_an_existing_component() {
    on_script_thread(|| {
        let h = Harness::new();
        let entity = h.manager.create().unwrap();
        entity.assign(Position { x: 2.0, y: 3.0 }).unwrap();
        entity
            .assign(script_component!("fixtures.assign_test", "AssignTest"))
            .unwrap();
        let object = h.object_of(&entity).unwrap();

        h.scripts.invoke(object, "testAssignExisting").unwrap();
        assert_eq!(
            get_component::<Position>(&h.manager, entity.id()),
            Some(Position { x: 3.0, y: 4.0 })
        );
    });
}

#[test]
fn components_declared_across_a_class_hierarchy() {
    on_script_thread(|| {
        let h = Harness::new();
        let entity = h.spawn(script_component!("fixtures.deep_subclass_test", "DeepSubclassTest"));
        let object = h.object_of(&entity).unwrap();

        h.scripts.invoke(object, "testDeepSubclass").unwrap();
        assert_eq!(
            get_component::<Position>(&h.manager, entity.id()),
            Some(Position { x: 5.0, y: 6.0 })
        );
    });
}

#[test]
fn attaching_from_inside_a_script_materializes_immediately() {
    on_script_thread(|| {
        let h = Harness::new();
        let spawner = h.spawn(script_component!("fixtures.spawn_test", "Spawner"));
        let object = h.object_of(&spawner).unwrap();

        // The child is created mid-pass and only joins the next one.
        assert_eq!(h.scripts.update(0.1).unwrap(), 1);
        assert_eq!(h.scripts.attribute::<String>(object, "childLabel").unwrap(), "spawned");
        assert_eq!(h.scripts.materializer().pending(), 0);
        assert_eq!(h.scripts.update(0.1).unwrap(), 2);
    });
}

#[test]
fn unmaterialized_and_destroyed_entities_are_skipped() {
    on_script_thread(|| {
        let h = Harness::new();
        let kept = h.spawn(script_component!("fixtures.update_test", "UpdateTest"));
        let doomed = h.spawn(script_component!("fixtures.spawn_test", "Child", "doomed"));
        doomed.destroy().unwrap();

        let unresolved = h.manager.create().unwrap();
        unresolved
            .assign(script_component!("fixtures.missing", "Nothing"))
            .unwrap_err();
        assert!(h.object_of(&unresolved).is_none());

        assert_eq!(h.scripts.update(0.1).unwrap(), 1);
        assert!(h.scripts.attribute::<bool>(h.object_of(&kept).unwrap(), "updated").unwrap());
    });
}

#[test]
fn destroying_an_entity_releases_its_object() {
    on_script_thread(|| {
        let h = Harness::new();
        let before = h.scripts.interpreter().live_objects();
        let entity = h.spawn(script_component!("fixtures.update_test", "UpdateTest"));
        assert_eq!(h.scripts.interpreter().live_objects(), before + 1);

        entity.destroy().unwrap();
        assert_eq!(h.scripts.interpreter().live_objects(), before);
    });
}

#[test]
fn entity_ids_are_visible_to_scripts() {
    on_script_thread(|| {
        let h = Harness::new();
        let repr: String = h
            .scripts
            .eval("new _spindle.EntityId(3, 2).toString()")
            .unwrap();
        assert_eq!(repr, "<Entity::Id 3.2>");

        let packed: f64 = h.scripts.eval("new _spindle.EntityId(3, 2).id").unwrap();
        assert_eq!(packed, ((2u64 << 32) | 3) as f64);

        assert!(h
            .scripts
            .eval::<bool>("new _spindle.EntityId(1, 1).equals(new _spindle.EntityId(1, 1))")
            .unwrap());
    });
}

#[test]
fn every_system_shares_the_one_interpreter() {
    on_script_thread(|| {
        let first = Harness::new();
        first.scripts.eval::<()>("globalThis.marker = 42").unwrap();

        let second = Harness::new();
        assert!(std::ptr::eq(first.scripts.interpreter(), second.scripts.interpreter()));
        assert_eq!(second.scripts.eval::<i32>("globalThis.marker").unwrap(), 42);

        // The most recently configured manager is the one scripts see.
        second
            .scripts
            .run_module_function::<i32>("fixtures.create_entities_test", "createEntitiesTest")
            .unwrap();
        assert_eq!(second.manager.size(), 4);
        assert_eq!(first.manager.size(), 0);
    });
}

#[test]
fn dropping_a_system_withdraws_its_manager() {
    on_script_thread(|| {
        let h = Harness::new();
        let probe = "typeof globalThis.entityManager";
        assert_eq!(h.scripts.eval::<String>(probe).unwrap(), "object");

        let interpreter = h.scripts.interpreter();
        drop(h);
        let left: String = interpreter.with(|ctx| ctx.eval::<String, _>(probe).unwrap()).unwrap();
        assert_eq!(left, "undefined");
    });
}
