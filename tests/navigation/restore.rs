use std::rc::Rc;

use stagehand::view::View;
use stagehand::{
    NavigationError, Navigator, SceneLifecycleManager, State, StateBag,
};

use super::{factory_with, new_log, push_labeled, resumed_harness, resumed_harness_with, TestHost};

#[test]
fn test_save_restore_round_trip() {
    let harness = resumed_harness_with(TestHost::with_restore(), |builder| builder).unwrap();
    push_labeled(&harness.navigator, "a", false).unwrap();
    push_labeled(&harness.navigator, "b", false).unwrap();

    let a_scope_key = harness
        .navigator
        .scene_by_tag("a")
        .unwrap()
        .scope()
        .unwrap()
        .key()
        .to_owned();

    let mut saved = StateBag::new();
    harness.lifecycle.on_save_instance_state(&mut saved).unwrap();
    harness.lifecycle.on_pause().unwrap();
    harness.lifecycle.on_stop().unwrap();
    harness.lifecycle.on_destroy_view().unwrap();
    assert!(harness.navigator.is_surface_destroyed());

    // next life: same factory registrations, fresh everything else
    let log = new_log();
    let factory = factory_with(&log);
    let host = TestHost::with_restore();
    let navigator = Rc::new(Navigator::builder("root").build(factory, host).unwrap());
    let lifecycle = SceneLifecycleManager::new(navigator.clone());

    lifecycle
        .on_activity_created(View::new(), Some(&saved))
        .unwrap();

    assert_eq!(navigator.stack_size(), 3);
    let root = navigator.scene_by_tag("root").unwrap();
    let a = navigator.scene_by_tag("a").unwrap();
    let b = navigator.scene_by_tag("b").unwrap();
    assert_eq!(b.state(), State::ActivityCreated);
    assert_eq!(a.state(), State::ActivityCreated);
    assert!(a.view().is_some());

    // creation hooks saw the saved bags, and the scope tree kept its keys
    assert!(log
        .borrow()
        .iter()
        .any(|entry| entry == "a:on_create[restored]"));
    assert_eq!(a.scope().unwrap().key(), a_scope_key);

    lifecycle.on_start().unwrap();
    lifecycle.on_resume().unwrap();
    assert_eq!(b.state(), State::Resumed);
    assert_eq!(a.state(), State::ActivityCreated);
    assert_eq!(root.state(), State::ActivityCreated);
}

#[test]
fn test_restore_keeps_translucency() {
    let harness = resumed_harness_with(TestHost::with_restore(), |builder| builder).unwrap();
    push_labeled(&harness.navigator, "a", false).unwrap();
    push_labeled(&harness.navigator, "sheet", true).unwrap();

    let mut saved = StateBag::new();
    harness.lifecycle.on_save_instance_state(&mut saved).unwrap();

    let log = new_log();
    let factory = factory_with(&log);
    let navigator = Rc::new(
        Navigator::builder("root")
            .build(factory, TestHost::with_restore())
            .unwrap(),
    );
    let lifecycle = SceneLifecycleManager::new(navigator.clone());
    lifecycle
        .on_activity_created(View::new(), Some(&saved))
        .unwrap();
    lifecycle.on_start().unwrap();
    lifecycle.on_resume().unwrap();

    // a translucent top keeps the record beneath it resumed, restore included
    assert_eq!(
        navigator.scene_by_tag("sheet").unwrap().state(),
        State::Resumed
    );
    assert_eq!(navigator.scene_by_tag("a").unwrap().state(), State::Resumed);
}

#[test]
fn test_only_restore_visible_scene_defers_covered_views() {
    let harness = resumed_harness_with(TestHost::with_restore(), |builder| builder).unwrap();
    push_labeled(&harness.navigator, "a", false).unwrap();
    push_labeled(&harness.navigator, "b", false).unwrap();

    let mut saved = StateBag::new();
    harness.lifecycle.on_save_instance_state(&mut saved).unwrap();

    let log = new_log();
    let factory = factory_with(&log);
    let navigator = Rc::new(
        Navigator::builder("root")
            .only_restore_visible_scene(true)
            .build(factory, TestHost::with_restore())
            .unwrap(),
    );
    let lifecycle = SceneLifecycleManager::new(navigator.clone());
    lifecycle
        .on_activity_created(View::new(), Some(&saved))
        .unwrap();
    lifecycle.on_start().unwrap();
    lifecycle.on_resume().unwrap();

    let a = navigator.scene_by_tag("a").unwrap();
    let b = navigator.scene_by_tag("b").unwrap();
    assert_eq!(b.state(), State::Resumed);
    assert!(b.view().is_some());
    // covered records stay logical-only until navigation returns to them
    assert!(a.view().is_none());
    assert!(!a.is_destroyed());

    navigator.pop().unwrap();
    assert_eq!(a.state(), State::Resumed);
    assert!(a.view().is_some());
}

#[test]
fn test_restore_rejected_when_unsupported() {
    let log = new_log();
    let factory = factory_with(&log);
    let navigator = Rc::new(
        Navigator::builder("root")
            .build(factory, TestHost::new())
            .unwrap(),
    );
    let lifecycle = SceneLifecycleManager::new(navigator.clone());

    let saved = StateBag::new();
    let err = lifecycle
        .on_activity_created(View::new(), Some(&saved))
        .unwrap_err();
    assert!(matches!(err, NavigationError::RestoreUnsupported));
}

#[test]
fn test_save_rejected_when_unsupported() {
    let harness = resumed_harness().unwrap();
    let mut out = StateBag::new();
    let err = harness
        .lifecycle
        .on_save_instance_state(&mut out)
        .unwrap_err();
    assert!(matches!(err, NavigationError::RestoreUnsupported));
    assert!(out.is_empty());
}

#[test]
fn test_configuration_change_reaches_every_scene() {
    let harness = resumed_harness().unwrap();
    push_labeled(&harness.navigator, "x", false).unwrap();
    super::clear_log(&harness.log);

    let mut config = StateBag::new();
    config.put_string("orientation", "landscape");
    harness.lifecycle.on_configuration_changed(&config).unwrap();

    // every scene is notified, in stack order, with no lifecycle churn
    assert_eq!(
        super::log_entries(&harness.log),
        vec!["root:on_configuration_changed", "x:on_configuration_changed"]
    );
    assert_eq!(
        harness.navigator.scene_by_tag("x").unwrap().state(),
        State::Resumed
    );
}
