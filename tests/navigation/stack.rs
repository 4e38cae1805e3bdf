use std::rc::Rc;

use stagehand::host::WindowFlags;
use stagehand::view::{View, Visibility};
use stagehand::{NavigationError, Navigator, PopOptions, SceneLifecycleManager, State};

use super::{factory_with, new_log, push_labeled, resumed_harness, resumed_harness_with, TestHost};

#[test]
fn test_push_resumes_new_top_and_caps_previous() {
    let harness = resumed_harness().unwrap();
    let root = harness.navigator.current_scene().unwrap();
    assert_eq!(harness.navigator.stack_size(), 1);
    assert_eq!(root.state(), State::Resumed);

    push_labeled(&harness.navigator, "x", false).unwrap();
    let x = harness.navigator.scene_by_tag("x").unwrap();

    assert_eq!(harness.navigator.stack_size(), 2);
    assert_eq!(x.state(), State::Resumed);
    assert_eq!(root.state(), State::ActivityCreated);
    assert_eq!(root.view().unwrap().visibility(), Visibility::Gone);

    harness.navigator.pop().unwrap();

    assert_eq!(harness.navigator.stack_size(), 1);
    assert_eq!(root.state(), State::Resumed);
    assert_eq!(root.view().unwrap().visibility(), Visibility::Visible);
    assert_eq!(x.state(), State::None);
    assert!(x.view().is_none());
    assert!(x.scope().is_none());
    assert!(!x.is_attached());
    assert!(x.is_destroyed());
}

#[test]
fn test_translucent_push_keeps_previous_resumed() {
    let harness = resumed_harness().unwrap();
    let root = harness.navigator.current_scene().unwrap();

    push_labeled(&harness.navigator, "sheet", true).unwrap();
    let sheet = harness.navigator.scene_by_tag("sheet").unwrap();

    assert_eq!(sheet.state(), State::Resumed);
    assert_eq!(root.state(), State::Resumed);
    assert_eq!(root.view().unwrap().visibility(), Visibility::Visible);

    harness.navigator.pop().unwrap();
    assert_eq!(root.state(), State::Resumed);
    assert_eq!(sheet.state(), State::None);
}

#[test]
fn test_pop_count_returns_to_exactly_the_root() {
    let harness = resumed_harness().unwrap();
    let root = harness.navigator.current_scene().unwrap();

    push_labeled(&harness.navigator, "a", false).unwrap();
    push_labeled(&harness.navigator, "b", false).unwrap();
    push_labeled(&harness.navigator, "c", false).unwrap();
    assert_eq!(harness.navigator.stack_size(), 4);

    let popped: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|tag| harness.navigator.scene_by_tag(tag).unwrap())
        .collect();

    harness.navigator.pop_count(3, PopOptions::default()).unwrap();

    assert_eq!(harness.navigator.stack_size(), 1);
    assert!(harness.navigator.is_at_root());
    assert_eq!(root.state(), State::Resumed);
    for scene in popped {
        assert_eq!(scene.state(), State::None);
        assert!(scene.view().is_none());
        assert!(scene.scope().is_none());
        assert!(!scene.is_attached());
    }
    assert!(!harness.host.finished.get());
}

#[test]
fn test_pop_past_root_pops_all_then_finishes_host() {
    let harness = resumed_harness().unwrap();
    push_labeled(&harness.navigator, "a", false).unwrap();
    push_labeled(&harness.navigator, "b", false).unwrap();

    harness.navigator.pop_count(10, PopOptions::default()).unwrap();

    assert_eq!(harness.navigator.stack_size(), 1);
    assert!(harness.host.finished.get());
    let root = harness.navigator.current_scene().unwrap();
    assert_eq!(root.state(), State::Resumed);
}

#[test]
fn test_pop_to_tag_and_to_root() {
    let harness = resumed_harness().unwrap();
    push_labeled(&harness.navigator, "a", false).unwrap();
    push_labeled(&harness.navigator, "b", false).unwrap();
    push_labeled(&harness.navigator, "c", false).unwrap();
    let a = harness.navigator.scene_by_tag("a").unwrap();

    harness.navigator.pop_to("a", PopOptions::default()).unwrap();
    assert_eq!(harness.navigator.stack_size(), 2);
    assert_eq!(a.state(), State::Resumed);
    assert!(harness.navigator.scene_by_tag("c").is_none());

    // popping to the current top is a no-op
    harness.navigator.pop_to("a", PopOptions::default()).unwrap();
    assert_eq!(harness.navigator.stack_size(), 2);

    let err = harness
        .navigator
        .pop_to("missing", PopOptions::default())
        .unwrap_err();
    assert!(matches!(err, NavigationError::UnknownTag(_)));

    harness.navigator.pop_to_root(PopOptions::default()).unwrap();
    assert_eq!(harness.navigator.stack_size(), 1);
    assert!(harness.navigator.is_at_root());
    assert!(!harness.host.finished.get());
}

#[test]
fn test_pop_on_lone_root_signals_finish_without_popping() {
    let harness = resumed_harness().unwrap();
    let root = harness.navigator.current_scene().unwrap();

    harness.navigator.pop().unwrap();

    assert_eq!(harness.navigator.stack_size(), 1);
    assert!(harness.host.finished.get());
    assert_eq!(root.state(), State::Resumed);
}

#[test]
fn test_pop_count_zero_is_rejected() {
    let harness = resumed_harness().unwrap();
    let err = harness
        .navigator
        .pop_count(0, PopOptions::default())
        .unwrap_err();
    assert!(matches!(err, NavigationError::IllegalPopCount { .. }));
    assert_eq!(harness.navigator.stack_size(), 1);
}

#[test]
fn test_duplicate_tag_is_rejected_without_partial_application() {
    let harness = resumed_harness().unwrap();
    push_labeled(&harness.navigator, "x", false).unwrap();
    let x = harness.navigator.scene_by_tag("x").unwrap();

    let err = push_labeled(&harness.navigator, "x", false).unwrap_err();
    let err = err.downcast::<NavigationError>().unwrap();
    assert!(matches!(err, NavigationError::DuplicateTag(tag) if tag == "x"));

    assert_eq!(harness.navigator.stack_size(), 2);
    assert_eq!(x.state(), State::Resumed);
}

#[test]
fn test_remove_middle_scene_keeps_top_running() {
    let harness = resumed_harness().unwrap();
    let root = harness.navigator.current_scene().unwrap();
    push_labeled(&harness.navigator, "a", false).unwrap();
    push_labeled(&harness.navigator, "b", false).unwrap();
    let a = harness.navigator.scene_by_tag("a").unwrap();
    let b = harness.navigator.scene_by_tag("b").unwrap();

    harness.navigator.remove(&a).unwrap();

    assert_eq!(harness.navigator.stack_size(), 2);
    assert_eq!(b.state(), State::Resumed);
    assert_eq!(root.state(), State::ActivityCreated);
    assert_eq!(a.state(), State::None);
    assert!(a.view().is_none());
}

#[test]
fn test_remove_top_scene_resumes_the_one_beneath() {
    let harness = resumed_harness().unwrap();
    push_labeled(&harness.navigator, "a", false).unwrap();
    push_labeled(&harness.navigator, "b", false).unwrap();
    let a = harness.navigator.scene_by_tag("a").unwrap();
    let b = harness.navigator.scene_by_tag("b").unwrap();

    harness.navigator.remove(&b).unwrap();

    assert_eq!(harness.navigator.stack_size(), 2);
    assert_eq!(a.state(), State::Resumed);
    assert_eq!(b.state(), State::None);
}

#[test]
fn test_remove_last_record_finishes_host() {
    let harness = resumed_harness().unwrap();
    let root = harness.navigator.current_scene().unwrap();

    harness.navigator.remove(&root).unwrap();

    assert_eq!(harness.navigator.stack_size(), 1);
    assert!(harness.host.finished.get());
    assert_eq!(root.state(), State::Resumed);
}

/// A posted pop runs its pause phase inline and leaves the resume and destroy
/// phases on the queue; an immediate remove drains them before it runs.
#[test]
fn test_posted_pop_then_immediate_remove() {
    let harness = resumed_harness().unwrap();
    let root = harness.navigator.current_scene().unwrap();
    push_labeled(&harness.navigator, "one", false).unwrap();
    push_labeled(&harness.navigator, "two", false).unwrap();
    let one = harness.navigator.scene_by_tag("one").unwrap();
    let two = harness.navigator.scene_by_tag("two").unwrap();

    harness
        .navigator
        .pop_with_options(PopOptions::builder().use_post(true).build())
        .unwrap();

    assert_eq!(harness.navigator.stack_size(), 3);
    assert_eq!(two.state(), State::Started);
    assert_eq!(one.state(), State::ActivityCreated);

    harness.navigator.remove(&one).unwrap();

    assert_eq!(harness.navigator.stack_size(), 1);
    assert_eq!(root.state(), State::Resumed);
    assert_eq!(two.state(), State::None);
    assert_eq!(one.state(), State::None);

    harness.navigator.run_until_idle().unwrap();
    assert_eq!(harness.navigator.stack_size(), 1);
}

#[test]
fn test_hide_show_updates_visibility_but_caps_lifecycle() {
    let harness = resumed_harness().unwrap();
    let root = harness.navigator.current_scene().unwrap();
    push_labeled(&harness.navigator, "x", false).unwrap();
    let x = harness.navigator.scene_by_tag("x").unwrap();

    harness.lifecycle.on_pause().unwrap();
    harness.lifecycle.on_stop().unwrap();
    assert_eq!(x.state(), State::ActivityCreated);

    harness.navigator.hide(&x).unwrap();
    assert_eq!(x.view().unwrap().visibility(), Visibility::Gone);
    assert_eq!(x.state(), State::ActivityCreated);
    assert_eq!(root.view().unwrap().visibility(), Visibility::Visible);

    harness.navigator.show(&x).unwrap();
    assert_eq!(x.view().unwrap().visibility(), Visibility::Visible);
    assert_eq!(x.state(), State::ActivityCreated);
    assert_eq!(root.view().unwrap().visibility(), Visibility::Gone);

    // hiding while resumed drops the scene out of the foreground, but never
    // below activity-created
    harness.lifecycle.on_start().unwrap();
    harness.lifecycle.on_resume().unwrap();
    assert_eq!(x.state(), State::Resumed);

    harness.navigator.hide(&x).unwrap();
    assert_eq!(x.view().unwrap().visibility(), Visibility::Gone);
    assert_eq!(x.state(), State::ActivityCreated);
    assert_eq!(root.state(), State::Resumed);
}

#[test]
fn test_push_before_surface_created_is_deferred_not_rejected() {
    let log = new_log();
    let factory = factory_with(&log);
    let host = TestHost::new();
    let navigator = Rc::new(Navigator::builder("root").build(factory, host).unwrap());
    let lifecycle = SceneLifecycleManager::new(navigator.clone());

    assert!(!navigator.can_execute_stack_operation());
    push_labeled(&navigator, "early", false).unwrap();
    assert_eq!(navigator.stack_size(), 0);

    lifecycle.on_activity_created(View::new(), None).unwrap();
    assert!(navigator.can_execute_stack_operation());
    assert_eq!(navigator.stack_size(), 2);
    let early = navigator.scene_by_tag("early").unwrap();
    assert_eq!(early.state(), State::ActivityCreated);

    lifecycle.on_start().unwrap();
    lifecycle.on_resume().unwrap();
    assert_eq!(early.state(), State::Resumed);
}

#[test]
fn test_scene_state_never_exceeds_surface_state() {
    let log = new_log();
    let factory = factory_with(&log);
    let host = TestHost::new();
    let navigator = Rc::new(Navigator::builder("root").build(factory, host).unwrap());
    let lifecycle = SceneLifecycleManager::new(navigator.clone());
    lifecycle.on_activity_created(View::new(), None).unwrap();

    push_labeled(&navigator, "x", false).unwrap();
    let x = navigator.scene_by_tag("x").unwrap();
    assert_eq!(x.state(), State::ActivityCreated);

    lifecycle.on_start().unwrap();
    assert_eq!(x.state(), State::Started);
    lifecycle.on_resume().unwrap();
    assert_eq!(x.state(), State::Resumed);
    lifecycle.on_pause().unwrap();
    assert_eq!(x.state(), State::Started);
    lifecycle.on_stop().unwrap();
    assert_eq!(x.state(), State::ActivityCreated);

    assert!(x.state() <= navigator.state());
}

#[test]
fn test_host_callbacks_from_wrong_state_are_rejected() {
    let log = new_log();
    let factory = factory_with(&log);
    let host = TestHost::new();
    let navigator = Rc::new(Navigator::builder("root").build(factory, host).unwrap());
    let lifecycle = SceneLifecycleManager::new(navigator.clone());
    lifecycle.on_activity_created(View::new(), None).unwrap();

    // resume straight from activity-created skips a state
    let err = lifecycle.on_resume().unwrap_err();
    assert!(matches!(err, NavigationError::IllegalState { .. }));
    assert_eq!(navigator.state(), State::ActivityCreated);

    lifecycle.on_start().unwrap();
    let err = lifecycle.on_start().unwrap_err();
    assert!(matches!(err, NavigationError::IllegalState { .. }));
    assert_eq!(navigator.state(), State::Started);
}

#[test]
fn test_window_status_restored_when_its_scene_pops() {
    let harness = resumed_harness().unwrap();
    let window = harness.host.window.clone();
    window.add_flags(WindowFlags::KEEP_SCREEN_ON);

    push_labeled(&harness.navigator, "fullscreen", false).unwrap();
    // the scene on top rearranges the window
    window.clear_flags(WindowFlags::KEEP_SCREEN_ON);
    window.add_flags(WindowFlags::FULLSCREEN);

    harness.navigator.pop().unwrap();

    assert_eq!(window.flags(), WindowFlags::KEEP_SCREEN_ON);
}

#[test]
fn test_memory_pressure_recycles_oldest_invisible_views() {
    let harness = resumed_harness_with(TestHost::new(), |builder| {
        builder.auto_recycle_invisible_scenes_threshold(0.5)
    })
    .unwrap();
    let root = harness.navigator.current_scene().unwrap();
    push_labeled(&harness.navigator, "a", false).unwrap();
    push_labeled(&harness.navigator, "b", false).unwrap();
    push_labeled(&harness.navigator, "c", false).unwrap();

    let a = harness.navigator.scene_by_tag("a").unwrap();
    let b = harness.navigator.scene_by_tag("b").unwrap();
    let c = harness.navigator.scene_by_tag("c").unwrap();

    // three invisible records; a 0.5 threshold recycles the oldest two
    harness.navigator.on_memory_pressure().unwrap();

    assert!(root.view().is_none());
    assert!(a.view().is_none());
    assert!(b.view().is_some());
    assert_eq!(c.state(), State::Resumed);

    // navigating back re-inflates through the normal state walk
    harness.navigator.pop_count(3, PopOptions::default()).unwrap();
    assert_eq!(harness.navigator.stack_size(), 1);
    assert_eq!(root.state(), State::Resumed);
    assert!(root.view().is_some());
    assert_eq!(root.view().unwrap().visibility(), Visibility::Visible);
}
