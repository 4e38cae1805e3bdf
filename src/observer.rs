//! Lifecycle observation
//!
//! Observers see every lifecycle transition of every scene in the stack, in a
//! fixed three-stage sequence per transition: `on_pre_event` before anything
//! changes, `on_super_event` once the framework's own base work for the
//! transition ran, and `on_event` after the scene's controller hook returned.
//! Order-sensitive observers may rely on exactly that sequence.

use std::cell::RefCell;
use std::rc::Rc;

use crate::scene::SceneHandle;

/// Which lifecycle transition an observer callback refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Created,
    ViewCreated,
    ActivityCreated,
    Started,
    Resumed,
    Paused,
    Stopped,
    ViewDestroyed,
    Destroyed,
    SaveInstanceState,
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::Created => "created",
            LifecycleEvent::ViewCreated => "view_created",
            LifecycleEvent::ActivityCreated => "activity_created",
            LifecycleEvent::Started => "started",
            LifecycleEvent::Resumed => "resumed",
            LifecycleEvent::Paused => "paused",
            LifecycleEvent::Stopped => "stopped",
            LifecycleEvent::ViewDestroyed => "view_destroyed",
            LifecycleEvent::Destroyed => "destroyed",
            LifecycleEvent::SaveInstanceState => "save_instance_state",
        }
    }
}

/// Observer of scene lifecycle transitions. All hooks default to no-ops.
pub trait LifecycleObserver {
    /// Fires before the transition touches the scene.
    fn on_pre_event(&self, event: LifecycleEvent, scene: &SceneHandle) {
        let _ = (event, scene);
    }

    /// Fires after the framework's base work for the transition, before the
    /// controller hook body runs.
    fn on_super_event(&self, event: LifecycleEvent, scene: &SceneHandle) {
        let _ = (event, scene);
    }

    /// Fires after the controller hook body returned.
    fn on_event(&self, event: LifecycleEvent, scene: &SceneHandle) {
        let _ = (event, scene);
    }
}

struct ObserverEntry {
    observer: Rc<dyn LifecycleObserver>,
    recursive: bool,
}

/// Ordered observer list shared by the surface and its scenes.
///
/// Non-recursive observers only see direct children of the surface; the
/// recursive flag opts into descendants at any depth.
#[derive(Default)]
pub struct ObserverRegistry {
    entries: RefCell<Vec<ObserverEntry>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, observer: Rc<dyn LifecycleObserver>, recursive: bool) {
        self.entries.borrow_mut().push(ObserverEntry {
            observer,
            recursive,
        });
    }

    pub fn unregister(&self, observer: &Rc<dyn LifecycleObserver>) {
        self.entries
            .borrow_mut()
            .retain(|entry| !Rc::ptr_eq(&entry.observer, observer));
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn snapshot(&self, depth: usize) -> Vec<Rc<dyn LifecycleObserver>> {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.recursive || depth <= 1)
            .map(|entry| entry.observer.clone())
            .collect()
    }

    pub(crate) fn notify_pre(&self, event: LifecycleEvent, scene: &SceneHandle) {
        for observer in self.snapshot(scene.depth()) {
            observer.on_pre_event(event, scene);
        }
    }

    pub(crate) fn notify_super(&self, event: LifecycleEvent, scene: &SceneHandle) {
        for observer in self.snapshot(scene.depth()) {
            observer.on_super_event(event, scene);
        }
    }

    pub(crate) fn notify_post(&self, event: LifecycleEvent, scene: &SceneHandle) {
        for observer in self.snapshot(scene.depth()) {
            observer.on_event(event, scene);
        }
    }
}
