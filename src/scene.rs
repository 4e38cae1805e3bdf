//! Scenes and their lifecycle state machine
//!
//! A [`Scene`] pairs framework-owned lifecycle state with a user-supplied
//! [`SceneController`] carrying the hooks. Transitions are driven by
//! one-directional `dispatch_*` calls; each is legal only from its specific
//! predecessor state, and a wrong-state call fails without mutating anything.
//!
//! Per transition the observable order is fixed: pre-observers, the
//! framework's base work, super-observers, the controller hook body, final
//! observers. Upward transitions commit the new state after the final
//! observers ran; downward transitions commit it before the hooks, so a
//! paused observer already sees `STARTED`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::bag::StateBag;
use crate::error::{NavigationError, Result};
use crate::observer::{LifecycleEvent, ObserverRegistry};
use crate::scope::{Scope, ScopeKeyGenerator};
use crate::state::State;
use crate::view::View;

const BAG_ARGUMENTS: &str = "arguments";
const BAG_SEPARATE_CREATE: &str = "separate_create_from_create_view";

/// User hooks for one scene. Implementations hold the scene's own state.
///
/// `on_create_view` is the only required hook; everything else defaults to a
/// no-op. Hooks receive the scene handle, so they can read lifecycle state,
/// reach the scope, or hold a navigator handle captured at construction time.
pub trait SceneController: 'static {
    fn on_create(&mut self, scene: &SceneHandle, saved: Option<&StateBag>) {
        let _ = (scene, saved);
    }

    /// Builds the scene's view. Called exactly once per view lifetime.
    fn on_create_view(&mut self, scene: &SceneHandle, saved: Option<&StateBag>) -> View;

    /// Runs right after the view exists, before the scene advances further.
    fn on_view_created(&mut self, scene: &SceneHandle, saved: Option<&StateBag>) {
        let _ = (scene, saved);
    }

    fn on_activity_created(&mut self, scene: &SceneHandle, saved: Option<&StateBag>) {
        let _ = (scene, saved);
    }

    fn on_start(&mut self, scene: &SceneHandle) {
        let _ = scene;
    }

    fn on_resume(&mut self, scene: &SceneHandle) {
        let _ = scene;
    }

    fn on_pause(&mut self, scene: &SceneHandle) {
        let _ = scene;
    }

    fn on_stop(&mut self, scene: &SceneHandle) {
        let _ = scene;
    }

    fn on_destroy_view(&mut self, scene: &SceneHandle) {
        let _ = scene;
    }

    fn on_destroy(&mut self, scene: &SceneHandle) {
        let _ = scene;
    }

    fn on_save_instance_state(&mut self, scene: &SceneHandle, out: &mut StateBag) {
        let _ = (scene, out);
    }

    fn on_configuration_changed(&mut self, scene: &SceneHandle, config: &StateBag) {
        let _ = (scene, config);
    }
}

struct Attachment {
    observers: Rc<ObserverRegistry>,
    depth: usize,
    display_name: String,
}

pub struct Scene {
    controller: Option<Box<dyn SceneController>>,
    state: State,
    view: Option<View>,
    scope: Option<Scope>,
    arguments: Option<StateBag>,
    separate_create_from_create_view: bool,
    logically_created: bool,
    attachment: Option<Attachment>,
    destroyed: bool,
}

/// Shared handle to one scene. All dispatching goes through the handle so
/// observers and controller hooks can inspect the scene mid-transition.
#[derive(Clone)]
pub struct SceneHandle {
    inner: Rc<RefCell<Scene>>,
}

impl SceneHandle {
    pub fn new(controller: Box<dyn SceneController>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Scene {
                controller: Some(controller),
                state: State::None,
                view: None,
                scope: None,
                arguments: None,
                separate_create_from_create_view: false,
                logically_created: false,
                attachment: None,
                destroyed: false,
            })),
        }
    }

    pub fn state(&self) -> State {
        self.inner.borrow().state
    }

    pub fn view(&self) -> Option<View> {
        self.inner.borrow().view.clone()
    }

    pub fn scope(&self) -> Option<Scope> {
        self.inner.borrow().scope.clone()
    }

    pub fn arguments(&self) -> Option<StateBag> {
        self.inner.borrow().arguments.clone()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.borrow().attachment.is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.borrow().destroyed
    }

    pub fn is_separate_create_from_create_view(&self) -> bool {
        self.inner.borrow().separate_create_from_create_view
    }

    /// Identity comparison; clones of one handle refer to the same scene.
    pub fn same_scene(&self, other: &SceneHandle) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn depth(&self) -> usize {
        self.inner
            .borrow()
            .attachment
            .as_ref()
            .map(|a| a.depth)
            .unwrap_or(1)
    }

    pub fn display_name(&self) -> String {
        self.inner
            .borrow()
            .attachment
            .as_ref()
            .map(|a| a.display_name.clone())
            .unwrap_or_else(|| "scene".to_owned())
    }

    /// Sets the argument bag. Arguments are write-once and sealed at attach.
    pub fn set_arguments(&self, arguments: StateBag) -> Result<()> {
        let mut scene = self.inner.borrow_mut();
        if scene.attachment.is_some() {
            return Err(NavigationError::illegal_state(
                "set_arguments",
                "detached scene",
                "attached",
            ));
        }
        scene.arguments = Some(arguments);
        Ok(())
    }

    /// Selects the creation model. Immutable once the scene is attached.
    pub fn set_separate_create_from_create_view(&self, separate: bool) -> Result<()> {
        let mut scene = self.inner.borrow_mut();
        if scene.attachment.is_some() {
            return Err(NavigationError::CreationModeSealed);
        }
        scene.separate_create_from_create_view = separate;
        Ok(())
    }

    pub(crate) fn dispatch_attach(
        &self,
        observers: Rc<ObserverRegistry>,
        depth: usize,
        display_name: &str,
        parent_scope: &Scope,
        generator: &ScopeKeyGenerator,
        saved: Option<&StateBag>,
    ) -> Result<()> {
        let mut scene = self.inner.borrow_mut();
        if scene.destroyed {
            return Err(NavigationError::illegal_state(
                "dispatch_attach",
                "a scene that was never destroyed",
                "destroyed",
            ));
        }
        if scene.attachment.is_some() {
            return Err(NavigationError::illegal_state(
                "dispatch_attach",
                "detached scene",
                "attached",
            ));
        }
        if let Some(saved) = saved {
            if let Some(separate) = saved.get_bool(BAG_SEPARATE_CREATE) {
                scene.separate_create_from_create_view = separate;
            }
            if scene.arguments.is_none() {
                scene.arguments = saved.get_bag(BAG_ARGUMENTS);
            }
        }
        scene.scope = Some(parent_scope.build_child_scope(Some(display_name), saved, generator));
        scene.attachment = Some(Attachment {
            observers,
            depth,
            display_name: display_name.to_owned(),
        });
        log::trace!("scene `{display_name}` attached");
        Ok(())
    }

    pub(crate) fn dispatch_create(&self, saved: Option<&StateBag>) -> Result<()> {
        {
            let scene = self.inner.borrow();
            if scene.attachment.is_none() {
                return Err(NavigationError::illegal_state(
                    "dispatch_create",
                    "attached scene",
                    "detached",
                ));
            }
            if scene.state != State::None || scene.logically_created {
                return Err(NavigationError::illegal_state(
                    "dispatch_create",
                    State::None.name(),
                    scene.state.name(),
                ));
            }
        }
        let observers = self.observers();
        observers.notify_pre(LifecycleEvent::Created, self);
        self.inner.borrow_mut().logically_created = true;
        observers.notify_super(LifecycleEvent::Created, self);
        let mut controller = self.take_controller("dispatch_create")?;
        controller.on_create(self, saved);
        self.put_controller(controller);
        observers.notify_post(LifecycleEvent::Created, self);
        if self.is_separate_create_from_create_view() {
            self.set_state(State::Created);
        }
        log::trace!("scene `{}` created", self.display_name());
        Ok(())
    }

    pub(crate) fn dispatch_create_view(&self, saved: Option<&StateBag>) -> Result<View> {
        {
            let scene = self.inner.borrow();
            let legal = if scene.separate_create_from_create_view {
                scene.state == State::Created
            } else {
                scene.state == State::None && scene.logically_created
            };
            if !legal || scene.view.is_some() {
                return Err(NavigationError::illegal_state(
                    "dispatch_create_view",
                    if scene.separate_create_from_create_view {
                        State::Created.name()
                    } else {
                        State::None.name()
                    },
                    scene.state.name(),
                ));
            }
        }
        let observers = self.observers();
        observers.notify_pre(LifecycleEvent::ViewCreated, self);
        let mut controller = self.take_controller("dispatch_create_view")?;
        let view = controller.on_create_view(self, saved);
        self.inner.borrow_mut().view = Some(view.clone());
        observers.notify_super(LifecycleEvent::ViewCreated, self);
        controller.on_view_created(self, saved);
        self.put_controller(controller);
        observers.notify_post(LifecycleEvent::ViewCreated, self);
        self.set_state(State::ViewCreated);
        log::trace!("scene `{}` view created", self.display_name());
        Ok(view)
    }

    pub(crate) fn dispatch_activity_created(&self, saved: Option<&StateBag>) -> Result<()> {
        self.expect_state("dispatch_activity_created", State::ViewCreated)?;
        let observers = self.observers();
        observers.notify_pre(LifecycleEvent::ActivityCreated, self);
        observers.notify_super(LifecycleEvent::ActivityCreated, self);
        let mut controller = self.take_controller("dispatch_activity_created")?;
        controller.on_activity_created(self, saved);
        self.put_controller(controller);
        observers.notify_post(LifecycleEvent::ActivityCreated, self);
        self.set_state(State::ActivityCreated);
        Ok(())
    }

    pub(crate) fn dispatch_start(&self) -> Result<()> {
        self.expect_state("dispatch_start", State::ActivityCreated)?;
        let observers = self.observers();
        observers.notify_pre(LifecycleEvent::Started, self);
        observers.notify_super(LifecycleEvent::Started, self);
        let mut controller = self.take_controller("dispatch_start")?;
        controller.on_start(self);
        self.put_controller(controller);
        observers.notify_post(LifecycleEvent::Started, self);
        self.set_state(State::Started);
        Ok(())
    }

    pub(crate) fn dispatch_resume(&self) -> Result<()> {
        self.expect_state("dispatch_resume", State::Started)?;
        let observers = self.observers();
        observers.notify_pre(LifecycleEvent::Resumed, self);
        observers.notify_super(LifecycleEvent::Resumed, self);
        let mut controller = self.take_controller("dispatch_resume")?;
        controller.on_resume(self);
        self.put_controller(controller);
        observers.notify_post(LifecycleEvent::Resumed, self);
        self.set_state(State::Resumed);
        Ok(())
    }

    pub(crate) fn dispatch_pause(&self) -> Result<()> {
        self.expect_state("dispatch_pause", State::Resumed)?;
        self.set_state(State::Started);
        let observers = self.observers();
        observers.notify_pre(LifecycleEvent::Paused, self);
        observers.notify_super(LifecycleEvent::Paused, self);
        let mut controller = self.take_controller("dispatch_pause")?;
        controller.on_pause(self);
        self.put_controller(controller);
        observers.notify_post(LifecycleEvent::Paused, self);
        Ok(())
    }

    pub(crate) fn dispatch_stop(&self) -> Result<()> {
        self.expect_state("dispatch_stop", State::Started)?;
        self.set_state(State::ActivityCreated);
        let observers = self.observers();
        observers.notify_pre(LifecycleEvent::Stopped, self);
        observers.notify_super(LifecycleEvent::Stopped, self);
        let mut controller = self.take_controller("dispatch_stop")?;
        controller.on_stop(self);
        self.put_controller(controller);
        observers.notify_post(LifecycleEvent::Stopped, self);
        Ok(())
    }

    pub(crate) fn dispatch_destroy_view(&self) -> Result<()> {
        let separate = {
            let scene = self.inner.borrow();
            if scene.state != State::ViewCreated && scene.state != State::ActivityCreated {
                return Err(NavigationError::illegal_state(
                    "dispatch_destroy_view",
                    State::ActivityCreated.name(),
                    scene.state.name(),
                ));
            }
            scene.separate_create_from_create_view
        };
        self.set_state(if separate { State::Created } else { State::None });
        let observers = self.observers();
        observers.notify_pre(LifecycleEvent::ViewDestroyed, self);
        observers.notify_super(LifecycleEvent::ViewDestroyed, self);
        let mut controller = self.take_controller("dispatch_destroy_view")?;
        controller.on_destroy_view(self);
        self.put_controller(controller);
        observers.notify_post(LifecycleEvent::ViewDestroyed, self);
        self.inner.borrow_mut().view = None;
        log::trace!("scene `{}` view destroyed", self.display_name());
        Ok(())
    }

    pub(crate) fn dispatch_destroy(&self) -> Result<()> {
        {
            let scene = self.inner.borrow();
            let legal = if scene.separate_create_from_create_view {
                scene.state == State::Created
            } else {
                scene.state == State::None && scene.logically_created
            };
            if !legal || scene.view.is_some() {
                return Err(NavigationError::illegal_state(
                    "dispatch_destroy",
                    if scene.separate_create_from_create_view {
                        State::Created.name()
                    } else {
                        State::None.name()
                    },
                    scene.state.name(),
                ));
            }
        }
        self.set_state(State::None);
        self.inner.borrow_mut().logically_created = false;
        let observers = self.observers();
        observers.notify_pre(LifecycleEvent::Destroyed, self);
        observers.notify_super(LifecycleEvent::Destroyed, self);
        let mut controller = self.take_controller("dispatch_destroy")?;
        controller.on_destroy(self);
        self.put_controller(controller);
        observers.notify_post(LifecycleEvent::Destroyed, self);

        let name = self.display_name();
        let mut scene = self.inner.borrow_mut();
        if let Some(scope) = scene.scope.take() {
            scope.destroy();
        }
        scene.attachment = None;
        scene.destroyed = true;
        log::trace!("scene `{name}` destroyed");
        Ok(())
    }

    pub(crate) fn dispatch_save_instance_state(&self, out: &mut StateBag) -> Result<()> {
        {
            let scene = self.inner.borrow();
            if !scene.logically_created {
                return Err(NavigationError::illegal_state(
                    "dispatch_save_instance_state",
                    "a created scene",
                    scene.state.name(),
                ));
            }
        }
        let observers = self.observers();
        observers.notify_pre(LifecycleEvent::SaveInstanceState, self);
        {
            let scene = self.inner.borrow();
            if let Some(scope) = &scene.scope {
                scope.save_to_bag(out);
            }
            out.put_bool(BAG_SEPARATE_CREATE, scene.separate_create_from_create_view);
            if let Some(arguments) = &scene.arguments {
                out.put_bag(BAG_ARGUMENTS, arguments.clone());
            }
        }
        observers.notify_super(LifecycleEvent::SaveInstanceState, self);
        let mut controller = self.take_controller("dispatch_save_instance_state")?;
        controller.on_save_instance_state(self, out);
        self.put_controller(controller);
        observers.notify_post(LifecycleEvent::SaveInstanceState, self);
        Ok(())
    }

    pub(crate) fn dispatch_configuration_changed(&self, config: &StateBag) -> Result<()> {
        let mut controller = self.take_controller("dispatch_configuration_changed")?;
        controller.on_configuration_changed(self, config);
        self.put_controller(controller);
        Ok(())
    }

    /// Ordinal position on the lifecycle ladder, creation-model aware.
    ///
    /// Combined-mode scenes sit at position 1 ("logically created") while
    /// their `State` still reads `None`, which keeps stepwise state driving
    /// uniform across both creation models.
    pub(crate) fn lifecycle_position(&self) -> u8 {
        let scene = self.inner.borrow();
        match scene.state {
            State::None => {
                if scene.logically_created {
                    1
                } else {
                    0
                }
            }
            State::Created => 1,
            State::ViewCreated => 2,
            State::ActivityCreated => 3,
            State::Started => 4,
            State::Resumed => 5,
        }
    }

    pub(crate) fn position_of_target(target: State) -> u8 {
        match target {
            State::None => 0,
            State::Created => 1,
            State::ViewCreated => 2,
            State::ActivityCreated => 3,
            State::Started => 4,
            State::Resumed => 5,
        }
    }

    fn expect_state(&self, operation: &'static str, expected: State) -> Result<()> {
        let actual = self.state();
        if actual != expected {
            return Err(NavigationError::illegal_state(
                operation,
                expected.name(),
                actual.name(),
            ));
        }
        Ok(())
    }

    fn set_state(&self, state: State) {
        self.inner.borrow_mut().state = state;
    }

    fn observers(&self) -> Rc<ObserverRegistry> {
        self.inner
            .borrow()
            .attachment
            .as_ref()
            .map(|a| a.observers.clone())
            .unwrap_or_else(|| Rc::new(ObserverRegistry::new()))
    }

    fn take_controller(&self, operation: &'static str) -> Result<Box<dyn SceneController>> {
        self.inner.borrow_mut().controller.take().ok_or_else(|| {
            NavigationError::illegal_state(operation, "idle scene", "dispatch in progress")
        })
    }

    fn put_controller(&self, controller: Box<dyn SceneController>) {
        self.inner.borrow_mut().controller = Some(controller);
    }
}
