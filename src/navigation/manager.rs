//! Stack state holder
//!
//! `NavigationManager` owns the record list, the surface lifecycle state, and
//! the machinery every operation leans on: the stepwise state-driving engine,
//! the suppress-token guard against re-entrant stack requests, and the
//! currently running animation's cancellation signal. Records are mutated
//! only from inside operation execution on the queue's single logical thread.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::animation::{AnimationExecutor, AnimationRequest, CancellationSignal};
use crate::bag::StateBag;
use crate::error::{NavigationError, Result};
use crate::host::{HostStatusRecord, HostWindow, NavigationHost};
use crate::observer::ObserverRegistry;
use crate::queue::NavigationMessageQueue;
use crate::scene::SceneHandle;
use crate::scope::{Scope, ScopeKeyGenerator};
use crate::state::State;
use crate::view::{View, Visibility};

use super::record::{Record, RecordRef};

/// Proof that a suppression is active. Must be handed back to
/// [`NavigationManager::end_suppress_stack_operation`] exactly once.
pub(crate) struct SuppressToken {
    tag: String,
}

pub(crate) struct NavigationManager {
    queue: NavigationMessageQueue,
    host: Rc<dyn NavigationHost>,
    observers: Rc<ObserverRegistry>,
    scope_generator: ScopeKeyGenerator,
    records: RefCell<Vec<RecordRef>>,
    surface_state: Cell<State>,
    surface_destroyed: Cell<bool>,
    root_scope: RefCell<Option<Scope>>,
    container: RefCell<Option<View>>,
    default_animation: RefCell<Option<Rc<dyn AnimationExecutor>>>,
    current_animation: RefCell<Option<CancellationSignal>>,
    active_suppressions: RefCell<Vec<String>>,
    suppress_counter: Cell<u64>,
}

impl NavigationManager {
    pub(crate) fn new(
        queue: NavigationMessageQueue,
        host: Rc<dyn NavigationHost>,
        observers: Rc<ObserverRegistry>,
        scope_generator: ScopeKeyGenerator,
        default_animation: Option<Rc<dyn AnimationExecutor>>,
    ) -> Rc<Self> {
        Rc::new(Self {
            queue,
            host,
            observers,
            scope_generator,
            records: RefCell::new(Vec::new()),
            surface_state: Cell::new(State::None),
            surface_destroyed: Cell::new(false),
            root_scope: RefCell::new(None),
            container: RefCell::new(None),
            default_animation: RefCell::new(default_animation),
            current_animation: RefCell::new(None),
            active_suppressions: RefCell::new(Vec::new()),
            suppress_counter: Cell::new(0),
        })
    }

    pub(crate) fn queue(&self) -> NavigationMessageQueue {
        self.queue.clone()
    }

    pub(crate) fn observers(&self) -> Rc<ObserverRegistry> {
        self.observers.clone()
    }

    // --- surface lifecycle -------------------------------------------------

    pub(crate) fn surface_state(&self) -> State {
        self.surface_state.get()
    }

    pub(crate) fn set_surface_state(&self, state: State) {
        self.surface_state.set(state);
    }

    pub(crate) fn is_surface_destroyed(&self) -> bool {
        self.surface_destroyed.get()
    }

    pub(crate) fn mark_surface_destroyed(&self) {
        self.surface_destroyed.set(true);
        self.surface_state.set(State::None);
    }

    pub(crate) fn attach_surface(&self, container: View, root_scope: Scope) {
        *self.container.borrow_mut() = Some(container);
        *self.root_scope.borrow_mut() = Some(root_scope);
    }

    pub(crate) fn detach_surface(&self) {
        if let Some(scope) = self.root_scope.borrow_mut().take() {
            scope.destroy();
        }
        *self.container.borrow_mut() = None;
    }

    pub(crate) fn container(&self) -> Option<View> {
        self.container.borrow().clone()
    }

    pub(crate) fn root_scope(&self) -> Option<Scope> {
        self.root_scope.borrow().clone()
    }

    /// True while the surface sits between activity-created and teardown.
    /// Operations arriving outside that window are deferred by the navigator,
    /// never executed against a half-built surface.
    pub(crate) fn can_execute_stack_operation(&self) -> bool {
        !self.surface_destroyed.get() && self.surface_state.get() >= State::ActivityCreated
    }

    pub(crate) fn require_surface_ready(&self, operation: &'static str) -> Result<()> {
        if !self.can_execute_stack_operation() {
            return Err(NavigationError::illegal_state(
                operation,
                State::ActivityCreated.name(),
                self.surface_state().name(),
            ));
        }
        Ok(())
    }

    // --- suppress tokens ---------------------------------------------------

    pub(crate) fn begin_suppress_stack_operation(&self, reason: &str) -> SuppressToken {
        let id = self.suppress_counter.get();
        self.suppress_counter.set(id + 1);
        let tag = format!("{reason} #{id}");
        self.active_suppressions.borrow_mut().push(tag.clone());
        SuppressToken { tag }
    }

    /// Releases one suppression. Releasing a token that is not active (double
    /// release, or a token from another manager) is a contract violation.
    pub(crate) fn end_suppress_stack_operation(&self, token: SuppressToken) -> Result<()> {
        let mut active = self.active_suppressions.borrow_mut();
        match active.iter().rposition(|tag| *tag == token.tag) {
            Some(index) => {
                active.remove(index);
                Ok(())
            }
            None => Err(NavigationError::SuppressTokenMismatch {
                expected: active
                    .last()
                    .cloned()
                    .unwrap_or_else(|| "no active suppression".to_owned()),
                released: token.tag,
            }),
        }
    }

    pub(crate) fn is_suppressed(&self) -> bool {
        !self.active_suppressions.borrow().is_empty()
    }

    // --- record list -------------------------------------------------------

    pub(crate) fn record_count(&self) -> usize {
        self.records.borrow().len()
    }

    pub(crate) fn records_snapshot(&self) -> Vec<RecordRef> {
        self.records.borrow().clone()
    }

    pub(crate) fn current_record(&self) -> Option<RecordRef> {
        self.records.borrow().last().cloned()
    }

    pub(crate) fn find_record_by_scene(&self, scene: &SceneHandle) -> Option<(usize, RecordRef)> {
        self.records
            .borrow()
            .iter()
            .enumerate()
            .find(|(_, record)| record.borrow().scene.same_scene(scene))
            .map(|(index, record)| (index, record.clone()))
    }

    pub(crate) fn find_record_by_tag(&self, tag: &str) -> Option<RecordRef> {
        self.records
            .borrow()
            .iter()
            .find(|record| record.borrow().tag == tag)
            .cloned()
    }

    pub(crate) fn ensure_tag_free(&self, tag: &str) -> Result<()> {
        if self.find_record_by_tag(tag).is_some() {
            return Err(NavigationError::DuplicateTag(tag.to_owned()));
        }
        Ok(())
    }

    /// Attaches `scene` and appends its record. The scene is left at whatever
    /// state it had; callers drive it afterwards with [`Self::move_state`].
    pub(crate) fn push_record(
        &self,
        scene: SceneHandle,
        tag: String,
        translucent: bool,
        scene_type: Option<String>,
        push_animation: Option<Rc<dyn AnimationExecutor>>,
        saved: Option<StateBag>,
    ) -> Result<()> {
        self.ensure_tag_free(&tag)?;
        let root_scope = self.root_scope().ok_or_else(|| {
            NavigationError::illegal_state("push", "a created surface", self.surface_state().name())
        })?;
        scene.dispatch_attach(
            self.observers.clone(),
            1,
            &tag,
            &root_scope,
            &self.scope_generator,
            saved.as_ref(),
        )?;
        let record = Record::new(scene, tag, translucent, scene_type, push_animation);
        {
            let mut borrowed = record.borrow_mut();
            borrowed.saved_state = saved;
            if let Some(window) = self.host_window() {
                borrowed.host_status = Some(HostStatusRecord::snapshot(&window));
            }
        }
        self.records.borrow_mut().push(record);
        Ok(())
    }

    pub(crate) fn remove_record(&self, record: &RecordRef) {
        self.records
            .borrow_mut()
            .retain(|candidate| !Rc::ptr_eq(candidate, record));
    }

    // --- state driving -----------------------------------------------------

    /// Walks `scene` one dispatch at a time until it sits at `target`.
    ///
    /// View attachment is part of the walk: the view joins the container right
    /// after creation and leaves it right after destruction. `saved` is only
    /// consulted by the creation steps, so passing it for an already-built
    /// scene is harmless.
    pub(crate) fn move_state(
        &self,
        scene: &SceneHandle,
        target: State,
        saved: Option<&StateBag>,
    ) -> Result<()> {
        let target_position = SceneHandle::position_of_target(target);
        loop {
            let position = scene.lifecycle_position();
            if position == target_position {
                return Ok(());
            }
            if position < target_position {
                match position {
                    0 => scene.dispatch_create(saved)?,
                    1 => {
                        let view = scene.dispatch_create_view(saved)?;
                        if let Some(container) = self.container() {
                            container.add_child(&view);
                        }
                    }
                    2 => scene.dispatch_activity_created(saved)?,
                    3 => scene.dispatch_start()?,
                    4 => scene.dispatch_resume()?,
                    _ => unreachable!("no upward step from the top of the ladder"),
                }
            } else {
                match position {
                    5 => scene.dispatch_pause()?,
                    4 => scene.dispatch_stop()?,
                    2 | 3 => {
                        let view = scene.view();
                        scene.dispatch_destroy_view()?;
                        if let (Some(view), Some(container)) = (view, self.container()) {
                            container.remove_child(&view);
                        }
                    }
                    1 => scene.dispatch_destroy()?,
                    _ => unreachable!("no downward step from the bottom of the ladder"),
                }
            }
        }
    }

    /// Re-aligns every record with the surface state and the translucency
    /// rules: the top visible chain (top record plus everything beneath an
    /// unbroken run of translucent records) tracks the surface, records
    /// covered by an opaque record cap at activity-created, hidden records cap
    /// there too and go `GONE`.
    ///
    /// Covered records whose views were recycled stay torn down; they are
    /// rebuilt by the pop path when navigation returns to them.
    pub(crate) fn sync_scene_states(&self) -> Result<()> {
        let records = self.records_snapshot();
        let surface = self.surface_state();
        let mut covered = false;
        for record in records.iter().rev() {
            let (scene, hidden, translucent, saved) = {
                let borrowed = record.borrow();
                (
                    borrowed.scene(),
                    borrowed.hidden,
                    borrowed.translucent,
                    borrowed.saved_state.clone(),
                )
            };
            let in_visible_chain = !hidden && !covered;
            if !in_visible_chain && scene.view().is_none() {
                if !hidden && !translucent {
                    covered = true;
                }
                continue;
            }
            let target = if in_visible_chain {
                surface
            } else {
                surface.min(State::ActivityCreated)
            };
            let moving_up = SceneHandle::position_of_target(target) > scene.lifecycle_position();
            if in_visible_chain && moving_up {
                // a revealed scene must already be visible when its hooks run
                if let Some(view) = scene.view() {
                    view.set_visibility(Visibility::Visible);
                }
            }
            self.move_state(&scene, target, saved.as_ref())?;
            if let Some(view) = scene.view() {
                view.set_visibility(if in_visible_chain {
                    Visibility::Visible
                } else {
                    Visibility::Gone
                });
            }
            if !hidden && !translucent {
                covered = true;
            }
        }
        Ok(())
    }

    // --- animation ---------------------------------------------------------

    pub(crate) fn default_animation(&self) -> Option<Rc<dyn AnimationExecutor>> {
        self.default_animation.borrow().clone()
    }

    pub(crate) fn set_default_animation(&self, executor: Option<Rc<dyn AnimationExecutor>>) {
        *self.default_animation.borrow_mut() = executor;
    }

    /// Starts a transition and tracks its signal as the currently running
    /// animation. Completion fires the signal, so waiters cannot tell apart
    /// "finished" from "superseded": both release them, exactly once.
    pub(crate) fn start_animation(
        &self,
        executor: Option<Rc<dyn AnimationExecutor>>,
        request: AnimationRequest,
    ) -> Option<CancellationSignal> {
        let executor = executor?;
        self.cancel_current_running_animation();
        let signal = CancellationSignal::new();
        *self.current_animation.borrow_mut() = Some(signal.clone());
        let end_signal = signal.clone();
        executor.execute(request, &signal, Box::new(move || end_signal.cancel()));
        Some(signal)
    }

    /// Fires the running animation's signal before a new structural operation
    /// starts, so whatever waited on it runs ahead of further view mutation.
    pub(crate) fn cancel_current_running_animation(&self) {
        if let Some(signal) = self.current_animation.borrow_mut().take() {
            signal.cancel();
        }
    }

    // --- host --------------------------------------------------------------

    pub(crate) fn finish_host(&self) {
        log::debug!("stack cannot pop below its root, finishing the host");
        self.host.finish_host();
    }

    pub(crate) fn host_window(&self) -> Option<HostWindow> {
        self.host.window()
    }
}
