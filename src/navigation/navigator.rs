//! Public navigation surface
//!
//! [`Navigator`] is what hosts and scenes talk to: push/pop/remove requests,
//! observer registration, saved-state plumbing, and memory-pressure
//! recycling. Structural requests become [`Operation`]s on the message queue;
//! requests arriving before the surface finished creating are deferred and
//! drained once it has, never rejected.

use std::cell::RefCell;
use std::rc::Rc;

use crate::animation::AnimationExecutor;
use crate::bag::StateBag;
use crate::error::{NavigationError, Result};
use crate::factory::SceneFactory;
use crate::host::NavigationHost;
use crate::observer::LifecycleObserver;
use crate::queue::NavigationMessageQueue;
use crate::scene::{SceneController, SceneHandle};
use crate::scope::{Scope, ScopeKeyGenerator, ScopeKeyStrategy};
use crate::state::State;
use crate::view::{View, Visibility};

use super::manager::NavigationManager;
use super::operation::{
    Operation, PopToOperation, PopToRootOperation, PushSceneOperation, RemoveSceneOperation,
};
use super::options::{NavigatorOptions, PopOptions, PushOptions};
use super::pop::CoordinatePopOperation;
use super::record::SavedRecord;

const BAG_RECORDS: &str = "navigation_records";

/// Pop counts above this are treated as caller bugs rather than pop-all
/// requests; a real stack never gets anywhere near it.
const MAX_POP_COUNT: usize = 1 << 16;

pub struct Navigator {
    manager: Rc<NavigationManager>,
    queue: NavigationMessageQueue,
    factory: Rc<SceneFactory>,
    options: NavigatorOptions,
    support_restore: bool,
    separate_create_from_create_view: bool,
    root_controller: RefCell<Option<Box<dyn SceneController>>>,
    pending: RefCell<Vec<Box<dyn Operation>>>,
}

impl Navigator {
    pub fn builder(root_scene_type: impl Into<String>) -> NavigatorBuilder {
        NavigatorBuilder::new(root_scene_type)
    }

    // --- structural requests -----------------------------------------------

    pub fn push(&self, type_key: &str) -> Result<()> {
        self.push_with_options(type_key, PushOptions::default())
    }

    pub fn push_with_options(&self, type_key: &str, mut options: PushOptions) -> Result<()> {
        let controller = self
            .factory
            .instantiate(type_key, options.arguments.as_ref())?;
        if options.scene_type.is_none() {
            options.scene_type = Some(type_key.to_owned());
        }
        self.push_controller(controller, options)
    }

    /// Pushes a pre-built controller, bypassing the factory registry. Without
    /// a `scene_type` in the options the record cannot be rebuilt on restore.
    pub fn push_controller(
        &self,
        controller: Box<dyn SceneController>,
        options: PushOptions,
    ) -> Result<()> {
        let scene = SceneHandle::new(controller);
        if let Some(arguments) = options.arguments.clone() {
            scene.set_arguments(arguments)?;
        }
        scene.set_separate_create_from_create_view(self.separate_create_from_create_view)?;
        self.push_scene(scene, options)
    }

    fn push_scene(&self, scene: SceneHandle, options: PushOptions) -> Result<()> {
        let tag = match options.tag.clone() {
            Some(tag) => {
                // duplicate tags are reported at the call site; the operation
                // re-checks against the stack as it is when it finally runs
                self.manager.ensure_tag_free(&tag)?;
                tag
            }
            None => self.generate_tag(options.scene_type.as_deref().unwrap_or("scene")),
        };
        let use_post = options.use_post || self.options.use_post_in_lifecycle;
        let operation = PushSceneOperation {
            scene,
            tag,
            translucent: options.translucent,
            scene_type: options.scene_type.clone(),
            animation: options.animation.clone(),
        };
        self.schedule(Box::new(operation), use_post)
    }

    pub fn pop(&self) -> Result<()> {
        self.pop_count(1, PopOptions::default())
    }

    pub fn pop_with_options(&self, options: PopOptions) -> Result<()> {
        self.pop_count(1, options)
    }

    pub fn pop_count(&self, count: usize, options: PopOptions) -> Result<()> {
        if count == 0 || count > MAX_POP_COUNT {
            return Err(NavigationError::IllegalPopCount {
                count,
                stack_size: self.manager.record_count(),
            });
        }
        let use_post = options.use_post || self.options.use_post_in_lifecycle;
        self.schedule(Box::new(CoordinatePopOperation::new(count, options)), use_post)
    }

    pub fn pop_to(&self, tag: &str, options: PopOptions) -> Result<()> {
        let use_post = options.use_post || self.options.use_post_in_lifecycle;
        let operation = PopToOperation {
            target_tag: tag.to_owned(),
            options,
        };
        self.schedule(Box::new(operation), use_post)
    }

    pub fn pop_to_root(&self, options: PopOptions) -> Result<()> {
        let use_post = options.use_post || self.options.use_post_in_lifecycle;
        self.schedule(Box::new(PopToRootOperation { options }), use_post)
    }

    pub fn remove(&self, scene: &SceneHandle) -> Result<()> {
        self.schedule(
            Box::new(RemoveSceneOperation {
                scene: scene.clone(),
            }),
            false,
        )
    }

    /// Hides a record's view. Visibility flips immediately; the lifecycle
    /// consequences go through the queue like any other state sync.
    pub fn hide(&self, scene: &SceneHandle) -> Result<()> {
        self.set_record_hidden(scene, true, Visibility::Gone)
    }

    pub fn show(&self, scene: &SceneHandle) -> Result<()> {
        self.set_record_hidden(scene, false, Visibility::Visible)
    }

    fn set_record_hidden(
        &self,
        scene: &SceneHandle,
        hidden: bool,
        visibility: Visibility,
    ) -> Result<()> {
        self.manager
            .require_surface_ready(if hidden { "hide" } else { "show" })?;
        let Some((_, record)) = self.manager.find_record_by_scene(scene) else {
            return Err(NavigationError::UnknownTag(scene.display_name()));
        };
        if record.borrow().hidden == hidden {
            return Ok(());
        }
        record.borrow_mut().hidden = hidden;
        if let Some(view) = scene.view() {
            view.set_visibility(visibility);
        }
        let manager = self.manager.clone();
        self.post_task(move || {
            let token = manager.begin_suppress_stack_operation("visibility sync");
            let result = manager.sync_scene_states();
            manager.end_suppress_stack_operation(token)?;
            result
        })
    }

    // --- queries -----------------------------------------------------------

    pub fn current_scene(&self) -> Option<SceneHandle> {
        self.manager.current_record().map(|record| record.borrow().scene())
    }

    pub fn scene_by_tag(&self, tag: &str) -> Option<SceneHandle> {
        self.manager
            .find_record_by_tag(tag)
            .map(|record| record.borrow().scene())
    }

    pub fn stack_size(&self) -> usize {
        self.manager.record_count()
    }

    pub fn is_at_root(&self) -> bool {
        self.stack_size() <= 1
    }

    pub fn can_pop(&self) -> bool {
        self.stack_size() > 1
    }

    /// The surface's own lifecycle state. No scene ever sits above it.
    pub fn state(&self) -> State {
        self.manager.surface_state()
    }

    /// Whether a stack mutation issued right now would execute: the surface
    /// must sit between activity-created and teardown, with no suppression
    /// active.
    pub fn can_execute_stack_operation(&self) -> bool {
        self.manager.can_execute_stack_operation() && !self.manager.is_suppressed()
    }

    pub fn is_support_restore(&self) -> bool {
        self.support_restore
    }

    pub fn is_surface_destroyed(&self) -> bool {
        self.manager.is_surface_destroyed()
    }

    // --- observers ---------------------------------------------------------

    pub fn register_observer(&self, observer: Rc<dyn LifecycleObserver>, recursive: bool) {
        self.manager.observers().register(observer, recursive);
    }

    pub fn unregister_observer(&self, observer: &Rc<dyn LifecycleObserver>) {
        self.manager.observers().unregister(observer);
    }

    // --- queue -------------------------------------------------------------

    pub fn queue(&self) -> NavigationMessageQueue {
        self.queue.clone()
    }

    /// Pumps the message loop to completion, like a host frame boundary.
    pub fn run_until_idle(&self) -> Result<()> {
        self.queue.run_until_idle()
    }

    pub fn set_default_animation(&self, executor: Option<Rc<dyn AnimationExecutor>>) {
        self.manager.set_default_animation(executor);
    }

    // --- memory pressure ---------------------------------------------------

    /// Destroys the views of the oldest invisible records, per the configured
    /// threshold. The visible chain is never touched; recycled scenes are
    /// rebuilt through the normal state walk when navigation returns to them.
    pub fn on_memory_pressure(&self) -> Result<()> {
        let threshold = self.options.auto_recycle_invisible_scenes_threshold;
        if threshold <= 0.0 {
            return Ok(());
        }
        self.manager.require_surface_ready("recycle")?;

        let records = self.manager.records_snapshot();
        let mut covered = false;
        let mut invisible = Vec::new();
        for record in records.iter().rev() {
            let (hidden, translucent) = {
                let borrowed = record.borrow();
                (borrowed.hidden, borrowed.translucent)
            };
            if covered || hidden {
                invisible.push(record.clone());
            }
            if !hidden && !translucent {
                covered = true;
            }
        }
        invisible.reverse();

        let recycle_count = (invisible.len() as f32 * threshold).ceil() as usize;
        let token = self.manager.begin_suppress_stack_operation("memory pressure recycle");
        let mut result = Ok(());
        let mut recycled = 0usize;
        for record in invisible.into_iter().take(recycle_count) {
            let scene = record.borrow().scene();
            if scene.view().is_none() {
                continue;
            }
            if self.support_restore {
                let mut bag = StateBag::new();
                result = scene.dispatch_save_instance_state(&mut bag);
                if result.is_err() {
                    break;
                }
                record.borrow_mut().saved_state = Some(bag);
            }
            result = self.manager.move_state(&scene, State::Created, None);
            if result.is_err() {
                break;
            }
            recycled += 1;
        }
        self.manager.end_suppress_stack_operation(token)?;
        result?;
        if recycled > 0 {
            log::info!("recycled {recycled} invisible scene views under memory pressure");
        }
        Ok(())
    }

    // --- scheduling --------------------------------------------------------

    fn schedule(&self, operation: Box<dyn Operation>, use_post: bool) -> Result<()> {
        if !self.manager.can_execute_stack_operation() {
            if self.manager.is_surface_destroyed() {
                return Err(NavigationError::illegal_state(
                    "stack operation",
                    State::ActivityCreated.name(),
                    "destroyed surface",
                ));
            }
            log::debug!("surface not ready, deferring stack operation");
            self.pending.borrow_mut().push(operation);
            return Ok(());
        }
        if !use_post && !self.manager.is_suppressed() {
            // an immediate operation observes the results of everything
            // queued before it and runs its own sub-phases to completion;
            // only animation waits survive past this call
            self.queue.run_until_idle()?;
            self.post_operation(operation)?;
            return self.queue.run_until_idle();
        }
        self.post_operation(operation)
    }

    fn post_operation(&self, operation: Box<dyn Operation>) -> Result<()> {
        let manager = self.manager.clone();
        self.post_task(move || {
            let token = manager.begin_suppress_stack_operation("execute stack operation");
            let result = operation.execute(&manager, Box::new(|| Ok(())));
            manager.end_suppress_stack_operation(token)?;
            result
        })
    }

    /// Posts a task, deferring it to the queue tail while a suppression is
    /// active. Requests issued from inside lifecycle hooks land here; they
    /// must wait for the running operation instead of executing re-entrantly.
    fn post_task(&self, task: impl FnOnce() -> Result<()> + 'static) -> Result<()> {
        if self.manager.is_suppressed() {
            self.queue.enqueue_tail(Box::new(task));
            return Ok(());
        }
        self.queue.post(task)
    }

    fn drain_pending_operations(&self) -> Result<()> {
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        for operation in pending {
            self.post_operation(operation)?;
        }
        Ok(())
    }

    fn generate_tag(&self, hint: &str) -> String {
        format!("{hint}_{}", uuid::Uuid::new_v4())
    }

    // --- surface dispatch, driven by the lifecycle manager -----------------

    pub(crate) fn dispatch_surface_created(
        &self,
        container: View,
        saved: Option<&StateBag>,
    ) -> Result<()> {
        self.manager
            .attach_surface(container, Scope::root("navigation_surface_scope"));
        self.manager.set_surface_state(State::ActivityCreated);

        let token = self.manager.begin_suppress_stack_operation("surface creation");
        let result = match saved {
            Some(saved) => self.restore_stack(saved),
            None => self.push_root_scene(),
        };
        self.manager.end_suppress_stack_operation(token)?;
        result?;
        self.drain_pending_operations()
    }

    pub(crate) fn dispatch_surface_start(&self) -> Result<()> {
        self.manager.set_surface_state(State::Started);
        self.sync_suppressed("surface start")
    }

    pub(crate) fn dispatch_surface_resume(&self) -> Result<()> {
        self.manager.set_surface_state(State::Resumed);
        self.sync_suppressed("surface resume")
    }

    pub(crate) fn dispatch_surface_pause(&self) -> Result<()> {
        self.manager.set_surface_state(State::Started);
        self.sync_suppressed("surface pause")
    }

    pub(crate) fn dispatch_surface_stop(&self) -> Result<()> {
        self.manager.set_surface_state(State::ActivityCreated);
        self.sync_suppressed("surface stop")
    }

    pub(crate) fn dispatch_surface_destroy_view(&self) -> Result<()> {
        self.manager.cancel_current_running_animation();
        let token = self.manager.begin_suppress_stack_operation("surface teardown");
        let records = self.manager.records_snapshot();
        let mut result = Ok(());
        for record in records.iter().rev() {
            let scene = record.borrow().scene();
            result = self.manager.move_state(&scene, State::None, None);
            if result.is_err() {
                break;
            }
            self.manager.remove_record(record);
        }
        self.manager.end_suppress_stack_operation(token)?;
        result?;
        self.manager.detach_surface();
        self.manager.mark_surface_destroyed();
        log::debug!("surface torn down");
        Ok(())
    }

    pub(crate) fn dispatch_surface_save(&self, out: &mut StateBag) -> Result<()> {
        let mut saved_records = Vec::new();
        for record in self.manager.records_snapshot() {
            let (scene, tag, translucent, hidden, scene_type, host_status) = {
                let borrowed = record.borrow();
                (
                    borrowed.scene(),
                    borrowed.tag.clone(),
                    borrowed.translucent,
                    borrowed.hidden,
                    borrowed.scene_type.clone(),
                    borrowed.host_status.clone(),
                )
            };
            let Some(scene_type) = scene_type else {
                log::warn!("scene `{tag}` has no type key, leaving it out of the saved state");
                continue;
            };
            let mut scene_state = StateBag::new();
            scene.dispatch_save_instance_state(&mut scene_state)?;
            saved_records.push(SavedRecord {
                tag,
                translucent,
                hidden,
                scene_type,
                scene_state,
                host_status,
            });
        }
        let value = serde_json::to_value(&saved_records)
            .map_err(|e| NavigationError::CorruptSavedState(e.to_string()))?;
        out.put_value(BAG_RECORDS, value);
        log::debug!("saved {} records", self.manager.record_count());
        Ok(())
    }

    pub(crate) fn dispatch_surface_configuration_changed(&self, config: &StateBag) -> Result<()> {
        for record in self.manager.records_snapshot() {
            let scene = record.borrow().scene();
            scene.dispatch_configuration_changed(config)?;
        }
        Ok(())
    }

    fn sync_suppressed(&self, reason: &str) -> Result<()> {
        let token = self.manager.begin_suppress_stack_operation(reason);
        let result = self.manager.sync_scene_states();
        self.manager.end_suppress_stack_operation(token)?;
        result
    }

    fn push_root_scene(&self) -> Result<()> {
        let controller = match self.root_controller.borrow_mut().take() {
            Some(controller) => controller,
            None => self.factory.instantiate(
                &self.options.root_scene_type,
                self.options.root_scene_arguments.as_ref(),
            )?,
        };
        let scene = SceneHandle::new(controller);
        if let Some(arguments) = self.options.root_scene_arguments.clone() {
            scene.set_arguments(arguments)?;
        }
        scene.set_separate_create_from_create_view(self.separate_create_from_create_view)?;
        // the root is never translucent and keeps a stable tag across restores
        self.manager.push_record(
            scene.clone(),
            self.options.root_scene_type.clone(),
            false,
            Some(self.options.root_scene_type.clone()),
            None,
            None,
        )?;
        self.manager
            .move_state(&scene, self.manager.surface_state(), None)?;
        self.manager.sync_scene_states()
    }

    fn restore_stack(&self, saved: &StateBag) -> Result<()> {
        let value = saved.get_value(BAG_RECORDS).ok_or_else(|| {
            NavigationError::CorruptSavedState("record list is missing".to_owned())
        })?;
        let records: Vec<SavedRecord> = serde_json::from_value(value.clone())
            .map_err(|e| NavigationError::CorruptSavedState(e.to_string()))?;
        if records.is_empty() {
            return Err(NavigationError::CorruptSavedState(
                "record list is empty".to_owned(),
            ));
        }

        let mut covered = vec![false; records.len()];
        let mut seen_opaque = false;
        for (index, record) in records.iter().enumerate().rev() {
            covered[index] = seen_opaque;
            if !record.hidden && !record.translucent {
                seen_opaque = true;
            }
        }

        for (index, saved_record) in records.iter().enumerate() {
            let controller = self.factory.instantiate(&saved_record.scene_type, None)?;
            let scene = SceneHandle::new(controller);
            self.manager.push_record(
                scene.clone(),
                saved_record.tag.clone(),
                saved_record.translucent,
                Some(saved_record.scene_type.clone()),
                None,
                Some(saved_record.scene_state.clone()),
            )?;
            if let Some(record) = self.manager.current_record() {
                let mut borrowed = record.borrow_mut();
                borrowed.hidden = saved_record.hidden;
                borrowed.host_status = saved_record.host_status.clone();
            }
            // with only-restore-visible, covered scenes stay logical-only and
            // re-inflate when navigation returns to them
            let target = if covered[index] && self.options.only_restore_visible_scene {
                State::Created
            } else {
                State::ActivityCreated
            };
            self.manager
                .move_state(&scene, target, Some(&saved_record.scene_state))?;
        }
        self.manager.sync_scene_states()?;
        log::debug!("restored {} records", records.len());
        Ok(())
    }
}

/// Setup entry point for a navigation surface.
pub struct NavigatorBuilder {
    options: NavigatorOptions,
    root_controller: Option<Box<dyn SceneController>>,
    support_restore: bool,
    separate_create_from_create_view: bool,
    default_animation: Option<Rc<dyn AnimationExecutor>>,
    scope_strategy: ScopeKeyStrategy,
}

impl NavigatorBuilder {
    pub fn new(root_scene_type: impl Into<String>) -> Self {
        Self {
            options: NavigatorOptions::new(root_scene_type),
            root_controller: None,
            support_restore: true,
            separate_create_from_create_view: false,
            default_animation: None,
            scope_strategy: ScopeKeyStrategy::Sequential,
        }
    }

    pub fn root_arguments(mut self, arguments: StateBag) -> Self {
        self.options.root_scene_arguments = Some(arguments);
        self
    }

    /// Substitutes a pre-built controller for the root scene's first
    /// creation. Restores still go through the factory.
    pub fn root_controller(mut self, controller: Box<dyn SceneController>) -> Self {
        self.root_controller = Some(controller);
        self
    }

    pub fn support_restore(mut self, support: bool) -> Self {
        self.support_restore = support;
        self
    }

    pub fn separate_create_from_create_view(mut self, separate: bool) -> Self {
        self.separate_create_from_create_view = separate;
        self
    }

    pub fn use_post_in_lifecycle(mut self, use_post: bool) -> Self {
        self.options.use_post_in_lifecycle = use_post;
        self
    }

    pub fn only_restore_visible_scene(mut self, only_visible: bool) -> Self {
        self.options.only_restore_visible_scene = only_visible;
        self
    }

    pub fn auto_recycle_invisible_scenes_threshold(mut self, threshold: f32) -> Self {
        self.options.auto_recycle_invisible_scenes_threshold = threshold;
        self
    }

    pub fn default_animation(mut self, executor: Rc<dyn AnimationExecutor>) -> Self {
        self.default_animation = Some(executor);
        self
    }

    pub fn scope_key_strategy(mut self, strategy: ScopeKeyStrategy) -> Self {
        self.scope_strategy = strategy;
        self
    }

    pub fn build(
        self,
        factory: Rc<SceneFactory>,
        host: Rc<dyn NavigationHost>,
    ) -> Result<Navigator> {
        if self.root_controller.is_none() && !factory.is_registered(&self.options.root_scene_type) {
            return Err(NavigationError::Instantiation {
                type_key: self.options.root_scene_type.clone(),
                source: None,
            });
        }
        let threshold = self.options.auto_recycle_invisible_scenes_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(NavigationError::illegal_state(
                "build",
                "auto-recycle threshold within 0.0..=1.0",
                format!("{threshold}"),
            ));
        }

        let queue = NavigationMessageQueue::new();
        let support_restore = self.support_restore && host.is_support_restore();
        let manager = NavigationManager::new(
            queue.clone(),
            host,
            Rc::new(crate::observer::ObserverRegistry::new()),
            ScopeKeyGenerator::new(self.scope_strategy),
            self.default_animation,
        );
        Ok(Navigator {
            manager,
            queue,
            factory,
            options: self.options,
            support_restore,
            separate_create_from_create_view: self.separate_create_from_create_view,
            root_controller: RefCell::new(self.root_controller),
            pending: RefCell::new(Vec::new()),
        })
    }
}
