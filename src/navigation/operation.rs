use std::rc::Rc;

use crate::animation::{AnimationDirection, AnimationExecutor, AnimationRequest};
use crate::error::{NavigationError, Result};
use crate::scene::SceneHandle;
use crate::state::State;

use super::manager::NavigationManager;

/// Completion callback for one stack operation. May fire long after
/// `execute` returned when the operation awaits an animation.
pub(crate) type OperationEnd = Box<dyn FnOnce() -> Result<()>>;

/// A unit of stack mutation, independent of when it runs.
pub(crate) trait Operation {
    fn execute(&self, manager: &Rc<NavigationManager>, on_end: OperationEnd) -> Result<()>;
}

/// Appends a new record and brings its scene up to the surface state.
pub(crate) struct PushSceneOperation {
    pub scene: SceneHandle,
    pub tag: String,
    pub translucent: bool,
    pub scene_type: Option<String>,
    pub animation: Option<Rc<dyn AnimationExecutor>>,
}

impl Operation for PushSceneOperation {
    fn execute(&self, manager: &Rc<NavigationManager>, on_end: OperationEnd) -> Result<()> {
        manager.cancel_current_running_animation();
        manager.require_surface_ready("push")?;
        // fail before anything is touched, so a duplicate tag leaves the
        // previous top untouched
        manager.ensure_tag_free(&self.tag)?;

        let previous = manager.current_record();

        // the outgoing top leaves the foreground before the new scene enters
        if let Some(previous) = &previous {
            if !self.translucent {
                let scene = previous.borrow().scene();
                if scene.state() == State::Resumed {
                    manager.move_state(&scene, State::Started, None)?;
                }
            }
        }

        manager.push_record(
            self.scene.clone(),
            self.tag.clone(),
            self.translucent,
            self.scene_type.clone(),
            self.animation.clone(),
            None,
        )?;
        manager.move_state(&self.scene, manager.surface_state(), None)?;
        manager.sync_scene_states()?;

        let from = previous.as_ref().and_then(|record| record.borrow().scene().view());
        let to = self.scene.view();
        let executor = self.animation.clone().or_else(|| manager.default_animation());
        manager.start_animation(
            executor,
            AnimationRequest {
                direction: AnimationDirection::Push,
                from,
                to,
            },
        );

        log::debug!(
            "pushed `{}`, stack size {}",
            self.tag,
            manager.record_count()
        );
        on_end()
    }
}

/// Removes an arbitrary record. A visible target is torn down synchronously,
/// with no animation, before the record leaves the stack.
pub(crate) struct RemoveSceneOperation {
    pub scene: SceneHandle,
}

impl Operation for RemoveSceneOperation {
    fn execute(&self, manager: &Rc<NavigationManager>, on_end: OperationEnd) -> Result<()> {
        manager.cancel_current_running_animation();
        manager.require_surface_ready("remove")?;

        let Some((_, record)) = manager.find_record_by_scene(&self.scene) else {
            log::warn!("remove: scene `{}` is not in the stack", self.scene.display_name());
            return on_end();
        };

        if manager.record_count() == 1 {
            // the stack never goes empty while the surface is alive
            log::debug!("remove of the last record finishes the host");
            manager.finish_host();
            return on_end();
        }

        let was_top = manager
            .current_record()
            .map(|top| Rc::ptr_eq(&top, &record))
            .unwrap_or(false);
        let host_status = record.borrow().host_status.clone();

        manager.move_state(&self.scene, State::None, None)?;
        manager.remove_record(&record);

        if was_top {
            if let (Some(status), Some(window)) = (host_status, manager.host_window()) {
                status.restore(&window);
            }
        }
        manager.sync_scene_states()?;

        log::debug!("removed a record, stack size {}", manager.record_count());
        on_end()
    }
}

/// Pops every record above `target_tag`. Count resolution happens at
/// execution time, against whatever the stack looks like by then.
pub(crate) struct PopToOperation {
    pub target_tag: String,
    pub options: super::options::PopOptions,
}

impl Operation for PopToOperation {
    fn execute(&self, manager: &Rc<NavigationManager>, on_end: OperationEnd) -> Result<()> {
        let records = manager.records_snapshot();
        let index = records
            .iter()
            .position(|record| record.borrow().tag == self.target_tag)
            .ok_or_else(|| NavigationError::UnknownTag(self.target_tag.clone()))?;
        let count = records.len() - 1 - index;
        if count == 0 {
            return on_end();
        }
        super::pop::CoordinatePopOperation::new(count, self.options.clone()).execute(manager, on_end)
    }
}

/// Pops everything above the root record.
pub(crate) struct PopToRootOperation {
    pub options: super::options::PopOptions,
}

impl Operation for PopToRootOperation {
    fn execute(&self, manager: &Rc<NavigationManager>, on_end: OperationEnd) -> Result<()> {
        let count = manager.record_count().saturating_sub(1);
        if count == 0 {
            return on_end();
        }
        super::pop::CoordinatePopOperation::new(count, self.options.clone()).execute(manager, on_end)
    }
}
