//! Multi-count pop coordination
//!
//! A pop of N records decomposes into three strictly ordered phases, each its
//! own queue task chained at the head so externally queued operations can
//! interleave only between phases, never inside one:
//!
//! 1. pause the current top;
//! 2. bring the target record forward to whatever the surface warrants;
//! 3. tear down every popped record and play the exit transition.
//!
//! With `use_idle_when_stop` the destroy phase itself splits: interior pages
//! die immediately, the exiting page only once the animation's signals all
//! fired or the time limit passed.

use std::rc::Rc;

use crate::animation::{AnimationDirection, AnimationRequest};
use crate::error::{NavigationError, Result};
use crate::state::State;
use crate::view::Visibility;

use super::manager::NavigationManager;
use super::operation::{Operation, OperationEnd};
use super::options::{PopOptions, SCENE_DESTROY_MAX_TIMEOUT};
use super::record::RecordRef;

pub(crate) struct CoordinatePopOperation {
    count: usize,
    options: PopOptions,
}

impl CoordinatePopOperation {
    pub(crate) fn new(count: usize, options: PopOptions) -> Self {
        Self { count, options }
    }
}

impl Operation for CoordinatePopOperation {
    fn execute(&self, manager: &Rc<NavigationManager>, on_end: OperationEnd) -> Result<()> {
        manager.cancel_current_running_animation();
        manager.require_surface_ready("pop")?;

        let records = manager.records_snapshot();
        let size = records.len();
        if self.count == 0 {
            return Err(NavigationError::IllegalPopCount {
                count: self.count,
                stack_size: size,
            });
        }
        if self.count >= size {
            // pop everything poppable, then hand the terminal signal to the
            // host; the root record itself never leaves the stack
            if size == 1 {
                manager.finish_host();
                return on_end();
            }
            let manager_after = manager.clone();
            return CoordinatePopOperation::new(size - 1, self.options.clone()).execute(
                manager,
                Box::new(move || {
                    manager_after.finish_host();
                    on_end()
                }),
            );
        }

        // top first, so teardown runs in reverse navigation order
        let destroy_records: Vec<RecordRef> =
            records[size - self.count..].iter().rev().cloned().collect();
        let return_record = records[size - self.count - 1].clone();
        let current_record = records[size - 1].clone();
        let current_scene = current_record.borrow().scene();

        let queue = manager.queue();

        // phase 3, queued by phase 2
        let destroy_task = build_destroy_task(
            manager.clone(),
            self.options.clone(),
            destroy_records,
            current_record,
            return_record.clone(),
            on_end,
        );

        // phase 2, queued by phase 1
        let manager_resume = manager.clone();
        let queue_resume = queue.clone();
        let resume_task = move || -> Result<()> {
            let token = manager_resume.begin_suppress_stack_operation("pop resume phase");
            let return_scene = return_record.borrow().scene();
            let saved = return_record.borrow().saved_state.clone();
            // the returning scene must be visible before its hooks fire
            if let Some(view) = return_scene.view() {
                view.set_visibility(Visibility::Visible);
            }
            let result = manager_resume.move_state(
                &return_scene,
                manager_resume.surface_state(),
                saved.as_ref(),
            );
            manager_resume.end_suppress_stack_operation(token)?;
            result?;
            queue_resume.post_at_head(destroy_task)
        };

        // phase 1 runs inside the dispatching task; the suppress wrap around
        // this operation is already active
        if current_scene.state() == State::Resumed {
            manager.move_state(&current_scene, State::Started, None)?;
        }
        queue.post_at_head(resume_task)
    }
}

/// Builds the destroy-phase task. Split out so the two variants (immediate
/// and idle-deferred) read side by side.
fn build_destroy_task(
    manager: Rc<NavigationManager>,
    options: PopOptions,
    destroy_records: Vec<RecordRef>,
    current_record: RecordRef,
    return_record: RecordRef,
    on_end: OperationEnd,
) -> impl FnOnce() -> Result<()> + 'static {
    move || -> Result<()> {
        let token = manager.begin_suppress_stack_operation("pop destroy phase");
        let result = if options.use_idle_when_stop {
            destroy_deferring_final_page(
                &manager,
                &options,
                destroy_records,
                current_record,
                return_record,
                on_end,
            )
        } else {
            destroy_immediately(
                &manager,
                &options,
                destroy_records,
                current_record,
                return_record,
                on_end,
            )
        };
        manager.end_suppress_stack_operation(token)?;
        result
    }
}

/// Plain destroy phase: every popped record is torn down right away and the
/// exit transition plays over the detached view.
fn destroy_immediately(
    manager: &Rc<NavigationManager>,
    options: &PopOptions,
    destroy_records: Vec<RecordRef>,
    current_record: RecordRef,
    return_record: RecordRef,
    on_end: OperationEnd,
) -> Result<()> {
    let current_scene = current_record.borrow().scene();
    let from_view = current_scene.view();
    let to_view = return_record.borrow().scene().view();
    let host_status = current_record.borrow().host_status.clone();
    let push_animation = current_record.borrow().push_animation.clone();

    for record in &destroy_records {
        let scene = record.borrow().scene();
        manager.move_state(&scene, State::None, None)?;
        manager.remove_record(record);
    }
    if let (Some(status), Some(window)) = (host_status, manager.host_window()) {
        status.restore(&window);
    }
    manager.sync_scene_states()?;

    let executor = options
        .animation
        .clone()
        .or(push_animation)
        .or_else(|| manager.default_animation());
    manager.start_animation(
        executor,
        AnimationRequest {
            direction: AnimationDirection::Pop,
            from: from_view,
            to: to_view,
        },
    );

    log::debug!("popped, stack size {}", manager.record_count());
    on_end()
}

/// Idle-deferred destroy phase: interior pages die immediately, then the exit
/// animation runs, and the final page is destroyed once the animation's
/// signals all fired, or once the time limit passed, trading animation
/// correctness for liveness.
fn destroy_deferring_final_page(
    manager: &Rc<NavigationManager>,
    options: &PopOptions,
    destroy_records: Vec<RecordRef>,
    current_record: RecordRef,
    return_record: RecordRef,
    on_end: OperationEnd,
) -> Result<()> {
    let current_scene = current_record.borrow().scene();
    let from_view = current_scene.view();
    let to_view = return_record.borrow().scene().view();
    let push_animation = current_record.borrow().push_animation.clone();

    for record in &destroy_records {
        if Rc::ptr_eq(record, &current_record) {
            continue;
        }
        let scene = record.borrow().scene();
        manager.move_state(&scene, State::None, None)?;
        manager.remove_record(record);
    }

    let executor = options
        .animation
        .clone()
        .or(push_animation)
        .or_else(|| manager.default_animation());
    let signal = manager.start_animation(
        executor,
        AnimationRequest {
            direction: AnimationDirection::Pop,
            from: from_view,
            to: to_view,
        },
    );
    let signals: Vec<_> = signal.into_iter().collect();

    let manager_final = manager.clone();
    let final_task = move || -> Result<()> {
        let token = manager_final.begin_suppress_stack_operation("pop final destroy");
        let scene = current_record.borrow().scene();
        let host_status = current_record.borrow().host_status.clone();
        let mut result = manager_final.move_state(&scene, State::None, None);
        if result.is_ok() {
            manager_final.remove_record(&current_record);
            if let (Some(status), Some(window)) = (host_status, manager_final.host_window()) {
                status.restore(&window);
            }
            result = manager_final.sync_scene_states();
        }
        manager_final.end_suppress_stack_operation(token)?;
        result?;
        log::debug!(
            "popped final page, stack size {}",
            manager_final.record_count()
        );
        on_end()
    };

    let timeout = options.destroy_timeout.unwrap_or(SCENE_DESTROY_MAX_TIMEOUT);
    manager
        .queue()
        .execute_when_idle_or_time_limit(final_task, &signals, timeout);
    Ok(())
}
