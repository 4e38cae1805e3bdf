//! Host lifecycle bridge
//!
//! `SceneLifecycleManager` is the surface the hosting environment drives:
//! each callback is legal only from the surface state its name implies, and a
//! wrong-state call reports expected-vs-actual instead of guessing. The
//! manager delegates the actual work to the navigator; this layer owns
//! nothing but the contract checks and the restore gate.

use std::rc::Rc;

use crate::bag::StateBag;
use crate::error::{NavigationError, Result};
use crate::navigation::Navigator;
use crate::state::State;
use crate::view::View;

pub struct SceneLifecycleManager {
    navigator: Rc<Navigator>,
    support_restore: bool,
}

impl SceneLifecycleManager {
    pub fn new(navigator: Rc<Navigator>) -> Self {
        let support_restore = navigator.is_support_restore();
        Self {
            navigator,
            support_restore,
        }
    }

    pub fn navigator(&self) -> Rc<Navigator> {
        self.navigator.clone()
    }

    /// Brings the surface up: container attached, root scope built, the root
    /// scene pushed (or the whole stack restored), deferred requests drained.
    pub fn on_activity_created(&self, container: View, saved: Option<&StateBag>) -> Result<()> {
        if self.navigator.is_surface_destroyed() {
            return Err(NavigationError::illegal_state(
                "on_activity_created",
                "a surface that was never destroyed",
                "destroyed",
            ));
        }
        self.expect_surface("on_activity_created", State::None)?;
        if saved.is_some() && !self.support_restore {
            return Err(NavigationError::RestoreUnsupported);
        }
        log::debug!("surface: on_activity_created");
        self.navigator.dispatch_surface_created(container, saved)
    }

    pub fn on_start(&self) -> Result<()> {
        self.expect_surface("on_start", State::ActivityCreated)?;
        log::debug!("surface: on_start");
        self.navigator.dispatch_surface_start()
    }

    pub fn on_resume(&self) -> Result<()> {
        self.expect_surface("on_resume", State::Started)?;
        log::debug!("surface: on_resume");
        self.navigator.dispatch_surface_resume()
    }

    pub fn on_pause(&self) -> Result<()> {
        self.expect_surface("on_pause", State::Resumed)?;
        log::debug!("surface: on_pause");
        self.navigator.dispatch_surface_pause()
    }

    pub fn on_stop(&self) -> Result<()> {
        self.expect_surface("on_stop", State::Started)?;
        log::debug!("surface: on_stop");
        self.navigator.dispatch_surface_stop()
    }

    /// Tears the whole stack down to nothing. The surface cannot be brought
    /// back up afterwards; hosts build a fresh navigator for the next life.
    pub fn on_destroy_view(&self) -> Result<()> {
        self.expect_surface("on_destroy_view", State::ActivityCreated)?;
        log::debug!("surface: on_destroy_view");
        self.navigator.dispatch_surface_destroy_view()
    }

    pub fn on_save_instance_state(&self, out: &mut StateBag) -> Result<()> {
        if !self.support_restore {
            return Err(NavigationError::RestoreUnsupported);
        }
        if self.navigator.state() < State::ActivityCreated {
            return Err(NavigationError::illegal_state(
                "on_save_instance_state",
                State::ActivityCreated.name(),
                self.navigator.state().name(),
            ));
        }
        log::debug!("surface: on_save_instance_state");
        self.navigator.dispatch_surface_save(out)
    }

    pub fn on_configuration_changed(&self, config: &StateBag) -> Result<()> {
        log::debug!("surface: on_configuration_changed");
        self.navigator.dispatch_surface_configuration_changed(config)
    }

    fn expect_surface(&self, operation: &'static str, expected: State) -> Result<()> {
        let actual = self.navigator.state();
        if actual != expected {
            return Err(NavigationError::illegal_state(
                operation,
                expected.name(),
                actual.name(),
            ));
        }
        Ok(())
    }
}
