//! Host integration
//!
//! The host is whatever owns the navigation surface: it provides the terminal
//! "finish" action, says whether state restore is supported, and optionally
//! exposes a window whose handful of flags scenes may change and pops must
//! put back.

use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// The handful of host window flags scenes are allowed to touch.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WindowFlags: u32 {
        const FULLSCREEN = 1 << 0;
        const KEEP_SCREEN_ON = 1 << 1;
        const SECURE = 1 << 2;
        const LAYOUT_NO_LIMITS = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoftInputMode {
    Unspecified,
    AdjustResize,
    AdjustPan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Unspecified,
    Portrait,
    Landscape,
}

#[derive(Debug)]
struct WindowState {
    flags: WindowFlags,
    soft_input_mode: SoftInputMode,
    orientation: Orientation,
}

/// Shared handle to the host window's mutable cosmetic state.
#[derive(Debug, Clone)]
pub struct HostWindow {
    inner: Rc<RefCell<WindowState>>,
}

impl HostWindow {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(WindowState {
                flags: WindowFlags::empty(),
                soft_input_mode: SoftInputMode::Unspecified,
                orientation: Orientation::Unspecified,
            })),
        }
    }

    pub fn flags(&self) -> WindowFlags {
        self.inner.borrow().flags
    }

    pub fn add_flags(&self, flags: WindowFlags) {
        self.inner.borrow_mut().flags.insert(flags);
    }

    pub fn clear_flags(&self, flags: WindowFlags) {
        self.inner.borrow_mut().flags.remove(flags);
    }

    pub fn soft_input_mode(&self) -> SoftInputMode {
        self.inner.borrow().soft_input_mode
    }

    pub fn set_soft_input_mode(&self, mode: SoftInputMode) {
        self.inner.borrow_mut().soft_input_mode = mode;
    }

    pub fn orientation(&self) -> Orientation {
        self.inner.borrow().orientation
    }

    pub fn set_orientation(&self, orientation: Orientation) {
        self.inner.borrow_mut().orientation = orientation;
    }
}

impl Default for HostWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the window taken when a scene is pushed, restored when that
/// scene pops so its cosmetic changes do not leak to the scene beneath.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostStatusRecord {
    flag_bits: u32,
    soft_input_mode: SoftInputMode,
    orientation: Orientation,
}

impl HostStatusRecord {
    pub fn snapshot(window: &HostWindow) -> Self {
        Self {
            flag_bits: window.flags().bits(),
            soft_input_mode: window.soft_input_mode(),
            orientation: window.orientation(),
        }
    }

    /// Restores the saved flag word by diffing against the current one, so
    /// flags untouched since the snapshot are not churned.
    pub fn restore(&self, window: &HostWindow) {
        let current = window.flags();
        let saved = WindowFlags::from_bits_truncate(self.flag_bits);

        let common = current & saved;
        window.add_flags(saved - common);
        window.clear_flags(current - common);

        window.set_soft_input_mode(self.soft_input_mode);
        window.set_orientation(self.orientation);
    }
}

/// The navigation surface's owner.
pub trait NavigationHost {
    /// Whether saved state may be written and restored for this surface.
    fn is_support_restore(&self) -> bool {
        false
    }

    /// Terminal signal: the stack cannot pop below its root, finish the host
    /// instead.
    fn finish_host(&self);

    fn window(&self) -> Option<HostWindow> {
        None
    }
}
