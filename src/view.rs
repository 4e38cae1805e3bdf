//! Headless view tree
//!
//! The navigation core only needs a view's identity, visibility, and position
//! in a container; actual rendering is the host's concern. `View` is a cheap
//! clonable handle, so scenes, records, and animation requests can all refer
//! to the same node.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Gone,
}

pub type ViewId = u32;

#[derive(Debug, Clone)]
pub struct View {
    inner: Rc<RefCell<ViewInner>>,
}

#[derive(Debug)]
struct ViewInner {
    id: Option<ViewId>,
    visibility: Visibility,
    children: Vec<View>,
}

impl View {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ViewInner {
                id: None,
                visibility: Visibility::Visible,
                children: Vec::new(),
            })),
        }
    }

    pub fn with_id(id: ViewId) -> Self {
        let view = Self::new();
        view.inner.borrow_mut().id = Some(id);
        view
    }

    pub fn id(&self) -> Option<ViewId> {
        self.inner.borrow().id
    }

    pub fn visibility(&self) -> Visibility {
        self.inner.borrow().visibility
    }

    pub fn set_visibility(&self, visibility: Visibility) {
        self.inner.borrow_mut().visibility = visibility;
    }

    pub fn add_child(&self, child: &View) {
        let mut inner = self.inner.borrow_mut();
        if !inner.children.iter().any(|c| c.is_same(child)) {
            inner.children.push(child.clone());
        }
    }

    pub fn remove_child(&self, child: &View) {
        self.inner
            .borrow_mut()
            .children
            .retain(|c| !c.is_same(child));
    }

    pub fn contains(&self, child: &View) -> bool {
        self.inner.borrow().children.iter().any(|c| c.is_same(child))
    }

    pub fn child_count(&self) -> usize {
        self.inner.borrow().children.len()
    }

    /// Identity comparison; two handles to the same node are the same view.
    pub fn is_same(&self, other: &View) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for View {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves the container view the stack's visual root attaches to.
pub trait ViewFinder {
    fn find_container(&self, id: ViewId) -> Option<View>;
}

/// A finder over a fixed set of root containers, keyed by view id.
pub struct RootViewFinder {
    containers: Vec<View>,
}

impl RootViewFinder {
    pub fn new(containers: Vec<View>) -> Self {
        Self { containers }
    }
}

impl ViewFinder for RootViewFinder {
    fn find_container(&self, id: ViewId) -> Option<View> {
        self.containers
            .iter()
            .find(|view| view.id() == Some(id))
            .cloned()
    }
}

/// Process-local generator for container view ids.
pub struct ViewIdGenerator {
    next: Cell<ViewId>,
}

impl ViewIdGenerator {
    pub fn new() -> Self {
        Self { next: Cell::new(1) }
    }

    pub fn generate(&self) -> ViewId {
        let id = self.next.get();
        self.next.set(id + 1);
        id
    }
}

impl Default for ViewIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
