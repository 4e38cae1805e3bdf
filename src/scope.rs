//! Hierarchical service scopes
//!
//! Each scene owns one `Scope`; lookups fall back to the parent scope, so a
//! service registered on the root is visible to every scene. Destroying a
//! scope notifies every registered service's unregister hook exactly once,
//! detaches from the parent, and recursively destroys children.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::bag::StateBag;

const BAG_SCOPE_KEY: &str = "scope_key";

/// Services that want to be told when their scope releases them.
pub trait Scoped {
    fn on_unregister(&self);
}

/// Strategy for generating scope keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKeyStrategy {
    /// `scene #0`, `scene #1`, and so on; stable within one generator.
    Sequential,
    /// Random uuid-suffixed keys.
    Random,
}

/// Explicit scope-key source, owned by the navigation surface.
///
/// Replaces ambient global counters: the generator travels with the surface
/// and can be reset deterministically by tests.
pub struct ScopeKeyGenerator {
    strategy: ScopeKeyStrategy,
    counter: Cell<u64>,
}

impl ScopeKeyGenerator {
    pub fn new(strategy: ScopeKeyStrategy) -> Self {
        Self {
            strategy,
            counter: Cell::new(0),
        }
    }

    pub fn next_key(&self, hint: Option<&str>) -> String {
        match self.strategy {
            ScopeKeyStrategy::Sequential => {
                let n = self.counter.get();
                self.counter.set(n + 1);
                match hint {
                    Some(hint) => format!("{hint} #{n}"),
                    None => format!("scene #{n}"),
                }
            }
            ScopeKeyStrategy::Random => match hint {
                Some(hint) => format!("{hint}_{}", uuid::Uuid::new_v4()),
                None => format!("scene_{}", uuid::Uuid::new_v4()),
            },
        }
    }

    pub fn reset(&self) {
        self.counter.set(0);
    }
}

impl Default for ScopeKeyGenerator {
    fn default() -> Self {
        Self::new(ScopeKeyStrategy::Sequential)
    }
}

struct ServiceEntry {
    value: Rc<dyn Any>,
    unregister_hook: Option<Rc<dyn Scoped>>,
}

/// One node of the scope tree. Cheap to clone; all handles share the node.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

struct ScopeInner {
    key: String,
    parent: Weak<ScopeInner>,
    children: RefCell<HashMap<String, Scope>>,
    services: RefCell<HashMap<String, ServiceEntry>>,
    destroyed: Cell<bool>,
}

impl Scope {
    /// Creates a root scope with no parent.
    pub fn root(key: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                key: key.into(),
                parent: Weak::new(),
                children: RefCell::new(HashMap::new()),
                services: RefCell::new(HashMap::new()),
                destroyed: Cell::new(false),
            }),
        }
    }

    /// Builds (or rebinds, during restore) a child scope.
    ///
    /// When `saved` carries a scope key the child keeps that key, so services
    /// registered against it before a teardown find the same scope after a
    /// restore.
    pub fn build_child_scope(
        &self,
        hint: Option<&str>,
        saved: Option<&StateBag>,
        generator: &ScopeKeyGenerator,
    ) -> Scope {
        let key = saved
            .and_then(|bag| bag.get_string(BAG_SCOPE_KEY))
            .map(str::to_owned)
            .unwrap_or_else(|| generator.next_key(hint));

        if let Some(existing) = self.inner.children.borrow().get(&key) {
            return existing.clone();
        }
        let child = Scope {
            inner: Rc::new(ScopeInner {
                key: key.clone(),
                parent: Rc::downgrade(&self.inner),
                children: RefCell::new(HashMap::new()),
                services: RefCell::new(HashMap::new()),
                destroyed: Cell::new(false),
            }),
        };
        self.inner.children.borrow_mut().insert(key, child.clone());
        child
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Registers a plain service under `key`.
    pub fn register<T: Any>(&self, key: impl Into<String>, service: Rc<T>) {
        self.inner.services.borrow_mut().insert(
            key.into(),
            ServiceEntry {
                value: service,
                unregister_hook: None,
            },
        );
    }

    /// Registers a service whose `on_unregister` hook fires when it leaves
    /// the scope (explicit unregister or scope destruction).
    pub fn register_scoped<T: Any + Scoped>(&self, key: impl Into<String>, service: Rc<T>) {
        self.inner.services.borrow_mut().insert(
            key.into(),
            ServiceEntry {
                value: service.clone(),
                unregister_hook: Some(service),
            },
        );
    }

    pub fn unregister(&self, key: &str) {
        let entry = self.inner.services.borrow_mut().remove(key);
        if let Some(entry) = entry {
            if let Some(hook) = entry.unregister_hook {
                hook.on_unregister();
            }
        }
    }

    pub fn has_service_in_my_scope(&self, key: &str) -> bool {
        self.inner.services.borrow().contains_key(key)
    }

    /// Looks `key` up in this scope, falling back to ancestors.
    pub fn get_service<T: Any>(&self, key: &str) -> Option<Rc<T>> {
        if let Some(entry) = self.inner.services.borrow().get(key) {
            return entry.value.clone().downcast::<T>().ok();
        }
        self.inner
            .parent
            .upgrade()
            .map(|parent| Scope { inner: parent })
            .and_then(|parent| parent.get_service::<T>(key))
    }

    pub fn save_to_bag(&self, bag: &mut StateBag) {
        bag.put_string(BAG_SCOPE_KEY, self.inner.key.clone());
    }

    /// Tears the scope down: detaches from the parent, fires every unregister
    /// hook exactly once, and recursively destroys children.
    pub fn destroy(&self) {
        if self.inner.destroyed.replace(true) {
            return;
        }
        if let Some(parent) = self.inner.parent.upgrade() {
            parent.children.borrow_mut().remove(&self.inner.key);
        }

        let services = std::mem::take(&mut *self.inner.services.borrow_mut());
        for entry in services.into_values() {
            if let Some(hook) = entry.unregister_hook {
                hook.on_unregister();
            }
        }

        let children = std::mem::take(&mut *self.inner.children.borrow_mut());
        for child in children.into_values() {
            child.destroy();
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    #[cfg(test)]
    fn child_count(&self) -> usize {
        self.inner.children.borrow().len()
    }
}
