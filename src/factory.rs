//! Scene construction
//!
//! Restore-by-name without reflection: hosts register a constructor closure
//! per type key up front, and the navigator calls through the registry when
//! it needs a fresh controller (first creation or state restore). A push can
//! still hand over a pre-built controller and bypass the registry entirely.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::bag::StateBag;
use crate::error::{NavigationError, Result};
use crate::scene::SceneController;

type ConstructorError = Box<dyn std::error::Error + Send + Sync>;

type Constructor =
    Box<dyn Fn(Option<&StateBag>) -> std::result::Result<Box<dyn SceneController>, ConstructorError>>;

/// Registry mapping type keys to validated zero-argument constructors.
#[derive(Default)]
pub struct SceneFactory {
    constructors: RefCell<HashMap<String, Constructor>>,
}

impl SceneFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor for `type_key`. Later registrations replace
    /// earlier ones, mirroring a class-map update.
    pub fn register<F>(&self, type_key: impl Into<String>, constructor: F) -> Result<()>
    where
        F: Fn(Option<&StateBag>) -> std::result::Result<Box<dyn SceneController>, ConstructorError>
            + 'static,
    {
        let type_key = type_key.into();
        if type_key.is_empty() {
            return Err(NavigationError::MissingArgument("type key"));
        }
        self.constructors
            .borrow_mut()
            .insert(type_key, Box::new(constructor));
        Ok(())
    }

    /// Convenience registration for controllers with a `Default` constructor,
    /// the moral equivalent of requiring a public no-arg constructor.
    pub fn register_default<C>(&self, type_key: impl Into<String>) -> Result<()>
    where
        C: SceneController + Default,
    {
        self.register(type_key, |_| Ok(Box::new(C::default())))
    }

    pub fn is_registered(&self, type_key: &str) -> bool {
        self.constructors.borrow().contains_key(type_key)
    }

    /// Builds a controller. Called at most once per logical scene creation.
    pub fn instantiate(
        &self,
        type_key: &str,
        arguments: Option<&StateBag>,
    ) -> Result<Box<dyn SceneController>> {
        let constructors = self.constructors.borrow();
        let constructor =
            constructors
                .get(type_key)
                .ok_or_else(|| NavigationError::Instantiation {
                    type_key: type_key.to_owned(),
                    source: None,
                })?;
        constructor(arguments).map_err(|source| NavigationError::Instantiation {
            type_key: type_key.to_owned(),
            source: Some(source),
        })
    }
}
