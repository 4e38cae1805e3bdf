//! Scene navigation stack with lifecycle management for view-based UIs.
//!
//! A *scene* is a navigable UI unit with its own lifecycle and view. Scenes
//! live on a back stack owned by a [`navigation::Navigator`]; pushes, pops,
//! and removals are serialized through a single-threaded message queue, and
//! the host drives the whole surface through a
//! [`lifecycle::SceneLifecycleManager`].
//!
//! The core is deliberately single-threaded: handles are `Rc`-based and
//! `!Send`, so every lifecycle dispatch and stack mutation happens on the one
//! logical thread that pumps the queue.

pub mod animation;
pub mod bag;
pub mod error;
pub mod factory;
pub mod host;
pub mod lifecycle;
pub mod navigation;
pub mod observer;
pub mod queue;
pub mod scene;
pub mod scope;
pub mod state;
pub mod view;

pub use bag::StateBag;
pub use error::{NavigationError, Result};
pub use factory::SceneFactory;
pub use lifecycle::SceneLifecycleManager;
pub use navigation::{Navigator, NavigatorBuilder, PopOptions, PushOptions};
pub use scene::{SceneController, SceneHandle};
pub use state::State;
