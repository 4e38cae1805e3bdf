use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::animation::AnimationExecutor;
use crate::bag::StateBag;
use crate::error::{NavigationError, Result};

/// Upper bound on waiting for an exit animation before the final page of a
/// pop is destroyed anyway.
pub const SCENE_DESTROY_MAX_TIMEOUT: Duration = Duration::from_secs(10);

/// Surface-wide configuration, fixed at setup and carried through restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigatorOptions {
    pub root_scene_type: String,
    #[serde(default)]
    pub root_scene_arguments: Option<StateBag>,
    #[serde(default)]
    pub use_post_in_lifecycle: bool,
    #[serde(default)]
    pub only_restore_visible_scene: bool,
    /// 0.0 disables recycling; otherwise the fraction of invisible scenes
    /// whose views are torn down under memory pressure.
    #[serde(default)]
    pub auto_recycle_invisible_scenes_threshold: f32,
}

impl NavigatorOptions {
    pub fn new(root_scene_type: impl Into<String>) -> Self {
        Self {
            root_scene_type: root_scene_type.into(),
            root_scene_arguments: None,
            use_post_in_lifecycle: false,
            only_restore_visible_scene: false,
            auto_recycle_invisible_scenes_threshold: 0.0,
        }
    }

    pub fn to_bag(&self) -> Result<StateBag> {
        let value = serde_json::to_value(self)
            .map_err(|e| NavigationError::CorruptSavedState(e.to_string()))?;
        serde_json::from_value(value)
            .map_err(|e| NavigationError::CorruptSavedState(e.to_string()))
    }

    pub fn from_bag(bag: &StateBag) -> Result<Self> {
        let value = serde_json::to_value(bag)
            .map_err(|e| NavigationError::CorruptSavedState(e.to_string()))?;
        serde_json::from_value(value)
            .map_err(|e| NavigationError::CorruptSavedState(e.to_string()))
    }
}

/// Per-push options. Snapshotted into the record at push time.
#[derive(Clone, Default)]
pub struct PushOptions {
    /// Tag for the new record; generated when absent. Must be unique in the
    /// stack at any instant.
    pub tag: Option<String>,
    /// Translucent records keep the record beneath them resumed.
    pub translucent: bool,
    /// Defer execution to the next pump of the message loop.
    pub use_post: bool,
    /// Factory key recorded for restore-by-name.
    pub scene_type: Option<String>,
    /// Argument bag handed to the new scene before attach.
    pub arguments: Option<StateBag>,
    /// Overrides the surface's default animation executor for this push.
    pub animation: Option<Rc<dyn AnimationExecutor>>,
}

impl PushOptions {
    pub fn builder() -> PushOptionsBuilder {
        PushOptionsBuilder {
            options: PushOptions::default(),
        }
    }
}

pub struct PushOptionsBuilder {
    options: PushOptions,
}

impl PushOptionsBuilder {
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.options.tag = Some(tag.into());
        self
    }

    pub fn translucent(mut self, translucent: bool) -> Self {
        self.options.translucent = translucent;
        self
    }

    pub fn use_post(mut self, use_post: bool) -> Self {
        self.options.use_post = use_post;
        self
    }

    pub fn scene_type(mut self, scene_type: impl Into<String>) -> Self {
        self.options.scene_type = Some(scene_type.into());
        self
    }

    pub fn arguments(mut self, arguments: StateBag) -> Self {
        self.options.arguments = Some(arguments);
        self
    }

    pub fn animation(mut self, animation: Rc<dyn AnimationExecutor>) -> Self {
        self.options.animation = Some(animation);
        self
    }

    pub fn build(self) -> PushOptions {
        self.options
    }
}

/// Per-pop options.
#[derive(Clone, Default)]
pub struct PopOptions {
    /// Defer execution to the next pump of the message loop.
    pub use_post: bool,
    /// Split the destroy phase: interior pages die immediately, the exiting
    /// page only once the animation signals fire or the time limit passes.
    pub use_idle_when_stop: bool,
    /// Overrides the surface's default animation executor for this pop.
    pub animation: Option<Rc<dyn AnimationExecutor>>,
    /// Overrides [`SCENE_DESTROY_MAX_TIMEOUT`] for the idle destroy phase.
    pub destroy_timeout: Option<Duration>,
}

impl PopOptions {
    pub fn builder() -> PopOptionsBuilder {
        PopOptionsBuilder {
            options: PopOptions::default(),
        }
    }
}

pub struct PopOptionsBuilder {
    options: PopOptions,
}

impl PopOptionsBuilder {
    pub fn use_post(mut self, use_post: bool) -> Self {
        self.options.use_post = use_post;
        self
    }

    pub fn use_idle_when_stop(mut self, use_idle: bool) -> Self {
        self.options.use_idle_when_stop = use_idle;
        self
    }

    pub fn animation(mut self, animation: Rc<dyn AnimationExecutor>) -> Self {
        self.options.animation = Some(animation);
        self
    }

    pub fn destroy_timeout(mut self, timeout: Duration) -> Self {
        self.options.destroy_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> PopOptions {
        self.options
    }
}
