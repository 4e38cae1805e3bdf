use serde::{Deserialize, Serialize};

/// Lifecycle state of a scene or of the navigation surface itself.
///
/// States are strictly ordered; the derived `Ord` follows declaration order,
/// so `State::Started < State::Resumed` holds and comparisons like
/// "a scene is never above its surface" can be written directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum State {
    /// Not created, or already destroyed.
    None,
    /// Logically created, no view yet (only reachable with separated creation).
    Created,
    /// View exists but the host surface has not finished its own creation.
    ViewCreated,
    /// Fully created and attached to a created host.
    ActivityCreated,
    /// Visible but not in the foreground.
    Started,
    /// Foreground, receiving input.
    Resumed,
}

impl State {
    pub fn name(&self) -> &'static str {
        match self {
            State::None => "NONE",
            State::Created => "CREATED",
            State::ViewCreated => "VIEW_CREATED",
            State::ActivityCreated => "ACTIVITY_CREATED",
            State::Started => "STARTED",
            State::Resumed => "RESUMED",
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
