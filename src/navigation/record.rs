use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::animation::AnimationExecutor;
use crate::bag::StateBag;
use crate::host::HostStatusRecord;
use crate::scene::SceneHandle;

pub(crate) type RecordRef = Rc<RefCell<Record>>;

/// One back-stack entry. Owns its scene for the record's lifetime.
pub struct Record {
    pub(crate) scene: SceneHandle,
    pub(crate) tag: String,
    pub(crate) translucent: bool,
    pub(crate) hidden: bool,
    pub(crate) scene_type: Option<String>,
    pub(crate) push_animation: Option<Rc<dyn AnimationExecutor>>,
    pub(crate) saved_state: Option<StateBag>,
    pub(crate) host_status: Option<HostStatusRecord>,
}

impl Record {
    pub(crate) fn new(
        scene: SceneHandle,
        tag: String,
        translucent: bool,
        scene_type: Option<String>,
        push_animation: Option<Rc<dyn AnimationExecutor>>,
    ) -> RecordRef {
        Rc::new(RefCell::new(Record {
            scene,
            tag,
            translucent,
            hidden: false,
            scene_type,
            push_animation,
            saved_state: None,
            host_status: None,
        }))
    }

    pub fn scene(&self) -> SceneHandle {
        self.scene.clone()
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is_translucent(&self) -> bool {
        self.translucent
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }
}

/// Serializable form of a record, written on save and rebuilt through the
/// scene factory on restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SavedRecord {
    pub tag: String,
    pub translucent: bool,
    pub hidden: bool,
    pub scene_type: String,
    pub scene_state: StateBag,
    #[serde(default)]
    pub host_status: Option<HostStatusRecord>,
}
