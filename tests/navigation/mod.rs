pub mod restore;
pub mod stack;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::Result;

use stagehand::host::{HostWindow, NavigationHost};
use stagehand::view::View;
use stagehand::{
    Navigator, NavigatorBuilder, PushOptions, SceneController, SceneFactory, SceneHandle,
    SceneLifecycleManager, StateBag,
};

pub type EventLog = Rc<RefCell<Vec<String>>>;

pub fn new_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn log_entries(log: &EventLog) -> Vec<String> {
    log.borrow().clone()
}

pub fn clear_log(log: &EventLog) {
    log.borrow_mut().clear();
}

/// Index of the first entry equal to `needle`, panicking with the full log on
/// a miss so ordering failures are readable.
pub fn index_of(log: &EventLog, needle: &str) -> usize {
    let entries = log.borrow();
    entries
        .iter()
        .position(|entry| entry == needle)
        .unwrap_or_else(|| panic!("`{needle}` not found in {entries:?}"))
}

pub struct TestHost {
    pub finished: Cell<bool>,
    pub support_restore: bool,
    pub window: HostWindow,
}

impl TestHost {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            finished: Cell::new(false),
            support_restore: false,
            window: HostWindow::new(),
        })
    }

    pub fn with_restore() -> Rc<Self> {
        Rc::new(Self {
            finished: Cell::new(false),
            support_restore: true,
            window: HostWindow::new(),
        })
    }
}

impl NavigationHost for TestHost {
    fn is_support_restore(&self) -> bool {
        self.support_restore
    }

    fn finish_host(&self) {
        self.finished.set(true);
    }

    fn window(&self) -> Option<HostWindow> {
        Some(self.window.clone())
    }
}

/// Controller that appends `label:hook` lines to the shared log. The label
/// comes from the constructor, the argument bag, or the restored state bag,
/// in that priority order.
pub struct LogController {
    label: String,
    log: EventLog,
}

impl LogController {
    pub fn new(label: impl Into<String>, log: EventLog) -> Box<Self> {
        Box::new(Self {
            label: label.into(),
            log,
        })
    }

    fn record(&self, hook: &str) {
        self.log.borrow_mut().push(format!("{}:{hook}", self.label));
    }
}

impl SceneController for LogController {
    fn on_create(&mut self, scene: &SceneHandle, saved: Option<&StateBag>) {
        if self.label.is_empty() {
            if let Some(label) = scene
                .arguments()
                .and_then(|args| args.get_string("label").map(str::to_owned))
            {
                self.label = label;
            } else {
                self.label = "scene".to_owned();
            }
        }
        if saved.is_some() {
            self.record("on_create[restored]");
        } else {
            self.record("on_create");
        }
    }

    fn on_create_view(&mut self, _scene: &SceneHandle, _saved: Option<&StateBag>) -> View {
        self.record("on_create_view");
        View::new()
    }

    fn on_view_created(&mut self, _scene: &SceneHandle, _saved: Option<&StateBag>) {
        self.record("on_view_created");
    }

    fn on_activity_created(&mut self, _scene: &SceneHandle, _saved: Option<&StateBag>) {
        self.record("on_activity_created");
    }

    fn on_start(&mut self, _scene: &SceneHandle) {
        self.record("on_start");
    }

    fn on_resume(&mut self, _scene: &SceneHandle) {
        self.record("on_resume");
    }

    fn on_pause(&mut self, _scene: &SceneHandle) {
        self.record("on_pause");
    }

    fn on_stop(&mut self, _scene: &SceneHandle) {
        self.record("on_stop");
    }

    fn on_destroy_view(&mut self, _scene: &SceneHandle) {
        self.record("on_destroy_view");
    }

    fn on_destroy(&mut self, _scene: &SceneHandle) {
        self.record("on_destroy");
    }

    fn on_save_instance_state(&mut self, _scene: &SceneHandle, out: &mut StateBag) {
        self.record("on_save_instance_state");
        out.put_string("label", self.label.clone());
    }

    fn on_configuration_changed(&mut self, _scene: &SceneHandle, _config: &StateBag) {
        self.record("on_configuration_changed");
    }
}

/// Registers the two controller types every test uses: `root` with a fixed
/// label, `scene` labelled through its argument bag.
pub fn factory_with(log: &EventLog) -> Rc<SceneFactory> {
    let factory = Rc::new(SceneFactory::new());
    let root_log = log.clone();
    factory
        .register("root", move |_| Ok(LogController::new("root", root_log.clone())))
        .unwrap();
    let scene_log = log.clone();
    factory
        .register("scene", move |_| Ok(LogController::new("", scene_log.clone())))
        .unwrap();
    factory
}

pub struct Harness {
    pub navigator: Rc<Navigator>,
    pub lifecycle: SceneLifecycleManager,
    pub host: Rc<TestHost>,
    pub container: View,
    pub log: EventLog,
}

/// Surface brought up to RESUMED with one `root` record on the stack.
pub fn resumed_harness() -> Result<Harness> {
    resumed_harness_with(TestHost::new(), |builder| builder)
}

pub fn resumed_harness_with(
    host: Rc<TestHost>,
    configure: impl FnOnce(NavigatorBuilder) -> NavigatorBuilder,
) -> Result<Harness> {
    let log = new_log();
    let factory = factory_with(&log);
    let navigator = Rc::new(configure(Navigator::builder("root")).build(factory, host.clone())?);
    let lifecycle = SceneLifecycleManager::new(navigator.clone());
    let container = View::new();
    lifecycle.on_activity_created(container.clone(), None)?;
    lifecycle.on_start()?;
    lifecycle.on_resume()?;
    Ok(Harness {
        navigator,
        lifecycle,
        host,
        container,
        log,
    })
}

/// Pushes a `scene` record labelled and tagged `tag`.
pub fn push_labeled(navigator: &Navigator, tag: &str, translucent: bool) -> Result<()> {
    let mut arguments = StateBag::new();
    arguments.put_string("label", tag);
    navigator.push_with_options(
        "scene",
        PushOptions::builder()
            .tag(tag)
            .translucent(translucent)
            .arguments(arguments)
            .build(),
    )?;
    Ok(())
}
