use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use log::info;

use stagehand::animation::DeferredAnimationExecutor;
use stagehand::host::{HostWindow, NavigationHost};
use stagehand::view::{RootViewFinder, View, ViewFinder, ViewIdGenerator};
use stagehand::{
    PopOptions, PushOptions, SceneController, SceneFactory, SceneHandle, SceneLifecycleManager,
    StateBag,
};

/// Drives a demo navigation stack through a full host lifecycle.
#[derive(Parser)]
#[command(name = "stagehand", version, about)]
struct Cli {
    /// How many detail scenes to push on top of the root
    #[arg(long, default_value_t = 3)]
    depth: usize,

    /// Complete transitions on a later pump instead of synchronously
    #[arg(long)]
    animated: bool,
}

struct DemoHost {
    window: HostWindow,
    finished: Cell<bool>,
}

impl NavigationHost for DemoHost {
    fn finish_host(&self) {
        self.finished.set(true);
    }

    fn window(&self) -> Option<HostWindow> {
        Some(self.window.clone())
    }
}

#[derive(Default)]
struct DemoController {
    label: String,
}

impl SceneController for DemoController {
    fn on_create(&mut self, scene: &SceneHandle, _saved: Option<&StateBag>) {
        if self.label.is_empty() {
            self.label = scene
                .arguments()
                .and_then(|args| args.get_string("label").map(str::to_owned))
                .unwrap_or_else(|| "scene".to_owned());
        }
    }

    fn on_create_view(&mut self, _scene: &SceneHandle, _saved: Option<&StateBag>) -> View {
        View::new()
    }

    fn on_resume(&mut self, _scene: &SceneHandle) {
        info!("`{}` is now in the foreground", self.label);
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let factory = Rc::new(SceneFactory::new());
    factory.register_default::<DemoController>("demo")?;

    let host = Rc::new(DemoHost {
        window: HostWindow::new(),
        finished: Cell::new(false),
    });

    let navigator = Rc::new(
        stagehand::Navigator::builder("demo")
            .support_restore(false)
            .build(factory, host.clone())?,
    );
    let lifecycle = SceneLifecycleManager::new(navigator.clone());

    if cli.animated {
        let executor = DeferredAnimationExecutor::new(navigator.queue(), Duration::from_millis(16));
        navigator.set_default_animation(Some(Rc::new(executor)));
    }

    // the host's view tree: one container, resolved through a finder the way
    // a real window would hand it over
    let ids = ViewIdGenerator::new();
    let container_id = ids.generate();
    let finder = RootViewFinder::new(vec![View::with_id(container_id)]);
    let container = finder
        .find_container(container_id)
        .expect("the demo container was just registered");

    // host brings the surface up
    lifecycle.on_activity_created(container, None)?;
    lifecycle.on_start()?;
    lifecycle.on_resume()?;

    for index in 1..=cli.depth {
        let mut arguments = StateBag::new();
        arguments.put_string("label", format!("detail {index}"));
        navigator.push_with_options(
            "demo",
            PushOptions::builder()
                .tag(format!("detail-{index}"))
                .arguments(arguments)
                .build(),
        )?;
        navigator.run_until_idle()?;
    }
    info!("stack size after pushes: {}", navigator.stack_size());

    if cli.depth > 0 {
        navigator.pop_count(cli.depth, PopOptions::default())?;
        navigator.run_until_idle()?;
    }
    info!(
        "stack size after popping back: {}, at root: {}",
        navigator.stack_size(),
        navigator.is_at_root()
    );

    // popping the root signals the host instead of emptying the stack
    navigator.pop()?;
    navigator.run_until_idle()?;
    info!("host finished: {}", host.finished.get());

    lifecycle.on_pause()?;
    lifecycle.on_stop()?;
    lifecycle.on_destroy_view()?;
    Ok(())
}
