//! Counter and todo list rendered into an in-memory host, driven by the std
//! runtime. Run with `RUST_LOG=debug` to watch passes and commits.

use std::time::Duration;

use fiber_core::{
    build, fragment, leaf, BuildError, Child, Component, EffectCleanup, Element, Event, Hooks,
    NodeId, PropValue, Props, RenderError, RenderRoot,
};
use fiber_runtime_std::{drive_until_idle, StdRuntime};
use fiber_testing::RecordingHost;

const TURN_BUDGET: Duration = Duration::from_micros(200);
const MAX_TURNS: usize = 1_000;

fn counter(hooks: &mut Hooks, props: &Props) -> Result<Element, BuildError> {
    let step = props.get("step").and_then(PropValue::as_int).unwrap_or(1);
    let (count, set_count) = hooks.use_state(|| 0i64);

    hooks.use_effect(Some(vec![PropValue::from(count)]), move || {
        log::info!("counter is now {count}");
        EffectCleanup::none()
    });

    let increment = set_count.clone();
    let reset = set_count;
    build(
        "div",
        Props::new().with("class", "counter"),
        [
            build("span", Props::new().with("id", "count"), [Child::from(count)])?,
            build(
                "button",
                Props::new()
                    .with("id", "increment")
                    .on("onClick", move |_| increment.update(move |c| c + step)),
                ["+"],
            )?,
            build(
                "button",
                Props::new().with("id", "reset").on("onClick", move |_| reset.set(0)),
                ["reset"],
            )?,
        ],
    )
}

fn todo_list(hooks: &mut Hooks, _props: &Props) -> Result<Element, BuildError> {
    let (items, set_items) = hooks.use_state(Vec::<String>::new);

    let add = set_items.clone();
    let entries = items
        .iter()
        .map(|item| build("li", Props::new(), [item.as_str()]))
        .collect::<Result<Vec<_>, _>>()?;
    fragment([
        build(
            "input",
            Props::new().with("id", "new-todo").on("onSubmit", move |event: &Event| {
                if let Some(text) = event.value.as_ref().and_then(PropValue::as_str) {
                    let text = text.to_owned();
                    add.update(move |items| {
                        let mut next = items.clone();
                        next.push(text);
                        next
                    });
                }
            }),
            Vec::<Child>::new(),
        )?,
        build("ul", Props::new(), entries)?,
    ])
}

fn app() -> Result<Element, BuildError> {
    let counter = leaf(Component::new("Counter", counter), Props::new().with("step", 2));
    let todos = leaf(Component::new("TodoList", todo_list), Props::new());
    build("main", Props::new(), [counter, todos])
}

fn click(root: &RenderRoot<RecordingHost>, container: NodeId, id: &str) {
    match root.backend().find_by_attribute(container, "id", &PropValue::from(id)) {
        Some(node) => {
            root.backend().dispatch(node, &Event::new("click"));
        }
        None => log::warn!("no element with id {id}"),
    }
}

fn submit(root: &RenderRoot<RecordingHost>, container: NodeId, text: &str) {
    if let Some(node) = root
        .backend()
        .find_by_attribute(container, "id", &PropValue::from("new-todo"))
    {
        root.backend()
            .dispatch(node, &Event::new("submit").with_value(text));
    }
}

fn settle(root: &mut RenderRoot<RecordingHost>, runtime: &StdRuntime) -> Result<(), RenderError> {
    let summary = drive_until_idle(root, runtime, TURN_BUDGET, MAX_TURNS)?;
    log::debug!(
        "settled after {} turns and {} commits",
        summary.turns,
        summary.commits.len()
    );
    Ok(())
}

fn main() -> Result<(), RenderError> {
    env_logger::init();

    let runtime = StdRuntime::new();
    let (host, container) = RecordingHost::with_container("body");
    let mut root = RenderRoot::with_runtime(host, runtime.runtime());

    root.render(app()?, container)?;
    settle(&mut root, &runtime)?;

    click(&root, container, "increment");
    click(&root, container, "increment");
    settle(&mut root, &runtime)?;

    submit(&root, container, "write docs");
    submit(&root, container, "ship it");
    settle(&mut root, &runtime)?;

    click(&root, container, "reset");
    settle(&mut root, &runtime)?;

    println!("{}", root.backend().dump_tree(container));
    println!("{}", root.dump_fibers());
    Ok(())
}
