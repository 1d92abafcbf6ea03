//! Counter Example - State updates reconciled into an in-memory host
//!
//! This example demonstrates:
//! - Mounting a component tree into a MemoryHost container
//! - Scheduling state updates from keyboard input
//! - Committed effects and the resulting host tree after each cycle
//!
//! Keys: `+` / `-` change the count, `r` re-renders the root, `q` quits.
//!
//! Lives under demos/ rather than examples/: the top-level examples/ directory
//! of this checkout holds unrelated reference code, so Cargo.toml turns off
//! example autodiscovery and registers this file explicitly.
//!
//! Run with: RUST_LOG=debug cargo run --example counter

use std::io::{self, Write};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{self, ClearType},
};
use spark_fiber::{
    component_fn, prop_map, Children, CommitReport, ComponentId, ComponentRegistry, ComponentRuntime,
    Element, HostNodeId, MemoryHost, PropMap, Reconciler, Value,
};

fn counter_tree(registry: &mut ComponentRegistry) -> (ComponentId, Element) {
    let counter = registry.register(
        component_fn("Counter", |props, state| {
            let count = state.get("count").and_then(Value::as_int).unwrap_or(0);
            let title = props.get("title").cloned().unwrap_or_default();
            let items: Vec<Element> = (0..count.clamp(0, 5))
                .map(|i| Element::host("li", prop_map([("n", Value::from(i))]), Children::None))
                .collect();

            Ok(Element::host(
                "box",
                prop_map([("border", Value::from("rounded"))]),
                vec![
                    Element::host("text", prop_map([("content", title)]), Children::None),
                    Element::host(
                        "text",
                        prop_map([("content", Value::from(format!("Count: {count}")))]),
                        Children::None,
                    ),
                    Element::host("list", PropMap::new(), items),
                ],
            )
            .into())
        })
        .with_initial_state(prop_map([("count", Value::from(0))])),
    );
    let tree = Element::component(counter, prop_map([("title", Value::from("spark-fiber"))]), Children::None);
    (counter, tree)
}

fn draw(
    out: &mut impl Write,
    reconciler: &Reconciler<MemoryHost>,
    container: HostNodeId,
    commits: &[CommitReport],
) -> io::Result<()> {
    execute!(out, terminal::Clear(ClearType::All), cursor::MoveTo(0, 0))?;
    if let Some(snapshot) = reconciler.host().snapshot(container) {
        for line in snapshot.to_string().lines() {
            write!(out, "{line}\r\n")?;
        }
    }
    write!(out, "\r\n")?;
    for commit in commits {
        for effect in &commit.effects {
            write!(out, "  {:?} {:?}\r\n", effect.effect, effect.host_node)?;
        }
    }
    write!(out, "\r\n[+/-] count  [r] re-render  [q] quit\r\n")?;
    out.flush()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut host = MemoryHost::new();
    let container = host.create_container("terminal");
    let mut registry = ComponentRegistry::new();
    let (counter, tree) = counter_tree(&mut registry);
    let mut reconciler = Reconciler::new(host, registry);

    reconciler.render(tree.clone(), container);
    let mut commits = reconciler.flush()?;
    reconciler.host_mut().take_ops();

    let mut stdout = io::stdout();
    terminal::enable_raw_mode()?;
    let result = (|| -> Result<(), Box<dyn std::error::Error>> {
        loop {
            draw(&mut stdout, &reconciler, container, &commits)?;

            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }

            let Some(&instance) = reconciler.runtime().instances_of(counter).first() else {
                break;
            };
            let count = reconciler
                .runtime()
                .state(instance)
                .and_then(|state| state.get("count"))
                .and_then(Value::as_int)
                .unwrap_or(0);

            match key.code {
                KeyCode::Char('+') => {
                    reconciler.schedule_update(instance, prop_map([("count", Value::from(count + 1))]))
                }
                KeyCode::Char('-') => {
                    reconciler.schedule_update(instance, prop_map([("count", Value::from(count - 1))]))
                }
                KeyCode::Char('r') => reconciler.render(tree.clone(), container),
                KeyCode::Char('q') | KeyCode::Esc => break,
                _ => continue,
            }
            commits = reconciler.flush()?;
            let ops = reconciler.host_mut().take_ops();
            log::debug!("{} host ops this cycle", ops.len());
        }
        Ok(())
    })();
    terminal::disable_raw_mode()?;
    result
}
