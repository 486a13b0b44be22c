//! Headless demo: drive a card's entrance animation and print the property
//! bags the engine pushes to its render target.

use std::cell::Cell;
use std::rc::Rc;

use anyhow::Result;
use motive_core::HeadlessHost;
use motive_graph::{
    HostHandle, InterpolationConfig, ParallelConfig, PropertyBag, PropsNode, RenderTarget,
    SpringConfig, StyleNode, TimingConfig, TransformNode, Value, VectorValue, delay, parallel,
    sequence, spring, timing,
};

/// Render target that logs what it is asked to apply.
struct ConsoleElement {
    name: &'static str,
    applied: Cell<usize>,
}

impl RenderTarget for ConsoleElement {
    fn try_apply_props(&self, props: &PropertyBag) -> bool {
        let count = self.applied.get() + 1;
        self.applied.set(count);
        // One line every few frames keeps the trace readable.
        if count % 8 == 1 {
            println!("[{}] apply #{count}: {props:?}", self.name);
        }
        true
    }

    fn request_render(&self) {
        println!("[{}] full re-render requested", self.name);
    }
}

fn main() -> Result<()> {
    let host = HeadlessHost::new();
    let handle: HostHandle = host.clone();

    // A card slides in from the left, fading and rotating in as it comes.
    let opacity = Value::new(0.0);
    let position = VectorValue::new(-120.0, 0.0);

    let angle = opacity.interpolate(InterpolationConfig::patterns(
        vec![0.0, 1.0],
        ["-90deg", "0deg"],
    ))?;

    let transform = TransformNode::builder()
        .translate_x(position.x())
        .translate_y(position.y())
        .rotate(&angle)
        .build();
    let style = StyleNode::builder()
        .node("opacity", &opacity)
        .transform(&transform)
        .build();
    let props = PropsNode::builder()
        .style(&style)
        .literal("test_id", "card")
        .build();

    let card = Rc::new(ConsoleElement {
        name: "card",
        applied: Cell::new(0),
    });
    props.connect(card.clone());

    let entrance = sequence(vec![
        delay(&handle, 48.0),
        parallel(
            vec![
                Some(spring(
                    &handle,
                    position.x(),
                    SpringConfig::to(0.0).with_bounciness_speed(10.0, 14.0),
                )),
                Some(timing(
                    &handle,
                    &opacity,
                    TimingConfig::to(1.0).with_duration(400.0),
                )),
            ],
            ParallelConfig {
                stop_together: false,
            },
        ),
    ]);

    let done = Rc::new(Cell::new(false));
    let done_flag = done.clone();
    entrance.start(Some(Box::new(move |result| {
        println!("entrance ended, finished: {}", result.finished);
        done_flag.set(true);
    })));

    let mut frames = 0;
    while !done.get() && frames < 2000 {
        host.step(16.0);
        frames += 1;
    }

    println!(
        "ran {frames} frames, {} applies, {} interaction handles outstanding",
        card.applied.get(),
        host.interactions().active_count()
    );
    println!(
        "resting state: opacity {}, x {}",
        opacity.get_value(),
        position.x().get_value()
    );
    Ok(())
}
