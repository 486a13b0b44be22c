//! Integration tests across the graph, drivers, and operators, driven on
//! the deterministic headless host.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use motive_core::{HeadlessHost, Host};

use crate::compose::{ParallelConfig, delay, parallel, sequence, stagger};
use crate::composite::{PropsNode, RenderTarget, StyleNode};
use crate::drivers::{
    DecayConfig, SpringConfig, TimingConfig, TimingVecConfig, decay, spring, timing, timing_vec,
};
use crate::easing::EasingFunction;
use crate::types::{EndResult, HostHandle, PropertyBag, Vec2};
use crate::value::Value;
use crate::vector::VectorValue;

const FRAME_MS: f64 = 16.0;

fn host() -> (Rc<HeadlessHost>, HostHandle) {
    let host = HeadlessHost::new();
    let handle: HostHandle = host.clone();
    (host, handle)
}

fn capture() -> (Rc<RefCell<Vec<EndResult>>>, Box<dyn FnMut(EndResult)>) {
    let seen: Rc<RefCell<Vec<EndResult>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    (seen, Box::new(move |result| sink.borrow_mut().push(result)))
}

#[test]
fn test_timing_reaches_exact_destination() {
    let (host, handle) = host();
    let value = Value::new(0.0);

    let (seen, on_end) = capture();
    timing(
        &handle,
        &value,
        TimingConfig::to(100.0)
            .with_duration(160.0)
            .with_easing(EasingFunction::Linear),
    )
    .start(Some(on_end));

    host.run_until_idle(FRAME_MS, 1000);
    assert_eq!(value.get_value(), 100.0);
    assert_eq!(*seen.borrow(), vec![EndResult::FINISHED]);
    assert!(!value.is_animating());
}

#[test]
fn test_timing_progress_is_eased() {
    let (host, handle) = host();
    let value = Value::new(0.0);

    timing(
        &handle,
        &value,
        TimingConfig::to(128.0)
            .with_duration(128.0)
            .with_easing(EasingFunction::Linear),
    )
    .start(None);

    host.step(FRAME_MS);
    assert_eq!(value.get_value(), 16.0);
    host.step(FRAME_MS);
    assert_eq!(value.get_value(), 32.0);
}

#[test]
fn test_zero_duration_timing_finishes_synchronously() {
    let (host, handle) = host();
    let value = Value::new(0.0);

    let updates = Rc::new(Cell::new(0u32));
    let updates2 = updates.clone();
    value.add_listener(move |_| updates2.set(updates2.get() + 1));

    let (seen, on_end) = capture();
    timing(&handle, &value, TimingConfig::to(42.0).with_duration(0.0)).start(Some(on_end));

    // Before any frame runs: one update, already finished.
    assert_eq!(value.get_value(), 42.0);
    assert_eq!(updates.get(), 1);
    assert_eq!(*seen.borrow(), vec![EndResult::FINISHED]);
    assert_eq!(host.pending_frames(), 0);
}

#[test]
fn test_spring_at_rest_finishes_on_first_evaluation() {
    let (host, handle) = host();
    let value = Value::new(7.0);

    let (seen, on_end) = capture();
    spring(&handle, &value, SpringConfig::to(7.0)).start(Some(on_end));

    assert_eq!(*seen.borrow(), vec![EndResult::FINISHED]);
    assert_eq!(value.get_value(), 7.0);
    assert_eq!(host.pending_frames(), 0);
}

#[test]
fn test_spring_settles_exactly_at_destination() {
    let (host, handle) = host();
    let value = Value::new(0.0);

    let (seen, on_end) = capture();
    spring(&handle, &value, SpringConfig::to(100.0)).start(Some(on_end));

    host.run_until_idle(FRAME_MS, 100_000);
    assert_eq!(value.get_value(), 100.0);
    assert_eq!(*seen.borrow(), vec![EndResult::FINISHED]);
}

#[test]
fn test_decay_coasts_to_rest() {
    let (host, handle) = host();
    let value = Value::new(0.0);

    let (seen, on_end) = capture();
    decay(&handle, &value, DecayConfig::with_velocity(0.5)).start(Some(on_end));

    host.run_until_idle(FRAME_MS, 100_000);
    let resting = value.get_value();
    assert!(resting > 0.0);
    assert!(resting < 0.5 / (1.0 - 0.998));
    assert_eq!(*seen.borrow(), vec![EndResult::FINISHED]);
}

#[test]
fn test_set_value_cancels_running_driver() {
    let (host, handle) = host();
    let value = Value::new(0.0);

    let (seen, on_end) = capture();
    timing(&handle, &value, TimingConfig::to(100.0).with_duration(160.0)).start(Some(on_end));
    host.step(FRAME_MS);

    value.set_value(5.0);
    assert_eq!(*seen.borrow(), vec![EndResult::STOPPED]);
    assert_eq!(value.get_value(), 5.0);

    // The dead driver's pending frame is cancelled; nothing moves later.
    host.run_until_idle(FRAME_MS, 100);
    assert_eq!(value.get_value(), 5.0);
}

#[test]
fn test_replacement_stops_outgoing_driver_first() {
    let (host, handle) = host();
    let value = Value::new(0.0);

    let (first, first_end) = capture();
    timing(
        &handle,
        &value,
        TimingConfig::to(128.0)
            .with_duration(128.0)
            .with_easing(EasingFunction::Linear),
    )
    .start(Some(first_end));
    host.step(FRAME_MS);
    host.step(FRAME_MS);
    assert_eq!(value.get_value(), 32.0);

    let (second, second_end) = capture();
    timing(
        &handle,
        &value,
        TimingConfig::to(0.0)
            .with_duration(32.0)
            .with_easing(EasingFunction::Linear),
    )
    .start(Some(second_end));

    // The outgoing driver ended unfinished the moment the new one started.
    assert_eq!(*first.borrow(), vec![EndResult::STOPPED]);

    host.run_until_idle(FRAME_MS, 1000);
    assert_eq!(value.get_value(), 0.0);
    assert_eq!(*second.borrow(), vec![EndResult::FINISHED]);
}

#[test]
fn test_stop_fires_completion_exactly_once() {
    let (host, handle) = host();
    let value = Value::new(0.0);

    let (seen, on_end) = capture();
    let anim = timing(&handle, &value, TimingConfig::to(100.0).with_duration(160.0));
    anim.start(Some(on_end));
    host.step(FRAME_MS);

    anim.stop();
    anim.stop();
    value.stop_animation();

    assert_eq!(*seen.borrow(), vec![EndResult::STOPPED]);
}

#[test]
fn test_listener_may_stop_its_own_driver() {
    let (host, handle) = host();
    let value = Value::new(0.0);

    let probe = value.clone();
    value.add_listener(move |v| {
        if v >= 10.0 {
            probe.stop_animation();
        }
    });

    let (seen, on_end) = capture();
    timing(
        &handle,
        &value,
        TimingConfig::to(128.0)
            .with_duration(128.0)
            .with_easing(EasingFunction::Linear),
    )
    .start(Some(on_end));

    host.run_until_idle(FRAME_MS, 1000);
    assert_eq!(value.get_value(), 16.0);
    assert_eq!(*seen.borrow(), vec![EndResult::STOPPED]);
}

#[test]
fn test_sequence_chains_drivers() {
    let (host, handle) = host();
    let value = Value::new(0.0);

    let (seen, on_end) = capture();
    sequence(vec![
        timing(
            &handle,
            &value,
            TimingConfig::to(10.0)
                .with_duration(32.0)
                .with_easing(EasingFunction::Linear),
        ),
        timing(
            &handle,
            &value,
            TimingConfig::to(20.0)
                .with_duration(32.0)
                .with_easing(EasingFunction::Linear),
        ),
    ])
    .start(Some(on_end));

    host.run_until_idle(FRAME_MS, 1000);
    assert_eq!(value.get_value(), 20.0);
    assert_eq!(*seen.borrow(), vec![EndResult::FINISHED]);
}

#[test]
fn test_sequence_abort_skips_later_members() {
    let (host, handle) = host();
    let a = Value::new(0.0);
    let b = Value::new(0.0);

    let (seen, on_end) = capture();
    let seq = sequence(vec![
        timing(&handle, &a, TimingConfig::to(10.0).with_duration(160.0)),
        timing(&handle, &b, TimingConfig::to(10.0).with_duration(160.0)),
    ]);
    seq.start(Some(on_end));
    host.step(FRAME_MS);

    // First member ends unfinished; the second never starts.
    a.stop_animation();
    host.run_until_idle(FRAME_MS, 100);

    assert_eq!(seen.borrow().len(), 1);
    assert!(!seen.borrow()[0].finished);
    assert_eq!(b.get_value(), 0.0);
    assert!(!b.is_animating());
}

#[test]
fn test_parallel_stop_together_with_drivers() {
    let (host, handle) = host();
    let a = Value::new(0.0);
    let b = Value::new(0.0);

    let (seen, on_end) = capture();
    parallel(
        vec![
            Some(timing(&handle, &a, TimingConfig::to(10.0).with_duration(64.0))),
            Some(timing(&handle, &b, TimingConfig::to(10.0).with_duration(320.0))),
        ],
        ParallelConfig::default(),
    )
    .start(Some(on_end));
    host.step(FRAME_MS);

    // A ends unfinished, which takes B down with it.
    a.stop_animation();

    assert!(!b.is_animating());
    assert_eq!(seen.borrow().len(), 1);
    assert!(!seen.borrow()[0].finished);
}

#[test]
fn test_stagger_offsets_member_starts() {
    let (host, handle) = host();
    let values: Vec<Value> = (0..3).map(|_| Value::new(0.0)).collect();
    let first_change: Rc<RefCell<Vec<(usize, f64)>>> = Rc::new(RefCell::new(Vec::new()));

    for (index, value) in values.iter().enumerate() {
        let first_change = first_change.clone();
        let when = host.clone();
        let fired = Cell::new(false);
        value.add_listener(move |_| {
            if !fired.get() {
                fired.set(true);
                first_change.borrow_mut().push((index, when.now()));
            }
        });
    }

    let members = values
        .iter()
        .map(|value| {
            timing(
                &handle,
                value,
                TimingConfig::to(1.0)
                    .with_duration(80.0)
                    .with_easing(EasingFunction::Linear),
            )
        })
        .collect();

    let (seen, on_end) = capture();
    stagger(&handle, 100.0, members).start(Some(on_end));
    host.run_until_idle(FRAME_MS, 1000);

    let changes = first_change.borrow();
    assert_eq!(changes.len(), 3);
    let start_of = |index: usize| {
        changes
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, at)| *at)
            .unwrap()
    };
    assert!(start_of(1) >= 100.0);
    assert!(start_of(2) >= 200.0);
    assert!(start_of(1) >= start_of(0) + 100.0);
    assert!(start_of(2) >= start_of(0) + 200.0);
    assert_eq!(*seen.borrow(), vec![EndResult::FINISHED]);
}

#[test]
fn test_delay_waits_at_least_its_time() {
    let (host, handle) = host();

    let (seen, on_end) = capture();
    delay(&handle, 100.0).start(Some(on_end));

    let mut elapsed = 0.0;
    while seen.borrow().is_empty() {
        host.step(FRAME_MS);
        elapsed += FRAME_MS;
        assert!(elapsed <= 1000.0, "delay never completed");
    }
    assert!(elapsed >= 100.0);
    assert_eq!(*seen.borrow(), vec![EndResult::FINISHED]);
}

#[test]
fn test_interaction_handles_balance() {
    let (host, handle) = host();
    let a = Value::new(0.0);
    let b = Value::new(0.0);

    parallel(
        vec![
            Some(timing(&handle, &a, TimingConfig::to(1.0).with_duration(64.0))),
            Some(timing(&handle, &b, TimingConfig::to(1.0).with_duration(64.0))),
        ],
        ParallelConfig::default(),
    )
    .start(None);

    assert_eq!(host.interactions().active_count(), 2);
    host.run_until_idle(FRAME_MS, 1000);
    assert!(host.interactions().is_idle());
}

#[test]
fn test_delay_holds_no_interaction_handle() {
    let (host, handle) = host();
    delay(&handle, 50.0).start(None);
    assert!(host.interactions().is_idle());
    host.run_until_idle(FRAME_MS, 100);
}

#[test]
fn test_stopped_driver_releases_interaction_handle() {
    let (host, handle) = host();
    let value = Value::new(0.0);

    let anim = timing(&handle, &value, TimingConfig::to(1.0).with_duration(160.0));
    anim.start(None);
    assert_eq!(host.interactions().active_count(), 1);
    anim.stop();
    assert!(host.interactions().is_idle());
}

#[test]
fn test_tracking_follows_a_moving_source() {
    let (host, handle) = host();
    let source = Value::new(0.0);
    let target = Value::new(0.0);

    let (cycles, on_end) = capture();
    timing(
        &handle,
        &target,
        TimingConfig::to(&source)
            .with_duration(64.0)
            .with_easing(EasingFunction::Linear),
    )
    .start(Some(on_end));

    // Nothing runs until the source moves.
    assert!(!target.is_animating());

    source.set_value(100.0);
    assert!(target.is_animating());
    host.run_until_idle(FRAME_MS, 100);
    assert_eq!(target.get_value(), 100.0);
    assert_eq!(*cycles.borrow(), vec![EndResult::FINISHED]);

    // A second source move starts a fresh cycle toward the new value.
    source.set_value(40.0);
    host.run_until_idle(FRAME_MS, 100);
    assert_eq!(target.get_value(), 40.0);
    assert_eq!(cycles.borrow().len(), 2);
}

#[test]
fn test_retarget_mid_cycle_replaces_driver() {
    let (host, handle) = host();
    let source = Value::new(0.0);
    let target = Value::new(0.0);

    let (cycles, on_end) = capture();
    timing(
        &handle,
        &target,
        TimingConfig::to(&source)
            .with_duration(160.0)
            .with_easing(EasingFunction::Linear),
    )
    .start(Some(on_end));

    source.set_value(100.0);
    host.step(FRAME_MS);
    let mid_flight = target.get_value();
    assert!(mid_flight > 0.0 && mid_flight < 100.0);

    // Re-target mid-cycle: the first cycle's driver ends unfinished.
    source.set_value(-50.0);
    assert_eq!(*cycles.borrow(), vec![EndResult::STOPPED]);

    host.run_until_idle(FRAME_MS, 1000);
    assert_eq!(target.get_value(), -50.0);
    assert_eq!(cycles.borrow().len(), 2);
    assert!(cycles.borrow()[1].finished);
}

#[test]
fn test_stop_animation_tears_down_tracking() {
    let (host, handle) = host();
    let source = Value::new(0.0);
    let target = Value::new(0.0);

    timing(&handle, &target, TimingConfig::to(&source).with_duration(64.0)).start(None);
    target.stop_animation();

    source.set_value(100.0);
    host.run_until_idle(FRAME_MS, 100);
    assert_eq!(target.get_value(), 0.0);
}

#[test]
fn test_vector_fanout_animates_both_axes() {
    let (host, handle) = host();
    let point = VectorValue::new(0.0, 0.0);

    let (seen, on_end) = capture();
    timing_vec(
        &handle,
        &point,
        TimingVecConfig::to(Vec2::new(10.0, 20.0)).with_duration(64.0),
    )
    .start(Some(on_end));

    host.run_until_idle(FRAME_MS, 1000);
    assert_eq!(point.get_value(), Vec2::new(10.0, 20.0));
    assert_eq!(*seen.borrow(), vec![EndResult::FINISHED]);
}

#[test]
fn test_vector_axes_are_independent_on_stop() {
    let (host, handle) = host();
    let point = VectorValue::new(0.0, 0.0);

    timing_vec(
        &handle,
        &point,
        TimingVecConfig::to(Vec2::new(10.0, 20.0)).with_duration(320.0),
    )
    .start(None);
    host.step(FRAME_MS);

    // Stopping one axis must not take the other down: the fan-out runs
    // without stop_together.
    point.x().stop_animation();
    assert!(!point.x().is_animating());
    assert!(point.y().is_animating());

    host.run_until_idle(FRAME_MS, 1000);
    assert_eq!(point.y().get_value(), 20.0);
}

struct Probe {
    bags: RefCell<Vec<PropertyBag>>,
}

impl RenderTarget for Probe {
    fn try_apply_props(&self, props: &PropertyBag) -> bool {
        self.bags.borrow_mut().push(props.clone());
        true
    }

    fn request_render(&self) {}
}

#[test]
fn test_driver_updates_flow_to_render_target() {
    let (host, handle) = host();
    let opacity = Value::new(0.0);
    let style = StyleNode::builder().node("opacity", &opacity).build();
    let props = PropsNode::builder().style(&style).build();

    let probe = Rc::new(Probe {
        bags: RefCell::new(Vec::new()),
    });
    props.connect(probe.clone());

    timing(
        &handle,
        &opacity,
        TimingConfig::to(1.0)
            .with_duration(64.0)
            .with_easing(EasingFunction::Linear),
    )
    .start(None);
    host.run_until_idle(FRAME_MS, 1000);

    let bags = probe.bags.borrow();
    // Initial push on connect plus one per frame.
    assert!(bags.len() >= 4);
    let last_opacity = bags
        .last()
        .and_then(|bag| bag.get("style"))
        .and_then(|style| style.as_style())
        .and_then(|style| style.get("opacity"))
        .and_then(|value| value.as_number());
    assert_eq!(last_opacity, Some(1.0));
}

#[test]
fn test_spring_inherits_velocity_across_retarget() {
    let (host, handle) = host();
    let value = Value::new(0.0);

    spring(&handle, &value, SpringConfig::to(100.0)).start(None);
    for _ in 0..6 {
        host.step(FRAME_MS);
    }
    let mid_position = value.get_value();
    assert!(mid_position > 0.0);

    // Re-target mid-flight. The replacement takes over smoothly: its next
    // frame continues from the inherited position rather than jumping.
    spring(&handle, &value, SpringConfig::to(0.0)).start(None);
    assert_eq!(value.get_value(), mid_position);

    host.step(FRAME_MS);
    let after = value.get_value();
    // Momentum carries the value past the inherited position before the
    // new destination pulls it back.
    assert!(after > mid_position);

    host.run_until_idle(FRAME_MS, 100_000);
    assert_eq!(value.get_value(), 0.0);
}
