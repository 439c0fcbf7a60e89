//! Scheduling properties of cyclic tasks, driven by a manual clock.

use c32_blocks::RecordingSink;
use c32_core::{Clock, EntityId, EntityKind, Handle, ManualClock, TaskId};
use c32_runtime::{CyclicTask, Graph, TickContext};
use proptest::prelude::*;

fn task_id() -> TaskId {
    TaskId::from_handle(Handle::new(EntityKind::Task, 3, 1)).unwrap()
}

fn tick(task: &mut CyclicTask, clock: &ManualClock, graph: &mut Graph) -> u64 {
    let mut acks = Vec::new();
    let ctx = TickContext {
        id: task_id(),
        clock,
        graph,
        acks: &mut acks,
    };
    task.tick(ctx, None::<&mut RecordingSink>)
}

#[test]
fn tasks_started_apart_share_a_grid() {
    let mut a = CyclicTask::new(50, 20, 4).unwrap();
    let mut b = CyclicTask::new(50, 20, 4).unwrap();
    a.start(1_003_000);
    b.start(7_481_000);
    assert_eq!(a.next_update_us() % 50_000, 20_000);
    assert_eq!(b.next_update_us() % 50_000, 20_000);
}

#[test]
fn missed_intervals_are_not_replayed() {
    let clock = ManualClock::new(0);
    let mut graph = Graph::new();
    let mut task = CyclicTask::new(10, 0, 4).unwrap();
    task.start(0);
    tick(&mut task, &clock, &mut graph);

    clock.advance_ms(1_000);
    let next = tick(&mut task, &clock, &mut graph);
    assert_eq!(task.stats().run_count, 2);
    assert_eq!(task.stats().drift_us, 990_000);
    assert_eq!(next, 1_010_000);

    // nothing more is due until the next grid point
    tick(&mut task, &clock, &mut graph);
    assert_eq!(task.stats().run_count, 2);
}

proptest! {
    #[test]
    fn start_lands_on_grid_not_in_past(
        interval_ms in 1u32..10_000,
        offset_frac in 0.0f64..1.0,
        now_us in 0u64..1_000_000_000_000,
    ) {
        let offset_ms = ((interval_ms as f64) * offset_frac) as u32 % interval_ms;
        let mut task = CyclicTask::new(interval_ms, offset_ms, 4).unwrap();
        task.start(now_us);
        let interval_us = u64::from(interval_ms) * 1000;
        let next = task.next_update_us();
        prop_assert!(next >= now_us);
        prop_assert!(next - now_us < interval_us + u64::from(offset_ms) * 1000);
        prop_assert_eq!(next % interval_us, u64::from(offset_ms) * 1000);
    }

    #[test]
    fn next_update_is_monotonic_and_in_future(
        interval_ms in 1u32..500,
        steps in prop::collection::vec(0u64..2_000_000, 1..40),
    ) {
        let clock = ManualClock::new(0);
        let mut graph = Graph::new();
        let mut task = CyclicTask::new(interval_ms, 0, 4).unwrap();
        task.start(0);
        let mut last = 0;
        for step in steps {
            clock.advance_us(step);
            let next = tick(&mut task, &clock, &mut graph);
            prop_assert!(next >= last);
            prop_assert!(next > clock.now_us());
            last = next;
        }
    }

    #[test]
    fn late_tick_fires_exactly_once(
        interval_ms in 1u32..1_000,
        missed in 1u64..1_000,
        extra_us in 0u64..1_000,
    ) {
        let clock = ManualClock::new(0);
        let mut graph = Graph::new();
        let mut task = CyclicTask::new(interval_ms, 0, 4).unwrap();
        task.start(0);
        tick(&mut task, &clock, &mut graph);

        let interval_us = u64::from(interval_ms) * 1000;
        let extra_us = extra_us % interval_us;
        clock.set_us(interval_us * missed + extra_us);
        let next = tick(&mut task, &clock, &mut graph);

        prop_assert_eq!(task.stats().run_count, 2);
        prop_assert_eq!(u64::from(task.stats().drift_us), interval_us * (missed - 1) + extra_us);
        prop_assert!(next > clock.now_us());
    }
}
