//! Benchmarks for event delivery
//!
//! These benchmarks measure the hot paths of the core: recycling pool slots,
//! routing button presses up deep window trees, and coalescing pointer
//! position records.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use hearth_core::config::Config;
use hearth_core::event::{EventMask, EventType};
use hearth_core::pool::{EventPool, EventQueue};
use hearth_core::state::{Buttons, Geometry, Modifiers};
use hearth_core::window::WindowClass;
use hearth_core::{EventCore, WindowId};

/// Core with a chain of `depth` nested windows under the root and one client
/// selecting `mask` on the outermost window.
fn nested_core(depth: u32, mask: EventMask) -> EventCore {
    let mut core = EventCore::new(Config::default());
    let client = core.connect_client("bench");
    let mut parent = core.windows.root();
    let mut outermost: Option<WindowId> = None;
    for _ in 0..depth {
        let wid = core
            .create_window(parent, Geometry::new(1, 1, 600, 400), WindowClass::InputOutput, None)
            .unwrap();
        core.map_window(wid).unwrap();
        outermost.get_or_insert(wid);
        parent = wid;
    }
    core.select_events(outermost.unwrap(), client, mask).unwrap();
    core
}

fn pool_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool");

    group.bench_function("allocate_release", |b| {
        let mut pool = EventPool::new(None, 64);
        let mut queue = EventQueue::new();
        b.iter(|| {
            let handle = pool.allocate(&mut queue, None).unwrap();
            black_box(handle);
            black_box(pool.pop_front(&mut queue))
        });
    });

    group.bench_function("fill_and_drain_64", |b| {
        let mut pool = EventPool::new(None, 64);
        let mut queue = EventQueue::new();
        b.iter(|| {
            for _ in 0..64 {
                pool.allocate(&mut queue, None).unwrap();
            }
            pool.drain(&mut queue);
            black_box(pool.free_len())
        });
    });

    group.finish();
}

fn button_routing_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("button_routing");

    for depth in [1u32, 8, 32] {
        group.bench_with_input(BenchmarkId::new("press_release", depth), &depth, |b, &depth| {
            let mut core = nested_core(depth, EventMask::BUTTON_DOWN | EventMask::BUTTON_UP);
            let client = core.clients().next().unwrap().id;
            b.iter(|| {
                core.handle_pointer_status(black_box(50), black_box(50), Buttons::LEFT);
                core.handle_pointer_status(50, 50, Buttons::empty());
                while core.next_event(client).is_some() {}
            });
        });
    }

    group.finish();
}

fn motion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("motion");

    group.bench_function("coalesce_position", |b| {
        let mut core = nested_core(4, EventMask::MOUSE_POSITION);
        let mut x = 10;
        b.iter(|| {
            // Alternate so every call is a real move.
            x = if x == 10 { 11 } else { 10 };
            core.handle_pointer_status(black_box(x), 10, Buttons::empty());
        });
        black_box(core.pool().len());
    });

    group.bench_function("deliver_motion_unselected", |b| {
        let mut core = nested_core(16, EventMask::EXPOSURE);
        b.iter(|| {
            core.deliver_motion(EventType::MouseMotion, Buttons::empty(), Modifiers::empty());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    pool_benchmark,
    button_routing_benchmark,
    motion_benchmark
);
criterion_main!(benches);
