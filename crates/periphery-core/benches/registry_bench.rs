//! Criterion benchmarks for name resolution, dispatch and rendering.
//!
//! Builds a chain of nested module blocks and measures the cost of reaching
//! a field at increasing depth.
//!
//! Run with: `cargo bench -p periphery-core`
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use periphery_core::{
    Child, FieldKind, FieldList, ListRef, OwnerKind, ParamOwner, Setter, Shared, Storage, find,
    render_to_string, set_param, shared,
};

const DEPTHS: &[usize] = &[1, 4, 16];

struct Stage {
    gain: f64,
    delay: f64,
    next: Option<ListRef>,
}

impl ParamOwner for Stage {
    const KIND: OwnerKind = OwnerKind::Module;
}

fn stage_list(stage: &Shared<Stage>) -> ListRef {
    let mut list = FieldList::create(stage.clone(), 3).unwrap().unwrap();
    list.define(
        0,
        "GAIN",
        "Stage gain.",
        FieldKind::Float,
        Storage::Float(|s| s.gain),
        Setter::Float(|s, v| {
            s.gain = v;
            Ok(())
        }),
    )
    .unwrap();
    list.define(
        1,
        "DELAY",
        "Stage delay.",
        FieldKind::Float,
        Storage::Float(|s| s.delay),
        Setter::Float(|s, v| {
            s.delay = v;
            Ok(())
        }),
    )
    .unwrap();
    list.define(
        2,
        "NEXT",
        "Following stage.",
        FieldKind::Module,
        Storage::Child(|s| s.next.clone().map(Child::List)),
        Setter::Handle,
    )
    .unwrap();
    list.into_ref()
}

/// Chain of `depth` stages; only the innermost carries a `TAIL` field.
fn chain(depth: usize) -> ListRef {
    struct Tail {
        level: f64,
    }
    impl ParamOwner for Tail {
        const KIND: OwnerKind = OwnerKind::Module;
    }
    let tail = shared(Tail { level: 0.0 });
    let mut list = FieldList::create(tail, 1).unwrap().unwrap();
    list.define(
        0,
        "TAIL",
        "Innermost level.",
        FieldKind::Float,
        Storage::Float(|t| t.level),
        Setter::Float(|t, v| {
            t.level = v;
            Ok(())
        }),
    )
    .unwrap();
    let mut next = list.into_ref();
    for _ in 0..depth {
        let stage = shared(Stage {
            gain: 1.0,
            delay: 0.0,
            next: Some(next),
        });
        next = stage_list(&stage);
    }
    next
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    for &depth in DEPTHS {
        let root = chain(depth);
        group.bench_with_input(BenchmarkId::new("deepest", depth), &depth, |b, _| {
            b.iter(|| black_box(find(&root, black_box("tail")).unwrap()));
        });
    }
    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    for &depth in DEPTHS {
        let root = chain(depth);
        group.bench_with_input(BenchmarkId::new("set_param", depth), &depth, |b, _| {
            b.iter(|| set_param(&root, black_box("TAIL"), black_box("-12.5")).unwrap());
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let root = chain(16);
    c.bench_function("render/depth_16", |b| {
        b.iter(|| black_box(render_to_string(&root).unwrap()));
    });
}

criterion_group!(benches, bench_resolve, bench_dispatch, bench_render);
criterion_main!(benches);
