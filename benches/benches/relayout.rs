// Copyright 2025 the Declutter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Relayout throughput over marker grids: full recompute plus the greedy
//! inflation pass, and the raw pairwise predicate for reference.

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use declutter_collision::may_obstruct;
use declutter_markers::{
    BaseMarker, GroupId, GroupOptions, LatLng, MarkerField, NoIcons, Projector,
};
use kurbo::{Point, Size, Vec2};

struct ZoomView {
    scale: f64,
}

impl Projector for ZoomView {
    fn project(&self, pos: LatLng) -> Point {
        Point::new(pos.lng * self.scale, pos.lat * self.scale)
    }
}

/// An n x n grid of markers, 30 degrees apart, attached at 1:1 zoom.
fn grid_field(n: usize) -> (MarkerField<ZoomView, NoIcons>, GroupId) {
    let mut field = MarkerField::new();
    let group = field.add_group(GroupOptions::new(NoIcons));
    for y in 0..n {
        for x in 0..n {
            let pos = LatLng::new(y as f64 * 30.0, x as f64 * 30.0);
            field.add_marker(group, BaseMarker::new(pos, Size::new(20.0, 20.0)));
        }
    }
    field.attach(group, ZoomView { scale: 1.0 });
    (field, group)
}

fn bench_view_changed(c: &mut Criterion) {
    let mut g = c.benchmark_group("view_changed");
    for n in [10_usize, 20, 30] {
        let markers = n * n;
        g.throughput(Throughput::Elements(markers as u64));
        // A crowded zoom: every 2x2 neighborhood collides.
        g.bench_function(format!("crowded_{markers}"), |b| {
            let (mut field, group) = grid_field(n);
            b.iter(|| {
                let batch = field.view_changed(group, ZoomView { scale: 0.4 });
                black_box(batch.len());
                let batch = field.view_changed(group, ZoomView { scale: 1.0 });
                black_box(batch.len());
            });
        });
    }
    g.finish();
}

fn bench_predicate(c: &mut Criterion) {
    let size = Size::new(20.0, 20.0);
    let clearance = Vec2::new(2.0, 2.0);
    c.bench_function("may_obstruct", |b| {
        b.iter(|| {
            let mut hits = 0_u32;
            for i in 0..1000 {
                let delta = Vec2::new(black_box(i as f64 * 0.05), 3.0);
                if may_obstruct(delta, size, size, clearance) {
                    hits += 1;
                }
            }
            black_box(hits)
        });
    });
}

criterion_group!(benches, bench_view_changed, bench_predicate);
criterion_main!(benches);
