// Copyright 2025 the Declutter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A marker row across zoom levels, drawn as ASCII.
//!
//! Builds one group of markers along a line, attaches it at a wide zoom,
//! then zooms out step by step and prints which markers stay inflated
//! (`O`) and which deflate (`.`) as screen space gets scarcer.
//!
//! Run:
//! - `cargo run -p declutter_demos --example declutter_basics`

use declutter_markers::{
    BaseMarker, GroupOptions, LatLng, MarkerField, MarkerId, NoIcons, Projector, RedrawBatch,
};
use kurbo::{Point, Size};

/// Equirectangular-ish projection: degrees scaled by a zoom factor.
struct ZoomView {
    scale: f64,
}

impl Projector for ZoomView {
    fn project(&self, pos: LatLng) -> Point {
        Point::new(pos.lng * self.scale, pos.lat * self.scale)
    }
}

fn main() {
    let mut field = MarkerField::new();
    let group = field.add_group(GroupOptions::new(NoIcons));

    // Eleven markers, 30 "degrees" apart, all with 20x20 inflated icons.
    let ids: Vec<MarkerId> = (0..11)
        .map(|i| {
            let base = BaseMarker::new(LatLng::new(0.0, i as f64 * 30.0), Size::new(20.0, 20.0));
            field.add_marker(group, base)
        })
        .collect();

    let batch = field.attach(group, ZoomView { scale: 1.0 });
    report("attach @ zoom 1.0", &field, &ids, &batch);

    for scale in [0.5, 0.25, 0.1] {
        let batch = field.view_changed(group, ZoomView { scale });
        report(&format!("zoom {scale}"), &field, &ids, &batch);
    }

    // A user right-clicks a deflated marker: it inflates and shoves its
    // neighbors down, whatever the zoom.
    let victim = ids[5];
    let batch = field.toggle(victim);
    report("toggle marker 5", &field, &ids, &batch);

    let batch = field.view_changed(group, ZoomView { scale: 1.0 });
    report("back to zoom 1.0", &field, &ids, &batch);
}

fn report(
    label: &str,
    field: &MarkerField<ZoomView, NoIcons>,
    ids: &[MarkerId],
    batch: &RedrawBatch,
) {
    let row: String = ids
        .iter()
        .map(|&m| if field.is_inflated(m) { 'O' } else { '.' })
        .collect();
    let inflated = ids.iter().filter(|&&m| field.is_inflated(m)).count();
    println!("{label:>18}:  {row}  ({inflated} inflated, {} redraws)", batch.len());
}
