// Copyright 2025 the Declutter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Two overlapping marker groups, before and after linking.
//!
//! Each group is conflict-free on its own, but their markers interleave on
//! screen. Linking the groups makes markers obstruct across the boundary,
//! and the linking side's insertion order settles who stays inflated.
//!
//! Run:
//! - `cargo run -p declutter_demos --example linked_groups`

use declutter_collision::may_obstruct;
use declutter_markers::{
    BaseMarker, GroupId, GroupOptions, LatLng, MarkerField, NoIcons, Projector,
};
use kurbo::{Point, Size, Vec2};

struct FlatView;

impl Projector for FlatView {
    fn project(&self, pos: LatLng) -> Point {
        Point::new(pos.lng, pos.lat)
    }
}

const ICON: Size = Size::new(20.0, 20.0);

fn main() {
    let mut field = MarkerField::new();
    let restaurants = field.add_group(GroupOptions::new(NoIcons));
    let hotels = field.add_group(GroupOptions::new(NoIcons));

    // 40px spacing within each group, offset by 8px against each other.
    for i in 0..6 {
        field.add_marker(
            restaurants,
            BaseMarker::new(LatLng::new(0.0, i as f64 * 40.0), ICON),
        );
        field.add_marker(
            hotels,
            BaseMarker::new(LatLng::new(0.0, 8.0 + i as f64 * 40.0), ICON),
        );
    }

    // Sanity-check one interleaved pair with the raw predicate.
    let clearance = Vec2::new(2.0, 2.0);
    println!(
        "8px apart, 20x20 icons, (2,2) clearance -> obstructs: {}\n",
        may_obstruct(Vec2::new(8.0, 0.0), ICON, ICON, clearance)
    );

    field.attach(restaurants, FlatView);
    field.attach(hotels, FlatView);
    print_groups("unlinked", &field, restaurants, hotels);

    let batch = field.link(restaurants, hotels);
    println!("link flushed {} redraws", batch.len());
    print_groups("linked", &field, restaurants, hotels);

    let batch = field.unlink(restaurants, hotels);
    println!("unlink flushed {} redraws", batch.len());
    print_groups("unlinked again", &field, restaurants, hotels);
}

fn print_groups(
    label: &str,
    field: &MarkerField<FlatView, NoIcons>,
    restaurants: GroupId,
    hotels: GroupId,
) {
    let row = |g: GroupId| -> String {
        field
            .markers_of(g)
            .map(|m| if field.is_inflated(m) { 'O' } else { '.' })
            .collect()
    };
    println!("== {label}");
    println!("  restaurants: {}", row(restaurants));
    println!("  hotels:      {}", row(hotels));
    println!();
}
