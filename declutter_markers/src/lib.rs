// Copyright 2025 the Declutter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Declutter Markers: inflatable map-marker groups.
//!
//! Every marker in a group is either *inflated* (its full-size, detailed
//! visual) or *deflated* (a compact icon), and the group guarantees that no
//! two inflated markers visually overlap. Markers keep their geographic
//! place; the map stays readable because contested markers shrink instead
//! of moving or clustering.
//!
//! - A pairwise obstruction graph records which markers would overlap if
//!   both were inflated at current screen positions (within a configurable
//!   clearance margin).
//! - A greedy selection inflates as many markers as possible, visiting them
//!   in insertion order: earlier-inserted markers win contention. The
//!   result is maximal, not maximum, by design.
//! - The graph is rebuilt whenever screen-space positions may have shifted
//!   (view changes, attachment, group linking) and patched incrementally on
//!   individual adds and removals.
//! - Groups can be linked so their markers obstruct across group
//!   boundaries.
//!
//! ## Where this fits
//!
//! The engine owns state and policy only. The host map supplies a
//! [`Projector`] snapshot (geographic position → container pixels) and
//! receives [`RedrawBatch`]es naming exactly the markers whose visual state
//! changed; a per-group [`IconFactory`] supplies deflated visuals on
//! demand. Wiring gestures (a right-click calling [`MarkerField::toggle`]),
//! panes, and actual drawing is host-adapter territory with no algorithmic
//! content.
//!
//! ## API overview
//!
//! - [`MarkerField`]: owner of all groups, markers, and the obstruction
//!   graph; every operation is addressed by id.
//! - [`GroupId`] / [`MarkerId`]: generational handles.
//! - [`BaseMarker`]: the caller-supplied inflated-visual descriptor.
//! - [`GroupOptions`] / [`ZBands`]: clearance, pane, layering bands, and
//!   the icon factory.
//! - [`RedrawBatch`] / [`RedrawRequest`]: flushed visual changes.
//!
//! Key operations: [`MarkerField::add_marker`],
//! [`MarkerField::attach`] / [`MarkerField::view_changed`],
//! [`MarkerField::inflate_as_many_as_possible`], [`MarkerField::toggle`],
//! [`MarkerField::link`].
//!
//! ## Example
//!
//! ```
//! use declutter_markers::{BaseMarker, GroupOptions, LatLng, MarkerField, NoIcons, Projector};
//! use kurbo::{Point, Size};
//!
//! // A toy projection: one degree is one pixel.
//! struct FlatView;
//!
//! impl Projector for FlatView {
//!     fn project(&self, pos: LatLng) -> Point {
//!         Point::new(pos.lng, pos.lat)
//!     }
//! }
//!
//! let mut field = MarkerField::new();
//! let group = field.add_group(GroupOptions::new(NoIcons));
//!
//! let size = Size::new(20.0, 20.0);
//! let a = field.add_marker(group, BaseMarker::new(LatLng::new(0.0, 0.0), size));
//! let b = field.add_marker(group, BaseMarker::new(LatLng::new(0.0, 5.0), size));
//!
//! // Attaching lays the group out: the markers are 5px apart, so only the
//! // earlier-inserted one stays inflated.
//! let batch = field.attach(group, FlatView);
//! assert!(field.is_inflated(a));
//! assert!(!field.is_inflated(b));
//! assert_eq!(batch.len(), 2, "both markers need an initial draw");
//!
//! // A user toggle forces the contested marker up and its neighbor down.
//! field.toggle(b);
//! assert!(field.is_inflated(b));
//! assert!(!field.is_inflated(a));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod field;
mod geo;
mod group;
mod marker;
mod redraw;
mod surface;

pub use field::MarkerField;
pub use geo::{GeoBounds, LatLng};
pub use group::{GroupId, GroupOptions, ZBands};
pub use marker::{BaseMarker, DisplayState, MarkerId};
pub use redraw::{RedrawBatch, RedrawRequest};
pub use surface::{IconFactory, NoIcons, Projector};
