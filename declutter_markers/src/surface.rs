// Copyright 2025 the Declutter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Seams to the host rendering surface and its icon factory.
//!
//! The engine never draws. It consumes a projection snapshot while a group
//! is attached, asks the factory for deflated visuals on demand, and hands
//! redraw work back to the host as [`RedrawBatch`](crate::RedrawBatch)es.

use kurbo::Point;

use crate::geo::LatLng;
use crate::marker::MarkerId;

/// Screen-space projection for the current view.
///
/// Implemented by the host map surface; a value of this type is a snapshot
/// of one view state. Attach it with
/// [`MarkerField::attach`](crate::MarkerField::attach) and hand in a fresh
/// snapshot from [`MarkerField::view_changed`](crate::MarkerField::view_changed)
/// whenever the view (for example the zoom level) changes.
pub trait Projector {
    /// Project a geographic position to container-relative screen pixels.
    fn project(&self, pos: LatLng) -> Point;
}

/// Produces the compact visual shown while a marker is deflated.
///
/// One factory instance lives in each group's
/// [`GroupOptions`](crate::GroupOptions). The engine invokes it lazily, the
/// first time a marker's deflated icon is requested, and caches the result
/// for the marker's lifetime.
pub trait IconFactory {
    /// The host's renderable icon descriptor.
    type Icon;

    /// Build the deflated icon for one marker.
    fn deflated_icon(&mut self, marker: MarkerId, position: LatLng) -> Self::Icon;
}

/// A factory for hosts that style deflated markers without per-marker data.
///
/// All icons are `()`; use it when the host derives the deflated visual from
/// the [`RedrawRequest`](crate::RedrawRequest) alone.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoIcons;

impl IconFactory for NoIcons {
    type Icon = ();

    #[inline]
    fn deflated_icon(&mut self, _marker: MarkerId, _position: LatLng) -> Self::Icon {}
}
