// Copyright 2025 the Declutter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geographic positions and grow-only bounds.

/// A geographic position in degrees.
///
/// Positions are immutable once a marker is created; only their projection
/// to screen space changes with the view.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LatLng {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl LatLng {
    /// Create a position from latitude and longitude.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// The minimal geographic rectangle covering a set of positions.
///
/// Bounds only ever grow: removing a marker does not shrink its group's
/// bounds, and only clearing the group resets them.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeoBounds {
    south: f64,
    west: f64,
    north: f64,
    east: f64,
}

impl GeoBounds {
    /// Degenerate bounds covering a single position.
    pub const fn of(pos: LatLng) -> Self {
        Self {
            south: pos.lat,
            west: pos.lng,
            north: pos.lat,
            east: pos.lng,
        }
    }

    /// Grow the bounds to cover `pos`.
    pub fn extend(&mut self, pos: LatLng) {
        self.south = self.south.min(pos.lat);
        self.west = self.west.min(pos.lng);
        self.north = self.north.max(pos.lat);
        self.east = self.east.max(pos.lng);
    }

    /// Whether `pos` lies inside the bounds (edges inclusive).
    pub fn contains(&self, pos: LatLng) -> bool {
        self.south <= pos.lat
            && pos.lat <= self.north
            && self.west <= pos.lng
            && pos.lng <= self.east
    }

    /// The south-west corner.
    pub const fn south_west(&self) -> LatLng {
        LatLng::new(self.south, self.west)
    }

    /// The north-east corner.
    pub const fn north_east(&self) -> LatLng {
        LatLng::new(self.north, self.east)
    }
}
