// Copyright 2025 the Declutter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Marker records: identity, display state, and layering transitions.

use kurbo::Size;

use crate::geo::LatLng;
use crate::group::{GroupId, ZBands};

/// Identifier for a marker owned by a [`MarkerField`](crate::MarkerField).
///
/// A small, copyable generational handle (slot index plus generation): on
/// removal the slot is freed, and reuse bumps the generation, so a stale
/// `MarkerId` never aliases a different live marker. Destructive and query
/// operations given a stale id are no-ops.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MarkerId(pub(crate) u32, pub(crate) u32);

impl MarkerId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// The binary visual state of a marker.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DisplayState {
    /// Full-size, detailed visual.
    Inflated,
    /// Compact, decluttered visual.
    Deflated,
}

/// The caller-supplied description of a marker's full-size visual.
///
/// The host keeps the actual renderable; the engine only needs its
/// geographic position, its inflated footprint in screen pixels, and its
/// baseline z-offset.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BaseMarker {
    /// Where the marker sits on the map.
    pub position: LatLng,
    /// Screen-space footprint of the inflated visual.
    pub inflated_size: Size,
    /// Baseline z-offset, restored when layering policy puts the marker back.
    pub z_offset: i32,
}

impl BaseMarker {
    /// Describe a marker with a zero baseline z-offset.
    pub const fn new(position: LatLng, inflated_size: Size) -> Self {
        Self {
            position,
            inflated_size,
            z_offset: 0,
        }
    }
}

bitflags::bitflags! {
    /// Per-marker state bits.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub(crate) struct MarkerFlags: u8 {
        /// The marker currently shows its full-size visual.
        const INFLATED   = 0b0000_0001;
        /// The marker's visual needs to be redrawn at the next flush.
        const ICON_DIRTY = 0b0000_0010;
    }
}

/// Arena record for one marker.
#[derive(Clone, Debug)]
pub(crate) struct Marker<I> {
    pub(crate) generation: u32,
    pub(crate) group: GroupId,
    pub(crate) position: LatLng,
    pub(crate) inflated_size: Size,
    pub(crate) z_offset: i32,
    pub(crate) saved_z_offset: i32,
    pub(crate) flags: MarkerFlags,
    /// Factory output, resolved on first request and kept for the marker's
    /// lifetime (the position never moves).
    pub(crate) deflated_icon: Option<I>,
}

impl<I> Marker<I> {
    pub(crate) fn new(generation: u32, group: GroupId, base: BaseMarker) -> Self {
        Self {
            generation,
            group,
            position: base.position,
            inflated_size: base.inflated_size,
            z_offset: base.z_offset,
            saved_z_offset: base.z_offset,
            // Every marker needs one initial draw.
            flags: MarkerFlags::ICON_DIRTY,
            deflated_icon: None,
        }
    }

    pub(crate) fn is_inflated(&self) -> bool {
        self.flags.contains(MarkerFlags::INFLATED)
    }

    pub(crate) fn display_state(&self) -> DisplayState {
        if self.is_inflated() {
            DisplayState::Inflated
        } else {
            DisplayState::Deflated
        }
    }

    /// Switch to the inflated state; no-op if already inflated.
    pub(crate) fn inflate(&mut self, bands: ZBands) {
        if self.is_inflated() {
            return;
        }
        self.bring_to_front(bands.inflated);
        self.flags.insert(MarkerFlags::INFLATED | MarkerFlags::ICON_DIRTY);
    }

    /// Switch to the deflated state; no-op if already deflated.
    ///
    /// Under the inflated-above policy the marker drops back to its saved
    /// baseline; with the policy inverted it rises into the
    /// deflated-prominent band so hidden markers can be inspected.
    pub(crate) fn deflate(&mut self, inflated_above: bool, bands: ZBands) {
        if !self.is_inflated() {
            return;
        }
        if inflated_above {
            self.bring_back_from_front();
        } else {
            self.bring_to_front(bands.deflated_prominent);
        }
        self.flags.remove(MarkerFlags::INFLATED);
        self.flags.insert(MarkerFlags::ICON_DIRTY);
    }

    /// Raise the marker into a layering band.
    pub(crate) fn bring_to_front(&mut self, offset: i32) {
        if self.z_offset != offset {
            self.z_offset = offset;
            self.flags.insert(MarkerFlags::ICON_DIRTY);
        }
    }

    /// Restore the saved baseline layering value.
    pub(crate) fn bring_back_from_front(&mut self) {
        if self.z_offset != self.saved_z_offset {
            self.z_offset = self.saved_z_offset;
            self.flags.insert(MarkerFlags::ICON_DIRTY);
        }
    }
}
