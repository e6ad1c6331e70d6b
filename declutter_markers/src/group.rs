// Copyright 2025 the Declutter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Group records: configuration, layering bands, and membership state.

use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;
use kurbo::Vec2;

use crate::geo::GeoBounds;
use crate::marker::MarkerId;
use crate::surface::IconFactory;

/// Identifier for a group owned by a [`MarkerField`](crate::MarkerField).
///
/// Generational like [`MarkerId`](crate::MarkerId): stale handles never
/// alias a live group.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct GroupId(pub(crate) u32, pub(crate) u32);

impl GroupId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Layering bands used to force markers above or below their peers.
///
/// Scoped per group rather than process-wide, so independent groups can
/// coexist with different layering needs. Inflated markers always sit in
/// the `inflated` band; deflated markers sit at their saved baseline under
/// the default policy, or in the `deflated_prominent` band when the policy
/// is inverted to surface hidden markers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ZBands {
    /// Z-offset applied to inflated markers.
    pub inflated: i32,
    /// Z-offset applied to deflated markers while they are made prominent.
    pub deflated_prominent: i32,
}

impl Default for ZBands {
    fn default() -> Self {
        Self {
            inflated: 10_000,
            deflated_prominent: 20_000,
        }
    }
}

/// Configuration for one marker group.
pub struct GroupOptions<F> {
    /// Margin kept clear around an inflated marker, per axis, in screen
    /// pixels. Zero tolerates exact touching; negative values tolerate that
    /// much overlap between inflated markers.
    pub clearance: Vec2,
    /// The host pane the group's visuals are placed in.
    pub pane: String,
    /// Layering bands for this group.
    pub z_bands: ZBands,
    /// Factory for deflated icons.
    pub factory: F,
}

impl<F: IconFactory> GroupOptions<F> {
    /// Options with the default clearance, pane, and bands.
    pub fn new(factory: F) -> Self {
        Self {
            clearance: Vec2::new(2.0, 2.0),
            pane: String::from("markers"),
            z_bands: ZBands::default(),
            factory,
        }
    }
}

impl<F> core::fmt::Debug for GroupOptions<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GroupOptions")
            .field("clearance", &self.clearance)
            .field("pane", &self.pane)
            .field("z_bands", &self.z_bands)
            .finish_non_exhaustive()
    }
}

/// Arena record for one group.
pub(crate) struct Group<P, F> {
    pub(crate) generation: u32,
    pub(crate) options: GroupOptions<F>,
    /// Owned markers in insertion order; the order is the greedy selection's
    /// iteration order and therefore decides contention.
    pub(crate) members: Vec<MarkerId>,
    /// Minimal region covering all members; `None` iff the group is empty.
    pub(crate) bounds: Option<GeoBounds>,
    /// Whether inflated markers layer above deflated ones.
    pub(crate) inflated_above: bool,
    /// Set on the first attach; only `clear` resets it.
    pub(crate) ever_laid_out: bool,
    /// Projection snapshot while attached to a surface.
    pub(crate) surface: Option<P>,
    /// Groups whose markers participate in this group's obstruction scope.
    pub(crate) links: BTreeSet<GroupId>,
}

impl<P, F> Group<P, F> {
    pub(crate) fn new(generation: u32, options: GroupOptions<F>) -> Self {
        Self {
            generation,
            options,
            members: Vec::new(),
            bounds: None,
            inflated_above: true,
            ever_laid_out: false,
            surface: None,
            links: BTreeSet::new(),
        }
    }
}
