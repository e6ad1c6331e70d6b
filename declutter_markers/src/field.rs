// Copyright 2025 the Declutter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The marker field: arenas, obstruction bookkeeping, and selection.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use kurbo::Size;

use declutter_collision::{ObstructionGraph, may_obstruct};

use crate::geo::{GeoBounds, LatLng};
use crate::group::{Group, GroupId, GroupOptions};
use crate::marker::{BaseMarker, DisplayState, Marker, MarkerFlags, MarkerId};
use crate::redraw::{RedrawBatch, RedrawRequest};
use crate::surface::{IconFactory, Projector};

/// Owner of every marker group and the obstruction graph spanning them.
///
/// All state lives here, addressed by generational [`GroupId`]s and
/// [`MarkerId`]s; groups and markers never hold references into each other,
/// so linked groups and symmetric obstruction edges need no back-pointer
/// cycles. Operations are synchronous and run to completion; those that
/// flush pending visual changes return a [`RedrawBatch`] for the host to
/// repaint.
///
/// `P` is the host's [`Projector`] snapshot type, `F` its [`IconFactory`].
pub struct MarkerField<P, F: IconFactory> {
    groups: Vec<Option<Group<P, F>>>,
    free_groups: Vec<(usize, u32)>,
    markers: Vec<Option<Marker<F::Icon>>>,
    free_markers: Vec<(usize, u32)>,
    graph: ObstructionGraph<MarkerId>,
}

impl<P, F: IconFactory> core::fmt::Debug for MarkerField<P, F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let groups_alive = self.groups.iter().filter(|g| g.is_some()).count();
        let markers_alive = self.markers.iter().filter(|m| m.is_some()).count();
        f.debug_struct("MarkerField")
            .field("groups_alive", &groups_alive)
            .field("markers_alive", &markers_alive)
            .field("obstruction_edges", &self.graph.edge_count())
            .finish_non_exhaustive()
    }
}

impl<P: Projector, F: IconFactory> Default for MarkerField<P, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Projector, F: IconFactory> MarkerField<P, F> {
    /// Create an empty field.
    pub fn new() -> Self {
        Self {
            groups: Vec::new(),
            free_groups: Vec::new(),
            markers: Vec::new(),
            free_markers: Vec::new(),
            graph: ObstructionGraph::new(),
        }
    }

    // --- groups ---

    /// Create an empty, detached group.
    pub fn add_group(&mut self, options: GroupOptions<F>) -> GroupId {
        let (idx, generation) = if let Some((idx, prev)) = self.free_groups.pop() {
            let generation = prev + 1;
            self.groups[idx] = Some(Group::new(generation, options));
            (idx, generation)
        } else {
            self.groups.push(Some(Group::new(1, options)));
            (self.groups.len() - 1, 1)
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "GroupId uses 32-bit indices by design."
        )]
        GroupId::new(idx as u32, generation)
    }

    /// Remove a group, its markers, and its links. No-op on a stale id.
    pub fn remove_group(&mut self, g: GroupId) {
        if self.group_opt(g).is_none() {
            return;
        }
        self.clear_group(g);
        let partners: Vec<GroupId> = self.group(g).links.iter().copied().collect();
        for other in partners {
            if let Some(o) = self.group_opt_mut(other) {
                o.links.remove(&g);
            }
        }
        let generation = self.group(g).generation;
        self.groups[g.idx()] = None;
        self.free_groups.push((g.idx(), generation));
    }

    /// The number of live groups.
    pub fn group_count(&self) -> usize {
        self.groups.iter().filter(|g| g.is_some()).count()
    }

    /// The group's geographic bounds; `None` while it is empty or stale.
    ///
    /// Bounds only grow as markers are added; removal does not shrink them.
    pub fn group_bounds(&self, g: GroupId) -> Option<GeoBounds> {
        self.group_opt(g).and_then(|gr| gr.bounds)
    }

    /// Whether the group is currently attached to a surface.
    pub fn is_attached(&self, g: GroupId) -> bool {
        self.group_opt(g).is_some_and(|gr| gr.surface.is_some())
    }

    /// Whether inflated markers currently layer above deflated ones.
    pub fn inflated_above(&self, g: GroupId) -> bool {
        self.group_opt(g).is_none_or(|gr| gr.inflated_above)
    }

    /// The group's markers in insertion order.
    pub fn markers_of(&self, g: GroupId) -> impl Iterator<Item = MarkerId> + '_ {
        self.group_opt(g)
            .into_iter()
            .flat_map(|gr| gr.members.iter().copied())
    }

    /// The number of markers owned by the group.
    pub fn marker_count(&self, g: GroupId) -> usize {
        self.group_opt(g).map_or(0, |gr| gr.members.len())
    }

    /// Groups linked to `g`.
    pub fn linked_groups(&self, g: GroupId) -> impl Iterator<Item = GroupId> + '_ {
        self.group_opt(g)
            .into_iter()
            .flat_map(|gr| gr.links.iter().copied())
    }

    // --- membership ---

    /// Add a marker wrapping the caller's inflated visual.
    ///
    /// While the group is attached, obstruction edges are computed
    /// incrementally against the group's own markers (linked groups are only
    /// consulted by full recomputation): the new marker starts deflated iff
    /// an edge was found, and is inflated immediately otherwise. While
    /// detached there is no screen geometry, so the marker simply appears
    /// inflated until the first attach lays the group out.
    ///
    /// Panics on a dangling `GroupId`; that is a contract violation, unlike
    /// the removal of an already-removed marker.
    pub fn add_marker(&mut self, g: GroupId, base: BaseMarker) -> MarkerId {
        assert!(self.group_opt(g).is_some(), "dangling GroupId");
        debug_assert!(
            base.inflated_size.width >= 0.0 && base.inflated_size.height >= 0.0,
            "inflated footprint must be non-negative"
        );

        // Screen geometry of the existing members, while attached.
        let (clearance, target, neighbors) = {
            let group = self.group(g);
            let clearance = group.options.clearance;
            match group.surface.as_ref() {
                Some(surface) => {
                    let target = surface.project(base.position);
                    let mut neighbors = Vec::with_capacity(group.members.len());
                    for &m in &group.members {
                        let mk = self.marker(m);
                        neighbors.push((m, surface.project(mk.position), mk.inflated_size));
                    }
                    (clearance, Some(target), neighbors)
                }
                None => (clearance, None, Vec::new()),
            }
        };

        let id = self.alloc_marker(g, base);
        let mut inhibited = false;
        if let Some(target) = target {
            for (m, pt, size) in neighbors {
                if may_obstruct(target - pt, base.inflated_size, size, clearance) {
                    self.graph.link(id, m);
                    inhibited = true;
                }
            }
        }

        {
            let group = self.group_mut(g);
            group.members.push(id);
            match group.bounds.as_mut() {
                Some(b) => b.extend(base.position),
                None => group.bounds = Some(GeoBounds::of(base.position)),
            }
        }

        if !inhibited {
            self.inflate_marker(id);
        }
        let (inflated_above, bands) = {
            let group = self.group(g);
            (group.inflated_above, group.options.z_bands)
        };
        if !inflated_above && !self.marker(id).is_inflated() {
            self.marker_mut(id).bring_to_front(bands.deflated_prominent);
        }
        id
    }

    /// Remove a marker, clearing its obstruction edges symmetrically.
    ///
    /// No-op on a stale id. The owning group's bounds are not shrunk.
    pub fn remove_marker(&mut self, m: MarkerId) {
        let Some(g) = self.marker_opt(m).map(|mk| mk.group) else {
            return;
        };
        self.graph.clear_node(m);
        if let Some(group) = self.group_opt_mut(g) {
            group.members.retain(|&x| x != m);
        }
        self.free_marker(m);
    }

    /// Drop all of the group's markers and reset it for a fresh layout.
    ///
    /// Bounds become undefined again, and the next attach runs the
    /// deterministic `reset = true` inflation pass as if the group had never
    /// been displayed.
    pub fn clear_group(&mut self, g: GroupId) {
        let Some(group) = self.group_opt_mut(g) else {
            return;
        };
        let members = core::mem::take(&mut group.members);
        group.bounds = None;
        group.ever_laid_out = false;
        for m in members {
            self.graph.clear_node(m);
            self.free_marker(m);
        }
    }

    /// Whether `m` is a live marker owned by `g`.
    pub fn contains_marker(&self, g: GroupId, m: MarkerId) -> bool {
        self.marker_opt(m).is_some_and(|mk| mk.group == g)
    }

    // --- obstruction bookkeeping ---

    /// Rebuild the obstruction edges of the group's markers from scratch.
    ///
    /// Every owned marker's edge set is cleared, then every unordered own
    /// pair and every (own, linked-group) pair is tested with the group's
    /// clearance against current screen positions. Skipped while detached:
    /// with no surface there is no screen geometry, and the next attach
    /// recomputes anyway.
    pub fn recompute_obstructions(&mut self, g: GroupId) {
        let Some(group) = self.group_opt(g) else {
            return;
        };
        let Some(surface) = group.surface.as_ref() else {
            return;
        };
        let clearance = group.options.clearance;

        let mut own = Vec::with_capacity(group.members.len());
        for &m in &group.members {
            let mk = self.marker(m);
            own.push((m, surface.project(mk.position), mk.inflated_size));
        }
        let mut linked = Vec::new();
        for &other in &group.links {
            let Some(o) = self.group_opt(other) else {
                continue;
            };
            for &m in &o.members {
                let mk = self.marker(m);
                linked.push((m, surface.project(mk.position), mk.inflated_size));
            }
        }

        for &(m, _, _) in &own {
            self.graph.clear_node(m);
        }
        for (i, &(a, pa, sa)) in own.iter().enumerate() {
            for &(b, pb, sb) in &own[i + 1..] {
                if may_obstruct(pa - pb, sa, sb, clearance) {
                    self.graph.link(a, b);
                }
            }
            for &(b, pb, sb) in &linked {
                if may_obstruct(pa - pb, sa, sb, clearance) {
                    self.graph.link(a, b);
                }
            }
        }
    }

    /// The markers currently obstructing `m`.
    pub fn obstructions(&self, m: MarkerId) -> impl Iterator<Item = MarkerId> + '_ {
        self.graph.neighbors(m)
    }

    // --- selection ---

    /// Greedily inflate a maximal set of mutually non-obstructing markers.
    ///
    /// Markers are visited in insertion order, so earlier-inserted markers
    /// win contention; the result is maximal, not maximum. With `reset =
    /// false`, markers left inflated by an earlier pass or a manual toggle
    /// keep suppressing their neighborhood (their still-inflated neighbors
    /// are deflated, earliest-inserted first, so no obstructing pair
    /// survives the pass). With `reset = true` every marker starts eligible
    /// and the outcome depends only on insertion order and the graph.
    ///
    /// Ends by flushing dirty markers; each appears at most once in the
    /// returned batch no matter how often it changed during the pass.
    pub fn inflate_as_many_as_possible(&mut self, g: GroupId, reset: bool) -> RedrawBatch {
        let Some(group) = self.group_opt(g) else {
            return RedrawBatch::default();
        };
        let members = group.members.clone();
        let mut inhibited: BTreeSet<MarkerId> = BTreeSet::new();

        if !reset {
            for &m in &members {
                if self.marker(m).is_inflated() {
                    let neighbors: Vec<MarkerId> = self.graph.neighbors(m).collect();
                    for n in neighbors {
                        inhibited.insert(n);
                        self.deflate_marker(n);
                    }
                }
            }
        }

        for &m in &members {
            if inhibited.contains(&m) {
                continue;
            }
            self.inflate_marker(m);
            let neighbors: Vec<MarkerId> = self.graph.neighbors(m).collect();
            for n in neighbors {
                inhibited.insert(n);
                self.deflate_marker(n);
            }
        }
        self.flush_icons(g)
    }

    /// Unconditionally deflate every marker owned by the group.
    ///
    /// The obstruction graph is untouched and nothing is flushed; call
    /// [`flush_icons`](Self::flush_icons) to collect the redraws.
    pub fn deflate_all(&mut self, g: GroupId) {
        let Some(group) = self.group_opt(g) else {
            return;
        };
        let members = group.members.clone();
        for m in members {
            self.deflate_marker(m);
        }
    }

    // --- user actions ---

    /// Toggle a marker between its inflated and deflated states.
    ///
    /// Deflating is unconditional. Inflating forcibly deflates every marker
    /// in the obstruction set, regardless of their own mutual relationships,
    /// so the toggled marker's neighborhood satisfies the no-overlap rule
    /// immediately. Legal while detached (only logical state changes; the
    /// visuals catch up at the next attach). Flushes own and linked groups.
    pub fn toggle(&mut self, m: MarkerId) -> RedrawBatch {
        let Some(g) = self.marker_opt(m).map(|mk| mk.group) else {
            return RedrawBatch::default();
        };
        if self.marker(m).is_inflated() {
            self.deflate_marker(m);
        } else {
            self.inflate_marker(m);
            let neighbors: Vec<MarkerId> = self.graph.neighbors(m).collect();
            for n in neighbors {
                self.deflate_marker(n);
            }
        }
        self.flush_icons(g)
    }

    /// Flip whether inflated markers layer above deflated ones.
    ///
    /// Flipping to deflated-prominent raises every currently deflated marker
    /// into the prominent band; flipping back restores their baselines.
    /// Inflated markers always keep the inflated band.
    pub fn toggle_inflated_above(&mut self, g: GroupId) -> RedrawBatch {
        let Some(group) = self.group_opt_mut(g) else {
            return RedrawBatch::default();
        };
        group.inflated_above = !group.inflated_above;
        let above = group.inflated_above;
        let bands = group.options.z_bands;
        let members = group.members.clone();
        for m in members {
            let mk = self.marker_mut(m);
            if !mk.is_inflated() {
                if above {
                    mk.bring_back_from_front();
                } else {
                    mk.bring_to_front(bands.deflated_prominent);
                }
            }
        }
        self.flush_icons(g)
    }

    // --- surface lifecycle ---

    /// Attach the group to a rendering surface.
    ///
    /// Records the projection snapshot and fully recomputes obstructions.
    /// The very first attach of a group's lifetime (until
    /// [`clear_group`](Self::clear_group)) also runs the deterministic
    /// `reset = true` inflation pass for the initial layout.
    pub fn attach(&mut self, g: GroupId, surface: P) -> RedrawBatch {
        let Some(group) = self.group_opt_mut(g) else {
            return RedrawBatch::default();
        };
        group.surface = Some(surface);
        let first = !core::mem::replace(&mut group.ever_laid_out, true);
        self.recompute_obstructions(g);
        if first {
            self.inflate_as_many_as_possible(g, true)
        } else {
            self.flush_icons(g)
        }
    }

    /// Detach the group from its surface, returning the projection snapshot.
    ///
    /// Obstruction edges are deliberately kept; the next attach recomputes
    /// them unconditionally.
    pub fn detach(&mut self, g: GroupId) -> Option<P> {
        self.group_opt_mut(g)?.surface.take()
    }

    /// React to a view change (for example a zoom) with a fresh projection.
    ///
    /// Recomputes obstructions under the new projection and re-runs the
    /// greedy selection with `reset = false`, preserving already-inflated
    /// markers where possible.
    pub fn view_changed(&mut self, g: GroupId, surface: P) -> RedrawBatch {
        let Some(group) = self.group_opt_mut(g) else {
            return RedrawBatch::default();
        };
        group.surface = Some(surface);
        self.recompute_obstructions(g);
        self.inflate_as_many_as_possible(g, false)
    }

    // --- linking ---

    /// Link two groups so their markers obstruct across the boundary.
    ///
    /// Symmetric. Each side that is currently attached recomputes and
    /// re-runs the greedy selection immediately (both sides, not only the
    /// invoked one). No-op if either id is stale or `a == b`.
    pub fn link(&mut self, a: GroupId, b: GroupId) -> RedrawBatch {
        if a == b || self.group_opt(a).is_none() || self.group_opt(b).is_none() {
            return RedrawBatch::default();
        }
        self.group_mut(a).links.insert(b);
        self.group_mut(b).links.insert(a);
        self.relayout_after_link_change(a, b)
    }

    /// Dissolve the link between two groups.
    ///
    /// Symmetric, with the same immediate recompute-and-reselect behavior
    /// as [`link`](Self::link).
    pub fn unlink(&mut self, a: GroupId, b: GroupId) -> RedrawBatch {
        if self.group_opt(a).is_none() || self.group_opt(b).is_none() {
            return RedrawBatch::default();
        }
        self.group_mut(a).links.remove(&b);
        self.group_mut(b).links.remove(&a);
        self.relayout_after_link_change(a, b)
    }

    fn relayout_after_link_change(&mut self, a: GroupId, b: GroupId) -> RedrawBatch {
        let mut batch = RedrawBatch::default();
        // Partner first, invoking side last: the invoker's insertion order
        // settles cross-boundary contention.
        for g in [b, a] {
            if self.is_attached(g) {
                self.recompute_obstructions(g);
                batch.merge(self.inflate_as_many_as_possible(g, false));
            }
        }
        // Whatever the attachment states, drain stragglers on both sides.
        batch.merge(self.flush_icons(a));
        batch.merge(self.flush_icons(b));
        batch
    }

    // --- redraw ---

    /// Drain pending redraws for the group's and its linked groups' markers.
    ///
    /// Each dirty marker is reported exactly once, however many times its
    /// state changed since the last flush.
    pub fn flush_icons(&mut self, g: GroupId) -> RedrawBatch {
        let Some(group) = self.group_opt(g) else {
            return RedrawBatch::default();
        };
        let mut ids = group.members.clone();
        let links: Vec<GroupId> = group.links.iter().copied().collect();
        for other in links {
            if let Some(o) = self.group_opt(other) {
                ids.extend(o.members.iter().copied());
            }
        }

        let mut batch = RedrawBatch::default();
        for m in ids {
            let Some(mk) = self.marker_opt_mut(m) else {
                continue;
            };
            if mk.flags.contains(MarkerFlags::ICON_DIRTY) {
                mk.flags.remove(MarkerFlags::ICON_DIRTY);
                batch.requests.push(RedrawRequest {
                    marker: m,
                    group: mk.group,
                    state: mk.display_state(),
                    z_offset: mk.z_offset,
                });
            }
        }
        batch
    }

    /// Mark a marker's visual for redraw at the next flush.
    pub fn force_redraw(&mut self, m: MarkerId) {
        if let Some(mk) = self.marker_opt_mut(m) {
            mk.flags.insert(MarkerFlags::ICON_DIRTY);
        }
    }

    // --- marker queries ---

    /// Whether the marker currently shows its full-size visual.
    ///
    /// `false` for stale ids.
    pub fn is_inflated(&self, m: MarkerId) -> bool {
        self.marker_opt(m).is_some_and(Marker::is_inflated)
    }

    /// The marker's display state.
    pub fn display_state(&self, m: MarkerId) -> Option<DisplayState> {
        self.marker_opt(m).map(Marker::display_state)
    }

    /// The marker's geographic position.
    pub fn position(&self, m: MarkerId) -> Option<LatLng> {
        self.marker_opt(m).map(|mk| mk.position)
    }

    /// The marker's inflated footprint in screen pixels.
    pub fn inflated_size(&self, m: MarkerId) -> Option<Size> {
        self.marker_opt(m).map(|mk| mk.inflated_size)
    }

    /// The marker's current z-offset.
    pub fn z_offset(&self, m: MarkerId) -> Option<i32> {
        self.marker_opt(m).map(|mk| mk.z_offset)
    }

    /// The group owning the marker.
    pub fn group_of(&self, m: MarkerId) -> Option<GroupId> {
        self.marker_opt(m).map(|mk| mk.group)
    }

    /// The marker's deflated icon, built by the group's factory on first
    /// request and cached for the marker's lifetime.
    pub fn deflated_icon(&mut self, m: MarkerId) -> Option<&F::Icon> {
        let mk = self.marker_opt(m)?;
        if mk.deflated_icon.is_none() {
            let position = mk.position;
            let g = mk.group;
            let icon = self
                .group_opt_mut(g)
                .expect("marker's owning group must be alive")
                .options
                .factory
                .deflated_icon(m, position);
            self.marker_mut(m).deflated_icon = Some(icon);
        }
        self.marker_opt(m)?.deflated_icon.as_ref()
    }

    // --- internals ---

    fn inflate_marker(&mut self, m: MarkerId) {
        let Some(g) = self.marker_opt(m).map(|mk| mk.group) else {
            return;
        };
        let bands = self.group(g).options.z_bands;
        self.marker_mut(m).inflate(bands);
    }

    fn deflate_marker(&mut self, m: MarkerId) {
        let Some(g) = self.marker_opt(m).map(|mk| mk.group) else {
            return;
        };
        let (above, bands) = {
            let group = self.group(g);
            (group.inflated_above, group.options.z_bands)
        };
        self.marker_mut(m).deflate(above, bands);
    }

    fn alloc_marker(&mut self, g: GroupId, base: BaseMarker) -> MarkerId {
        let (idx, generation) = if let Some((idx, prev)) = self.free_markers.pop() {
            let generation = prev + 1;
            self.markers[idx] = Some(Marker::new(generation, g, base));
            (idx, generation)
        } else {
            self.markers.push(Some(Marker::new(1, g, base)));
            (self.markers.len() - 1, 1)
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "MarkerId uses 32-bit indices by design."
        )]
        MarkerId::new(idx as u32, generation)
    }

    fn free_marker(&mut self, m: MarkerId) {
        let Some(mk) = self.markers[m.idx()].take() else {
            return;
        };
        self.free_markers.push((m.idx(), mk.generation));
    }

    fn group(&self, g: GroupId) -> &Group<P, F> {
        self.groups[g.idx()].as_ref().expect("dangling GroupId")
    }

    fn group_mut(&mut self, g: GroupId) -> &mut Group<P, F> {
        self.groups[g.idx()].as_mut().expect("dangling GroupId")
    }

    fn group_opt(&self, g: GroupId) -> Option<&Group<P, F>> {
        let gr = self.groups.get(g.idx())?.as_ref()?;
        (gr.generation == g.1).then_some(gr)
    }

    fn group_opt_mut(&mut self, g: GroupId) -> Option<&mut Group<P, F>> {
        let gr = self.groups.get_mut(g.idx())?.as_mut()?;
        (gr.generation == g.1).then_some(gr)
    }

    fn marker(&self, m: MarkerId) -> &Marker<F::Icon> {
        self.markers[m.idx()].as_ref().expect("dangling MarkerId")
    }

    fn marker_mut(&mut self, m: MarkerId) -> &mut Marker<F::Icon> {
        self.markers[m.idx()].as_mut().expect("dangling MarkerId")
    }

    fn marker_opt(&self, m: MarkerId) -> Option<&Marker<F::Icon>> {
        let mk = self.markers.get(m.idx())?.as_ref()?;
        (mk.generation == m.1).then_some(mk)
    }

    fn marker_opt_mut(&mut self, m: MarkerId) -> Option<&mut Marker<F::Icon>> {
        let mk = self.markers.get_mut(m.idx())?.as_mut()?;
        (mk.generation == m.1).then_some(mk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::ZBands;
    use crate::surface::NoIcons;
    use alloc::vec::Vec;
    use kurbo::Point;

    /// Identity projection: longitude/latitude are screen pixels.
    struct Flat;

    impl Projector for Flat {
        fn project(&self, pos: LatLng) -> Point {
            Point::new(pos.lng, pos.lat)
        }
    }

    /// Uniform scaling, standing in for zoom levels.
    struct Zoom(f64);

    impl Projector for Zoom {
        fn project(&self, pos: LatLng) -> Point {
            Point::new(pos.lng * self.0, pos.lat * self.0)
        }
    }

    /// Numbers icons in creation order, to observe factory invocations.
    #[derive(Default)]
    struct SeqIcons {
        next: u32,
    }

    impl IconFactory for SeqIcons {
        type Icon = u32;

        fn deflated_icon(&mut self, _marker: MarkerId, _position: LatLng) -> Self::Icon {
            let n = self.next;
            self.next += 1;
            n
        }
    }

    const SIZE: Size = Size::new(20.0, 20.0);

    fn field() -> MarkerField<Flat, NoIcons> {
        MarkerField::new()
    }

    fn at(lng: f64, lat: f64) -> BaseMarker {
        BaseMarker::new(LatLng::new(lat, lng), SIZE)
    }

    /// No two inflated markers may obstruct each other.
    fn assert_mutual_exclusion(field: &MarkerField<impl Projector, impl IconFactory>, g: GroupId) {
        let inflated: Vec<MarkerId> = field.markers_of(g).filter(|&m| field.is_inflated(m)).collect();
        for &a in &inflated {
            for &b in &inflated {
                assert!(
                    a == b || !field.graph.obstructs(a, b),
                    "inflated markers {a:?} and {b:?} obstruct each other"
                );
            }
        }
    }

    #[test]
    fn close_pair_inflates_the_earlier_marker() {
        let mut f = field();
        let g = f.add_group(GroupOptions::new(NoIcons));
        let a = f.add_marker(g, at(0.0, 0.0));
        let b = f.add_marker(g, at(5.0, 0.0));
        f.attach(g, Flat);

        assert!(f.graph.obstructs(a, b), "10 + 10 + 2 >= 5 on both axes");
        assert!(f.is_inflated(a), "earlier-inserted marker wins contention");
        assert!(!f.is_inflated(b));
    }

    #[test]
    fn distant_pair_inflates_both() {
        let mut f = field();
        let g = f.add_group(GroupOptions::new(NoIcons));
        let a = f.add_marker(g, at(0.0, 0.0));
        let b = f.add_marker(g, at(50.0, 0.0));
        f.attach(g, Flat);

        assert!(f.graph.is_empty());
        assert!(f.is_inflated(a));
        assert!(f.is_inflated(b));
    }

    #[test]
    fn obstruction_edges_stay_symmetric() {
        let mut f = field();
        let g = f.add_group(GroupOptions::new(NoIcons));
        let ids: Vec<MarkerId> = (0..4).map(|i| f.add_marker(g, at(i as f64 * 15.0, 0.0))).collect();
        f.attach(g, Flat);

        for &a in &ids {
            for &b in &ids {
                assert_eq!(
                    f.graph.obstructs(a, b),
                    f.graph.obstructs(b, a),
                    "asymmetric edge between {a:?} and {b:?}"
                );
            }
        }
        f.remove_marker(ids[1]);
        for &a in &ids {
            assert!(!f.graph.obstructs(a, ids[1]), "edges to a removed marker must vanish");
            assert!(!f.graph.obstructs(ids[1], a), "edges to a removed marker must vanish");
        }
    }

    #[test]
    fn selection_is_maximal() {
        let mut f = field();
        let g = f.add_group(GroupOptions::new(NoIcons));
        // A ragged cluster: chain overlaps plus one isolated marker.
        for (x, y) in [(0.0, 0.0), (15.0, 0.0), (30.0, 0.0), (15.0, 15.0), (200.0, 0.0)] {
            f.add_marker(g, at(x, y));
        }
        f.attach(g, Flat);

        assert_mutual_exclusion(&f, g);
        for m in f.markers_of(g).collect::<Vec<_>>() {
            if !f.is_inflated(m) {
                let suppressed = f.obstructions(m).any(|n| f.is_inflated(n));
                assert!(suppressed, "deflated {m:?} obstructs no inflated marker");
            }
        }
    }

    #[test]
    fn reset_pass_is_deterministic() {
        let build = || {
            let mut f = field();
            let g = f.add_group(GroupOptions::new(NoIcons));
            let ids: Vec<MarkerId> = [(0.0, 0.0), (18.0, 3.0), (36.0, 0.0), (9.0, 12.0)]
                .into_iter()
                .map(|(x, y)| f.add_marker(g, at(x, y)))
                .collect();
            f.attach(g, Flat);
            let states: Vec<bool> = ids.iter().map(|&m| f.is_inflated(m)).collect();
            states
        };
        assert_eq!(build(), build(), "same order and positions, same partition");
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut f = field();
        let g = f.add_group(GroupOptions::new(NoIcons));
        for (x, y) in [(0.0, 0.0), (15.0, 0.0), (30.0, 10.0)] {
            f.add_marker(g, at(x, y));
        }
        f.attach(g, Flat);

        let first = f.graph.clone();
        f.recompute_obstructions(g);
        assert_eq!(f.graph, first, "recomputation without state change must be stable");
    }

    #[test]
    fn toggle_deflates_the_obstructing_neighbor() {
        let mut f = field();
        let g = f.add_group(GroupOptions::new(NoIcons));
        let a = f.add_marker(g, at(0.0, 0.0));
        let b = f.add_marker(g, at(5.0, 0.0));
        f.attach(g, Flat);
        assert!(f.is_inflated(a));

        let batch = f.toggle(b);
        assert!(f.is_inflated(b));
        assert!(!f.is_inflated(a), "toggle must force the neighbor down");
        assert!(batch.contains(a), "the neighbor's change is flushed");
        assert!(batch.contains(b));
        assert_mutual_exclusion(&f, g);
    }

    #[test]
    fn toggle_off_only_deflates_itself() {
        let mut f = field();
        let g = f.add_group(GroupOptions::new(NoIcons));
        let a = f.add_marker(g, at(0.0, 0.0));
        let b = f.add_marker(g, at(50.0, 0.0));
        f.attach(g, Flat);

        let batch = f.toggle(a);
        assert!(!f.is_inflated(a));
        assert!(f.is_inflated(b));
        assert!(!batch.contains(b));
    }

    #[test]
    fn removal_releases_the_suppressed_neighbor() {
        let mut f = field();
        let g = f.add_group(GroupOptions::new(NoIcons));
        let a = f.add_marker(g, at(0.0, 0.0));
        let b = f.add_marker(g, at(5.0, 0.0));
        f.attach(g, Flat);
        assert!(!f.is_inflated(b));

        f.remove_marker(a);
        assert_eq!(f.obstructions(b).count(), 0, "the sole obstruction is gone");
        f.inflate_as_many_as_possible(g, false);
        assert!(f.is_inflated(b), "nothing inhibits the survivor anymore");
    }

    #[test]
    fn detached_add_appears_inflated() {
        let mut f = field();
        let g = f.add_group(GroupOptions::new(NoIcons));
        let a = f.add_marker(g, at(0.0, 0.0));
        let b = f.add_marker(g, at(5.0, 0.0));
        // No surface: no geometry, so both logically inflate.
        assert!(f.is_inflated(a));
        assert!(f.is_inflated(b));
        assert!(f.graph.is_empty(), "no edges can be computed while detached");

        // First attach restores order deterministically.
        f.attach(g, Flat);
        assert!(f.is_inflated(a));
        assert!(!f.is_inflated(b));
    }

    #[test]
    fn attached_add_collides_incrementally() {
        let mut f = field();
        let g = f.add_group(GroupOptions::new(NoIcons));
        let a = f.add_marker(g, at(0.0, 0.0));
        f.attach(g, Flat);

        let b = f.add_marker(g, at(5.0, 0.0));
        assert!(f.graph.obstructs(a, b));
        assert!(!f.is_inflated(b), "a colliding newcomer starts deflated");

        let c = f.add_marker(g, at(100.0, 0.0));
        assert!(f.is_inflated(c), "an unobstructed newcomer inflates immediately");
        let batch = f.flush_icons(g);
        assert!(batch.contains(b) && batch.contains(c), "newcomers need an initial draw");
    }

    #[test]
    fn attached_add_ignores_linked_groups() {
        let mut f = field();
        let g1 = f.add_group(GroupOptions::new(NoIcons));
        let g2 = f.add_group(GroupOptions::new(NoIcons));
        f.add_marker(g2, at(0.0, 0.0));
        f.attach(g1, Flat);
        f.attach(g2, Flat);
        f.link(g1, g2);

        // The incremental path only consults g1's own markers.
        let m = f.add_marker(g1, at(3.0, 0.0));
        assert!(f.is_inflated(m), "cross-group edges wait for full recomputation");
        assert_eq!(f.obstructions(m).count(), 0);

        f.view_changed(g1, Flat);
        assert_eq!(f.obstructions(m).count(), 1, "full recompute sees the linked marker");
    }

    #[test]
    fn first_attach_lays_out_once() {
        let mut f = field();
        let g = f.add_group(GroupOptions::new(NoIcons));
        let a = f.add_marker(g, at(0.0, 0.0));
        let b = f.add_marker(g, at(5.0, 0.0));
        f.attach(g, Flat);
        assert!(f.is_inflated(a) && !f.is_inflated(b));

        // Manually invert the pair, detach, re-attach: no reset pass runs.
        f.toggle(b);
        f.detach(g);
        assert!(!f.is_attached(g));
        f.attach(g, Flat);
        assert!(f.is_inflated(b), "re-attach must not reset manual choices");
        assert!(!f.is_inflated(a));
    }

    #[test]
    fn clear_resets_bounds_and_layout_flag() {
        let mut f = field();
        let g = f.add_group(GroupOptions::new(NoIcons));
        let a = f.add_marker(g, at(0.0, 0.0));
        let b = f.add_marker(g, at(5.0, 0.0));
        f.attach(g, Flat);
        f.toggle(b);

        f.clear_group(g);
        assert_eq!(f.marker_count(g), 0);
        assert!(f.group_bounds(g).is_none());
        assert!(f.graph.is_empty());
        assert!(!f.contains_marker(g, a));

        // The next attach is a first attach again: the reset pass overrides
        // a manual toggle made in the meantime.
        let a2 = f.add_marker(g, at(0.0, 0.0));
        let b2 = f.add_marker(g, at(5.0, 0.0));
        f.toggle(b2);
        f.detach(g);
        f.attach(g, Flat);
        assert!(f.is_inflated(a2), "cleared group lays out from scratch");
        assert!(!f.is_inflated(b2));
    }

    #[test]
    fn bounds_extend_but_never_shrink() {
        let mut f = field();
        let g = f.add_group(GroupOptions::new(NoIcons));
        assert!(f.group_bounds(g).is_none());
        let a = f.add_marker(g, at(0.0, 0.0));
        f.add_marker(g, at(100.0, 40.0));
        let bounds = f.group_bounds(g).expect("two markers define bounds");
        assert_eq!(bounds.south_west(), LatLng::new(0.0, 0.0));
        assert_eq!(bounds.north_east(), LatLng::new(40.0, 100.0));

        f.remove_marker(a);
        assert_eq!(
            f.group_bounds(g),
            Some(bounds),
            "removal keeps the grown bounds"
        );
    }

    #[test]
    fn layering_policy_moves_deflated_markers_only() {
        let mut f = field();
        let g = f.add_group(GroupOptions::new(NoIcons));
        let a = f.add_marker(g, at(0.0, 0.0));
        let b = f.add_marker(g, at(5.0, 0.0));
        f.attach(g, Flat);
        let bands = ZBands::default();
        assert_eq!(f.z_offset(a), Some(bands.inflated));
        assert_eq!(f.z_offset(b), Some(0), "deflated markers rest at their baseline");

        f.toggle_inflated_above(g);
        assert!(!f.inflated_above(g));
        assert_eq!(f.z_offset(b), Some(bands.deflated_prominent));
        assert_eq!(f.z_offset(a), Some(bands.inflated), "inflated markers are untouched");

        f.toggle_inflated_above(g);
        assert_eq!(f.z_offset(b), Some(0), "baseline restored");
    }

    #[test]
    fn inverted_policy_applies_to_new_markers() {
        let mut f = field();
        let g = f.add_group(GroupOptions::new(NoIcons));
        f.add_marker(g, at(0.0, 0.0));
        f.attach(g, Flat);
        f.toggle_inflated_above(g);

        let b = f.add_marker(g, at(5.0, 0.0));
        assert!(!f.is_inflated(b));
        assert_eq!(
            f.z_offset(b),
            Some(ZBands::default().deflated_prominent),
            "a deflated newcomer joins the prominent band under the inverted policy"
        );
    }

    #[test]
    fn flush_reports_each_marker_once() {
        let mut f = field();
        let g = f.add_group(GroupOptions::new(NoIcons));
        let a = f.add_marker(g, at(0.0, 0.0));
        f.add_marker(g, at(5.0, 0.0));
        let batch = f.attach(g, Flat);
        let hits = batch.requests.iter().filter(|r| r.marker == a).count();
        assert_eq!(hits, 1, "dirty flags collapse repeated changes");
        assert!(f.flush_icons(g).is_empty(), "a second flush has nothing to do");
    }

    #[test]
    fn deflate_all_defers_its_redraws() {
        let mut f = field();
        let g = f.add_group(GroupOptions::new(NoIcons));
        let a = f.add_marker(g, at(0.0, 0.0));
        let b = f.add_marker(g, at(50.0, 0.0));
        f.attach(g, Flat);

        f.deflate_all(g);
        assert!(!f.is_inflated(a) && !f.is_inflated(b));
        let batch = f.flush_icons(g);
        assert!(batch.contains(a) && batch.contains(b));
        assert_eq!(f.display_state(a), Some(DisplayState::Deflated));
    }

    #[test]
    fn zoom_changes_relayout_preserving_where_possible() {
        let mut f: MarkerField<Zoom, NoIcons> = MarkerField::new();
        let g = f.add_group(GroupOptions::new(NoIcons));
        let a = f.add_marker(g, at(0.0, 0.0));
        let b = f.add_marker(g, at(40.0, 0.0));
        f.attach(g, Zoom(1.0));
        assert!(f.is_inflated(a) && f.is_inflated(b), "40px apart is clear");

        // Zooming out pulls them within collision range; the earlier wins.
        f.view_changed(g, Zoom(0.1));
        assert!(f.is_inflated(a));
        assert!(!f.is_inflated(b));
        assert_mutual_exclusion(&f, g);

        // Zooming back in frees the suppressed marker again.
        f.view_changed(g, Zoom(1.0));
        assert!(f.is_inflated(a) && f.is_inflated(b));
    }

    #[test]
    fn view_change_preserves_a_manual_winner() {
        let mut f = field();
        let g = f.add_group(GroupOptions::new(NoIcons));
        let a = f.add_marker(g, at(0.0, 0.0));
        let b = f.add_marker(g, at(15.0, 0.0));
        let c = f.add_marker(g, at(30.0, 0.0));
        f.attach(g, Flat);
        assert!(f.is_inflated(a) && !f.is_inflated(b) && f.is_inflated(c));

        f.toggle(b);
        assert!(!f.is_inflated(a) && f.is_inflated(b) && !f.is_inflated(c));

        f.view_changed(g, Flat);
        assert!(f.is_inflated(b), "the manually inflated marker keeps its spot");
        assert!(!f.is_inflated(a) && !f.is_inflated(c));
        assert_mutual_exclusion(&f, g);
    }

    #[test]
    fn linked_groups_suppress_across_the_boundary() {
        let mut f = field();
        let g1 = f.add_group(GroupOptions::new(NoIcons));
        let g2 = f.add_group(GroupOptions::new(NoIcons));
        let m1 = f.add_marker(g1, at(0.0, 0.0));
        let m2 = f.add_marker(g2, at(5.0, 0.0));
        f.attach(g1, Flat);
        f.attach(g2, Flat);
        assert!(f.is_inflated(m1) && f.is_inflated(m2), "unlinked groups ignore each other");

        f.link(g1, g2);
        assert!(f.graph.obstructs(m1, m2), "linking creates cross-group edges");
        assert!(f.is_inflated(m1));
        assert!(!f.is_inflated(m2), "g1's winner suppresses g2's marker");

        let batch = f.unlink(g1, g2);
        assert!(!f.graph.obstructs(m1, m2));
        assert!(f.is_inflated(m2), "unlinking frees the suppressed marker");
        assert!(batch.contains(m2));
    }

    #[test]
    fn link_relayouts_both_attached_sides() {
        let mut f = field();
        let g1 = f.add_group(GroupOptions::new(NoIcons));
        let g2 = f.add_group(GroupOptions::new(NoIcons));
        // Two interleaved rows: each group alone is conflict-free.
        let a1 = f.add_marker(g1, at(0.0, 0.0));
        let a2 = f.add_marker(g1, at(40.0, 0.0));
        let b1 = f.add_marker(g2, at(8.0, 0.0));
        let b2 = f.add_marker(g2, at(48.0, 0.0));
        f.attach(g1, Flat);
        f.attach(g2, Flat);
        assert!([a1, a2, b1, b2].iter().all(|&m| f.is_inflated(m)));

        f.link(g2, g1);
        // Both sides re-ran their selection, so no cross conflict survives.
        for &(x, y) in &[(a1, b1), (a2, b2)] {
            assert!(
                f.is_inflated(x) ^ f.is_inflated(y),
                "exactly one of each colliding pair stays inflated"
            );
        }
    }

    #[test]
    fn conflicting_inflated_markers_resolve_on_relayout() {
        let mut f: MarkerField<Zoom, NoIcons> = MarkerField::new();
        let g = f.add_group(GroupOptions::new(NoIcons));
        let a = f.add_marker(g, at(0.0, 0.0));
        let b = f.add_marker(g, at(40.0, 0.0));
        f.attach(g, Zoom(1.0));
        assert!(f.is_inflated(a) && f.is_inflated(b));

        // Zooming out makes two *currently inflated* markers collide; the
        // preserve-pass must still end without an obstructing inflated pair.
        f.view_changed(g, Zoom(0.1));
        assert!(f.is_inflated(a), "the earlier-inserted winner survives");
        assert!(!f.is_inflated(b));
        assert_mutual_exclusion(&f, g);
    }

    #[test]
    fn stale_ids_are_no_ops() {
        let mut f = field();
        let g = f.add_group(GroupOptions::new(NoIcons));
        let a = f.add_marker(g, at(0.0, 0.0));
        f.attach(g, Flat);
        f.remove_marker(a);

        assert!(!f.contains_marker(g, a));
        assert!(!f.is_inflated(a));
        assert!(f.toggle(a).is_empty());
        f.remove_marker(a);
        assert_eq!(f.position(a), None);
        assert_eq!(f.marker_count(g), 0);
    }

    #[test]
    fn slot_reuse_does_not_alias_old_handles() {
        let mut f = field();
        let g = f.add_group(GroupOptions::new(NoIcons));
        let a = f.add_marker(g, at(0.0, 0.0));
        f.remove_marker(a);
        let b = f.add_marker(g, at(9.0, 9.0));
        assert_eq!(b.idx(), a.idx(), "the slot is reused");
        assert_ne!(a, b);
        assert_eq!(f.position(a), None, "the stale handle stays dead");
        assert!(f.contains_marker(g, b));
    }

    #[test]
    fn remove_group_unlinks_partners() {
        let mut f = field();
        let g1 = f.add_group(GroupOptions::new(NoIcons));
        let g2 = f.add_group(GroupOptions::new(NoIcons));
        let m2 = f.add_marker(g2, at(0.0, 0.0));
        f.attach(g1, Flat);
        f.attach(g2, Flat);
        f.link(g1, g2);

        f.remove_group(g2);
        assert_eq!(f.group_count(), 1);
        assert_eq!(f.linked_groups(g1).count(), 0, "dead partners are unlinked");
        assert!(!f.contains_marker(g2, m2));
        f.recompute_obstructions(g1);
        f.view_changed(g1, Flat);
    }

    #[test]
    fn deflated_icons_resolve_lazily_and_cache() {
        let mut f: MarkerField<Flat, SeqIcons> = MarkerField::new();
        let g = f.add_group(GroupOptions::new(SeqIcons::default()));
        let a = f.add_marker(g, at(0.0, 0.0));
        let b = f.add_marker(g, at(50.0, 0.0));

        assert_eq!(f.deflated_icon(a), Some(&0));
        assert_eq!(f.deflated_icon(a), Some(&0), "second request hits the cache");
        assert_eq!(f.deflated_icon(b), Some(&1), "each marker resolves once");
        f.remove_marker(a);
        assert_eq!(f.deflated_icon(a), None);
    }

    #[test]
    fn force_redraw_marks_a_clean_marker() {
        let mut f = field();
        let g = f.add_group(GroupOptions::new(NoIcons));
        let a = f.add_marker(g, at(0.0, 0.0));
        f.attach(g, Flat);
        assert!(f.flush_icons(g).is_empty());

        f.force_redraw(a);
        let batch = f.flush_icons(g);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.requests[0].marker, a);
        assert_eq!(batch.requests[0].group, g);
    }
}
