// Copyright 2025 the Declutter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Batched redraw requests handed back to the host surface.

use alloc::vec::Vec;

use crate::group::GroupId;
use crate::marker::{DisplayState, MarkerId};

/// One marker whose visual state changed and needs repainting.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RedrawRequest {
    /// The marker to repaint.
    pub marker: MarkerId,
    /// The group owning the marker (for pane routing).
    pub group: GroupId,
    /// The display state to render.
    pub state: DisplayState,
    /// The z-offset to assign.
    pub z_offset: i32,
}

/// Batched redraw requests produced by operations that flush pending
/// visual changes.
///
/// Each flush reports a marker at most once; when an operation merges
/// several flushes (linking two attached groups, for instance) a marker may
/// appear more than once, and the last request wins.
#[derive(Clone, Debug, Default)]
pub struct RedrawBatch {
    /// The requests, in flush order.
    pub requests: Vec<RedrawRequest>,
}

impl RedrawBatch {
    /// Whether the batch carries no requests.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// The number of requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether the batch carries a request for `marker`.
    pub fn contains(&self, marker: MarkerId) -> bool {
        self.requests.iter().any(|r| r.marker == marker)
    }

    /// Append another batch's requests after this one's.
    pub fn merge(&mut self, other: Self) {
        self.requests.extend(other.requests);
    }
}
