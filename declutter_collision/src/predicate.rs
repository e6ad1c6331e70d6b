// Copyright 2025 the Declutter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The obstruction predicate: an axis-aligned overlap test with clearance.

use kurbo::{Size, Vec2};

/// Whether two full-size footprints would overlap at the given separation.
///
/// `delta` is the screen-space vector between the two footprint centers (its
/// sign does not matter), `a` and `b` are the inflated footprint sizes, and
/// `clearance` is the extra margin that must stay clear on each axis. The
/// test is a plain axis-aligned bounding-box overlap check, widened by the
/// clearance:
///
/// `|delta.x| <= (a.width + b.width) / 2 + clearance.x`, and the symmetric
/// condition on the vertical axis. A zero clearance tolerates exact
/// touching; a negative clearance tolerates that much overlap.
///
/// Pure and total. Footprint sizes must be non-negative and all inputs
/// finite (no NaN); violations are programmer error and are debug-asserted.
#[inline]
pub fn may_obstruct(delta: Vec2, a: Size, b: Size, clearance: Vec2) -> bool {
    debug_assert!(
        a.width >= 0.0 && a.height >= 0.0 && b.width >= 0.0 && b.height >= 0.0,
        "footprint sizes must be non-negative"
    );
    abs(delta.x) <= 0.5 * (a.width + b.width) + clearance.x
        && abs(delta.y) <= 0.5 * (a.height + b.height) + clearance.y
}

// Sign flip rather than `f64::abs` to stay independent of std/libm.
#[inline]
fn abs(v: f64) -> f64 {
    if v < 0.0 { -v } else { v }
}
