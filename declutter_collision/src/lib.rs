// Copyright 2025 the Declutter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Declutter Collision: the pairwise machinery behind marker decluttering.
//!
//! This crate is the leaf building block of the Declutter workspace. It knows
//! nothing about maps, markers, or rendering; it answers exactly two
//! questions:
//!
//! - Would two rectangular footprints at a given screen-space separation
//!   overlap, within a clearance margin, if both were shown full-size?
//!   See [`may_obstruct`].
//! - Which pairs currently do? [`ObstructionGraph`] stores that relation as
//!   an undirected, irreflexive adjacency structure over any copyable
//!   ordered key, with a single symmetric insert/remove path so the two
//!   endpoints can never disagree.
//!
//! Higher layers rebuild or patch the graph whenever screen-space positions
//! may have shifted and then run their selection policy over it.
//!
//! ## Example
//!
//! ```
//! use declutter_collision::{ObstructionGraph, may_obstruct};
//! use kurbo::{Size, Vec2};
//!
//! let footprint = Size::new(20.0, 20.0);
//! let clearance = Vec2::new(2.0, 2.0);
//!
//! // 5px apart: 10 + 10 + 2 >= 5 on both axes, so the pair obstructs.
//! assert!(may_obstruct(Vec2::new(5.0, 0.0), footprint, footprint, clearance));
//! // 50px apart: well clear of the combined half-sizes plus clearance.
//! assert!(!may_obstruct(Vec2::new(50.0, 0.0), footprint, footprint, clearance));
//!
//! let mut graph = ObstructionGraph::new();
//! graph.link(1_u32, 2_u32);
//! assert!(graph.obstructs(2, 1), "edges are recorded on both endpoints");
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod graph;
mod predicate;

pub use graph::ObstructionGraph;
pub use predicate::may_obstruct;
