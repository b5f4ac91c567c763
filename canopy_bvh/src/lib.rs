// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=canopy_bvh --heading-base-level=0

//! Canopy BVH: an incrementally maintained 3D AABB tree (dynamic BVH).
//!
//! Canopy BVH is a reusable broad phase for collision detection, culling, and
//! proximity queries.
//!
//! - Insert, update, and remove axis-aligned bounding boxes (AABBs) keyed by
//!   user-supplied item ids.
//! - Query by box overlap, frustum, or ray; enumerate overlapping item pairs.
//! - Walk two trees in lockstep with [`dual_traverse`] for cross-tree
//!   overlap ([`tree_overlap`]) and approximate closest pairs
//!   ([`tree_closest`]).
//!
//! Leaf boxes are stored fattened by a configurable margin, so small motion
//! is absorbed by [`BvhTree::refit`] without touching the tree structure.
//! The tree is rebalanced after every mutation with AVL-style rotations, so
//! query cost stays logarithmic in the number of items regardless of
//! insertion order.
//!
//! The crate is generic over the scalar type `T` (`f32`, `f64`, `i64`) and
//! does not depend on any geometry crate. Distance and surface-area metrics
//! use widened accumulator types (f32→f64, f64→f64, i64→i128) to sidestep
//! precision and overflow pitfalls. The insertion heuristic is pluggable via
//! [`InsertHeuristic`]; the default, [`SurfaceArea`], descends toward the
//! child whose box would grow least.
//!
//! # Example
//!
//! ```rust
//! use canopy_bvh::{Aabb3, BvhTree};
//!
//! // Track three boxes by id.
//! let mut tree: BvhTree<f64, u32> = BvhTree::new();
//! tree.insert(1, Aabb3::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0));
//! tree.insert(2, Aabb3::new(0.5, 0.5, 0.0, 1.5, 1.5, 1.0));
//! tree.insert(3, Aabb3::new(5.0, 5.0, 0.0, 6.0, 6.0, 1.0));
//!
//! // The two overlapping boxes form the only pair.
//! assert_eq!(tree.collision_pairs(), vec![(1, 2)]);
//!
//! // Box queries report everything whose stored box overlaps the probe.
//! let mut hits = tree.query_overlap(&Aabb3::new(0.0, 0.0, 0.0, 2.0, 2.0, 1.0));
//! hits.sort();
//! assert_eq!(hits, vec![1, 2]);
//!
//! // Small motion is absorbed by the fat margin; nothing is restructured.
//! assert!(!tree.refit(1, Aabb3::new(0.1, 0.0, 0.0, 1.1, 1.0, 1.0)));
//! ```
//!
//! Two trees can be compared without merging them:
//!
//! ```rust
//! use canopy_bvh::{Aabb3, BvhTree, tree_closest, tree_overlap};
//!
//! let mut left: BvhTree<f64, u32> = BvhTree::new();
//! let mut right: BvhTree<f64, char> = BvhTree::new();
//! left.insert(7, Aabb3::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0));
//! right.insert('a', Aabb3::new(0.5, 0.0, 0.0, 1.5, 1.0, 1.0));
//! right.insert('b', Aabb3::new(90.0, 0.0, 0.0, 91.0, 1.0, 1.0));
//!
//! assert_eq!(tree_overlap(&left, &right), vec![(7, 'a')]);
//! assert_eq!(tree_closest(&left, &right), vec![(7, 'a')]);
//! ```
//!
//! ### Float semantics
//!
//! This crate assumes no NaNs for floating-point coordinates. Debug builds
//! may assert. Rays with a zero direction component still work; the slab
//! test relies on IEEE infinities for axis-parallel rays.

#![no_std]

extern crate alloc;

mod dual;
mod heuristic;
mod query;
mod tree;
mod types;

pub use dual::{DEFAULT_SEED, dual_traverse, tree_closest, tree_closest_seeded, tree_overlap, tree_overlap_seeded};
pub use heuristic::{InsertHeuristic, Side, SurfaceArea};
pub use tree::BvhTree;
pub use types::{Aabb3, FloatScalar, Frustum, Plane, Ray3, Scalar, ScalarAcc};
