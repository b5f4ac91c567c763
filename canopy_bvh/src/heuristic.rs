// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Insertion heuristics: choosing which subtree a new leaf descends into.

use crate::types::{Aabb3, Scalar};

/// Which child of a branch a descending insertion should follow.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    /// Descend into the left child.
    Left,
    /// Descend into the right child.
    Right,
}

/// Strategy deciding which sibling subtree a new leaf descends into.
///
/// Implementations only see the two candidate child boxes and the incoming
/// leaf box; they are consulted at every branch on the way down until a leaf
/// is reached. The tree is parameterized by the heuristic type the same way
/// it would be by a backend, so the choice is fixed at construction and has
/// no per-call dispatch cost.
pub trait InsertHeuristic<T: Scalar> {
    /// Choose a side for `item` between the `left` and `right` child boxes.
    fn choose(&self, left: &Aabb3<T>, right: &Aabb3<T>, item: &Aabb3<T>) -> Side;
}

/// Default heuristic: descend into the child whose box grows least in
/// surface area when enlarged to enclose the new leaf.
///
/// Ties go to the left (first) candidate.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SurfaceArea;

impl<T: Scalar> InsertHeuristic<T> for SurfaceArea {
    fn choose(&self, left: &Aabb3<T>, right: &Aabb3<T>, item: &Aabb3<T>) -> Side {
        let growth_l = left.union(item).surface_area() - left.surface_area();
        let growth_r = right.union(item).surface_area() - right.surface_area();
        if growth_r < growth_l {
            Side::Right
        } else {
            Side::Left
        }
    }
}
