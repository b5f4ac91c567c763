// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simultaneous traversal of two trees.
//!
//! The walk keeps a stack of node pairs, one node from each tree. A pair is
//! pruned when the caller's admissibility test rejects its boxes; a pair of
//! leaves is reported; otherwise one branch is expanded into its children.
//! When both nodes are branches the side to expand is picked by a seeded
//! coin flip, which keeps the walk from degenerating on adversarially
//! lopsided tree pairs while staying reproducible.

use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt::Debug;
use core::hash::Hash;

use smallvec::{SmallVec, smallvec};

use crate::heuristic::InsertHeuristic;
use crate::tree::{BvhTree, NIL};
use crate::types::{Aabb3, Scalar};

/// Seed used by the non-`_seeded` entry points.
pub const DEFAULT_SEED: u64 = 0x853C_49E6_748F_EA9B;

const PCG_MULTIPLIER: u64 = 6364136223846793005;

/// Minimal PCG-XSH-RR generator for traversal tie-breaking.
pub(crate) struct Pcg32 {
    state: u64,
    inc: u64,
}

impl Pcg32 {
    pub(crate) fn new(seed: u64) -> Self {
        let mut rng = Self {
            state: 0,
            inc: (seed << 1) | 1,
        };
        rng.next_u32();
        rng.state = rng.state.wrapping_add(seed);
        rng.next_u32();
        rng
    }

    #[allow(
        clippy::cast_possible_truncation,
        reason = "The PCG output function truncates the 64-bit state on purpose."
    )]
    pub(crate) fn next_u32(&mut self) -> u32 {
        let old = self.state;
        self.state = old.wrapping_mul(PCG_MULTIPLIER).wrapping_add(self.inc);
        let xorshifted = (((old >> 18) ^ old) >> 27) as u32;
        let rot = (old >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    fn coin(&mut self) -> bool {
        self.next_u32() & 1 == 1
    }
}

/// Walk two trees in lockstep, reporting admissible leaf pairs.
///
/// `admit` prunes: a node pair whose boxes fail it is dropped along with
/// everything beneath it. `order` steers expansion: given the fixed side's
/// box and the two child boxes of the side being expanded, `Less` descends
/// only into the first child, `Greater` only into the second, and `Equal`
/// into both. `emit` receives each surviving leaf pair with its stored
/// (fattened) boxes.
///
/// The same `seed` over the same pair of trees yields the same walk.
pub fn dual_traverse<T, PA, HA, PB, HB, Admit, Order, Emit>(
    a: &BvhTree<T, PA, HA>,
    b: &BvhTree<T, PB, HB>,
    mut admit: Admit,
    mut order: Order,
    seed: u64,
    mut emit: Emit,
) where
    T: Scalar,
    PA: Copy + Eq + Hash + Debug,
    PB: Copy + Eq + Hash + Debug,
    HA: InsertHeuristic<T>,
    HB: InsertHeuristic<T>,
    Admit: FnMut(&Aabb3<T>, &Aabb3<T>) -> bool,
    Order: FnMut(&Aabb3<T>, &Aabb3<T>, &Aabb3<T>) -> Ordering,
    Emit: FnMut(PA, &Aabb3<T>, PB, &Aabb3<T>),
{
    if a.root == NIL || b.root == NIL {
        return;
    }
    let mut rng = Pcg32::new(seed);
    let mut stack: SmallVec<[(u32, u32); 64]> = smallvec![(a.root, b.root)];

    while let Some((i, j)) = stack.pop() {
        let na = &a.nodes[i as usize];
        let nb = &b.nodes[j as usize];
        if !admit(&na.aabb, &nb.aabb) {
            continue;
        }
        let expand_a = match (na.item, nb.item) {
            (Some(pa), Some(pb)) => {
                emit(pa, &na.aabb, pb, &nb.aabb);
                continue;
            }
            (None, Some(_)) => true,
            (Some(_), None) => false,
            (None, None) => rng.coin(),
        };
        if expand_a {
            let (c1, c2) = (na.left, na.right);
            match order(&nb.aabb, &a.nodes[c1 as usize].aabb, &a.nodes[c2 as usize].aabb) {
                Ordering::Less => stack.push((c1, j)),
                Ordering::Greater => stack.push((c2, j)),
                Ordering::Equal => {
                    stack.push((c1, j));
                    stack.push((c2, j));
                }
            }
        } else {
            let (c1, c2) = (nb.left, nb.right);
            match order(&na.aabb, &b.nodes[c1 as usize].aabb, &b.nodes[c2 as usize].aabb) {
                Ordering::Less => stack.push((i, c1)),
                Ordering::Greater => stack.push((i, c2)),
                Ordering::Equal => {
                    stack.push((i, c1));
                    stack.push((i, c2));
                }
            }
        }
    }
}

/// Every cross-tree pair of items whose stored boxes overlap.
///
/// Each pair appears exactly once, as `(item from a, item from b)`. The seed
/// affects only the order of the result, never its contents.
pub fn tree_overlap<T, PA, HA, PB, HB>(
    a: &BvhTree<T, PA, HA>,
    b: &BvhTree<T, PB, HB>,
) -> Vec<(PA, PB)>
where
    T: Scalar,
    PA: Copy + Eq + Hash + Debug,
    PB: Copy + Eq + Hash + Debug,
    HA: InsertHeuristic<T>,
    HB: InsertHeuristic<T>,
{
    tree_overlap_seeded(a, b, DEFAULT_SEED)
}

/// [`tree_overlap`] with an explicit traversal seed.
pub fn tree_overlap_seeded<T, PA, HA, PB, HB>(
    a: &BvhTree<T, PA, HA>,
    b: &BvhTree<T, PB, HB>,
    seed: u64,
) -> Vec<(PA, PB)>
where
    T: Scalar,
    PA: Copy + Eq + Hash + Debug,
    PB: Copy + Eq + Hash + Debug,
    HA: InsertHeuristic<T>,
    HB: InsertHeuristic<T>,
{
    let mut out = Vec::new();
    dual_traverse(
        a,
        b,
        |ba, bb| ba.overlaps(bb),
        |_, _, _| Ordering::Equal,
        seed,
        |pa, _, pb, _| out.push((pa, pb)),
    );
    out
}

/// Candidate closest cross-tree pairs, in discovery order.
///
/// At each step the walk descends only into the child nearer to the other
/// side's box (ties descend into both), so this is a heuristic nearest-pair
/// search: the reported pairs are close, but there is no global
/// best-distance cutoff and exactness is not guaranteed. Callers wanting a
/// single pair can rank the candidates with [`Aabb3::dist2`]. Empty when
/// either tree is empty. Distances are between stored (fattened) boxes;
/// overlapping boxes have distance zero.
pub fn tree_closest<T, PA, HA, PB, HB>(
    a: &BvhTree<T, PA, HA>,
    b: &BvhTree<T, PB, HB>,
) -> Vec<(PA, PB)>
where
    T: Scalar,
    PA: Copy + Eq + Hash + Debug,
    PB: Copy + Eq + Hash + Debug,
    HA: InsertHeuristic<T>,
    HB: InsertHeuristic<T>,
{
    tree_closest_seeded(a, b, DEFAULT_SEED)
}

/// [`tree_closest`] with an explicit traversal seed.
pub fn tree_closest_seeded<T, PA, HA, PB, HB>(
    a: &BvhTree<T, PA, HA>,
    b: &BvhTree<T, PB, HB>,
    seed: u64,
) -> Vec<(PA, PB)>
where
    T: Scalar,
    PA: Copy + Eq + Hash + Debug,
    PB: Copy + Eq + Hash + Debug,
    HA: InsertHeuristic<T>,
    HB: InsertHeuristic<T>,
{
    let mut out = Vec::new();
    dual_traverse(
        a,
        b,
        |_, _| true,
        |fixed, c1, c2| {
            fixed
                .dist2(c1)
                .partial_cmp(&fixed.dist2(c2))
                .unwrap_or(Ordering::Equal)
        },
        seed,
        |pa, _, pb, _| out.push((pa, pb)),
    );
    out
}
