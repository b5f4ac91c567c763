// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Read-only traversals over a single tree.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::HashSet;
use smallvec::{SmallVec, smallvec};

use crate::heuristic::InsertHeuristic;
use crate::tree::{BvhTree, NIL};
use crate::types::{Aabb3, FloatScalar, Frustum, Ray3, Scalar};

impl<T, P, H> BvhTree<T, P, H>
where
    T: Scalar,
    P: Copy + Eq + Hash + Debug,
    H: InsertHeuristic<T>,
{
    /// Depth-first walk pruned by `admit`; leaves that pass are reported.
    fn visit_where<F, V>(&self, mut admit: F, mut visit: V)
    where
        F: FnMut(&Aabb3<T>) -> bool,
        V: FnMut(P),
    {
        if self.root == NIL {
            return;
        }
        let mut stack: SmallVec<[u32; 64]> = smallvec![self.root];
        while let Some(i) = stack.pop() {
            let n = &self.nodes[i as usize];
            if !admit(&n.aabb) {
                continue;
            }
            if let Some(item) = n.item {
                visit(item);
            } else {
                stack.push(n.left);
                stack.push(n.right);
            }
        }
    }

    /// Call `visit` for every item whose stored box overlaps `aabb`.
    ///
    /// Stored boxes are fattened, so this can report items whose tight boxes
    /// miss `aabb` by up to the margin. Touching boundaries count as overlap.
    pub fn visit_overlap<V: FnMut(P)>(&self, aabb: &Aabb3<T>, visit: V) {
        self.visit_where(|b| b.overlaps(aabb), visit);
    }

    /// Collect every item whose stored box overlaps `aabb`.
    ///
    /// Order is unspecified. See [`BvhTree::visit_overlap`] to avoid the
    /// allocation.
    pub fn query_overlap(&self, aabb: &Aabb3<T>) -> Vec<P> {
        let mut out = Vec::new();
        self.visit_overlap(aabb, |item| out.push(item));
        out
    }

    /// Like [`BvhTree::query_overlap`], keeping only items that pass `filter`.
    pub fn query_overlap_filtered<F>(&self, aabb: &Aabb3<T>, mut filter: F) -> Vec<P>
    where
        F: FnMut(P) -> bool,
    {
        let mut out = Vec::new();
        self.visit_overlap(aabb, |item| {
            if filter(item) {
                out.push(item);
            }
        });
        out
    }

    /// Call `visit` for every item whose stored box intersects the frustum.
    ///
    /// The plane test is conservative: boxes fully outside any plane are
    /// culled, and everything else is reported, including the occasional box
    /// outside the frustum's corner regions.
    pub fn visit_frustum<V: FnMut(P)>(&self, frustum: &Frustum<T>, visit: V) {
        self.visit_where(|b| frustum.intersects(b), visit);
    }

    /// Collect every item whose stored box intersects the frustum.
    pub fn query_frustum(&self, frustum: &Frustum<T>) -> Vec<P> {
        let mut out = Vec::new();
        self.visit_frustum(frustum, |item| out.push(item));
        out
    }

    /// Like [`BvhTree::query_frustum`], keeping only items that pass `filter`.
    pub fn query_frustum_filtered<F>(&self, frustum: &Frustum<T>, mut filter: F) -> Vec<P>
    where
        F: FnMut(P) -> bool,
    {
        let mut out = Vec::new();
        self.visit_frustum(frustum, |item| {
            if filter(item) {
                out.push(item);
            }
        });
        out
    }

    /// Report every distinct unordered pair of items whose stored boxes
    /// overlap. Each pair is emitted once, ordered `(min, max)`.
    pub fn collision_pairs(&self) -> Vec<(P, P)>
    where
        P: Ord,
    {
        self.collision_pairs_filtered(|_, _| true)
    }

    /// Like [`BvhTree::collision_pairs`], keeping only pairs that pass
    /// `filter`. The filter is called at most once per candidate pair, with
    /// the items in `(min, max)` order.
    pub fn collision_pairs_filtered<F>(&self, mut filter: F) -> Vec<(P, P)>
    where
        P: Ord,
        F: FnMut(&P, &P) -> bool,
    {
        let mut seen: HashSet<(P, P)> = HashSet::new();
        let mut out = Vec::new();
        for n in &self.nodes {
            let Some(item) = n.item else {
                continue;
            };
            let aabb = n.aabb;
            self.visit_overlap(&aabb, |other| {
                if other == item {
                    return;
                }
                let key = if item < other { (item, other) } else { (other, item) };
                if seen.insert(key) && filter(&key.0, &key.1) {
                    out.push(key);
                }
            });
        }
        out
    }
}

impl<T, P, H> BvhTree<T, P, H>
where
    T: FloatScalar,
    P: Copy + Eq + Hash + Debug,
    H: InsertHeuristic<T>,
{
    /// Call `visit` for every item whose stored box is hit by `ray`.
    ///
    /// Hits anywhere along `t >= 0` count; items are not ordered by distance.
    pub fn visit_ray<V: FnMut(P)>(&self, ray: &Ray3<T>, visit: V) {
        self.visit_where(|b| ray.hits_aabb(b), visit);
    }

    /// Collect every item whose stored box is hit by `ray`.
    pub fn query_ray(&self, ray: &Ray3<T>) -> Vec<P> {
        let mut out = Vec::new();
        self.visit_ray(ray, |item| out.push(item));
        out
    }

    /// Like [`BvhTree::query_ray`], keeping only items that pass `filter`.
    pub fn query_ray_filtered<F>(&self, ray: &Ray3<T>, mut filter: F) -> Vec<P>
    where
        F: FnMut(P) -> bool,
    {
        let mut out = Vec::new();
        self.visit_ray(ray, |item| {
            if filter(item) {
                out.push(item);
            }
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dual::Pcg32;
    use alloc::vec;
    use alloc::vec::Vec;

    /// A thin box in z, so 2D scenarios read naturally.
    fn slab(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Aabb3<f64> {
        Aabb3::new(min_x, min_y, 0.0, max_x, max_y, 1.0)
    }

    fn sorted<P: Ord>(mut v: Vec<P>) -> Vec<P> {
        v.sort();
        v
    }

    #[test]
    fn overlapping_neighbors_pair_up() {
        let mut tree: BvhTree<f64, u32> = BvhTree::new();
        let a = 0;
        let b = 1;
        let c = 2;
        tree.insert(a, slab(0.0, 0.0, 1.0, 1.0));
        tree.insert(b, slab(0.5, 0.5, 1.5, 1.5));
        tree.insert(c, slab(5.0, 5.0, 6.0, 6.0));

        assert_eq!(tree.collision_pairs(), vec![(a, b)]);

        let probe = slab(0.0, 0.0, 2.0, 2.0);
        assert_eq!(sorted(tree.query_overlap(&probe)), vec![a, b]);

        tree.remove(b);
        assert_eq!(tree.query_overlap(&probe), vec![a]);
        assert!(tree.collision_pairs().is_empty());
    }

    #[test]
    fn empty_tree_yields_nothing() {
        let tree: BvhTree<f64, u32> = BvhTree::new();
        assert!(tree.query_overlap(&slab(0.0, 0.0, 100.0, 100.0)).is_empty());
        assert!(tree.collision_pairs().is_empty());
        let ray = Ray3::new(0.0, 0.0, 0.0, 1.0, 0.0, 0.0);
        assert!(tree.query_ray(&ray).is_empty());
    }

    #[test]
    fn query_matches_linear_scan() {
        let mut tree: BvhTree<i64, u32> = BvhTree::new();
        let mut rng = Pcg32::new(0xC0FFEE);
        let mut boxes: Vec<(u32, Aabb3<i64>)> = Vec::new();

        for id in 0..300_u32 {
            let coord = |r: &mut Pcg32| i64::from(r.next_u32() % 200) - 100;
            let (x, y, z) = (coord(&mut rng), coord(&mut rng), coord(&mut rng));
            let aabb = Aabb3::new(x, y, z, x + 4, y + 4, z + 4);
            tree.insert(id, aabb);
            boxes.push((id, tree.item_aabb(id).unwrap()));
        }

        for _ in 0..50 {
            let coord = |r: &mut Pcg32| i64::from(r.next_u32() % 200) - 100;
            let (x, y, z) = (coord(&mut rng), coord(&mut rng), coord(&mut rng));
            let probe = Aabb3::new(x, y, z, x + 20, y + 20, z + 20);

            let expected: Vec<u32> = boxes
                .iter()
                .filter(|(_, b)| b.overlaps(&probe))
                .map(|&(id, _)| id)
                .collect();
            assert_eq!(sorted(tree.query_overlap(&probe)), sorted(expected));
        }
    }

    #[test]
    fn pairs_match_quadratic_scan() {
        let mut tree: BvhTree<i64, u32> = BvhTree::new();
        let mut rng = Pcg32::new(42);
        let mut boxes: Vec<(u32, Aabb3<i64>)> = Vec::new();

        for id in 0..120_u32 {
            let coord = |r: &mut Pcg32| i64::from(r.next_u32() % 60) - 30;
            let (x, y, z) = (coord(&mut rng), coord(&mut rng), coord(&mut rng));
            tree.insert(id, Aabb3::new(x, y, z, x + 6, y + 6, z + 6));
            boxes.push((id, tree.item_aabb(id).unwrap()));
        }

        let mut expected: Vec<(u32, u32)> = Vec::new();
        for (i, &(a, ref ba)) in boxes.iter().enumerate() {
            for &(b, ref bb) in &boxes[i + 1..] {
                if ba.overlaps(bb) {
                    expected.push(if a < b { (a, b) } else { (b, a) });
                }
            }
        }
        assert_eq!(sorted(tree.collision_pairs()), sorted(expected));
    }

    #[test]
    fn pair_filter_drops_pairs() {
        let mut tree: BvhTree<f64, u32> = BvhTree::new();
        tree.insert(0, slab(0.0, 0.0, 2.0, 2.0));
        tree.insert(1, slab(1.0, 1.0, 3.0, 3.0));
        tree.insert(2, slab(1.5, 1.5, 4.0, 4.0));

        let all = tree.collision_pairs();
        assert_eq!(all.len(), 3);

        let without_zero = tree.collision_pairs_filtered(|&a, &_b| a != 0);
        assert_eq!(without_zero, vec![(1, 2)]);
    }

    #[test]
    fn ray_reports_boxes_along_its_path() {
        let mut tree: BvhTree<f64, u32> = BvhTree::with_margin(0.1);
        for i in 0..5_u32 {
            let x = f64::from(i) * 10.0;
            tree.insert(i, Aabb3::new(x, 0.0, 0.0, x + 1.0, 1.0, 1.0));
        }
        tree.insert(9, Aabb3::new(0.0, 50.0, 0.0, 1.0, 51.0, 1.0));

        // Along +x through the whole row.
        let ray = Ray3::new(-5.0, 0.5, 0.5, 1.0, 0.0, 0.0);
        assert_eq!(sorted(tree.query_ray(&ray)), vec![0, 1, 2, 3, 4]);

        // Pointing away from the row.
        let away = Ray3::new(-5.0, 0.5, 0.5, -1.0, 0.0, 0.0);
        assert!(tree.query_ray(&away).is_empty());

        let only_even = tree.query_ray_filtered(&ray, |id| id % 2 == 0);
        assert_eq!(sorted(only_even), vec![0, 2, 4]);
    }

    #[test]
    fn frustum_culls_boxes_outside_the_clip_volume() {
        // Identity matrix: the frustum is the [-1, 1] cube.
        let identity = [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let frustum = Frustum::from_view_proj(&identity);

        let mut tree: BvhTree<f64, u32> = BvhTree::with_margin(0.01);
        tree.insert(0, Aabb3::new(-0.5, -0.5, -0.5, 0.5, 0.5, 0.5));
        tree.insert(1, Aabb3::new(0.9, 0.9, 0.9, 1.5, 1.5, 1.5));
        tree.insert(2, Aabb3::new(5.0, 5.0, 5.0, 6.0, 6.0, 6.0));

        assert_eq!(sorted(tree.query_frustum(&frustum)), vec![0, 1]);
        let filtered = tree.query_frustum_filtered(&frustum, |id| id != 0);
        assert_eq!(filtered, vec![1]);
    }
}
