// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The dynamic AABB tree: arena, incremental updates, rebalancing.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::HashMap;

use crate::heuristic::{InsertHeuristic, Side, SurfaceArea};
use crate::types::{Aabb3, Scalar};

/// Sentinel for "no node".
pub(crate) const NIL: u32 = u32::MAX;

/// A tree node. Leaves hold one tracked item and a fattened box; branches
/// hold exactly two children and the tight union of their boxes.
#[derive(Clone, Debug)]
pub(crate) struct Node<T, P> {
    pub(crate) aabb: Aabb3<T>,
    pub(crate) parent: u32,
    pub(crate) left: u32,
    pub(crate) right: u32,
    /// 0 for leaves, 1 + max(child heights) for branches, -1 for free slots.
    pub(crate) height: i32,
    pub(crate) item: Option<P>,
}

impl<T, P> Node<T, P> {
    fn leaf(aabb: Aabb3<T>, item: P) -> Self {
        Self {
            aabb,
            parent: NIL,
            left: NIL,
            right: NIL,
            height: 0,
            item: Some(item),
        }
    }

    /// A node is a leaf iff it has no children.
    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        self.left == NIL
    }
}

/// An incrementally maintained bounding-volume hierarchy over fattened AABBs.
///
/// Items are tracked by identity (`P` must be cheap to copy, hashable, and
/// equality-comparable — typically a small id type). Each tracked item owns
/// one leaf; leaf boxes are expanded by a configurable margin so small motion
/// can be absorbed by [`BvhTree::refit`] without restructuring. Branch boxes
/// are tight unions of their children, and an AVL-style height bound
/// (child heights differ by at most one) is restored after every mutation.
///
/// The type parameter `H` selects the insertion heuristic and defaults to
/// [`SurfaceArea`]. All operations are synchronous and single-threaded; the
/// usual `&self`/`&mut self` discipline is the whole concurrency story.
///
/// ## Example
///
/// ```rust
/// use canopy_bvh::{Aabb3, BvhTree};
///
/// let mut tree: BvhTree<f64, u32> = BvhTree::new();
/// tree.insert(1, Aabb3::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0));
/// tree.insert(2, Aabb3::new(5.0, 5.0, 5.0, 6.0, 6.0, 6.0));
///
/// let hits = tree.query_overlap(&Aabb3::new(0.0, 0.0, 0.0, 2.0, 2.0, 2.0));
/// assert_eq!(hits, vec![1]);
/// ```
pub struct BvhTree<T: Scalar, P: Copy + Eq + Hash + Debug, H: InsertHeuristic<T> = SurfaceArea> {
    pub(crate) nodes: Vec<Node<T, P>>,
    free_list: Vec<u32>,
    pub(crate) root: u32,
    margin: T,
    heuristic: H,
    items: HashMap<P, u32>,
}

impl<T, P, H> Debug for BvhTree<T, P, H>
where
    T: Scalar,
    P: Copy + Eq + Hash + Debug,
    H: InsertHeuristic<T>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = total - self.free_list.len();
        f.debug_struct("BvhTree")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("items", &self.items.len())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

impl<T, P> BvhTree<T, P>
where
    T: Scalar,
    P: Copy + Eq + Hash + Debug,
{
    /// Create an empty tree with the scalar's default fat margin and the
    /// [`SurfaceArea`] heuristic.
    pub fn new() -> Self {
        Self::with_margin(T::default_margin())
    }

    /// Create an empty tree with an explicit fat margin.
    pub fn with_margin(margin: T) -> Self {
        Self::with_margin_and_heuristic(margin, SurfaceArea)
    }
}

impl<T, P> Default for BvhTree<T, P>
where
    T: Scalar,
    P: Copy + Eq + Hash + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, P, H> BvhTree<T, P, H>
where
    T: Scalar,
    P: Copy + Eq + Hash + Debug,
    H: InsertHeuristic<T>,
{
    /// Create an empty tree with a specific insertion heuristic.
    pub fn with_heuristic(heuristic: H) -> Self {
        Self::with_margin_and_heuristic(T::default_margin(), heuristic)
    }

    /// Create an empty tree with an explicit fat margin and heuristic.
    pub fn with_margin_and_heuristic(margin: T, heuristic: H) -> Self {
        Self {
            nodes: Vec::new(),
            free_list: Vec::new(),
            root: NIL,
            margin,
            heuristic,
            items: HashMap::new(),
        }
    }

    /// Number of tracked items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the tree tracks no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether `item` is currently tracked.
    pub fn contains(&self, item: P) -> bool {
        self.items.contains_key(&item)
    }

    /// The stored (fattened) box for a tracked item.
    pub fn item_aabb(&self, item: P) -> Option<Aabb3<T>> {
        self.items
            .get(&item)
            .map(|&leaf| self.nodes[leaf as usize].aabb)
    }

    /// Height of the root (0 for an empty or single-leaf tree).
    pub fn height(&self) -> i32 {
        if self.root == NIL {
            0
        } else {
            self.nodes[self.root as usize].height
        }
    }

    /// Number of allocated nodes (leaves and branches), excluding free slots.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    /// Track `item` under a fattened copy of `aabb`.
    ///
    /// If `item` is already tracked this behaves as [`BvhTree::update`]: the
    /// old leaf is removed and the item is reinserted under the new box.
    pub fn insert(&mut self, item: P, aabb: Aabb3<T>) {
        if self.items.contains_key(&item) {
            self.remove(item);
        }
        let fat = aabb.fattened(self.margin);
        let leaf = self.alloc(Node::leaf(fat, item));
        self.insert_leaf(leaf);
        self.items.insert(item, leaf);
    }

    /// Unconditionally remove and reinsert `item` under a freshly fattened
    /// copy of `aabb`. Untracked items are inserted.
    ///
    /// This always restructures, even when `aabb` still fits the stored fat
    /// box; use [`BvhTree::refit`] when a conditional move is wanted.
    pub fn update(&mut self, item: P, aabb: Aabb3<T>) {
        self.insert(item, aabb);
    }

    /// Move `item` only if `aabb` has escaped its stored fat box.
    ///
    /// Returns whether the tree structure changed. Untracked items are
    /// inserted (and `true` is returned). This is the margin-aware fast path
    /// for frequently moving items; unlike [`BvhTree::update`] it skips all
    /// structural work while motion stays within the margin.
    pub fn refit(&mut self, item: P, aabb: Aabb3<T>) -> bool {
        let Some(&leaf) = self.items.get(&item) else {
            self.insert(item, aabb);
            return true;
        };
        if self.nodes[leaf as usize].aabb.contains(&aabb) {
            return false;
        }
        self.remove_leaf(leaf);
        self.nodes[leaf as usize].aabb = aabb.fattened(self.margin);
        self.insert_leaf(leaf);
        true
    }

    /// Stop tracking `item`. No-op when it is not tracked.
    pub fn remove(&mut self, item: P) {
        let Some(leaf) = self.items.remove(&item) else {
            return;
        };
        self.remove_leaf(leaf);
        self.free(leaf);
    }

    /// Remove all items and release the arena.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free_list.clear();
        self.root = NIL;
        self.items.clear();
    }

    // --- internals ---

    fn alloc(&mut self, node: Node<T, P>) -> u32 {
        if let Some(i) = self.free_list.pop() {
            self.nodes[i as usize] = node;
            i
        } else {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "Node indices are intentionally 32-bit."
            )]
            let i = self.nodes.len() as u32;
            self.nodes.push(node);
            i
        }
    }

    fn free(&mut self, node: u32) {
        let n = &mut self.nodes[node as usize];
        n.parent = NIL;
        n.left = NIL;
        n.right = NIL;
        n.height = -1;
        n.item = None;
        self.free_list.push(node);
    }

    /// Descend from the root to a sibling leaf, splice in a new branch above
    /// it, and restore invariants up to the root.
    fn insert_leaf(&mut self, leaf: u32) {
        self.nodes[leaf as usize].parent = NIL;
        if self.root == NIL {
            self.root = leaf;
            return;
        }

        let leaf_aabb = self.nodes[leaf as usize].aabb;
        let mut sibling = self.root;
        while !self.nodes[sibling as usize].is_leaf() {
            let l = self.nodes[sibling as usize].left;
            let r = self.nodes[sibling as usize].right;
            let side = self.heuristic.choose(
                &self.nodes[l as usize].aabb,
                &self.nodes[r as usize].aabb,
                &leaf_aabb,
            );
            sibling = match side {
                Side::Left => l,
                Side::Right => r,
            };
        }

        let old_parent = self.nodes[sibling as usize].parent;
        let branch = self.alloc(Node {
            aabb: leaf_aabb.union(&self.nodes[sibling as usize].aabb),
            parent: old_parent,
            left: sibling,
            right: leaf,
            // Provisional; corrected by sync_up.
            height: self.nodes[sibling as usize].height + 1,
            item: None,
        });
        self.nodes[sibling as usize].parent = branch;
        self.nodes[leaf as usize].parent = branch;
        if old_parent == NIL {
            self.root = branch;
        } else {
            self.replace_child(old_parent, sibling, branch);
        }

        self.sync_up(branch);
    }

    /// Detach a leaf, collapsing its parent branch into the sibling. The
    /// parent slot is freed here; the leaf slot is the caller's to free or
    /// reinsert.
    fn remove_leaf(&mut self, leaf: u32) {
        if leaf == self.root {
            self.root = NIL;
            return;
        }

        let parent = self.nodes[leaf as usize].parent;
        let grandparent = self.nodes[parent as usize].parent;
        let p = &self.nodes[parent as usize];
        let sibling = if p.left == leaf { p.right } else { p.left };
        self.free(parent);

        if grandparent == NIL {
            self.root = sibling;
            self.nodes[sibling as usize].parent = NIL;
        } else {
            self.replace_child(grandparent, parent, sibling);
            self.nodes[sibling as usize].parent = grandparent;
            self.sync_up(grandparent);
        }
    }

    fn replace_child(&mut self, parent: u32, old: u32, new: u32) {
        let p = &mut self.nodes[parent as usize];
        if p.left == old {
            p.left = new;
        } else {
            debug_assert_eq!(p.right, old, "child link out of sync");
            p.right = new;
        }
    }

    /// Walk from `start` to the root, applying at most one rotation per node
    /// and recomputing heights and tight unions exactly.
    fn sync_up(&mut self, start: u32) {
        let mut node = start;
        while node != NIL {
            node = self.balance(node);
            self.refresh(node);
            node = self.nodes[node as usize].parent;
        }
    }

    /// Recompute a branch's height and box from its children.
    fn refresh(&mut self, node: u32) {
        let n = &self.nodes[node as usize];
        if n.is_leaf() {
            return;
        }
        let (l, r) = (n.left as usize, n.right as usize);
        let aabb = self.nodes[l].aabb.union(&self.nodes[r].aabb);
        let height = 1 + self.nodes[l].height.max(self.nodes[r].height);
        let n = &mut self.nodes[node as usize];
        n.aabb = aabb;
        n.height = height;
    }

    /// Apply one AVL rotation at `node` if its children's heights differ by
    /// more than one. Returns the index now occupying `node`'s position.
    fn balance(&mut self, node: u32) -> u32 {
        let n = &self.nodes[node as usize];
        if n.is_leaf() || n.height < 2 {
            return node;
        }
        let lh = self.nodes[n.left as usize].height;
        let rh = self.nodes[n.right as usize].height;
        if rh - lh > 1 {
            self.promote_child(node, true)
        } else if lh - rh > 1 {
            self.promote_child(node, false)
        } else {
            node
        }
    }

    /// Promote the deeper child into `node`'s position, demoting `node` under
    /// it and redistributing the promoted child's subtrees so the taller one
    /// stays on the promoted child's heavy side.
    fn promote_child(&mut self, node: u32, right_heavy: bool) -> u32 {
        let n = node as usize;
        let child = if right_heavy {
            self.nodes[n].right
        } else {
            self.nodes[n].left
        };
        let c = child as usize;
        // A height-2 imbalance forces the heavy child to be a branch.
        debug_assert!(!self.nodes[c].is_leaf(), "cannot promote a leaf");
        let g1 = self.nodes[c].left;
        let g2 = self.nodes[c].right;
        let parent = self.nodes[n].parent;

        self.nodes[c].parent = parent;
        if parent == NIL {
            self.root = child;
        } else {
            self.replace_child(parent, node, child);
        }
        if right_heavy {
            self.nodes[c].left = node;
        } else {
            self.nodes[c].right = node;
        }
        self.nodes[n].parent = child;

        let (keep, give) = if self.nodes[g1 as usize].height > self.nodes[g2 as usize].height {
            (g1, g2)
        } else {
            (g2, g1)
        };
        if right_heavy {
            self.nodes[c].right = keep;
            self.nodes[n].right = give;
        } else {
            self.nodes[c].left = keep;
            self.nodes[n].left = give;
        }
        self.nodes[keep as usize].parent = child;
        self.nodes[give as usize].parent = node;

        self.refresh(node);
        self.refresh(child);
        child
    }
}

#[cfg(test)]
impl<T, P, H> BvhTree<T, P, H>
where
    T: Scalar,
    P: Copy + Eq + Hash + Debug,
    H: InsertHeuristic<T>,
{
    /// Validate structural invariants: balance, tight containment, and the
    /// item-to-leaf bijection. Panics on the first violation.
    pub(crate) fn assert_invariants(&self) {
        let mut leaves = 0_usize;
        if self.root != NIL {
            assert_eq!(self.nodes[self.root as usize].parent, NIL, "root has a parent");
            let mut stack = alloc::vec![self.root];
            while let Some(i) = stack.pop() {
                let n = &self.nodes[i as usize];
                assert!(n.height >= 0, "free slot reachable from root");
                if n.is_leaf() {
                    assert_eq!(n.right, NIL, "leaf with one child");
                    assert_eq!(n.height, 0, "leaf height");
                    let item = n.item.expect("leaf without item");
                    assert_eq!(self.items.get(&item), Some(&i), "stale item mapping");
                    leaves += 1;
                } else {
                    assert!(n.item.is_none(), "branch holding an item");
                    let (l, r) = (n.left, n.right);
                    assert_ne!(r, NIL, "branch with one child");
                    assert_eq!(self.nodes[l as usize].parent, i, "left parent link");
                    assert_eq!(self.nodes[r as usize].parent, i, "right parent link");
                    let lh = self.nodes[l as usize].height;
                    let rh = self.nodes[r as usize].height;
                    assert_eq!(n.height, 1 + lh.max(rh), "branch height");
                    assert!((lh - rh).abs() <= 1, "imbalance at node {i}");
                    let union = self.nodes[l as usize].aabb.union(&self.nodes[r as usize].aabb);
                    assert!(n.aabb.contains(&union), "branch box misses children");
                    stack.push(l);
                    stack.push(r);
                }
            }
        }
        assert_eq!(leaves, self.items.len(), "item index out of sync");
    }
}
