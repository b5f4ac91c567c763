// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Broad-phase collision and viewport culling for a 2D sprite scene.
//!
//! This example shows how to:
//! - lift `kurbo::Rect` sprite bounds into unit-depth `Aabb3` boxes,
//! - keep the tree in sync with moving sprites via `refit`,
//! - cull against a viewport with `query_overlap`,
//! - enumerate touching sprites with `collision_pairs`.
//!
//! Run:
//! - `cargo run -p canopy_examples --example sprite_broadphase`

use canopy_bvh::{Aabb3, BvhTree};
use kurbo::Rect;

/// A 2D rect as a flat box in the z = 0..1 slab.
fn lift(rect: Rect) -> Aabb3<f64> {
    Aabb3::new(rect.x0, rect.y0, 0.0, rect.x1, rect.y1, 1.0)
}

fn main() {
    let mut tree: BvhTree<f64, u32> = BvhTree::with_margin(4.0);

    // A diagonal trail of sprites, each slightly overlapping the next.
    let mut sprites: Vec<(u32, Rect)> = Vec::new();
    for i in 0..32u32 {
        let o = f64::from(i) * 24.0;
        let rect = Rect::new(o, o, o + 32.0, o + 32.0);
        tree.insert(i, lift(rect));
        sprites.push((i, rect));
    }

    let viewport = Rect::new(0.0, 0.0, 320.0, 240.0);
    let mut visible = tree.query_overlap(&lift(viewport));
    visible.sort();
    println!("visible in {viewport:?}: {visible:?}");

    let pairs = tree.collision_pairs();
    println!("{} touching sprite pairs", pairs.len());

    // Drift every sprite a little. Motion inside the fat margin leaves the
    // tree untouched; the returned flag says whether a reinsert happened.
    let mut moved = 0;
    for (id, rect) in &mut sprites {
        *rect = *rect + kurbo::Vec2::new(1.5, 0.0);
        if tree.refit(*id, lift(*rect)) {
            moved += 1;
        }
    }
    println!("after small drift: {moved} of {} sprites reinserted", sprites.len());

    // Teleport one sprite far away; update always restructures.
    let (id, rect) = &mut sprites[0];
    *rect = Rect::new(5000.0, 5000.0, 5032.0, 5032.0);
    tree.update(*id, lift(*rect));
    println!(
        "sprite {id} teleported; still visible: {}",
        tree.query_overlap(&lift(viewport)).contains(id)
    );

    println!("tree height {} over {} sprites", tree.height(), tree.len());
}
