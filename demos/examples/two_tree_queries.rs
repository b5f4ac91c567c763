// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cross-tree queries: overlap and approximate closest pairs between two
//! independently maintained trees.
//!
//! Two groups of agents each keep their own tree. Rather than merging them
//! into one structure, `tree_overlap` walks both at once to find contacts
//! between the groups, and `tree_closest` finds a nearby pair to steer
//! toward.
//!
//! Run:
//! - `cargo run -p canopy_examples --example two_tree_queries`

use canopy_bvh::{Aabb3, BvhTree, tree_closest, tree_overlap};
use kurbo::Rect;

fn lift(rect: Rect) -> Aabb3<f64> {
    Aabb3::new(rect.x0, rect.y0, 0.0, rect.x1, rect.y1, 1.0)
}

fn ring(tree: &mut BvhTree<f64, u32>, center: (f64, f64), radius: f64, count: u32) {
    for i in 0..count {
        let angle = f64::from(i) / f64::from(count) * core::f64::consts::TAU;
        let x = center.0 + radius * angle.cos();
        let y = center.1 + radius * angle.sin();
        tree.insert(i, lift(Rect::new(x, y, x + 10.0, y + 10.0)));
    }
}

fn main() {
    let mut herd: BvhTree<f64, u32> = BvhTree::with_margin(1.0);
    let mut pack: BvhTree<f64, u32> = BvhTree::with_margin(1.0);

    // Two rings that intersect on one side.
    ring(&mut herd, (0.0, 0.0), 100.0, 40);
    ring(&mut pack, (160.0, 0.0), 100.0, 40);

    let contacts = tree_overlap(&herd, &pack);
    println!("{} herd/pack contacts", contacts.len());
    for (h, p) in contacts.iter().take(5) {
        println!("  herd {h} touches pack {p}");
    }

    // Rank the candidate pairs by actual box distance.
    let candidates = tree_closest(&herd, &pack);
    let nearest = candidates.iter().copied().min_by(|&(h1, p1), &(h2, p2)| {
        let d1 = herd.item_aabb(h1).unwrap().dist2(&pack.item_aabb(p1).unwrap());
        let d2 = herd.item_aabb(h2).unwrap().dist2(&pack.item_aabb(p2).unwrap());
        d1.partial_cmp(&d2).unwrap()
    });
    match nearest {
        Some((h, p)) => {
            let hb = herd.item_aabb(h).unwrap();
            let pb = pack.item_aabb(p).unwrap();
            println!("close pair: herd {h} at ({:.0}, {:.0}), pack {p} at ({:.0}, {:.0})",
                hb.min_x, hb.min_y, pb.min_x, pb.min_y);
        }
        None => println!("one of the trees is empty"),
    }

    // Payload types are independent per tree.
    let mut labels: BvhTree<f64, char> = BvhTree::new();
    labels.insert('a', lift(Rect::new(95.0, -5.0, 115.0, 15.0)));
    let near_label = tree_overlap(&herd, &labels);
    println!("{} herd members under label 'a'", near_label.len());
}
