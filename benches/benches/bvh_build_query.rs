// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use canopy_bvh::{Aabb3, BvhTree, tree_overlap};
use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

fn gen_random_boxes(count: usize, extent: f64, size: f64, seed: u64) -> Vec<Aabb3<f64>> {
    let mut out = Vec::with_capacity(count);
    let mut rng = Rng::new(seed);
    for _ in 0..count {
        let x = rng.next_f64() * extent;
        let y = rng.next_f64() * extent;
        let z = rng.next_f64() * extent;
        out.push(Aabb3::new(x, y, z, x + size, y + size, z + size));
    }
    out
}

fn build_tree(boxes: &[Aabb3<f64>]) -> BvhTree<f64, u32> {
    let mut tree = BvhTree::new();
    for (i, b) in boxes.iter().enumerate() {
        tree.insert(i as u32, *b);
    }
    tree
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for &n in &[1_000usize, 10_000] {
        let boxes = gen_random_boxes(n, 1_000.0, 4.0, 0xCAFE_F00D_DEAD_BEEF);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("incremental_n{}", n), |b| {
            b.iter_batched(
                BvhTree::<f64, u32>::new,
                |mut tree| {
                    for (i, r) in boxes.iter().copied().enumerate() {
                        tree.insert(i as u32, r);
                    }
                    black_box(tree.height())
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_query_overlap(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_overlap");
    for &n in &[1_000usize, 10_000] {
        let boxes = gen_random_boxes(n, 1_000.0, 4.0, 0xBADC_F00D_1234_5678);
        let tree = build_tree(&boxes);
        let probes = gen_random_boxes(256, 1_000.0, 40.0, 0xFACE_FEED_CAFE_BABE);
        group.throughput(Throughput::Elements(probes.len() as u64));
        group.bench_function(format!("tree_n{}", n), |b| {
            b.iter(|| {
                let mut hits = 0usize;
                for p in &probes {
                    tree.visit_overlap(p, |_| hits += 1);
                }
                black_box(hits)
            });
        });
        group.bench_function(format!("linear_scan_n{}", n), |b| {
            b.iter(|| {
                let mut hits = 0usize;
                for p in &probes {
                    hits += boxes.iter().filter(|r| r.overlaps(p)).count();
                }
                black_box(hits)
            });
        });
    }
    group.finish();
}

fn bench_refit_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn");
    let n = 10_000usize;
    let boxes = gen_random_boxes(n, 1_000.0, 4.0, 0xC1A5_7E55_9999_ABCD);
    group.throughput(Throughput::Elements(n as u64));

    // Jitter every box by less than the fat margin; refit should skip
    // nearly all restructuring.
    group.bench_function("refit_small_motion", |b| {
        b.iter_batched(
            || build_tree(&boxes),
            |mut tree| {
                let mut moved = 0usize;
                for (i, r) in boxes.iter().enumerate() {
                    let shifted = Aabb3::new(
                        r.min_x + 0.1,
                        r.min_y,
                        r.min_z,
                        r.max_x + 0.1,
                        r.max_y,
                        r.max_z,
                    );
                    if tree.refit(i as u32, shifted) {
                        moved += 1;
                    }
                }
                black_box(moved)
            },
            BatchSize::SmallInput,
        );
    });

    // Teleport every box; update always removes and reinserts.
    group.bench_function("update_teleport", |b| {
        let targets = gen_random_boxes(n, 1_000.0, 4.0, 0x0123_4567_89AB_CDEF);
        b.iter_batched(
            || build_tree(&boxes),
            |mut tree| {
                for (i, r) in targets.iter().copied().enumerate() {
                    tree.update(i as u32, r);
                }
                black_box(tree.height())
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_pairs(c: &mut Criterion) {
    let mut group = c.benchmark_group("pairs");
    for &n in &[1_000usize, 4_000] {
        let boxes = gen_random_boxes(n, 400.0, 6.0, 0x5EED_5EED_5EED_5EED);
        let tree = build_tree(&boxes);
        group.bench_function(format!("self_pairs_n{}", n), |b| {
            b.iter(|| black_box(tree.collision_pairs().len()));
        });
    }

    let left = build_tree(&gen_random_boxes(4_000, 400.0, 6.0, 1));
    let right = build_tree(&gen_random_boxes(4_000, 400.0, 6.0, 2));
    group.bench_function("tree_overlap_4k_x_4k", |b| {
        b.iter(|| black_box(tree_overlap(&left, &right).len()));
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_query_overlap,
    bench_refit_churn,
    bench_pairs
);
criterion_main!(benches);
