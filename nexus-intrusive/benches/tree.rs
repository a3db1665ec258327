//! Benchmarks comparing the intrusive trees against `std::collections::BTreeSet`.
//!
//! Run with: cargo bench
//!
//! Storage is pre-allocated and records are created once; each iteration only
//! links and unlinks them.

use core::cmp::Ordering;
use std::collections::BTreeSet;

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use nexus_intrusive::{
    AaTree, Arena, DList, DListAdapter, DListLink, Tree, TreeAdapter, TreeLink,
};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

const COUNT: usize = 10_000;

struct Node {
    key: u64,
    link: TreeLink<u32>,
    queue: DListLink<u32>,
}

struct ByKey;

impl TreeAdapter for ByKey {
    type Node = Node;
    type Index = u32;
    type Key = u64;

    #[inline]
    fn link(node: &Node) -> &TreeLink<u32> {
        &node.link
    }

    #[inline]
    fn link_mut(node: &mut Node) -> &mut TreeLink<u32> {
        &mut node.link
    }

    #[inline]
    fn compare(&self, a: &Node, b: &Node) -> Ordering {
        a.key.cmp(&b.key)
    }

    #[inline]
    fn compare_key(&self, node: &Node, key: &u64) -> Ordering {
        node.key.cmp(key)
    }
}

struct Queue;

impl DListAdapter for Queue {
    type Node = Node;
    type Index = u32;

    #[inline]
    fn link(node: &Node) -> &DListLink<u32> {
        &node.queue
    }

    #[inline]
    fn link_mut(node: &mut Node) -> &mut DListLink<u32> {
        &mut node.queue
    }
}

fn shuffled_keys() -> Vec<u64> {
    let mut keys: Vec<u64> = (0..COUNT as u64).collect();
    keys.shuffle(&mut SmallRng::seed_from_u64(0xbe7c));
    keys
}

fn nodes(keys: &[u64]) -> Arena<Node, u32> {
    keys.iter()
        .map(|&key| Node {
            key,
            link: TreeLink::new(),
            queue: DListLink::new(),
        })
        .collect()
}

// ============================================================================
// Insert + remove
// ============================================================================

fn bench_link_unlink(c: &mut Criterion) {
    let mut group = c.benchmark_group("link_unlink");
    group.throughput(Throughput::Elements(COUNT as u64));

    let keys = shuffled_keys();

    let mut storage = nodes(&keys);
    let mut aa: AaTree<ByKey> = AaTree::new(ByKey);
    group.bench_function("aa_tree/random", |b| {
        b.iter(|| {
            for idx in 0..COUNT as u32 {
                black_box(aa.insert(&mut storage, idx).unwrap());
            }
            for idx in 0..COUNT as u32 {
                black_box(aa.remove(&mut storage, idx));
            }
        });
    });

    let mut sequential = nodes(&(0..COUNT as u64).collect::<Vec<_>>());
    group.bench_function("aa_tree/ascending", |b| {
        b.iter(|| {
            for idx in 0..COUNT as u32 {
                black_box(aa.insert(&mut sequential, idx).unwrap());
            }
            for idx in 0..COUNT as u32 {
                black_box(aa.remove(&mut sequential, idx));
            }
        });
    });

    let mut plain_storage = nodes(&keys);
    let mut plain: Tree<ByKey> = Tree::new(ByKey);
    group.bench_function("unbalanced/random", |b| {
        b.iter(|| {
            for idx in 0..COUNT as u32 {
                black_box(plain.insert(&mut plain_storage, idx).unwrap());
            }
            for idx in 0..COUNT as u32 {
                black_box(plain.remove(&mut plain_storage, idx));
            }
        });
    });

    let mut set = BTreeSet::new();
    group.bench_function("btreeset/random", |b| {
        b.iter(|| {
            for &key in &keys {
                black_box(set.insert(key));
            }
            for &key in &keys {
                black_box(set.remove(&key));
            }
        });
    });

    group.finish();
}

// ============================================================================
// Lookup
// ============================================================================

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    group.throughput(Throughput::Elements(COUNT as u64));

    let keys = shuffled_keys();
    let mut storage = nodes(&keys);
    let mut aa: AaTree<ByKey> = AaTree::new(ByKey);
    for idx in 0..COUNT as u32 {
        aa.insert(&mut storage, idx).unwrap();
    }
    let set: BTreeSet<u64> = keys.iter().copied().collect();

    group.bench_function("aa_tree/find", |b| {
        b.iter(|| {
            for key in 0..COUNT as u64 {
                black_box(aa.find(&storage, &key));
            }
        });
    });

    group.bench_function("aa_tree/find_floor", |b| {
        b.iter(|| {
            for key in 0..COUNT as u64 {
                black_box(aa.find_floor(&storage, &(key * 2)));
            }
        });
    });

    group.bench_function("btreeset/get", |b| {
        b.iter(|| {
            for key in 0..COUNT as u64 {
                black_box(set.get(&key));
            }
        });
    });

    group.bench_function("aa_tree/iter", |b| {
        b.iter(|| black_box(aa.iter(&storage).map(|(_, n)| n.key).sum::<u64>()));
    });

    group.finish();
}

// ============================================================================
// List churn
// ============================================================================

fn bench_dlist(c: &mut Criterion) {
    let mut group = c.benchmark_group("dlist");
    group.throughput(Throughput::Elements(COUNT as u64));

    let mut storage = nodes(&(0..COUNT as u64).collect::<Vec<_>>());
    let mut list: DList<Queue> = DList::new(Queue);

    group.bench_function("push_back/pop_front", |b| {
        b.iter(|| {
            for idx in 0..COUNT as u32 {
                black_box(list.push_back(&mut storage, idx).unwrap());
            }
            while let Some(idx) = list.pop_front(&mut storage) {
                black_box(idx);
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_link_unlink, bench_lookup, bench_dlist);

criterion_main!(benches);
