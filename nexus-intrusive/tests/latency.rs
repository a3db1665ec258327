//! Cycle-level latency histograms for the hot operations.
//!
//! Ignored by default. Run with:
//!
//! ```text
//! cargo test --release --test latency -- --ignored --nocapture
//! ```

use core::cmp::Ordering;

use hdrhistogram::Histogram;
use nexus_intrusive::{AaTree, Arena, DList, DListAdapter, DListLink, TreeAdapter, TreeLink};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const WARMUP: usize = 10_000;
const ITERATIONS: usize = 100_000;

#[inline]
fn rdtscp() -> u64 {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        core::arch::x86_64::__rdtscp(&mut 0)
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        std::time::Instant::now().elapsed().as_nanos() as u64
    }
}

fn print_histogram(name: &str, hist: &Histogram<u64>) {
    println!(
        "{:24} p50: {:4} cycles | p99: {:4} cycles | p999: {:5} cycles | min: {:4} | max: {:5}",
        name,
        hist.value_at_quantile(0.50),
        hist.value_at_quantile(0.99),
        hist.value_at_quantile(0.999),
        hist.min(),
        hist.max(),
    );
}

struct Level {
    price: u64,
    book: TreeLink<u32>,
    queue: DListLink<u32>,
}

struct Book;

impl TreeAdapter for Book {
    type Node = Level;
    type Index = u32;
    type Key = u64;

    #[inline]
    fn link(node: &Level) -> &TreeLink<u32> {
        &node.book
    }

    #[inline]
    fn link_mut(node: &mut Level) -> &mut TreeLink<u32> {
        &mut node.book
    }

    #[inline]
    fn compare(&self, a: &Level, b: &Level) -> Ordering {
        a.price.cmp(&b.price)
    }

    #[inline]
    fn compare_key(&self, node: &Level, key: &u64) -> Ordering {
        node.price.cmp(key)
    }
}

struct Queue;

impl DListAdapter for Queue {
    type Node = Level;
    type Index = u32;

    #[inline]
    fn link(node: &Level) -> &DListLink<u32> {
        &node.queue
    }

    #[inline]
    fn link_mut(node: &mut Level) -> &mut DListLink<u32> {
        &mut node.queue
    }
}

fn levels(prices: impl Iterator<Item = u64>) -> Arena<Level, u32> {
    prices
        .map(|price| Level {
            price,
            book: TreeLink::new(),
            queue: DListLink::new(),
        })
        .collect()
}

// ============================================================================
// Tree
// ============================================================================

#[test]
#[ignore]
fn bench_tree_insert_remove_random() {
    let mut rng = SmallRng::seed_from_u64(12345);
    let mut storage = levels((0..ITERATIONS).map(|_| rng.random_range(0..1_000_000)));
    let mut tree: AaTree<Book> = AaTree::new(Book);
    let mut insert = Histogram::<u64>::new(3).unwrap();
    let mut remove = Histogram::<u64>::new(3).unwrap();

    // Warmup
    for idx in 0..WARMUP as u32 {
        tree.insert(&mut storage, idx).unwrap();
    }
    tree.clear(&mut storage);

    for idx in 0..ITERATIONS as u32 {
        let start = rdtscp();
        let _ = tree.insert(&mut storage, idx);
        let elapsed = rdtscp() - start;
        insert.record(elapsed).unwrap();
    }

    for idx in 0..ITERATIONS as u32 {
        let start = rdtscp();
        let _ = tree.remove(&mut storage, idx);
        let elapsed = rdtscp() - start;
        remove.record(elapsed).unwrap();
    }

    print_histogram("tree insert_random", &insert);
    print_histogram("tree remove_random", &remove);
}

#[test]
#[ignore]
fn bench_tree_insert_sequential() {
    let mut storage = levels(0..ITERATIONS as u64);
    let mut tree: AaTree<Book> = AaTree::new(Book);
    let mut hist = Histogram::<u64>::new(3).unwrap();

    for idx in 0..WARMUP as u32 {
        tree.insert(&mut storage, idx).unwrap();
    }
    tree.clear(&mut storage);

    for idx in 0..ITERATIONS as u32 {
        let start = rdtscp();
        let _ = tree.insert(&mut storage, idx);
        let elapsed = rdtscp() - start;
        hist.record(elapsed).unwrap();
    }

    print_histogram("tree insert_sequential", &hist);
}

#[test]
#[ignore]
fn bench_tree_find() {
    let mut storage = levels((0..ITERATIONS as u64).map(|p| p * 2));
    let mut tree: AaTree<Book> = AaTree::new(Book);
    for idx in 0..ITERATIONS as u32 {
        tree.insert(&mut storage, idx).unwrap();
    }

    let mut rng = SmallRng::seed_from_u64(99999);
    let keys: Vec<u64> = (0..ITERATIONS)
        .map(|_| rng.random_range(0..2 * ITERATIONS as u64))
        .collect();
    let mut hist = Histogram::<u64>::new(3).unwrap();

    for key in &keys {
        let start = rdtscp();
        let found = tree.find_floor(&storage, key);
        let elapsed = rdtscp() - start;
        std::hint::black_box(found);
        hist.record(elapsed).unwrap();
    }

    print_histogram("tree find_floor", &hist);
}

// ============================================================================
// List
// ============================================================================

#[test]
#[ignore]
fn bench_dlist_push_remove() {
    let mut storage = levels(0..ITERATIONS as u64);
    let mut list: DList<Queue> = DList::new(Queue);
    let mut push = Histogram::<u64>::new(3).unwrap();
    let mut remove = Histogram::<u64>::new(3).unwrap();

    for idx in 0..WARMUP as u32 {
        list.push_back(&mut storage, idx).unwrap();
    }
    list.clear(&mut storage);

    for idx in 0..ITERATIONS as u32 {
        let start = rdtscp();
        let _ = list.push_back(&mut storage, idx);
        let elapsed = rdtscp() - start;
        push.record(elapsed).unwrap();
    }

    // Remove from the middle outwards.
    let mut rng = SmallRng::seed_from_u64(7);
    for _ in 0..ITERATIONS {
        let idx = rng.random_range(0..ITERATIONS as u32);
        let start = rdtscp();
        let _ = list.remove(&mut storage, idx);
        let elapsed = rdtscp() - start;
        remove.record(elapsed).unwrap();
    }

    print_histogram("dlist push_back", &push);
    print_histogram("dlist remove", &remove);
}
