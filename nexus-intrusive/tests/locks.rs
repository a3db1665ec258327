//! Containers behind real locks, shared across threads for reading.

use core::cmp::Ordering;
use std::sync::Once;

use nexus_intrusive::{
    AaTree, ContainerLock, DList, DListAdapter, DListLink, MutexLock, RwLock, SpinLock, Tree,
    TreeAdapter, TreeLink,
};
use slab::Slab;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug)]
struct Quote {
    price: u64,
    book: TreeLink<usize>,
    fifo: DListLink<usize>,
}

fn quote(price: u64) -> Quote {
    Quote {
        price,
        book: TreeLink::new(),
        fifo: DListLink::new(),
    }
}

struct Book;

impl TreeAdapter for Book {
    type Node = Quote;
    type Index = usize;
    type Key = u64;

    fn link(node: &Quote) -> &TreeLink<usize> {
        &node.book
    }

    fn link_mut(node: &mut Quote) -> &mut TreeLink<usize> {
        &mut node.book
    }

    fn compare(&self, a: &Quote, b: &Quote) -> Ordering {
        a.price.cmp(&b.price)
    }

    fn compare_key(&self, node: &Quote, key: &u64) -> Ordering {
        node.price.cmp(key)
    }
}

struct Fifo;

impl DListAdapter for Fifo {
    type Node = Quote;
    type Index = usize;

    fn link(node: &Quote) -> &DListLink<usize> {
        &node.fifo
    }

    fn link_mut(node: &mut Quote) -> &mut DListLink<usize> {
        &mut node.fifo
    }
}

fn populate<L: ContainerLock>() -> (Slab<Quote>, AaTree<Book, L>, DList<Fifo, L>) {
    let mut storage = Slab::with_capacity(512);
    let mut tree: AaTree<Book, L> = Tree::new(Book);
    let mut list: DList<Fifo, L> = DList::new(Fifo);
    for i in 0..512u64 {
        let idx = storage.insert(quote((i * 7919) % 1024));
        tree.insert(&mut storage, idx).unwrap();
        list.push_back(&mut storage, idx).unwrap();
    }
    (storage, tree, list)
}

fn concurrent_readers<L: ContainerLock + Sync>() {
    let (storage, tree, list) = populate::<L>();

    std::thread::scope(|s| {
        for t in 0..4u64 {
            let (storage, tree, list) = (&storage, &tree, &list);
            s.spawn(move || {
                for round in 0..200u64 {
                    let key = (t * 131 + round * 17) % 1024;
                    if let Some(idx) = tree.find_floor(storage, &key) {
                        assert!(storage[idx].price <= key);
                    }
                    assert_eq!(tree.iter(storage).len(), 512);
                    assert_eq!(list.iter(storage).count(), 512);
                }
                assert!(tree.check(storage));
            });
        }
    });
}

#[test]
fn rwlock_concurrent_readers() {
    init_tracing();
    concurrent_readers::<RwLock>();
}

#[test]
fn spinlock_concurrent_readers() {
    init_tracing();
    concurrent_readers::<SpinLock>();
}

#[test]
fn mutex_concurrent_readers() {
    init_tracing();
    concurrent_readers::<MutexLock>();
}

#[test]
fn locked_mutation_round_trip() {
    init_tracing();
    let (mut storage, mut tree, mut list) = populate::<RwLock>();

    let victims: Vec<usize> = tree.iter(&storage).step_by(2).map(|(idx, _)| idx).collect();
    for idx in victims {
        assert!(tree.remove(&mut storage, idx));
        assert!(list.remove(&mut storage, idx));
        storage.remove(idx);
    }

    assert_eq!(tree.len(), 256);
    assert_eq!(list.len(), 256);
    assert!(tree.check(&storage));
    assert!(list.check(&storage));

    list.clear(&mut storage);
    tree.clear(&mut storage);
    assert!(tree.is_empty());
    assert!(storage.iter().all(|(_, q)| !q.book.is_attached() && !q.fifo.is_attached()));
}
