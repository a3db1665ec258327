use super::*;
use crate::error::ViolationKind;
use slab::Slab;

#[derive(Debug)]
struct Node {
    key: u64,
    tag: u32,
    link: TreeLink<usize>,
}

fn node(key: u64) -> Node {
    tagged(key, 0)
}

fn tagged(key: u64, tag: u32) -> Node {
    Node {
        key,
        tag,
        link: TreeLink::new(),
    }
}

struct ByKey;

impl TreeAdapter for ByKey {
    type Node = Node;
    type Index = usize;
    type Key = u64;

    fn link(node: &Node) -> &TreeLink<usize> {
        &node.link
    }

    fn link_mut(node: &mut Node) -> &mut TreeLink<usize> {
        &mut node.link
    }

    fn compare(&self, a: &Node, b: &Node) -> Ordering {
        a.key.cmp(&b.key)
    }

    fn compare_key(&self, node: &Node, key: &u64) -> Ordering {
        node.key.cmp(key)
    }
}

type Plain = Tree<ByKey>;
type Balanced = AaTree<ByKey>;

fn build<B: Balance>(keys: &[u64]) -> (Slab<Node>, Tree<ByKey, B>, Vec<usize>) {
    let mut storage = Slab::new();
    let mut tree = Tree::new(ByKey);
    let mut idxs = Vec::with_capacity(keys.len());
    for &key in keys {
        let idx = storage.insert(node(key));
        assert_eq!(tree.insert(&mut storage, idx), Ok(true));
        idxs.push(idx);
    }
    (storage, tree, idxs)
}

fn keys<B: Balance>(tree: &Tree<ByKey, B>, storage: &Slab<Node>) -> Vec<u64> {
    tree.iter(storage).map(|(_, n)| n.key).collect()
}

// ============================================================================
// Empty and single-node trees
// ============================================================================

#[test]
fn empty_tree() {
    let storage: Slab<Node> = Slab::new();
    let tree: Plain = Tree::new(ByKey);

    assert!(tree.is_empty());
    assert_eq!(tree.len(), 0);
    assert!(tree.base().is_none());
    assert!(tree.first(&storage).is_none());
    assert!(tree.last(&storage).is_none());
    assert!(tree.find(&storage, &1).is_none());
    assert!(tree.find_floor(&storage, &1).is_none());
    assert!(tree.find_ceiling(&storage, &1).is_none());
    assert_eq!(tree.height(&storage), 0);
    assert_eq!(tree.iter(&storage).count(), 0);
    assert!(tree.check(&storage));
}

#[test]
fn single_node() {
    let (mut storage, mut tree, idxs) = build::<AaBalance>(&[7]);
    let a = idxs[0];

    assert_eq!(tree.base(), Some(a));
    assert_eq!(tree.first(&storage), Some(a));
    assert_eq!(tree.last(&storage), Some(a));
    assert!(tree.next(&storage, a).is_none());
    assert!(tree.prev(&storage, a).is_none());
    assert_eq!(storage[a].link.level(), 1);
    assert_eq!(storage[a].link.owner(), Some(tree.id()));
    assert!(tree.check(&storage));

    assert!(tree.remove(&mut storage, a));
    assert!(tree.is_empty());
    assert!(tree.base().is_none());
    assert_eq!(storage[a].link, TreeLink::new());
    assert!(tree.check(&storage));
}

// ============================================================================
// Ordering and search
// ============================================================================

#[test]
fn in_order_round_trip() {
    let input = [5, 3, 8, 1, 4, 7, 9, 2, 6];

    let (storage, tree, _) = build::<Unbalanced>(&input);
    assert_eq!(keys(&tree, &storage), (1..=9).collect::<Vec<_>>());
    assert!(tree.check(&storage));

    let (storage, tree, _) = build::<AaBalance>(&input);
    assert_eq!(keys(&tree, &storage), (1..=9).collect::<Vec<_>>());
    assert!(tree.check(&storage));
}

#[test]
fn next_and_prev_walk() {
    let (storage, tree, _) = build::<AaBalance>(&[5, 3, 8, 1, 4, 7, 9, 2, 6]);

    let mut forward = Vec::new();
    let mut cursor = tree.first(&storage);
    while let Some(idx) = cursor {
        forward.push(storage[idx].key);
        cursor = tree.next(&storage, idx);
    }
    assert_eq!(forward, (1..=9).collect::<Vec<_>>());

    let mut backward = Vec::new();
    let mut cursor = tree.last(&storage);
    while let Some(idx) = cursor {
        backward.push(storage[idx].key);
        cursor = tree.prev(&storage, idx);
    }
    assert_eq!(backward, (1..=9).rev().collect::<Vec<_>>());
}

#[test]
fn iter_is_double_ended() {
    let (storage, tree, _) = build::<AaBalance>(&[4, 2, 6, 1, 3, 5, 7]);

    let mut iter = tree.iter(&storage);
    assert_eq!(iter.len(), 7);
    assert_eq!(iter.next().map(|(_, n)| n.key), Some(1));
    assert_eq!(iter.next_back().map(|(_, n)| n.key), Some(7));
    assert_eq!(iter.len(), 5);

    let rest: Vec<u64> = iter.map(|(_, n)| n.key).collect();
    assert_eq!(rest, vec![2, 3, 4, 5, 6]);

    let rev: Vec<u64> = tree.iter(&storage).rev().map(|(_, n)| n.key).collect();
    assert_eq!(rev, vec![7, 6, 5, 4, 3, 2, 1]);
}

#[test]
fn find_floor_ceiling() {
    let (storage, tree, _) = build::<AaBalance>(&[1, 3, 5, 7, 9]);
    let key_of = |idx: Option<usize>| idx.map(|i| storage[i].key);

    assert_eq!(key_of(tree.find(&storage, &5)), Some(5));
    assert_eq!(key_of(tree.find(&storage, &4)), None);

    assert_eq!(key_of(tree.find_floor(&storage, &4)), Some(3));
    assert_eq!(key_of(tree.find_ceiling(&storage, &4)), Some(5));

    assert_eq!(key_of(tree.find_floor(&storage, &5)), Some(5));
    assert_eq!(key_of(tree.find_ceiling(&storage, &5)), Some(5));

    assert_eq!(key_of(tree.find_floor(&storage, &0)), None);
    assert_eq!(key_of(tree.find_ceiling(&storage, &0)), Some(1));

    assert_eq!(key_of(tree.find_floor(&storage, &10)), Some(9));
    assert_eq!(key_of(tree.find_ceiling(&storage, &10)), None);
}

#[test]
fn equal_keys_keep_insertion_order() {
    let mut storage = Slab::new();
    let mut tree: Balanced = Tree::new(ByKey);

    let inputs = [(2, 0), (1, 0), (2, 1), (3, 0), (2, 2), (2, 3), (1, 1)];
    for (key, tag) in inputs {
        let idx = storage.insert(tagged(key, tag));
        tree.insert(&mut storage, idx).unwrap();
        assert!(tree.check(&storage));
    }

    let seen: Vec<(u64, u32)> = tree.iter(&storage).map(|(_, n)| (n.key, n.tag)).collect();
    assert_eq!(
        seen,
        vec![(1, 0), (1, 1), (2, 0), (2, 1), (2, 2), (2, 3), (3, 0)]
    );
}

// ============================================================================
// Deletion cases (unbalanced, so the shape is predictable)
// ============================================================================

#[test]
fn remove_leaf() {
    //        5
    //      3   8
    //     1 4 7 9
    let (mut storage, mut tree, idxs) = build::<Unbalanced>(&[5, 3, 8, 1, 4, 7, 9]);
    let (n3, n1) = (idxs[1], idxs[3]);

    assert!(tree.remove(&mut storage, n1));
    assert!(storage[n3].link.left().is_none());
    assert_eq!(storage[n1].link, TreeLink::new());
    assert_eq!(tree.len(), 6);
    assert!(tree.check(&storage));
}

#[test]
fn remove_one_child() {
    //        5
    //      3   8
    //     1 4 7 9
    //        6
    let (mut storage, mut tree, idxs) = build::<Unbalanced>(&[5, 3, 8, 1, 4, 7, 9, 6]);
    let (n8, n7, n6) = (idxs[2], idxs[5], idxs[7]);

    assert!(tree.remove(&mut storage, n7));
    assert_eq!(storage[n8].link.left(), n6);
    assert_eq!(storage[n6].link.parent(), n8);
    assert!(!storage[n7].link.is_attached());
    assert!(tree.check(&storage));
}

#[test]
fn remove_two_children_predecessor_is_left_child() {
    let (mut storage, mut tree, idxs) = build::<Unbalanced>(&[5, 3, 8, 1, 4, 7, 9]);
    let (n5, n3, n1, n4) = (idxs[0], idxs[1], idxs[3], idxs[4]);

    assert!(tree.remove(&mut storage, n3));
    assert_eq!(storage[n5].link.left(), n1);
    assert_eq!(storage[n1].link.parent(), n5);
    assert_eq!(storage[n1].link.right(), n4);
    assert_eq!(storage[n4].link.parent(), n1);
    assert_eq!(keys(&tree, &storage), vec![1, 4, 5, 7, 8, 9]);
    assert!(tree.check(&storage));
}

#[test]
fn remove_two_children_deep_predecessor() {
    //        10
    //      5    15
    //     3 8
    //      7
    let (mut storage, mut tree, idxs) = build::<Unbalanced>(&[10, 5, 15, 3, 8, 7]);
    let (n10, n5, n15, n8, n7) = (idxs[0], idxs[1], idxs[2], idxs[4], idxs[5]);

    assert!(tree.remove(&mut storage, n10));

    // 8 takes the base position; its former parent 5 adopts its left child 7.
    assert_eq!(tree.base(), Some(n8));
    assert!(storage[n8].link.parent().is_none());
    assert_eq!(storage[n8].link.left(), n5);
    assert_eq!(storage[n8].link.right(), n15);
    assert_eq!(storage[n5].link.parent(), n8);
    assert_eq!(storage[n15].link.parent(), n8);
    assert_eq!(storage[n5].link.right(), n7);
    assert_eq!(storage[n7].link.parent(), n5);
    assert_eq!(keys(&tree, &storage), vec![3, 5, 7, 8, 15]);
    assert!(tree.check(&storage));
}

#[test]
fn remove_base_down_to_empty() {
    let (mut storage, mut tree, _) = build::<AaBalance>(&[5, 3, 8, 1, 4, 7, 9, 2, 6]);

    while let Some(base) = tree.base() {
        assert!(tree.remove(&mut storage, base));
        assert!(tree.check(&storage));
    }
    assert!(tree.is_empty());
    assert!(storage.iter().all(|(_, n)| !n.link.is_attached()));
}

// ============================================================================
// Membership
// ============================================================================

#[test]
fn insert_is_idempotent() {
    let (mut storage, mut tree, idxs) = build::<AaBalance>(&[1, 2, 3]);

    assert_eq!(tree.insert(&mut storage, idxs[1]), Ok(false));
    assert_eq!(tree.len(), 3);
    assert!(tree.check(&storage));
}

#[test]
fn remove_non_member_is_noop() {
    let (mut storage, mut tree, idxs) = build::<AaBalance>(&[1, 2, 3]);
    let loose = storage.insert(node(4));

    assert!(!tree.remove(&mut storage, loose));
    assert!(tree.remove(&mut storage, idxs[0]));
    assert!(!tree.remove(&mut storage, idxs[0]));
    assert_eq!(tree.len(), 2);

    // Vacant slots are not members either.
    assert!(!tree.remove(&mut storage, 1_000));
    assert!(!tree.contains(&storage, 1_000));
}

#[test]
fn foreign_node_is_refused_then_transferred() {
    let mut storage = Slab::new();
    let mut a: Balanced = Tree::new(ByKey);
    let mut b: Balanced = Tree::new(ByKey);

    let idx = storage.insert(node(1));
    a.insert(&mut storage, idx).unwrap();

    assert_eq!(b.insert(&mut storage, idx), Err(Attached { owner: a.id() }));
    assert!(b.next(&storage, idx).is_none());

    assert_eq!(b.transfer(&mut a, &mut storage, idx), Ok(true));
    assert!(a.is_empty());
    assert_eq!(b.len(), 1);
    assert_eq!(storage[idx].link.owner(), Some(b.id()));

    // Already there: nothing to do.
    assert_eq!(b.transfer(&mut a, &mut storage, idx), Ok(false));
    assert!(a.check(&storage));
    assert!(b.check(&storage));
}

#[test]
fn clear_detaches_everything() {
    let (mut storage, mut tree, idxs) = build::<AaBalance>(&[5, 3, 8, 1, 4, 7, 9]);

    tree.clear(&mut storage);
    assert!(tree.is_empty());
    assert!(tree.base().is_none());
    for &idx in &idxs {
        assert_eq!(storage[idx].link, TreeLink::new());
    }

    for &idx in &idxs {
        assert_eq!(tree.insert(&mut storage, idx), Ok(true));
    }
    assert_eq!(keys(&tree, &storage), vec![1, 3, 4, 5, 7, 8, 9]);
    assert!(tree.check(&storage));
}

#[test]
fn dropped_tree_keeps_members_owned() {
    let (mut storage, tree, idxs) = build::<AaBalance>(&[2, 1, 3]);
    let stale = tree.id();
    drop(tree);

    let mut other: Balanced = Tree::new(ByKey);
    assert_eq!(
        other.insert(&mut storage, idxs[0]),
        Err(Attached { owner: stale })
    );
    assert_eq!(storage[idxs[0]].link.owner(), Some(stale));
    assert!(other.is_empty());
}

// ============================================================================
// AA shape
// ============================================================================

#[test]
fn ascending_three_rotates_to_middle() {
    let (storage, tree, idxs) = build::<AaBalance>(&[1, 2, 3]);
    let (n1, n2, n3) = (idxs[0], idxs[1], idxs[2]);

    assert_eq!(tree.base(), Some(n2));
    assert_eq!(storage[n2].link.level(), 2);
    assert_eq!(storage[n1].link.level(), 1);
    assert_eq!(storage[n3].link.level(), 1);
    assert_eq!(storage[n2].link.left(), n1);
    assert_eq!(storage[n2].link.right(), n3);
}

#[test]
fn ascending_insert_stays_logarithmic() {
    let input: Vec<u64> = (0..1000).collect();
    let (storage, tree, _) = build::<AaBalance>(&input);

    let bound = 2.0 * ((tree.len() + 1) as f64).log2();
    assert!(tree.height(&storage) as f64 <= bound);
    assert!(tree.check(&storage));

    let (storage, plain, _) = build::<Unbalanced>(&input);
    assert_eq!(plain.height(&storage), 1000);
}

#[test]
fn unbalanced_levels_stay_zero() {
    let (storage, _tree, idxs) = build::<Unbalanced>(&[2, 1, 3]);
    assert!(idxs.iter().all(|&i| storage[i].link.level() == 0));
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn validate_reports_level_damage() {
    let (mut storage, tree, idxs) = build::<AaBalance>(&[1, 2, 3]);
    let base = idxs[1];

    storage[base].link.level = 7;
    let err = tree.validate(&storage).unwrap_err();
    assert_eq!(err.node, Some(base));
    assert_eq!(err.kind, ViolationKind::LeftLevel);
    assert!(!tree.check(&storage));
}

#[test]
fn validate_reports_order_damage() {
    let (mut storage, tree, idxs) = build::<Unbalanced>(&[5, 3, 8]);
    storage[idxs[1]].key = 6;

    let err = tree.check_node(&storage, idxs[0]).unwrap_err();
    assert_eq!(err.kind, ViolationKind::Order);
    assert_eq!(err.node, Some(idxs[1]));
}

#[test]
fn validate_reports_broken_back_link() {
    let (mut storage, tree, idxs) = build::<Unbalanced>(&[5, 3, 8]);
    storage[idxs[2]].link.parent = idxs[1];

    assert!(tree.validate(&storage).is_err());
    assert_eq!(
        tree.check_node(&storage, idxs[0]).unwrap_err().kind,
        ViolationKind::ChildLink
    );
}

#[test]
fn validate_reports_length_mismatch() {
    let (storage, mut tree, _) = build::<Unbalanced>(&[5, 3, 8]);
    tree.len = 2;
    assert_eq!(
        tree.validate(&storage).unwrap_err().kind,
        ViolationKind::Length
    );
}

#[test]
fn stray_level_on_plain_tree() {
    let (mut storage, tree, idxs) = build::<Unbalanced>(&[5]);
    storage[idxs[0]].link.level = 1;
    assert_eq!(
        tree.validate(&storage).unwrap_err().kind,
        ViolationKind::StrayLevel
    );
}

#[test]
fn locked_tree_operations() {
    use crate::lock::{MutexLock, RwLock, SpinLock};

    fn exercise<L: ContainerLock>() {
        let mut storage = Slab::new();
        let mut tree: AaTree<ByKey, L> = Tree::new(ByKey);
        for key in [4, 2, 6, 1, 3, 5, 7] {
            let idx = storage.insert(node(key));
            tree.insert(&mut storage, idx).unwrap();
        }
        let found = tree.find(&storage, &5).unwrap();
        assert!(tree.remove(&mut storage, found));
        assert_eq!(keys_locked(&tree, &storage), vec![1, 2, 3, 4, 6, 7]);
        assert!(tree.check(&storage));
        tree.clear(&mut storage);
        assert!(tree.is_empty());
    }

    fn keys_locked<L: ContainerLock>(tree: &AaTree<ByKey, L>, storage: &Slab<Node>) -> Vec<u64> {
        tree.iter(storage).map(|(_, n)| n.key).collect()
    }

    exercise::<NoLock>();
    exercise::<RwLock>();
    exercise::<MutexLock>();
    exercise::<SpinLock>();
}
