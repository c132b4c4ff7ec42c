//! Tests for the alternative bitset.

use super::bitset::BitSet;

#[test]
fn set_and_get() {
    let mut b = BitSet::new();
    b.set(1);
    b.set(70);

    assert!(b.get(1));
    assert!(b.get(70));
    assert!(!b.get(2));
    assert_eq!(b.cardinality(), 2);
}

#[test]
fn min_finds_lowest_bit() {
    let mut b = BitSet::new();
    assert_eq!(b.min(), None);

    b.set(65);
    assert_eq!(b.min(), Some(65));

    b.set(3);
    assert_eq!(b.min(), Some(3));
}

#[test]
fn or_with_unions() {
    let mut a: BitSet = [1, 2].into_iter().collect();
    let b: BitSet = [2, 100].into_iter().collect();
    a.or_with(&b);

    assert_eq!(a.iter().collect::<Vec<_>>(), vec![1, 2, 100]);
}

#[test]
fn equal_sets_compare_equal_across_capacities() {
    // Same members, different internal growth history.
    let mut a = BitSet::new();
    a.set(1);

    let b: BitSet = [1].into_iter().collect();
    assert_eq!(a, b);
}

#[test]
fn clear_drops_bit_and_normalizes() {
    let mut b = BitSet::new();
    b.set(2);
    b.set(100);
    b.clear(100);

    assert!(!b.get(100));
    assert!(b.get(2));
    // Clearing the high bit leaves the set equal to one that never had it.
    let expected: BitSet = [2].into_iter().collect();
    assert_eq!(b, expected);
}

#[test]
fn display_lists_members() {
    let b: BitSet = [1, 3].into_iter().collect();
    assert_eq!(b.to_string(), "{1, 3}");
}
