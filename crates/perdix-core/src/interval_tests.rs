//! Tests for interval sets.

use super::interval::IntervalSet;
use super::token::EOF;
use super::vocabulary::Vocabulary;

#[test]
fn add_coalesces_adjacent_ranges() {
    let mut s = IntervalSet::new();
    s.add_range(1, 3);
    s.add_range(4, 6);

    assert_eq!(s.intervals().len(), 1);
    assert_eq!(s.size(), 6);
    assert!(s.contains(1) && s.contains(6));
    assert!(!s.contains(7));
}

#[test]
fn add_keeps_disjoint_ranges_separate() {
    let mut s = IntervalSet::new();
    s.add_range(1, 2);
    s.add_range(5, 6);

    assert_eq!(s.intervals().len(), 2);
    assert!(!s.contains(3));
    assert!(!s.contains(4));
}

#[test]
fn add_merges_overlapping_spans() {
    let mut s = IntervalSet::new();
    s.add_range(1, 4);
    s.add_range(10, 12);
    s.add_range(3, 11);

    assert_eq!(s.intervals().len(), 1);
    assert_eq!(s.min_element(), Some(1));
    assert_eq!(s.size(), 12);
}

#[test]
fn out_of_order_inserts_stay_sorted() {
    let mut s = IntervalSet::new();
    s.add(9);
    s.add(2);
    s.add(5);

    let members: Vec<_> = s.iter().collect();
    assert_eq!(members, vec![2, 5, 9]);
}

#[test]
fn complement_fills_gaps() {
    let mut s = IntervalSet::new();
    s.add_range(3, 4);
    s.add(7);

    let c = s.complement(1, 9);
    let members: Vec<_> = c.iter().collect();
    assert_eq!(members, vec![1, 2, 5, 6, 8, 9]);
}

#[test]
fn complement_of_empty_is_universe() {
    let s = IntervalSet::new();
    let c = s.complement(1, 3);
    assert_eq!(c.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[test]
fn remove_splits_interval() {
    let mut s = IntervalSet::of_range(1, 5);
    s.remove(3);

    assert_eq!(s.intervals().len(), 2);
    assert!(s.contains(2) && s.contains(4));
    assert!(!s.contains(3));
}

#[test]
fn eof_is_representable() {
    let mut s = IntervalSet::new();
    s.add(EOF);
    s.add(1);

    assert!(s.contains(EOF));
    assert_eq!(s.min_element(), Some(EOF));
}

#[test]
fn display_resolves_names() {
    let vocab = Vocabulary::from_symbolic(&["ID", "INT"]);
    let mut s = IntervalSet::new();
    s.add(1);
    s.add(2);

    assert_eq!(s.display(&vocab), "{ID, INT}");
    assert_eq!(IntervalSet::of(1).display(&vocab), "ID");
    assert_eq!(IntervalSet::of(EOF).display(&vocab), "<EOF>");
}

proptest::proptest! {
    /// Membership after any add sequence matches a naive set, and the
    /// stored intervals stay sorted, disjoint, and non-adjacent.
    #[test]
    fn add_matches_naive_membership(
        ranges in proptest::collection::vec((0i32..60, 0i32..8), 0..12)
    ) {
        let mut s = IntervalSet::new();
        let mut naive = std::collections::BTreeSet::new();
        for (low, len) in ranges {
            s.add_range(low, low + len);
            naive.extend(low..=low + len);
        }

        proptest::prop_assert_eq!(s.iter().collect::<Vec<_>>(), naive.into_iter().collect::<Vec<_>>());
        for pair in s.intervals().windows(2) {
            proptest::prop_assert!(pair[0].high + 1 < pair[1].low);
        }
    }
}

#[test]
fn union_does_not_mutate_operands() {
    let a = IntervalSet::of_range(1, 2);
    let b = IntervalSet::of(5);
    let u = a.union(&b);

    assert_eq!(u.size(), 3);
    assert_eq!(a.size(), 2);
    assert_eq!(b.size(), 1);
}
