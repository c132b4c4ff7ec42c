//! Sorted interval sets over token types.
//!
//! An [`IntervalSet`] stores a sorted, coalesced list of closed intervals.
//! Transition labels, lookahead sets, and expected-token sets are all
//! interval sets; membership is a binary search.

use crate::token::{EOF, EPSILON, TokenType};
use crate::vocabulary::Vocabulary;

/// A closed interval `[low, high]` of token types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interval {
    pub low: TokenType,
    pub high: TokenType,
}

impl Interval {
    #[inline]
    pub fn new(low: TokenType, high: TokenType) -> Self {
        Self { low, high }
    }

    #[inline]
    pub fn contains(&self, t: TokenType) -> bool {
        self.low <= t && t <= self.high
    }

    /// Whether two intervals overlap or touch (can be coalesced).
    #[inline]
    fn adjacent_or_overlapping(&self, other: &Interval) -> bool {
        self.low <= other.high.saturating_add(1) && other.low <= self.high.saturating_add(1)
    }
}

/// A set of token types stored as sorted disjoint intervals.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set containing a single token type.
    pub fn of(t: TokenType) -> Self {
        let mut s = Self::new();
        s.add(t);
        s
    }

    /// Set containing the closed range `[low, high]`.
    pub fn of_range(low: TokenType, high: TokenType) -> Self {
        let mut s = Self::new();
        s.add_range(low, high);
        s
    }

    /// Add a single token type.
    pub fn add(&mut self, t: TokenType) {
        self.add_range(t, t);
    }

    /// Add a closed range, coalescing with existing intervals.
    pub fn add_range(&mut self, low: TokenType, high: TokenType) {
        if low > high {
            return;
        }
        let added = Interval::new(low, high);

        // Find insertion point, then merge every neighbor the new interval
        // touches. Intervals stay sorted by `low` and pairwise disjoint.
        let mut i = match self
            .intervals
            .binary_search_by_key(&low, |iv| iv.low)
        {
            Ok(i) | Err(i) => i,
        };
        if i > 0 && self.intervals[i - 1].adjacent_or_overlapping(&added) {
            i -= 1;
        }
        if i == self.intervals.len() || !self.intervals[i].adjacent_or_overlapping(&added) {
            self.intervals.insert(i, added);
            return;
        }

        let mut merged = added;
        let mut j = i;
        while j < self.intervals.len() && self.intervals[j].adjacent_or_overlapping(&merged) {
            merged.low = merged.low.min(self.intervals[j].low);
            merged.high = merged.high.max(self.intervals[j].high);
            j += 1;
        }
        self.intervals.splice(i..j, [merged]);
    }

    /// Union another set into this one.
    pub fn add_set(&mut self, other: &IntervalSet) {
        for iv in &other.intervals {
            self.add_range(iv.low, iv.high);
        }
    }

    /// Union, consuming neither operand.
    pub fn union(&self, other: &IntervalSet) -> IntervalSet {
        let mut out = self.clone();
        out.add_set(other);
        out
    }

    /// Complement relative to the range `[min, max]`.
    pub fn complement(&self, min: TokenType, max: TokenType) -> IntervalSet {
        let mut out = IntervalSet::new();
        let mut next = min;
        for iv in &self.intervals {
            if iv.high < min {
                continue;
            }
            if iv.low > max {
                break;
            }
            if iv.low > next {
                out.add_range(next, iv.low - 1);
            }
            next = next.max(iv.high.saturating_add(1));
        }
        if next <= max {
            out.add_range(next, max);
        }
        out
    }

    #[inline]
    pub fn contains(&self, t: TokenType) -> bool {
        self.intervals
            .binary_search_by(|iv| {
                if t < iv.low {
                    std::cmp::Ordering::Greater
                } else if t > iv.high {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Number of token types in the set.
    pub fn size(&self) -> usize {
        self.intervals
            .iter()
            .map(|iv| (iv.high - iv.low) as usize + 1)
            .sum()
    }

    /// Smallest member, if any.
    pub fn min_element(&self) -> Option<TokenType> {
        self.intervals.first().map(|iv| iv.low)
    }

    /// Remove a single token type, splitting intervals as needed.
    pub fn remove(&mut self, t: TokenType) {
        let Some(i) = self.intervals.iter().position(|iv| iv.contains(t)) else {
            return;
        };
        let iv = self.intervals[i];
        match (iv.low == t, iv.high == t) {
            (true, true) => {
                self.intervals.remove(i);
            }
            (true, false) => self.intervals[i].low = t + 1,
            (false, true) => self.intervals[i].high = t - 1,
            (false, false) => {
                self.intervals[i].high = t - 1;
                self.intervals.insert(i + 1, Interval::new(t + 1, iv.high));
            }
        }
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Iterate all members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = TokenType> + '_ {
        self.intervals.iter().flat_map(|iv| iv.low..=iv.high)
    }

    /// Render against a vocabulary, e.g. `{ID, '=', INT}`.
    pub fn display(&self, vocabulary: &Vocabulary) -> String {
        if self.is_nil() {
            return "{}".to_string();
        }
        let names: Vec<String> = self
            .iter()
            .map(|t| match t {
                EOF => "<EOF>".to_string(),
                EPSILON => "<EPSILON>".to_string(),
                _ => vocabulary.display_name(t),
            })
            .collect();
        if names.len() == 1 {
            names.into_iter().next().unwrap()
        } else {
            format!("{{{}}}", names.join(", "))
        }
    }
}

impl FromIterator<TokenType> for IntervalSet {
    fn from_iter<I: IntoIterator<Item = TokenType>>(iter: I) -> Self {
        let mut s = IntervalSet::new();
        for t in iter {
            s.add(t);
        }
        s
    }
}
